//! Price book and pricing contexts

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::{IndustryError, Result};
use crate::models::{RegionId, TypeId};
use crate::sources::Pricing;

/// Where and how fresh prices must be for one lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceContext {
    pub region: RegionId,
    pub max_age: Duration,
}

impl PriceContext {
    pub fn new(region: RegionId, max_age: Duration) -> Self {
        Self { region, max_age }
    }
}

/// A price with the unix time it was observed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub price: f64,
    pub updated_at: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceKind {
    Adjusted,
    Buy,
    Sell,
}

impl PriceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PriceKind::Adjusted => "adjusted",
            PriceKind::Buy => "buy",
            PriceKind::Sell => "sell",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "adjusted" => Some(PriceKind::Adjusted),
            "buy" => Some(PriceKind::Buy),
            "sell" => Some(PriceKind::Sell),
            _ => None,
        }
    }
}

/// Snapshot of market prices, keyed by item and region.
#[derive(Debug, Clone, Default)]
pub struct PriceBook {
    adjusted: HashMap<TypeId, Quote>,
    regional: HashMap<(PriceKind, TypeId, RegionId), Quote>,
    /// Fixed clock for age checks. `None` uses the system time.
    clock: Option<u64>,
}

impl PriceBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate staleness against a fixed unix time instead of the system clock.
    pub fn with_clock(mut self, now: u64) -> Self {
        self.clock = Some(now);
        self
    }

    pub fn set_adjusted(&mut self, item: TypeId, quote: Quote) {
        self.adjusted.insert(item, quote);
    }

    pub fn set_buy(&mut self, item: TypeId, region: RegionId, quote: Quote) {
        self.regional.insert((PriceKind::Buy, item, region), quote);
    }

    pub fn set_sell(&mut self, item: TypeId, region: RegionId, quote: Quote) {
        self.regional.insert((PriceKind::Sell, item, region), quote);
    }

    pub fn len(&self) -> usize {
        self.adjusted.len() + self.regional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn now(&self) -> u64 {
        self.clock.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0)
        })
    }

    fn fresh(
        &self,
        quote: Option<&Quote>,
        kind: PriceKind,
        item: TypeId,
        region: Option<RegionId>,
        max_age: Duration,
    ) -> Result<f64> {
        let quote = quote.ok_or(IndustryError::PriceUnavailable {
            item,
            kind: kind.as_str(),
            region,
        })?;
        let age_secs = self.now().saturating_sub(quote.updated_at);
        if age_secs > max_age.as_secs() {
            return Err(IndustryError::PriceTooStale {
                item,
                kind: kind.as_str(),
                age_secs,
                max_age_secs: max_age.as_secs(),
            });
        }
        Ok(quote.price)
    }
}

impl Pricing for PriceBook {
    fn adjusted_price(&self, item: TypeId, max_age: Duration) -> Result<f64> {
        self.fresh(
            self.adjusted.get(&item),
            PriceKind::Adjusted,
            item,
            None,
            max_age,
        )
    }

    fn buy_price(&self, item: TypeId, region: RegionId, max_age: Duration) -> Result<f64> {
        self.fresh(
            self.regional.get(&(PriceKind::Buy, item, region)),
            PriceKind::Buy,
            item,
            Some(region),
            max_age,
        )
    }

    fn sell_price(&self, item: TypeId, region: RegionId, max_age: Duration) -> Result<f64> {
        self.fresh(
            self.regional.get(&(PriceKind::Sell, item, region)),
            PriceKind::Sell,
            item,
            Some(region),
            max_age,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HUB: RegionId = RegionId(10000002);

    #[test]
    fn stale_and_missing_prices_are_distinct() {
        let mut book = PriceBook::new().with_clock(10_000);
        book.set_buy(TypeId(34), HUB, Quote { price: 5.0, updated_at: 9_000 });

        let hour = Duration::from_secs(3600);
        assert_eq!(book.buy_price(TypeId(34), HUB, hour).unwrap(), 5.0);

        let err = book
            .buy_price(TypeId(34), HUB, Duration::from_secs(60))
            .unwrap_err();
        assert!(matches!(
            err,
            IndustryError::PriceTooStale { age_secs: 1000, max_age_secs: 60, .. }
        ));

        let err = book.sell_price(TypeId(34), HUB, hour).unwrap_err();
        assert!(matches!(err, IndustryError::PriceUnavailable { kind: "sell", .. }));
    }

    #[test]
    fn adjusted_prices_are_region_free() {
        let mut book = PriceBook::new().with_clock(100);
        book.set_adjusted(TypeId(35), Quote { price: 12.5, updated_at: 100 });
        assert_eq!(
            book.adjusted_price(TypeId(35), Duration::ZERO).unwrap(),
            12.5
        );
    }
}
