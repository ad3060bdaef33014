//! Activity resolvers: turn a request into a process tree
//!
//! Every resolver computes its own job time and cost, converts the recipe's
//! raw materials into required quantities, then decides per material whether
//! to recurse into a child job or record a purchase. Recursion is bounded by
//! [`RecursionBudget`], so cyclic recipe graphs still produce finite trees.

mod copy;
mod invent;
mod manufacture;
mod react;
mod research;

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

use tracing::trace;

use crate::error::{IndustryError, Result};
use crate::models::{Blueprint, ItemInfo, RecipeActivity, RegionId, TypeId};
use crate::modifier::{IndustryModifier, JobModifier};
use crate::process::ProcessNode;
use crate::quantity::{MaterialMap, QUANTITY_EPSILON};
use crate::reprocess::StandardReprocessing;
use crate::sources::{Catalog, Character, Pricing, Reprocessor};

pub use research::RESEARCH_LEVEL_TABLE;

/// Copy, research and invention job costs are this share of the product's base cost.
pub const JOB_COST_SHARE: f64 = 0.02;

/// Seconds per reaction cycle.
pub const REACTION_CYCLE_SECONDS: f64 = 3600.0;

/// Material/time reduction for a research level: `1 − |level| / 100`.
pub fn level_factor(level: i32) -> f64 {
    1.0 - f64::from(level.unsigned_abs()) / 100.0
}

/// Quantity of one material needed for `portions` runs.
///
/// Whole portions round up to whole units (snapping values within
/// [`QUANTITY_EPSILON`] of an integer), and never drop below one unit per
/// portion. Fractional portions keep the exact product.
pub fn required_quantity(base: f64, material_factor: f64, portions: f64) -> f64 {
    let raw = base * material_factor * portions;
    if portions.fract() != 0.0 {
        return raw;
    }
    let nearest = raw.round();
    let rounded = if (raw - nearest).abs() < QUANTITY_EPSILON {
        nearest
    } else {
        raw.ceil()
    };
    rounded.max(portions)
}

/// Apply [`required_quantity`] to every entry of a recipe's material list.
pub fn round_materials(
    materials: &MaterialMap,
    material_factor: f64,
    portions: f64,
) -> MaterialMap {
    materials
        .iter()
        .map(|(item, qty)| (item, required_quantity(qty, material_factor, portions)))
        .collect()
}

/// How many more levels of manufacturing and reaction jobs may be expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecursionBudget {
    pub manufacture: u32,
    pub reaction: u32,
}

impl RecursionBudget {
    /// Stop at leaves: every input is a purchase.
    pub const NONE: RecursionBudget = RecursionBudget {
        manufacture: 0,
        reaction: 0,
    };

    pub fn new(manufacture: u32, reaction: u32) -> Self {
        Self {
            manufacture,
            reaction,
        }
    }

    fn after_manufacture(self) -> Self {
        Self {
            manufacture: self.manufacture.saturating_sub(1),
            ..self
        }
    }

    fn after_reaction(self) -> Self {
        Self {
            reaction: self.reaction.saturating_sub(1),
            ..self
        }
    }
}

/// Researched blueprint levels, as non-positive numbers (ME 0..=-10, TE 0..=-20).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlueprintLevels {
    pub me: i32,
    pub te: i32,
}

impl BlueprintLevels {
    pub fn new(me: i32, te: i32) -> Self {
        Self { me, te }
    }

    fn validate(self) -> Result<Self> {
        if self.me.unsigned_abs() > 10 {
            return Err(IndustryError::InvalidResearchLevels {
                start: self.me,
                end: self.te,
                reason: "material efficiency must be within 0..=10",
            });
        }
        if self.te.unsigned_abs() > 20 {
            return Err(IndustryError::InvalidResearchLevels {
                start: self.me,
                end: self.te,
                reason: "time efficiency must be within 0..=20",
            });
        }
        Ok(self)
    }
}

/// Pricing knobs shared by every resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolverSettings {
    /// Oldest acceptable price data.
    pub max_price_age: Duration,
    /// Region used when an adjusted price is missing and for ranking reaction paths.
    pub reference_region: RegionId,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            max_price_age: Duration::from_secs(24 * 3600),
            reference_region: RegionId(10000002),
        }
    }
}

/// Resolves industry requests against one environment.
///
/// Owned by a single caller for the duration of its resolutions: the
/// base-cost memo uses interior mutability.
pub struct Resolver<'a> {
    catalog: &'a dyn Catalog,
    pricing: &'a dyn Pricing,
    character: &'a dyn Character,
    modifier: &'a IndustryModifier,
    reprocessor: Box<dyn Reprocessor + 'a>,
    settings: ResolverSettings,
    base_costs: RefCell<HashMap<TypeId, f64>>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        catalog: &'a dyn Catalog,
        pricing: &'a dyn Pricing,
        character: &'a dyn Character,
        modifier: &'a IndustryModifier,
    ) -> Self {
        Self {
            catalog,
            pricing,
            character,
            modifier,
            reprocessor: Box::new(StandardReprocessing::new(catalog, character)),
            settings: ResolverSettings::default(),
            base_costs: RefCell::new(HashMap::new()),
        }
    }

    pub fn with_settings(mut self, settings: ResolverSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replace the default reprocessing calculation used by alchemy reactions.
    pub fn with_reprocessor(mut self, reprocessor: Box<dyn Reprocessor + 'a>) -> Self {
        self.reprocessor = reprocessor;
        self
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    pub fn catalog(&self) -> &dyn Catalog {
        self.catalog
    }

    /// Price used for job cost estimation: the adjusted price, or the
    /// reference region's buy price when no adjusted price exists.
    fn estimate_price(&self, item: TypeId) -> Result<f64> {
        match self
            .pricing
            .adjusted_price(item, self.settings.max_price_age)
        {
            Err(IndustryError::PriceUnavailable { .. }) => self.pricing.buy_price(
                item,
                self.settings.reference_region,
                self.settings.max_price_age,
            ),
            other => other,
        }
    }

    /// Estimated value of one manufacturing run's materials, memoised per blueprint.
    pub fn base_product_cost(&self, blueprint: &Blueprint) -> Result<f64> {
        if let Some(cost) = self.base_costs.borrow().get(&blueprint.id) {
            return Ok(*cost);
        }

        let manufacturing =
            blueprint
                .manufacturing
                .as_ref()
                .ok_or(IndustryError::ActivityMissing {
                    blueprint: blueprint.id,
                    activity: RecipeActivity::Manufacturing,
                })?;

        let mut cost = 0.0;
        for (item, qty) in manufacturing.activity.materials.iter() {
            cost += self.estimate_price(item)? * qty;
        }

        self.base_costs.borrow_mut().insert(blueprint.id, cost);
        Ok(cost)
    }

    fn job_modifier(&self, activity: RecipeActivity, item: &ItemInfo) -> Result<JobModifier> {
        self.modifier
            .combined_modifier(activity, item, self.character)
    }

    /// Attach required materials to `node`, recursing where the budget allows.
    fn expand_materials(
        &self,
        node: &mut ProcessNode,
        required: &MaterialMap,
        budget: RecursionBudget,
    ) -> Result<()> {
        for (item, qty) in required.iter() {
            if budget.manufacture > 0 && self.catalog.is_manufacturable(item) {
                trace!(target: "resolve", item = item.0, quantity = qty, "expanding manufacture");
                let child = self.manufacture(item, qty, None, budget.after_manufacture())?;
                node.push_child(child);
            } else if budget.reaction > 0 && self.catalog.is_reaction_product(item) {
                trace!(target: "resolve", item = item.0, quantity = qty, "expanding reaction");
                match self.best_reaction(item, qty, budget.after_reaction()) {
                    Ok(child) => node.push_child(child),
                    Err(IndustryError::NoReactionPath(_)) => {
                        trace!(target: "resolve", item = item.0, "no net reaction yield, buying");
                        node.materials_mut().add(item, qty)?;
                    }
                    Err(err) => return Err(err),
                }
            } else {
                node.materials_mut().add(item, qty)?;
            }
        }
        Ok(())
    }
}

fn check_quantity(quantity: f64) -> Result<f64> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(IndustryError::InvalidQuantity {
            quantity,
            reason: "must be a positive finite number",
        });
    }
    Ok(quantity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_factor_is_linear() {
        assert_eq!(level_factor(0), 1.0);
        assert!((level_factor(-10) - 0.90).abs() < 1e-12);
        assert!((level_factor(-4) - 0.96).abs() < 1e-12);
        assert_eq!(level_factor(-10), level_factor(10));
    }

    #[test]
    fn whole_portions_round_up_with_floor() {
        assert_eq!(required_quantity(10.0, 0.9, 3.0), 27.0);
        assert_eq!(required_quantity(1.0, 0.9, 3.0), 3.0);
        assert_eq!(required_quantity(7.0, 0.95, 2.0), 14.0);
        assert_eq!(required_quantity(100.0, 0.99, 1.0), 99.0);
    }

    #[test]
    fn near_integer_values_snap_instead_of_ceiling() {
        // 0.1 * 3 * 10 is 3.0000000000000004 in binary floating point.
        assert_eq!(required_quantity(10.0, 0.1 * 3.0, 1.0), 3.0);
    }

    #[test]
    fn fractional_portions_are_exact() {
        let q = required_quantity(10.0, 0.9, 2.5);
        assert!((q - 22.5).abs() < 1e-12);
    }

    #[test]
    fn budget_descends_one_kind_at_a_time() {
        let budget = RecursionBudget::new(2, 1);
        assert_eq!(budget.after_manufacture(), RecursionBudget::new(1, 1));
        assert_eq!(budget.after_reaction(), RecursionBudget::new(2, 0));
        assert_eq!(RecursionBudget::NONE.after_reaction(), RecursionBudget::NONE);
    }

    #[test]
    fn blueprint_levels_out_of_range_are_rejected() {
        assert!(BlueprintLevels::new(-10, -20).validate().is_ok());
        assert!(BlueprintLevels::new(-11, 0).validate().is_err());
        assert!(BlueprintLevels::new(0, -22).validate().is_err());
    }

    #[test]
    fn invalid_quantities_are_rejected() {
        assert!(check_quantity(0.0).is_err());
        assert!(check_quantity(-1.0).is_err());
        assert!(check_quantity(f64::NAN).is_err());
        assert_eq!(check_quantity(2.5).unwrap(), 2.5);
    }
}
