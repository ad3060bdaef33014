//! Material and skill quantity maps

use std::collections::BTreeMap;
use std::collections::btree_map;

use crate::models::TypeId;

/// Tolerance used when comparing quantities that went through float arithmetic.
pub const QUANTITY_EPSILON: f64 = 1e-9;

/// Errors raised by quantity map operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QuantityError {
    #[error("cannot add negative quantity {quantity} of item {item}")]
    Negative { item: TypeId, quantity: f64 },

    #[error("cannot remove {requested} of item {item}: only {available} present")]
    Insufficient {
        item: TypeId,
        requested: f64,
        available: f64,
    },

    #[error("invalid scale factor {factor}")]
    InvalidScale { factor: f64 },
}

/// Item id to quantity. Quantities are non-negative; zero entries are dropped.
///
/// Quantities are `f64` because reaction cycles and fractional portions
/// produce non-integral requirements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialMap {
    entries: BTreeMap<TypeId, f64>,
}

impl MaterialMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, item: TypeId) -> f64 {
        self.entries.get(&item).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, item: TypeId) -> bool {
        self.entries.contains_key(&item)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, f64)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, *v))
    }

    pub fn items(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.entries.keys().copied()
    }

    /// Sum of all quantities, regardless of item.
    pub fn total_quantity(&self) -> f64 {
        self.entries.values().sum()
    }

    /// Add `quantity` of `item`.
    pub fn add(&mut self, item: TypeId, quantity: f64) -> Result<(), QuantityError> {
        if quantity < 0.0 || quantity.is_nan() {
            return Err(QuantityError::Negative { item, quantity });
        }
        if quantity == 0.0 {
            return Ok(());
        }
        *self.entries.entry(item).or_insert(0.0) += quantity;
        Ok(())
    }

    /// Remove `quantity` of `item`. Dropping to zero removes the entry.
    pub fn remove(&mut self, item: TypeId, quantity: f64) -> Result<(), QuantityError> {
        if quantity < 0.0 || quantity.is_nan() {
            return Err(QuantityError::Negative { item, quantity });
        }
        let available = self.get(item);
        if quantity > available + QUANTITY_EPSILON {
            return Err(QuantityError::Insufficient {
                item,
                requested: quantity,
                available,
            });
        }
        let left = available - quantity;
        if left.abs() <= QUANTITY_EPSILON {
            self.entries.remove(&item);
        } else if let Some(entry) = self.entries.get_mut(&item) {
            *entry = left;
        }
        Ok(())
    }

    /// Remove an entry entirely, returning its quantity.
    pub fn take(&mut self, item: TypeId) -> f64 {
        self.entries.remove(&item).unwrap_or(0.0)
    }

    /// Add every entry of `other` into this map.
    pub fn merge(&mut self, other: &MaterialMap) {
        for (item, qty) in other.iter() {
            *self.entries.entry(item).or_insert(0.0) += qty;
        }
    }

    /// Remove every entry of `other` from this map.
    pub fn subtract(&mut self, other: &MaterialMap) -> Result<(), QuantityError> {
        for (item, qty) in other.iter() {
            self.remove(item, qty)?;
        }
        Ok(())
    }

    /// Multiply every quantity by `factor`.
    pub fn scale(&mut self, factor: f64) -> Result<(), QuantityError> {
        if factor < 0.0 || !factor.is_finite() {
            return Err(QuantityError::InvalidScale { factor });
        }
        if factor == 0.0 {
            self.entries.clear();
            return Ok(());
        }
        for qty in self.entries.values_mut() {
            *qty *= factor;
        }
        Ok(())
    }

    pub fn scaled(&self, factor: f64) -> Result<MaterialMap, QuantityError> {
        let mut out = self.clone();
        out.scale(factor)?;
        Ok(out)
    }

    /// Net out items present in both maps.
    ///
    /// For every item in both `self` and `other`, `min(self, other)` is removed
    /// from each side, so at most one side keeps the item afterwards.
    pub fn symmetric_difference(&mut self, other: &mut MaterialMap) {
        let shared: Vec<TypeId> = self
            .entries
            .keys()
            .filter(|k| other.entries.contains_key(k))
            .copied()
            .collect();

        for item in shared {
            let common = self.get(item).min(other.get(item));
            // Both sides hold at least `common`, so neither removal can fail.
            let _ = self.remove(item, common);
            let _ = other.remove(item, common);
        }
    }
}

impl FromIterator<(TypeId, f64)> for MaterialMap {
    fn from_iter<I: IntoIterator<Item = (TypeId, f64)>>(iter: I) -> Self {
        let mut map = MaterialMap::new();
        for (item, qty) in iter {
            if qty > 0.0 {
                *map.entries.entry(item).or_insert(0.0) += qty;
            }
        }
        map
    }
}

impl<'a> IntoIterator for &'a MaterialMap {
    type Item = (&'a TypeId, &'a f64);
    type IntoIter = btree_map::Iter<'a, TypeId, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Skill id to required level.
///
/// Merging keeps the highest level per skill: requirements are thresholds,
/// not amounts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillMap {
    levels: BTreeMap<TypeId, u8>,
}

impl SkillMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self, skill: TypeId) -> u8 {
        self.levels.get(&skill).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, u8)> + '_ {
        self.levels.iter().map(|(k, v)| (*k, *v))
    }

    /// Require `skill` at `level`, keeping any higher existing requirement.
    pub fn require(&mut self, skill: TypeId, level: u8) {
        let entry = self.levels.entry(skill).or_insert(level);
        if *entry < level {
            *entry = level;
        }
    }

    pub fn merge(&mut self, other: &SkillMap) {
        for (skill, level) in other.iter() {
            self.require(skill, level);
        }
    }

    /// Skills whose level in `self` exceeds what `trained` provides.
    pub fn missing(&self, trained: impl Fn(TypeId) -> u8) -> SkillMap {
        self.iter()
            .filter(|(skill, level)| trained(*skill) < *level)
            .collect()
    }
}

impl FromIterator<(TypeId, u8)> for SkillMap {
    fn from_iter<I: IntoIterator<Item = (TypeId, u8)>>(iter: I) -> Self {
        let mut map = SkillMap::new();
        for (skill, level) in iter {
            map.require(skill, level);
        }
        map
    }
}
