//! Errors surfaced by process resolution

use crate::models::{RecipeActivity, RegionId, TypeId};
use crate::quantity::QuantityError;

/// Errors that can occur while resolving an industry process.
///
/// Nothing is retried internally; a failed resolution yields no tree.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IndustryError {
    /// No assembly line of the activity accepts the item's group or category.
    #[error("no compatible facility for {activity} of item {item}")]
    NoCompatibleFacility {
        activity: RecipeActivity,
        item: TypeId,
    },

    /// The activity cannot be performed on the item in this environment.
    #[error("{activity} is not possible for item {item} here")]
    ActivityNotPossible {
        activity: RecipeActivity,
        item: TypeId,
    },

    #[error("no recipe found for item {0}")]
    RecipeNotFound(TypeId),

    /// The blueprint exists but does not support the activity.
    #[error("blueprint {blueprint} has no {activity} activity")]
    ActivityMissing {
        blueprint: TypeId,
        activity: RecipeActivity,
    },

    #[error("item {0} not found in catalog")]
    ItemNotFound(TypeId),

    #[error("no {kind} price for item {item} (region {region:?})")]
    PriceUnavailable {
        item: TypeId,
        kind: &'static str,
        region: Option<RegionId>,
    },

    /// Price data exists but is older than the caller's bound.
    #[error("{kind} price for item {item} is {age_secs}s old (max {max_age_secs}s)")]
    PriceTooStale {
        item: TypeId,
        kind: &'static str,
        age_secs: u64,
        max_age_secs: u64,
    },

    #[error("invalid research levels {start}..{end}: {reason}")]
    InvalidResearchLevels {
        start: i32,
        end: i32,
        reason: &'static str,
    },

    #[error("invalid quantity {quantity}: {reason}")]
    InvalidQuantity { quantity: f64, reason: &'static str },

    #[error("no reaction produces item {0}")]
    NoReactionPath(TypeId),

    /// The invention target is not among the blueprint's candidate outputs.
    #[error("blueprint {blueprint} cannot invent {target}")]
    NotInventable { blueprint: TypeId, target: TypeId },

    #[error(transparent)]
    Quantity(#[from] QuantityError),
}

pub type Result<T, E = IndustryError> = std::result::Result<T, E>;
