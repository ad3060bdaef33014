//! Collaborator contracts the resolvers consume
//!
//! The resolvers never touch storage or markets directly; they ask these
//! traits. `catalog::MemoryCatalog`, `pricing::PriceBook`,
//! `character::CharacterProfile` and `reprocess::StandardReprocessing` are the
//! implementations shipped with the crate.

use std::time::Duration;

use crate::error::Result;
use crate::models::{
    Blueprint, Decryptor, ItemClass, ItemInfo, Reaction, RecipeActivity, RegionId, TypeId,
};
use crate::quantity::MaterialMap;

/// Recipe and item lookup.
pub trait Catalog {
    fn item(&self, id: TypeId) -> Result<&ItemInfo>;

    fn classify(&self, id: TypeId) -> ItemClass;

    /// Blueprint (or relic) by its own type id.
    fn blueprint(&self, id: TypeId) -> Result<&Blueprint>;

    /// Blueprint whose manufacturing activity builds `product`.
    fn blueprint_for_product(&self, product: TypeId) -> Result<&Blueprint>;

    /// Every reaction formula with `item` among its outputs, including
    /// alchemy formulas whose output reprocesses into `item`.
    fn reactions_producing(&self, item: TypeId) -> Vec<&Reaction>;

    fn reaction(&self, id: TypeId) -> Result<&Reaction>;

    /// Blueprint or relic whose invention yields `blueprint`.
    fn inventor_of(&self, blueprint: TypeId) -> Option<TypeId>;

    fn decryptor(&self, id: TypeId) -> Result<&Decryptor>;

    /// Materials yielded by reprocessing one portion of `item`.
    fn reprocessing_materials(&self, item: TypeId) -> Option<&MaterialMap>;

    fn is_manufacturable(&self, id: TypeId) -> bool {
        matches!(self.classify(id), ItemClass::Manufacturable { .. })
    }

    fn is_reaction_product(&self, id: TypeId) -> bool {
        matches!(self.classify(id), ItemClass::ReactionProduct)
    }

    fn is_reprocessable(&self, id: TypeId) -> bool {
        self.reprocessing_materials(id).is_some()
    }
}

/// Market price lookup. Every call takes a freshness bound.
pub trait Pricing {
    /// Region-wide adjusted price used for job cost estimation.
    fn adjusted_price(&self, item: TypeId, max_age: Duration) -> Result<f64>;

    fn buy_price(&self, item: TypeId, region: RegionId, max_age: Duration) -> Result<f64>;

    fn sell_price(&self, item: TypeId, region: RegionId, max_age: Duration) -> Result<f64>;
}

/// Character skills, implants, taxes and owned blueprint research.
pub trait Character {
    fn skill_level(&self, skill: TypeId) -> u8;

    /// Multiplier on job duration from trained skills.
    fn industry_time_factor(&self, activity: RecipeActivity) -> f64;

    /// Multiplier on job duration from plugged-in implants.
    fn implant_time_factor(&self, activity: RecipeActivity) -> f64;

    /// Fraction of the sell price kept after broker fee and sales tax.
    fn sell_tax_factor(&self) -> f64;

    /// Fraction of the base reprocessing yield obtained for `item`.
    fn reprocessing_factor(&self, item: TypeId) -> f64;

    /// Fraction taken by the reprocessing facility owner.
    fn reprocessing_tax(&self) -> f64;

    /// Researched (ME, TE) levels of an owned blueprint, as non-positive numbers.
    fn blueprint_levels(&self, blueprint: TypeId) -> (i32, i32);
}

/// Reprocessing yield calculation.
pub trait Reprocessor {
    /// Materials obtained by reprocessing `quantity` units of `item`.
    fn reprocess(&self, item: TypeId, quantity: f64) -> Result<MaterialMap>;
}
