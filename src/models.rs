//! Data models for industry recipes, items and facilities

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::quantity::{MaterialMap, SkillMap};

/// Identifies an item type (materials, products, blueprints, skills, decryptors).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeId(pub u32);

/// Identifies a market region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(pub u32);

/// Identifies the solar system or structure an industry job runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(pub u64);

/// Identifies an industry facility (station service or structure rig set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacilityId(pub u32);

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for FacilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of industry job. Selects the formula and the facility table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeActivity {
    Manufacturing,
    TimeResearch,
    MaterialResearch,
    Copying,
    Inventing,
    Reacting,
}

impl RecipeActivity {
    pub const ALL: [RecipeActivity; 6] = [
        RecipeActivity::Manufacturing,
        RecipeActivity::TimeResearch,
        RecipeActivity::MaterialResearch,
        RecipeActivity::Copying,
        RecipeActivity::Inventing,
        RecipeActivity::Reacting,
    ];

    /// Stable key used in the SQLite store and config files.
    pub fn as_str(self) -> &'static str {
        match self {
            RecipeActivity::Manufacturing => "manufacturing",
            RecipeActivity::TimeResearch => "time_research",
            RecipeActivity::MaterialResearch => "material_research",
            RecipeActivity::Copying => "copying",
            RecipeActivity::Inventing => "inventing",
            RecipeActivity::Reacting => "reacting",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        RecipeActivity::ALL.into_iter().find(|a| a.as_str() == s)
    }
}

impl fmt::Display for RecipeActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RecipeActivity::Manufacturing => "Manufacturing",
            RecipeActivity::TimeResearch => "Time Efficiency Research",
            RecipeActivity::MaterialResearch => "Material Efficiency Research",
            RecipeActivity::Copying => "Copying",
            RecipeActivity::Inventing => "Invention",
            RecipeActivity::Reacting => "Reaction",
        };
        f.write_str(label)
    }
}

/// Static item data the resolvers need: facility matching keys and market flags.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemInfo {
    pub id: TypeId,
    pub name: String,
    pub group_id: u32,
    pub category_id: u32,
    /// Minimum reprocessing batch. Manufacturing portion size lives on the blueprint.
    pub portion_size: u32,
    /// Whether the item can be listed on the market.
    pub sellable: bool,
}

/// Closed classification of an item, decided once when the catalog is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemClass {
    /// Built by a blueprint's manufacturing activity.
    Manufacturable { blueprint: TypeId },
    /// A reaction formula.
    Reaction,
    /// Produced by one or more reaction formulas.
    ReactionProduct,
    Decryptor,
    /// Blueprint that can invent other blueprints.
    InventorBlueprint,
    /// Blueprint obtained through invention (tech II).
    InventableBlueprint,
    /// Blueprint obtained through relic invention (tech III).
    T3Blueprint,
    /// Ancient relic used for tech III invention.
    Relic,
    /// Anything else: raw materials, commodities, skills.
    Item,
}

/// Time, input materials and minimum skills shared by every blueprint activity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityData {
    /// Base duration in seconds.
    pub time: u32,
    pub materials: MaterialMap,
    pub skills: SkillMap,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ManufacturingData {
    pub activity: ActivityData,
    pub product: TypeId,
    /// Units produced per run.
    pub portion_size: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InventionData {
    pub activity: ActivityData,
    /// Blueprints that a successful attempt can yield.
    pub products: Vec<TypeId>,
    pub base_probability: f64,
    /// Runs on an invented copy before decryptor modifiers.
    pub base_runs: u32,
    /// The two science skills that raise the success chance.
    pub science_skills: [TypeId; 2],
    pub encryption_skill: TypeId,
}

/// One blueprint (or relic) with whichever activities it supports.
#[derive(Debug, Clone, PartialEq)]
pub struct Blueprint {
    pub id: TypeId,
    pub max_production_limit: u32,
    pub manufacturing: Option<ManufacturingData>,
    pub copying: Option<ActivityData>,
    pub research_material: Option<ActivityData>,
    pub research_time: Option<ActivityData>,
    pub invention: Option<InventionData>,
}

impl Blueprint {
    pub fn new(id: TypeId, max_production_limit: u32) -> Self {
        Self {
            id,
            max_production_limit,
            manufacturing: None,
            copying: None,
            research_material: None,
            research_time: None,
            invention: None,
        }
    }

    /// Activity block for the given kind, if this blueprint supports it.
    pub fn activity(&self, activity: RecipeActivity) -> Option<&ActivityData> {
        match activity {
            RecipeActivity::Manufacturing => self.manufacturing.as_ref().map(|m| &m.activity),
            RecipeActivity::Copying => self.copying.as_ref(),
            RecipeActivity::MaterialResearch => self.research_material.as_ref(),
            RecipeActivity::TimeResearch => self.research_time.as_ref(),
            RecipeActivity::Inventing => self.invention.as_ref().map(|i| &i.activity),
            RecipeActivity::Reacting => None,
        }
    }
}

/// A reaction formula. Quantities are per cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    pub id: TypeId,
    pub inputs: MaterialMap,
    pub outputs: MaterialMap,
    pub skills: SkillMap,
    /// The output the formula is named after.
    pub primary_output: TypeId,
}

/// Consumable that shifts invention probability, runs and research levels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decryptor {
    pub id: TypeId,
    pub probability_modifier: f64,
    pub run_modifier: i32,
    pub me_modifier: i32,
    pub te_modifier: i32,
}

/// Requested run count for blueprint copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyRuns {
    /// The blueprint's maximum production limit.
    Max,
    Exact(u32),
}
