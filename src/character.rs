//! Character skills, implants, taxes and blueprint research levels

use std::collections::HashMap;

use crate::models::{RecipeActivity, TypeId};
use crate::sources::Character;

/// Skill type ids the profile's formulas read.
pub mod skills {
    use crate::models::TypeId;

    pub const INDUSTRY: TypeId = TypeId(3380);
    pub const ADVANCED_INDUSTRY: TypeId = TypeId(3388);
    pub const SCIENCE: TypeId = TypeId(3402);
    pub const RESEARCH: TypeId = TypeId(3403);
    pub const METALLURGY: TypeId = TypeId(3409);
    pub const REACTIONS: TypeId = TypeId(45746);
    pub const REPROCESSING: TypeId = TypeId(3385);
    pub const REPROCESSING_EFFICIENCY: TypeId = TypeId(3389);
    pub const ACCOUNTING: TypeId = TypeId(16622);
    pub const BROKER_RELATIONS: TypeId = TypeId(3446);
}

/// A character's trained skills and personal modifiers.
#[derive(Debug, Clone)]
pub struct CharacterProfile {
    skills: HashMap<TypeId, u8>,
    implants: HashMap<RecipeActivity, f64>,
    blueprints: HashMap<TypeId, (i32, i32)>,
    /// Item id to the ore-specific reprocessing skill that applies to it.
    reprocessing_skills: HashMap<TypeId, TypeId>,
    pub base_broker_fee: f64,
    pub base_sales_tax: f64,
    pub reprocessing_base_yield: f64,
    pub reprocessing_tax: f64,
}

impl Default for CharacterProfile {
    fn default() -> Self {
        Self {
            skills: HashMap::new(),
            implants: HashMap::new(),
            blueprints: HashMap::new(),
            reprocessing_skills: HashMap::new(),
            base_broker_fee: 0.03,
            base_sales_tax: 0.08,
            reprocessing_base_yield: 0.5,
            reprocessing_tax: 0.0,
        }
    }
}

impl CharacterProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// A character with every listed skill at level 5.
    pub fn all_five(skills: &[TypeId]) -> Self {
        let mut profile = Self::default();
        for skill in skills {
            profile.set_skill(*skill, 5);
        }
        profile
    }

    pub fn set_skill(&mut self, skill: TypeId, level: u8) {
        self.skills.insert(skill, level.min(5));
    }

    pub fn with_skill(mut self, skill: TypeId, level: u8) -> Self {
        self.set_skill(skill, level);
        self
    }

    /// Set the implant duration multiplier for an activity (e.g. 0.96).
    pub fn set_implant(&mut self, activity: RecipeActivity, factor: f64) {
        self.implants.insert(activity, factor);
    }

    /// Record researched levels for an owned blueprint. Magnitudes are accepted
    /// with either sign and stored as non-positive levels.
    pub fn set_blueprint_levels(&mut self, blueprint: TypeId, me: i32, te: i32) {
        let me = me.unsigned_abs().min(10) as i32;
        let te = te.unsigned_abs().min(20) as i32;
        self.blueprints.insert(blueprint, (-me, -te));
    }

    pub fn set_reprocessing_skill(&mut self, item: TypeId, skill: TypeId) {
        self.reprocessing_skills.insert(item, skill);
    }

    pub fn trained_skills(&self) -> impl Iterator<Item = (TypeId, u8)> + '_ {
        self.skills.iter().map(|(k, v)| (*k, *v))
    }

    fn level(&self, skill: TypeId) -> f64 {
        f64::from(self.skill_level(skill))
    }
}

impl Character for CharacterProfile {
    fn skill_level(&self, skill: TypeId) -> u8 {
        self.skills.get(&skill).copied().unwrap_or(0)
    }

    fn industry_time_factor(&self, activity: RecipeActivity) -> f64 {
        let advanced = 1.0 - 0.03 * self.level(skills::ADVANCED_INDUSTRY);
        match activity {
            RecipeActivity::Manufacturing => {
                (1.0 - 0.04 * self.level(skills::INDUSTRY)) * advanced
            }
            RecipeActivity::MaterialResearch => {
                (1.0 - 0.05 * self.level(skills::METALLURGY)) * advanced
            }
            RecipeActivity::TimeResearch => (1.0 - 0.05 * self.level(skills::RESEARCH)) * advanced,
            RecipeActivity::Copying => (1.0 - 0.05 * self.level(skills::SCIENCE)) * advanced,
            RecipeActivity::Inventing => advanced,
            RecipeActivity::Reacting => 1.0 - 0.04 * self.level(skills::REACTIONS),
        }
    }

    fn implant_time_factor(&self, activity: RecipeActivity) -> f64 {
        self.implants.get(&activity).copied().unwrap_or(1.0)
    }

    fn sell_tax_factor(&self) -> f64 {
        let broker =
            (self.base_broker_fee - 0.003 * self.level(skills::BROKER_RELATIONS)).max(0.0);
        let sales = self.base_sales_tax * (1.0 - 0.11 * self.level(skills::ACCOUNTING));
        1.0 - broker - sales
    }

    fn reprocessing_factor(&self, item: TypeId) -> f64 {
        let specific = self
            .reprocessing_skills
            .get(&item)
            .map(|skill| 1.0 + 0.02 * self.level(*skill))
            .unwrap_or(1.0);
        let factor = self.reprocessing_base_yield
            * (1.0 + 0.03 * self.level(skills::REPROCESSING))
            * (1.0 + 0.02 * self.level(skills::REPROCESSING_EFFICIENCY))
            * specific;
        factor.min(1.0)
    }

    fn reprocessing_tax(&self) -> f64 {
        self.reprocessing_tax
    }

    fn blueprint_levels(&self, blueprint: TypeId) -> (i32, i32) {
        self.blueprints.get(&blueprint).copied().unwrap_or((0, 0))
    }
}
