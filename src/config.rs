//! TOML configuration: market regions, facilities and the character

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::character::CharacterProfile;
use crate::models::{FacilityId, LocationId, RecipeActivity, RegionId, TypeId};
use crate::modifier::{AssemblyLine, IndustryModifier, ModifierTriple, STANDARD_CATEGORIES};
use crate::pricing::PriceContext;
use crate::resolver::{RecursionBudget, ResolverSettings};

/// Default file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "industry.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse error in {path}: {detail}")]
    Parse { path: PathBuf, detail: String },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub market: MarketConfig,
    pub industry: IndustryConfig,
    pub character: CharacterConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Region used for fallback job-cost prices and reaction path ranking.
    pub reference_region: RegionId,
    pub buy_region: RegionId,
    pub sell_region: RegionId,
    pub max_price_age_hours: u64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        let forge = RegionId(10000002);
        Self {
            reference_region: forge,
            buy_region: forge,
            sell_region: forge,
            max_price_age_hours: 24,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndustryConfig {
    pub location_id: LocationId,
    pub tax: f64,
    pub manufacture_recursion_depth: u32,
    pub reaction_recursion_depth: u32,
    pub cost_indices: Vec<CostIndexConfig>,
    pub assembly_lines: Vec<AssemblyLineConfig>,
}

impl Default for IndustryConfig {
    fn default() -> Self {
        Self {
            location_id: LocationId(60003760),
            tax: 0.0,
            manufacture_recursion_depth: 0,
            reaction_recursion_depth: 0,
            cost_indices: Vec::new(),
            assembly_lines: RecipeActivity::ALL
                .into_iter()
                .map(AssemblyLineConfig::station)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostIndexConfig {
    pub activity: RecipeActivity,
    pub index: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyLineConfig {
    pub activity: RecipeActivity,
    pub facility: FacilityId,
    #[serde(default)]
    pub base: ModifierTriple,
    #[serde(default)]
    pub groups: Vec<OverrideConfig>,
    #[serde(default)]
    pub categories: Vec<OverrideConfig>,
}

impl AssemblyLineConfig {
    fn station(activity: RecipeActivity) -> Self {
        Self {
            activity,
            facility: FacilityId(1),
            base: ModifierTriple::NEUTRAL,
            groups: Vec::new(),
            categories: STANDARD_CATEGORIES
                .iter()
                .map(|id| OverrideConfig::neutral(*id))
                .collect(),
        }
    }

    pub fn to_line(&self) -> AssemblyLine {
        let line = AssemblyLine::new(self.facility, self.activity, self.base);
        let line = self
            .groups
            .iter()
            .fold(line, |line, o| line.with_group(o.id, o.triple()));
        self.categories
            .iter()
            .fold(line, |line, o| line.with_category(o.id, o.triple()))
    }
}

/// Group or category override; omitted multipliers are 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideConfig {
    pub id: u32,
    #[serde(default = "one")]
    pub material: f64,
    #[serde(default = "one")]
    pub time: f64,
    #[serde(default = "one")]
    pub cost: f64,
}

fn one() -> f64 {
    1.0
}

impl OverrideConfig {
    fn neutral(id: u32) -> Self {
        Self {
            id,
            material: 1.0,
            time: 1.0,
            cost: 1.0,
        }
    }

    fn triple(&self) -> ModifierTriple {
        ModifierTriple::new(self.material, self.time, self.cost)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterConfig {
    pub skills: Vec<SkillConfig>,
    pub implants: Vec<ImplantConfig>,
    pub blueprints: Vec<BlueprintConfig>,
    pub sales_tax: f64,
    pub broker_fee: f64,
    pub reprocessing_yield: f64,
    pub reprocessing_tax: f64,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        let profile = CharacterProfile::new();
        Self {
            skills: Vec::new(),
            implants: Vec::new(),
            blueprints: Vec::new(),
            sales_tax: profile.base_sales_tax,
            broker_fee: profile.base_broker_fee,
            reprocessing_yield: profile.reprocessing_base_yield,
            reprocessing_tax: profile.reprocessing_tax,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillConfig {
    pub id: TypeId,
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplantConfig {
    pub activity: RecipeActivity,
    /// Duration multiplier, e.g. 0.96 for a 4% implant.
    pub factor: f64,
}

/// Researched levels of an owned blueprint, as positive magnitudes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueprintConfig {
    pub id: TypeId,
    #[serde(default)]
    pub me: i32,
    #[serde(default)]
    pub te: i32,
}

impl Config {
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    /// Read `path`, or fall back to the defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, path)
    }

    pub fn max_price_age(&self) -> Duration {
        Duration::from_secs(self.market.max_price_age_hours * 3600)
    }

    pub fn buy_context(&self) -> PriceContext {
        PriceContext::new(self.market.buy_region, self.max_price_age())
    }

    pub fn sell_context(&self) -> PriceContext {
        PriceContext::new(self.market.sell_region, self.max_price_age())
    }

    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            max_price_age: self.max_price_age(),
            reference_region: self.market.reference_region,
        }
    }

    pub fn recursion_budget(&self) -> RecursionBudget {
        RecursionBudget::new(
            self.industry.manufacture_recursion_depth,
            self.industry.reaction_recursion_depth,
        )
    }

    pub fn modifier(&self) -> IndustryModifier {
        let mut modifier = IndustryModifier::new(self.industry.location_id, self.industry.tax);
        for index in &self.industry.cost_indices {
            modifier.set_cost_index(index.activity, index.index);
        }
        for line in &self.industry.assembly_lines {
            modifier.add_line(line.to_line());
        }
        modifier
    }

    pub fn character(&self) -> CharacterProfile {
        let cfg = &self.character;
        let mut profile = CharacterProfile::new();
        for skill in &cfg.skills {
            profile.set_skill(skill.id, skill.level);
        }
        for implant in &cfg.implants {
            profile.set_implant(implant.activity, implant.factor);
        }
        for bp in &cfg.blueprints {
            profile.set_blueprint_levels(bp.id, bp.me, bp.te);
        }
        profile.base_sales_tax = cfg.sales_tax;
        profile.base_broker_fee = cfg.broker_fee;
        profile.reprocessing_base_yield = cfg.reprocessing_yield;
        profile.reprocessing_tax = cfg.reprocessing_tax;
        profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemInfo;
    use crate::sources::Character;

    fn ship() -> ItemInfo {
        ItemInfo {
            id: TypeId(587),
            name: "Rifter".to_string(),
            group_id: 25,
            category_id: 6,
            portion_size: 1,
            sellable: true,
        }
    }

    #[test]
    fn default_station_serves_every_activity() {
        let config = Config::default();
        let modifier = config.modifier();
        let character = config.character();
        for activity in RecipeActivity::ALL {
            let job = modifier
                .combined_modifier(activity, &ship(), &character)
                .unwrap();
            assert_eq!(job.triple.material, 1.0);
        }
        assert_eq!(config.market.reference_region, RegionId(10000002));
        assert_eq!(config.max_price_age(), Duration::from_secs(86400));
    }

    #[test]
    fn parses_partial_file() {
        let text = r#"
            [market]
            sell_region = 10000043
            max_price_age_hours = 6

            [industry]
            tax = 0.1
            manufacture_recursion_depth = 2

            [[industry.cost_indices]]
            activity = "manufacturing"
            index = 0.05

            [[industry.assembly_lines]]
            activity = "manufacturing"
            facility = 7
            base = { time = 0.85 }
            categories = [{ id = 6, material = 0.99 }]

            [character]
            sales_tax = 0.036

            [[character.skills]]
            id = 3380
            level = 5

            [[character.blueprints]]
            id = 691
            me = 10
            te = 20
        "#;
        let config = Config::from_toml(text, Path::new("industry.toml")).unwrap();

        assert_eq!(config.market.sell_region, RegionId(10000043));
        assert_eq!(config.market.buy_region, RegionId(10000002));
        assert_eq!(config.recursion_budget(), RecursionBudget::new(2, 0));

        let modifier = config.modifier();
        assert_eq!(modifier.cost_index(RecipeActivity::Manufacturing), 0.05);
        assert_eq!(modifier.lines(RecipeActivity::Manufacturing).len(), 1);
        assert!(modifier.lines(RecipeActivity::Copying).is_empty());
        let line = &modifier.lines(RecipeActivity::Manufacturing)[0];
        let triple = line.modifier_for(&ship());
        assert!((triple.material - 0.99).abs() < 1e-12);
        assert!((triple.time - 0.85).abs() < 1e-12);

        let character = config.character();
        assert_eq!(character.skill_level(TypeId(3380)), 5);
        assert_eq!(character.blueprint_levels(TypeId(691)), (-10, -20));
        assert_eq!(character.base_sales_tax, 0.036);
    }

    #[test]
    fn malformed_file_reports_path() {
        let err = Config::from_toml("[market\n", Path::new("bad.toml")).unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = Config::load(Path::new("/nonexistent/industry.toml")).unwrap();
        assert_eq!(config, Config::default());
    }
}
