//! Catalog and price import from a data directory
//!
//! `*.toml` files hold catalog fragments (items, blueprints, reactions,
//! decryptors, reprocessing yields). `*.txt` files are price sheets with one
//! quote per line: `<type id> <buy|sell|adjusted> <price> [region]`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use rusqlite::Connection;
use serde::Deserialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::db;
use crate::models::{
    ActivityData, Blueprint, Decryptor, InventionData, ItemInfo, ManufacturingData, Reaction,
    RegionId, TypeId,
};
use crate::pricing::PriceKind;
use crate::quantity::{MaterialMap, QuantityError, SkillMap};

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    #[error("invalid quantity in {file}: {source}")]
    Quantity {
        file: PathBuf,
        source: QuantityError,
    },

    #[error("{file}:{line}: adjusted prices take no region")]
    AdjustedWithRegion { file: PathBuf, line: usize },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Fragment {
    items: Vec<ItemRecord>,
    blueprints: Vec<BlueprintRecord>,
    reactions: Vec<ReactionRecord>,
    decryptors: Vec<DecryptorRecord>,
    reprocessing: Vec<ReprocessingRecord>,
}

#[derive(Debug, Deserialize)]
struct ItemRecord {
    id: TypeId,
    name: String,
    group_id: u32,
    category_id: u32,
    #[serde(default = "one")]
    portion_size: u32,
    #[serde(default = "yes")]
    sellable: bool,
}

fn one() -> u32 {
    1
}

fn yes() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct Amount {
    id: TypeId,
    quantity: f64,
}

#[derive(Debug, Deserialize)]
struct SkillLevel {
    id: TypeId,
    level: u8,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ActivityRecord {
    time: u32,
    materials: Vec<Amount>,
    skills: Vec<SkillLevel>,
}

#[derive(Debug, Deserialize)]
struct ManufacturingRecord {
    #[serde(flatten)]
    activity: ActivityRecord,
    product: TypeId,
    #[serde(default = "one")]
    portion_size: u32,
}

#[derive(Debug, Deserialize)]
struct InventionRecord {
    #[serde(flatten)]
    activity: ActivityRecord,
    products: Vec<TypeId>,
    base_probability: f64,
    #[serde(default = "one")]
    base_runs: u32,
    science_skills: [TypeId; 2],
    encryption_skill: TypeId,
}

#[derive(Debug, Deserialize)]
struct BlueprintRecord {
    id: TypeId,
    max_production_limit: u32,
    manufacturing: Option<ManufacturingRecord>,
    copying: Option<ActivityRecord>,
    research_material: Option<ActivityRecord>,
    research_time: Option<ActivityRecord>,
    invention: Option<InventionRecord>,
}

#[derive(Debug, Deserialize)]
struct ReactionRecord {
    id: TypeId,
    primary_output: TypeId,
    inputs: Vec<Amount>,
    outputs: Vec<Amount>,
    #[serde(default)]
    skills: Vec<SkillLevel>,
}

#[derive(Debug, Deserialize)]
struct DecryptorRecord {
    id: TypeId,
    probability_modifier: f64,
    #[serde(default)]
    run_modifier: i32,
    #[serde(default)]
    me_modifier: i32,
    #[serde(default)]
    te_modifier: i32,
}

#[derive(Debug, Deserialize)]
struct ReprocessingRecord {
    item: TypeId,
    materials: Vec<Amount>,
}

fn material_map(amounts: &[Amount]) -> Result<MaterialMap, QuantityError> {
    let mut map = MaterialMap::new();
    for amount in amounts {
        map.add(amount.id, amount.quantity)?;
    }
    Ok(map)
}

fn skill_map(levels: &[SkillLevel]) -> SkillMap {
    levels.iter().map(|s| (s.id, s.level)).collect()
}

impl ActivityRecord {
    fn to_data(&self) -> Result<ActivityData, QuantityError> {
        Ok(ActivityData {
            time: self.time,
            materials: material_map(&self.materials)?,
            skills: skill_map(&self.skills),
        })
    }
}

impl BlueprintRecord {
    fn to_blueprint(&self) -> Result<Blueprint, QuantityError> {
        let mut blueprint = Blueprint::new(self.id, self.max_production_limit);
        if let Some(m) = &self.manufacturing {
            blueprint.manufacturing = Some(ManufacturingData {
                activity: m.activity.to_data()?,
                product: m.product,
                portion_size: m.portion_size,
            });
        }
        blueprint.copying = self.copying.as_ref().map(|a| a.to_data()).transpose()?;
        blueprint.research_material = self
            .research_material
            .as_ref()
            .map(|a| a.to_data())
            .transpose()?;
        blueprint.research_time = self.research_time.as_ref().map(|a| a.to_data()).transpose()?;
        if let Some(inv) = &self.invention {
            blueprint.invention = Some(InventionData {
                activity: inv.activity.to_data()?,
                products: inv.products.clone(),
                base_probability: inv.base_probability,
                base_runs: inv.base_runs,
                science_skills: inv.science_skills,
                encryption_skill: inv.encryption_skill,
            });
        }
        Ok(blueprint)
    }
}

/// A quote parsed from a price sheet line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceLine {
    pub item: TypeId,
    pub kind: PriceKind,
    pub price: f64,
    pub region: Option<RegionId>,
}

/// Parses price sheet lines; blank lines and `#` comments yield `None`.
pub struct PriceSheetParser {
    line_re: Regex,
}

impl PriceSheetParser {
    pub fn new() -> Result<Self> {
        let line_re = Regex::new(
            r"^\s*(\d+)\s+(buy|sell|adjusted)\s+(\d+(?:\.\d+)?)(?:\s+(\d+))?\s*(?:#.*)?$",
        )?;
        Ok(Self { line_re })
    }

    /// `Ok(None)` for blank or comment lines, `Err` for malformed ones.
    pub fn parse_line(&self, line: &str) -> Result<Option<PriceLine>, String> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(None);
        }
        let cap = self
            .line_re
            .captures(trimmed)
            .ok_or_else(|| format!("unrecognised price line '{trimmed}'"))?;

        let item = cap[1].parse::<u32>().map_err(|e| e.to_string())?;
        let kind = PriceKind::parse(&cap[2]).ok_or_else(|| format!("unknown kind '{}'", &cap[2]))?;
        let price = cap[3].parse::<f64>().map_err(|e| e.to_string())?;
        let region = cap
            .get(4)
            .map(|m| m.as_str().parse::<u32>().map(RegionId))
            .transpose()
            .map_err(|e| e.to_string())?;

        Ok(Some(PriceLine {
            item: TypeId(item),
            kind,
            price,
            region,
        }))
    }
}

/// Find all catalog fragments and price sheets below `dir`, sorted by path
pub fn find_data_files(dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let mut fragments = Vec::new();
    let mut sheets = Vec::new();

    for entry in WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => fragments.push(path.to_path_buf()),
            Some("txt") => sheets.push(path.to_path_buf()),
            _ => {}
        }
    }

    Ok((fragments, sheets))
}

fn import_fragment(conn: &Connection, path: &Path, stats: &mut ImportStats) -> Result<()> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let fragment: Fragment = toml::from_str(&content).map_err(|e| ImportError::Parse {
        file: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    let quantity_err = |source| ImportError::Quantity {
        file: path.to_path_buf(),
        source,
    };

    for record in &fragment.items {
        db::upsert_item(
            conn,
            &ItemInfo {
                id: record.id,
                name: record.name.clone(),
                group_id: record.group_id,
                category_id: record.category_id,
                portion_size: record.portion_size,
                sellable: record.sellable,
            },
        )?;
    }
    for record in &fragment.blueprints {
        db::upsert_blueprint(conn, &record.to_blueprint().map_err(quantity_err)?)?;
    }
    for record in &fragment.reactions {
        let reaction = Reaction {
            id: record.id,
            inputs: material_map(&record.inputs).map_err(quantity_err)?,
            outputs: material_map(&record.outputs).map_err(quantity_err)?,
            skills: skill_map(&record.skills),
            primary_output: record.primary_output,
        };
        db::upsert_reaction(conn, &reaction)?;
    }
    for record in &fragment.decryptors {
        db::upsert_decryptor(
            conn,
            &Decryptor {
                id: record.id,
                probability_modifier: record.probability_modifier,
                run_modifier: record.run_modifier,
                me_modifier: record.me_modifier,
                te_modifier: record.te_modifier,
            },
        )?;
    }
    for record in &fragment.reprocessing {
        let yields = material_map(&record.materials).map_err(quantity_err)?;
        db::set_reprocessing(conn, record.item, &yields)?;
    }

    stats.items += fragment.items.len();
    stats.blueprints += fragment.blueprints.len();
    stats.reactions += fragment.reactions.len();
    stats.decryptors += fragment.decryptors.len();
    debug!(
        target: "import",
        file = %path.display(),
        items = fragment.items.len(),
        blueprints = fragment.blueprints.len(),
        reactions = fragment.reactions.len(),
        "imported fragment"
    );
    Ok(())
}

fn import_price_sheet(
    conn: &Connection,
    parser: &PriceSheetParser,
    path: &Path,
    observed_at: u64,
    stats: &mut ImportStats,
) -> Result<()> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    for (index, line) in content.lines().enumerate() {
        match parser.parse_line(line) {
            Ok(Some(quote)) => {
                if quote.kind == PriceKind::Adjusted && quote.region.is_some() {
                    return Err(ImportError::AdjustedWithRegion {
                        file: path.to_path_buf(),
                        line: index + 1,
                    }
                    .into());
                }
                db::upsert_price(conn, quote.kind, quote.item, quote.region, quote.price, observed_at)?;
                stats.prices += 1;
            }
            Ok(None) => {}
            Err(reason) => {
                warn!(target: "import", file = %path.display(), line = index + 1, %reason, "skipping price line");
                stats.skipped += 1;
            }
        }
    }
    Ok(())
}

/// Import every fragment and price sheet below `dir` into the database
pub fn import_directory(conn: &Connection, dir: &Path, observed_at: u64) -> Result<ImportStats> {
    let mut stats = ImportStats::default();
    let parser = PriceSheetParser::new()?;

    info!(target: "import", dir = %dir.display(), "scanning for data files");
    let (fragments, sheets) = find_data_files(dir)?;
    info!(
        target: "import",
        fragments = fragments.len(),
        sheets = sheets.len(),
        "found data files"
    );

    for path in &fragments {
        if let Err(e) = import_fragment(conn, path, &mut stats) {
            warn!(target: "import", file = %path.display(), error = %e, "fragment failed");
            stats.errors += 1;
        }
    }
    for path in &sheets {
        if let Err(e) = import_price_sheet(conn, &parser, path, observed_at, &mut stats) {
            warn!(target: "import", file = %path.display(), error = %e, "price sheet failed");
            stats.errors += 1;
        }
    }

    Ok(stats)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub items: usize,
    pub blueprints: usize,
    pub reactions: usize,
    pub decryptors: usize,
    pub prices: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl std::fmt::Display for ImportStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Imported {} items, {} blueprints, {} reactions, {} decryptors, {} prices. Skipped: {}, Errors: {}",
            self.items,
            self.blueprints,
            self.reactions,
            self.decryptors,
            self.prices,
            self.skipped,
            self.errors
        )
    }
}
