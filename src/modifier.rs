//! Facility selection and combined job modifiers

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{IndustryError, Result};
use crate::models::{FacilityId, ItemInfo, LocationId, RecipeActivity};
use crate::sources::Character;

/// Item categories an ordinary NPC station accepts for every activity.
pub const STANDARD_CATEGORIES: [u32; 22] = [
    4, 6, 7, 8, 9, 17, 18, 22, 23, 24, 32, 34, 35, 39, 40, 41, 43, 46, 63, 65, 66, 87,
];

/// Multipliers on material use, job duration and job cost. 1.0 means no change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModifierTriple {
    pub material: f64,
    pub time: f64,
    pub cost: f64,
}

impl ModifierTriple {
    pub const NEUTRAL: ModifierTriple = ModifierTriple {
        material: 1.0,
        time: 1.0,
        cost: 1.0,
    };

    pub fn new(material: f64, time: f64, cost: f64) -> Self {
        Self {
            material,
            time,
            cost,
        }
    }

    /// Elementwise product.
    pub fn apply(self, other: ModifierTriple) -> ModifierTriple {
        ModifierTriple {
            material: self.material * other.material,
            time: self.time * other.time,
            cost: self.cost * other.cost,
        }
    }

    /// Lower is better: material first, then time, then cost.
    fn rank(&self, other: &ModifierTriple) -> Ordering {
        self.material
            .total_cmp(&other.material)
            .then(self.time.total_cmp(&other.time))
            .then(self.cost.total_cmp(&other.cost))
    }
}

impl Default for ModifierTriple {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// One industry slot type and the items it accepts.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyLine {
    pub facility: FacilityId,
    pub activity: RecipeActivity,
    pub base: ModifierTriple,
    pub group_overrides: HashMap<u32, ModifierTriple>,
    pub category_overrides: HashMap<u32, ModifierTriple>,
}

impl AssemblyLine {
    pub fn new(facility: FacilityId, activity: RecipeActivity, base: ModifierTriple) -> Self {
        Self {
            facility,
            activity,
            base,
            group_overrides: HashMap::new(),
            category_overrides: HashMap::new(),
        }
    }

    /// A neutral line accepting every item in [`STANDARD_CATEGORIES`].
    pub fn station(facility: FacilityId, activity: RecipeActivity) -> Self {
        STANDARD_CATEGORIES.iter().fold(
            Self::new(facility, activity, ModifierTriple::NEUTRAL),
            |line, category| line.with_category(*category, ModifierTriple::NEUTRAL),
        )
    }

    pub fn with_group(mut self, group_id: u32, triple: ModifierTriple) -> Self {
        self.group_overrides.insert(group_id, triple);
        self
    }

    pub fn with_category(mut self, category_id: u32, triple: ModifierTriple) -> Self {
        self.category_overrides.insert(category_id, triple);
        self
    }

    /// The override that applies to `item`; group wins over category.
    fn override_for(&self, item: &ItemInfo) -> Option<ModifierTriple> {
        self.group_overrides
            .get(&item.group_id)
            .or_else(|| self.category_overrides.get(&item.category_id))
            .copied()
    }

    pub fn is_compatible(&self, item: &ItemInfo) -> bool {
        self.override_for(item).is_some()
    }

    /// Base triple with the matching override applied.
    pub fn modifier_for(&self, item: &ItemInfo) -> ModifierTriple {
        match self.override_for(item) {
            Some(over) => self.base.apply(over),
            None => self.base,
        }
    }
}

/// The resolved multipliers for one job, with where it runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JobModifier {
    pub triple: ModifierTriple,
    pub facility: FacilityId,
    pub location: LocationId,
}

/// Pick the compatible line with the lowest (material, time, cost) triple.
///
/// Exact ties keep the earliest line in `lines`.
pub fn best_facility<'a>(
    activity: RecipeActivity,
    item: &ItemInfo,
    lines: &'a [AssemblyLine],
) -> Result<(&'a AssemblyLine, ModifierTriple)> {
    let mut best: Option<(&AssemblyLine, ModifierTriple)> = None;

    for line in lines
        .iter()
        .filter(|l| l.activity == activity && l.is_compatible(item))
    {
        let triple = line.modifier_for(item);
        let better = match &best {
            Some((_, current)) => triple.rank(current) == Ordering::Less,
            None => true,
        };
        if better {
            best = Some((line, triple));
        }
    }

    best.ok_or(IndustryError::NoCompatibleFacility {
        activity,
        item: item.id,
    })
}

/// Everything about "where am I operating": lines, cost indices, tax.
#[derive(Debug, Clone, PartialEq)]
pub struct IndustryModifier {
    pub location: LocationId,
    pub tax: f64,
    lines: HashMap<RecipeActivity, Vec<AssemblyLine>>,
    cost_indices: HashMap<RecipeActivity, f64>,
}

impl IndustryModifier {
    pub fn new(location: LocationId, tax: f64) -> Self {
        Self {
            location,
            tax,
            lines: HashMap::new(),
            cost_indices: HashMap::new(),
        }
    }

    pub fn add_line(&mut self, line: AssemblyLine) {
        self.lines.entry(line.activity).or_default().push(line);
    }

    pub fn with_line(mut self, line: AssemblyLine) -> Self {
        self.add_line(line);
        self
    }

    pub fn set_cost_index(&mut self, activity: RecipeActivity, index: f64) {
        self.cost_indices.insert(activity, index);
    }

    pub fn with_cost_index(mut self, activity: RecipeActivity, index: f64) -> Self {
        self.set_cost_index(activity, index);
        self
    }

    /// System cost index for the activity; 1.0 when unknown.
    pub fn cost_index(&self, activity: RecipeActivity) -> f64 {
        self.cost_indices.get(&activity).copied().unwrap_or(1.0)
    }

    pub fn lines(&self, activity: RecipeActivity) -> &[AssemblyLine] {
        self.lines.get(&activity).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Best facility's triple combined with location cost, tax and character time bonuses.
    pub fn combined_modifier(
        &self,
        activity: RecipeActivity,
        item: &ItemInfo,
        character: &dyn Character,
    ) -> Result<JobModifier> {
        let (line, triple) = best_facility(activity, item, self.lines(activity)).map_err(|_| {
            IndustryError::ActivityNotPossible {
                activity,
                item: item.id,
            }
        })?;

        let combined = ModifierTriple {
            material: triple.material,
            time: triple.time
                * character.industry_time_factor(activity)
                * character.implant_time_factor(activity),
            cost: triple.cost * self.cost_index(activity) * (1.0 + self.tax),
        };

        debug!(
            target: "facility",
            activity = activity.as_str(),
            item = item.id.0,
            facility = line.facility.0,
            material = combined.material,
            time = combined.time,
            cost = combined.cost,
            "selected facility"
        );

        Ok(JobModifier {
            triple: combined,
            facility: line.facility,
            location: self.location,
        })
    }
}
