//! Material and time efficiency research jobs

use tracing::debug;

use super::{JOB_COST_SHARE, RecursionBudget, Resolver, round_materials};
use crate::error::{IndustryError, Result};
use crate::models::{RecipeActivity, TypeId};
use crate::process::{ProcessDetail, ProcessNode};

/// Cumulative research effort to reach each level from level 0.
pub const RESEARCH_LEVEL_TABLE: [f64; 11] = [
    0.0, 105.0, 250.0, 595.0, 1414.0, 3360.0, 8000.0, 19000.0, 45255.0, 107700.0, 256000.0,
];

/// Effort to go from `start` to `end`, relative to a single level-1 step.
fn research_multiplier(start: usize, end: usize) -> f64 {
    (RESEARCH_LEVEL_TABLE[end] - RESEARCH_LEVEL_TABLE[start]) / RESEARCH_LEVEL_TABLE[1]
}

fn invalid(start: i32, end: i32, reason: &'static str) -> IndustryError {
    IndustryError::InvalidResearchLevels { start, end, reason }
}

fn validate_me(start: i32, end: i32) -> Result<(usize, usize)> {
    if start < 0 {
        return Err(invalid(start, end, "start level must not be negative"));
    }
    if start >= end {
        return Err(invalid(start, end, "start level must be below end level"));
    }
    if end > 10 {
        return Err(invalid(start, end, "material efficiency caps at level 10"));
    }
    Ok((start as usize, end as usize))
}

fn validate_te(start: i32, end: i32) -> Result<(usize, usize)> {
    if start % 2 != 0 {
        return Err(invalid(start, end, "start level must be even"));
    }
    if end % 2 != 0 {
        return Err(invalid(start, end, "end level must be even"));
    }
    if start < 0 {
        return Err(invalid(start, end, "start level must not be negative"));
    }
    if start >= end {
        return Err(invalid(start, end, "start level must be below end level"));
    }
    if end > 20 {
        return Err(invalid(start, end, "time efficiency caps at level 20"));
    }
    Ok((start as usize / 2, end as usize / 2))
}

impl Resolver<'_> {
    /// Research material efficiency from `start` to `end` (0..=10).
    pub fn research_me(
        &self,
        blueprint: TypeId,
        start: i32,
        end: i32,
        budget: RecursionBudget,
    ) -> Result<ProcessNode> {
        let steps = validate_me(start, end)?;
        self.research(
            RecipeActivity::MaterialResearch,
            blueprint,
            (start, end),
            steps,
            budget,
        )
    }

    /// Research time efficiency from `start` to `end` (0..=20, even levels).
    pub fn research_te(
        &self,
        blueprint: TypeId,
        start: i32,
        end: i32,
        budget: RecursionBudget,
    ) -> Result<ProcessNode> {
        let steps = validate_te(start, end)?;
        self.research(
            RecipeActivity::TimeResearch,
            blueprint,
            (start, end),
            steps,
            budget,
        )
    }

    fn research(
        &self,
        activity: RecipeActivity,
        blueprint: TypeId,
        (start, end): (i32, i32),
        (from, to): (usize, usize),
        budget: RecursionBudget,
    ) -> Result<ProcessNode> {
        let bp = self.catalog.blueprint(blueprint)?;
        let data = bp
            .activity(activity)
            .ok_or(IndustryError::ActivityMissing {
                blueprint,
                activity,
            })?;

        let item = self.catalog.item(blueprint)?;
        let job = self.job_modifier(activity, item)?;

        let mult = research_multiplier(from, to);
        let time = (mult * job.triple.time * f64::from(data.time)).ceil();
        let cost = mult * job.triple.cost * self.base_product_cost(bp)? * JOB_COST_SHARE;

        debug!(
            target: "resolve",
            activity = activity.as_str(),
            blueprint = blueprint.0,
            start,
            end,
            mult,
            time,
            cost,
            "research"
        );

        let mut node = ProcessNode::new(
            activity,
            blueprint,
            None,
            1.0,
            ProcessDetail::Research { start, end },
        )
        .with_time(time)
        .with_cost(cost)
        .with_skills(data.skills.clone())
        .with_site(job.facility, job.location);

        let required = round_materials(&data.materials, job.triple.material, 1.0);
        self.expand_materials(&mut node, &required, budget)?;

        Ok(node)
    }
}
