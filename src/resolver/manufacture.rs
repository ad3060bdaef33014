//! Manufacturing jobs

use tracing::debug;

use super::{BlueprintLevels, RecursionBudget, Resolver, check_quantity, level_factor, round_materials};
use crate::error::{IndustryError, Result};
use crate::models::{CopyRuns, RecipeActivity, TypeId};
use crate::process::{ProcessDetail, ProcessNode};

impl Resolver<'_> {
    /// Build `units` of `product`.
    ///
    /// `levels` overrides the blueprint's researched ME/TE; when `None` the
    /// character's owned blueprint levels apply.
    pub fn manufacture(
        &self,
        product: TypeId,
        units: f64,
        levels: Option<BlueprintLevels>,
        budget: RecursionBudget,
    ) -> Result<ProcessNode> {
        let units = check_quantity(units)?;
        let blueprint = self.catalog.blueprint_for_product(product)?;
        let manufacturing =
            blueprint
                .manufacturing
                .as_ref()
                .ok_or(IndustryError::ActivityMissing {
                    blueprint: blueprint.id,
                    activity: RecipeActivity::Manufacturing,
                })?;

        let levels = match levels {
            Some(levels) => levels,
            None => {
                let (me, te) = self.character.blueprint_levels(blueprint.id);
                BlueprintLevels::new(me, te)
            }
        }
        .validate()?;

        let item = self.catalog.item(product)?;
        let job = self.job_modifier(RecipeActivity::Manufacturing, item)?;

        let portions = units / f64::from(manufacturing.portion_size.max(1));
        let base_time = f64::from(manufacturing.activity.time);
        let time = (portions * base_time * level_factor(levels.te) * job.triple.time).ceil();
        let cost = self.base_product_cost(blueprint)? * portions * job.triple.cost;

        debug!(
            target: "resolve",
            product = product.0,
            units,
            portions,
            me = levels.me,
            te = levels.te,
            time,
            cost,
            "manufacture"
        );

        let mut node = ProcessNode::new(
            RecipeActivity::Manufacturing,
            blueprint.id,
            Some(product),
            units,
            ProcessDetail::Manufacture {
                me: levels.me,
                te: levels.te,
                portions,
            },
        )
        .with_time(time)
        .with_cost(cost)
        .with_skills(manufacturing.activity.skills.clone())
        .with_site(job.facility, job.location);

        let material_factor = level_factor(levels.me) * job.triple.material;
        let required = round_materials(&manufacturing.activity.materials, material_factor, portions);
        self.expand_materials(&mut node, &required, budget)?;

        Ok(node)
    }

    /// Build `units` of an invented product, including the invention jobs
    /// (and the one-run copies they consume) needed to obtain enough runs.
    pub fn manufacture_invented(
        &self,
        product: TypeId,
        units: f64,
        decryptor: Option<TypeId>,
        budget: RecursionBudget,
    ) -> Result<ProcessNode> {
        let units = check_quantity(units)?;
        let blueprint = self.catalog.blueprint_for_product(product)?;
        let inventor = self
            .catalog
            .inventor_of(blueprint.id)
            .ok_or(IndustryError::RecipeNotFound(blueprint.id))?;
        let portion_size = blueprint
            .manufacturing
            .as_ref()
            .map(|m| m.portion_size.max(1))
            .unwrap_or(1);

        let outcome = self.invention_outcome(inventor, decryptor)?;
        let portions = units / f64::from(portion_size);
        let successes = (portions / f64::from(outcome.runs.max(1))).ceil().max(1.0) as u32;

        let mut invention =
            self.invent_attempts(inventor, Some(blueprint.id), decryptor, successes, budget)?;

        // Relics are consumed whole; only blueprint originals need copying first.
        let inventor_bp = self.catalog.blueprint(inventor)?;
        if inventor_bp.copying.is_some() {
            let copies =
                self.copy(inventor, successes, CopyRuns::Exact(1), RecursionBudget::NONE)?;
            invention.push_child(copies);
        }

        let levels = BlueprintLevels::new(outcome.me, outcome.te);
        let mut node = self.manufacture(product, units, Some(levels), budget)?;
        node.push_child(invention);
        Ok(node)
    }
}
