//! Invention jobs

use tracing::debug;

use super::{JOB_COST_SHARE, RecursionBudget, Resolver, round_materials};
use crate::error::{IndustryError, Result};
use crate::models::{InventionData, RecipeActivity, TypeId};
use crate::process::{InventionResult, ProcessDetail, ProcessNode};

impl Resolver<'_> {
    fn invention_data(&self, inventor: TypeId) -> Result<&InventionData> {
        self.catalog
            .blueprint(inventor)?
            .invention
            .as_ref()
            .ok_or(IndustryError::ActivityMissing {
                blueprint: inventor,
                activity: RecipeActivity::Inventing,
            })
    }

    /// Success chance and resulting copy parameters for one attempt.
    pub fn invention_outcome(
        &self,
        inventor: TypeId,
        decryptor: Option<TypeId>,
    ) -> Result<InventionResult> {
        let data = self.invention_data(inventor)?;
        let decryptor = decryptor
            .map(|id| self.catalog.decryptor(id))
            .transpose()?;

        let science = data
            .science_skills
            .iter()
            .map(|s| f64::from(self.character.skill_level(*s)))
            .sum::<f64>();
        let encryption = f64::from(self.character.skill_level(data.encryption_skill));
        let mut probability = data.base_probability * (1.0 + science / 30.0 + encryption / 40.0);

        let (mut runs, mut me, mut te) = (data.base_runs as i32, -2, -4);
        if let Some(d) = decryptor {
            probability *= d.probability_modifier;
            runs += d.run_modifier;
            me -= d.me_modifier;
            te -= d.te_modifier;
        }

        Ok(InventionResult {
            probability: probability.min(1.0),
            runs: runs.max(1) as u32,
            me,
            te,
            attempts: 1,
            target: None,
            decryptor: decryptor.map(|d| d.id),
        })
    }

    /// One invention attempt from `inventor` (a blueprint or relic).
    pub fn invent(
        &self,
        inventor: TypeId,
        target: Option<TypeId>,
        decryptor: Option<TypeId>,
        budget: RecursionBudget,
    ) -> Result<ProcessNode> {
        self.invent_attempts(inventor, target, decryptor, 1, budget)
    }

    /// `attempts` identical invention attempts.
    ///
    /// Per-attempt metrics scale linearly; the node's until-success metrics
    /// then give the expected draw for `attempts` successes.
    pub fn invent_attempts(
        &self,
        inventor: TypeId,
        target: Option<TypeId>,
        decryptor: Option<TypeId>,
        attempts: u32,
        budget: RecursionBudget,
    ) -> Result<ProcessNode> {
        if attempts == 0 {
            return Err(IndustryError::InvalidQuantity {
                quantity: 0.0,
                reason: "at least one invention attempt is required",
            });
        }
        let data = self.invention_data(inventor)?;
        if let Some(target) = target {
            if !data.products.contains(&target) {
                return Err(IndustryError::NotInventable {
                    blueprint: inventor,
                    target,
                });
            }
        }
        if data.products.is_empty() {
            return Err(IndustryError::ActivityMissing {
                blueprint: inventor,
                activity: RecipeActivity::Inventing,
            });
        }

        let mut outcome = self.invention_outcome(inventor, decryptor)?;
        outcome.attempts = attempts;
        outcome.target = target;

        let item = self.catalog.item(inventor)?;
        let job = self.job_modifier(RecipeActivity::Inventing, item)?;

        let mut candidate_cost = 0.0;
        for product in &data.products {
            candidate_cost += self.base_product_cost(self.catalog.blueprint(*product)?)?;
        }
        let average_cost = candidate_cost / data.products.len() as f64;

        let attempts_f = f64::from(attempts);
        let time = f64::from(data.activity.time) * job.triple.time * attempts_f;
        let cost = average_cost * JOB_COST_SHARE * job.triple.cost * attempts_f;

        debug!(
            target: "resolve",
            inventor = inventor.0,
            attempts,
            probability = outcome.probability,
            runs = outcome.runs,
            time,
            cost,
            "invent"
        );

        let mut node = ProcessNode::new(
            RecipeActivity::Inventing,
            inventor,
            None,
            attempts_f,
            ProcessDetail::Invention(outcome),
        )
        .with_time(time)
        .with_cost(cost)
        .with_skills(data.activity.skills.clone())
        .with_site(job.facility, job.location);

        let required = round_materials(&data.activity.materials, job.triple.material, attempts_f);
        self.expand_materials(&mut node, &required, budget)?;
        if let Some(decryptor) = outcome.decryptor {
            node.materials_mut().add(decryptor, attempts_f)?;
        }

        Ok(node)
    }
}
