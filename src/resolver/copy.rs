//! Blueprint copying jobs

use tracing::debug;

use super::{JOB_COST_SHARE, RecursionBudget, Resolver, round_materials};
use crate::error::{IndustryError, Result};
use crate::models::{CopyRuns, RecipeActivity, TypeId};
use crate::process::{ProcessDetail, ProcessNode};

impl Resolver<'_> {
    /// Make `copies` copies of `blueprint`, each with `runs` runs.
    pub fn copy(
        &self,
        blueprint: TypeId,
        copies: u32,
        runs: CopyRuns,
        budget: RecursionBudget,
    ) -> Result<ProcessNode> {
        let bp = self.catalog.blueprint(blueprint)?;
        let copying = bp.copying.as_ref().ok_or(IndustryError::ActivityMissing {
            blueprint,
            activity: RecipeActivity::Copying,
        })?;

        let runs = match runs {
            CopyRuns::Max => bp.max_production_limit,
            CopyRuns::Exact(runs) => runs,
        };
        if copies == 0 || runs == 0 {
            return Err(IndustryError::InvalidQuantity {
                quantity: f64::from(copies.min(runs)),
                reason: "copies and runs must be at least one",
            });
        }
        if runs > bp.max_production_limit {
            return Err(IndustryError::InvalidQuantity {
                quantity: f64::from(runs),
                reason: "runs exceed the blueprint's production limit",
            });
        }

        let item = self.catalog.item(blueprint)?;
        let job = self.job_modifier(RecipeActivity::Copying, item)?;

        let total_runs = f64::from(copies) * f64::from(runs);
        let time = (f64::from(copying.time) * total_runs * job.triple.time).ceil();
        let cost = self.base_product_cost(bp)? * JOB_COST_SHARE * total_runs * job.triple.cost;

        debug!(target: "resolve", blueprint = blueprint.0, copies, runs, time, cost, "copy");

        let mut node = ProcessNode::new(
            RecipeActivity::Copying,
            blueprint,
            Some(blueprint),
            f64::from(copies),
            ProcessDetail::Copy { copies, runs },
        )
        .with_time(time)
        .with_cost(cost)
        .with_skills(copying.skills.clone())
        .with_site(job.facility, job.location);

        let required = round_materials(&copying.materials, job.triple.material, total_runs);
        self.expand_materials(&mut node, &required, budget)?;

        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::IndustryError;
    use crate::models::{CopyRuns, RecipeActivity};
    use crate::process::ProcessDetail;
    use crate::resolver::RecursionBudget;
    use crate::sample::{self, ids};
    use crate::sources::Catalog;

    #[test]
    fn max_runs_uses_production_limit() {
        let env = sample::Environment::new();
        let resolver = env.resolver();

        let node = resolver
            .copy(ids::RIFTER_BLUEPRINT, 2, CopyRuns::Max, RecursionBudget::NONE)
            .unwrap();
        let limit = env.catalog.blueprint(ids::RIFTER_BLUEPRINT).unwrap().max_production_limit;
        assert_eq!(
            node.detail(),
            &ProcessDetail::Copy { copies: 2, runs: limit }
        );
        assert_eq!(node.quantity(), 2.0);
    }

    #[test]
    fn copy_cost_is_two_percent_of_base_cost_per_run() {
        let env = sample::Environment::new();
        let resolver = env.resolver();
        let bp = env.catalog.blueprint(ids::RIFTER_BLUEPRINT).unwrap();
        let base = resolver.base_product_cost(bp).unwrap();

        let one = resolver
            .copy(ids::RIFTER_BLUEPRINT, 1, CopyRuns::Exact(1), RecursionBudget::NONE)
            .unwrap();
        let ten = resolver
            .copy(ids::RIFTER_BLUEPRINT, 2, CopyRuns::Exact(5), RecursionBudget::NONE)
            .unwrap();

        // The sample station is neutral for blueprints; index and tax still apply.
        let expected = base
            * 0.02
            * env.modifier.cost_index(RecipeActivity::Copying)
            * (1.0 + env.modifier.tax);
        assert!(one.cost() > 0.0);
        assert!((one.cost() - expected).abs() < 1e-6);
        assert!((ten.cost() - one.cost() * 10.0).abs() < 1e-6);
    }

    #[test]
    fn runs_above_limit_are_rejected() {
        let env = sample::Environment::new();
        let err = env
            .resolver()
            .copy(ids::RIFTER_BLUEPRINT, 1, CopyRuns::Exact(10_000), RecursionBudget::NONE)
            .unwrap_err();
        assert!(matches!(err, IndustryError::InvalidQuantity { .. }));
    }
}
