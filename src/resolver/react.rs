//! Reaction jobs and reaction path selection
//!
//! Alchemy formulas produce an unrefined output that must be reprocessed.
//! Reprocessing often returns some of the formula's own inputs, which the
//! feedback option nets against the inputs so only the shortfall is bought.

use tracing::{debug, warn};

use super::{REACTION_CYCLE_SECONDS, RecursionBudget, Resolver, check_quantity};
use crate::error::{IndustryError, Result};
use crate::models::{RecipeActivity, TypeId};
use crate::pricing::PriceContext;
use crate::process::{ProcessDetail, ProcessNode};
use crate::quantity::MaterialMap;

/// Scaled inputs and outputs of a number of reaction cycles.
struct CycleBalance {
    inputs: MaterialMap,
    outputs: MaterialMap,
}

impl Resolver<'_> {
    fn cycle_balance(
        &self,
        reaction: TypeId,
        cycles: f64,
        reprocess: bool,
        feedback: bool,
    ) -> Result<CycleBalance> {
        let formula = self.catalog.reaction(reaction)?;
        let mut inputs = formula.inputs.scaled(cycles)?;
        let mut outputs = formula.outputs.scaled(cycles)?;

        let alchemy = outputs.items().any(|out| self.catalog.is_reprocessable(out));
        if !alchemy {
            return Ok(CycleBalance { inputs, outputs });
        }

        if reprocess {
            let unrefined: Vec<TypeId> = outputs
                .items()
                .filter(|out| self.catalog.is_reprocessable(*out))
                .collect();
            for item in unrefined {
                let quantity = outputs.take(item);
                outputs.merge(&self.reprocessor.reprocess(item, quantity)?);
            }
        }
        if feedback {
            inputs.symmetric_difference(&mut outputs);
        }

        Ok(CycleBalance { inputs, outputs })
    }

    /// Run `cycles` cycles of a reaction formula.
    ///
    /// `reprocess` refines unrefined alchemy outputs; `feedback` nets outputs
    /// that are also inputs. Both are no-ops for ordinary formulas.
    pub fn react(
        &self,
        reaction: TypeId,
        cycles: f64,
        reprocess: bool,
        feedback: bool,
        budget: RecursionBudget,
    ) -> Result<ProcessNode> {
        let cycles = check_quantity(cycles)?;
        self.react_for(reaction, None, cycles, reprocess, feedback, budget)
    }

    /// React enough cycles to yield `units` of `item`, with reprocessing and feedback.
    pub fn react_exact(
        &self,
        reaction: TypeId,
        item: TypeId,
        units: f64,
        budget: RecursionBudget,
    ) -> Result<ProcessNode> {
        let units = check_quantity(units)?;
        let per_cycle = self.cycle_balance(reaction, 1.0, true, true)?.outputs.get(item);
        if per_cycle <= 0.0 {
            return Err(IndustryError::NoReactionPath(item));
        }
        let cycles = units / per_cycle;
        self.react_for(reaction, Some(item), cycles, true, true, budget)
    }

    /// Resolve a reaction node labelled with `output`, or with the formula's
    /// primary output when that survives reprocessing and the largest
    /// remaining yield otherwise.
    fn react_for(
        &self,
        reaction: TypeId,
        output: Option<TypeId>,
        cycles: f64,
        reprocess: bool,
        feedback: bool,
        budget: RecursionBudget,
    ) -> Result<ProcessNode> {
        let formula = self.catalog.reaction(reaction)?;
        let CycleBalance { inputs, outputs } =
            self.cycle_balance(reaction, cycles, reprocess, feedback)?;
        let output = output
            .or_else(|| Some(formula.primary_output).filter(|p| outputs.contains(*p)))
            .or_else(|| largest_entry(&outputs))
            .ok_or(IndustryError::NoReactionPath(formula.primary_output))?;
        let time = cycles * REACTION_CYCLE_SECONDS;

        debug!(
            target: "resolve",
            reaction = reaction.0,
            output = output.0,
            cycles,
            time,
            "react"
        );

        let mut node = ProcessNode::new(
            RecipeActivity::Reacting,
            reaction,
            Some(output),
            outputs.get(output),
            ProcessDetail::Reaction { cycles, outputs },
        )
        .with_time(time)
        .with_skills(formula.skills.clone());

        self.expand_materials(&mut node, &inputs, budget)?;
        Ok(node)
    }

    /// Cheapest way to react `units` of `item`.
    ///
    /// With several formulas each is resolved and its tree priced in the
    /// reference region; formulas whose inputs cannot be priced, or whose
    /// feedback nets the item away, are skipped.
    pub fn best_reaction(
        &self,
        item: TypeId,
        units: f64,
        budget: RecursionBudget,
    ) -> Result<ProcessNode> {
        let paths = self.catalog.reactions_producing(item);
        match paths.as_slice() {
            [] => Err(IndustryError::NoReactionPath(item)),
            [only] => self.react_exact(only.id, item, units, budget),
            _ => {
                let ctx = PriceContext::new(
                    self.settings.reference_region,
                    self.settings.max_price_age,
                );
                let mut best: Option<(f64, ProcessNode)> = None;
                let mut first_error = None;

                for path in &paths {
                    let node = match self.react_exact(path.id, item, units, budget) {
                        Ok(node) => node,
                        Err(IndustryError::NoReactionPath(_)) => {
                            debug!(target: "resolve", item = item.0, reaction = path.id.0, "path nets no output");
                            continue;
                        }
                        Err(err) => return Err(err),
                    };
                    match node.total_cost(self.pricing, &ctx) {
                        Ok(cost) => {
                            debug!(target: "resolve", item = item.0, reaction = path.id.0, cost, "reaction path");
                            if best.as_ref().is_none_or(|(current, _)| cost < *current) {
                                best = Some((cost, node));
                            }
                        }
                        Err(err) => {
                            warn!(target: "resolve", item = item.0, reaction = path.id.0, %err, "skipping unpriced reaction path");
                            first_error.get_or_insert(err);
                        }
                    }
                }

                match (best, first_error) {
                    (Some((_, node)), _) => Ok(node),
                    (None, Some(err)) => Err(err),
                    (None, None) => Err(IndustryError::NoReactionPath(item)),
                }
            }
        }
    }
}

fn largest_entry(materials: &MaterialMap) -> Option<TypeId> {
    materials
        .iter()
        .fold(None, |best: Option<(TypeId, f64)>, (item, qty)| match best {
            Some((_, top)) if top >= qty => best,
            _ => Some((item, qty)),
        })
        .map(|(item, _)| item)
}

#[cfg(test)]
mod tests {
    use crate::error::IndustryError;
    use crate::models::RecipeActivity;
    use crate::process::ProcessDetail;
    use crate::resolver::RecursionBudget;
    use crate::sample::{self, ids};
    use crate::sources::{Catalog, Character};

    #[test]
    fn plain_reaction_scales_by_cycles() {
        let env = sample::Environment::new();
        let node = env
            .resolver()
            .react(ids::FERNITE_ALLOY_REACTION, 2.5, true, true, RecursionBudget::NONE)
            .unwrap();

        assert_eq!(node.activity(), RecipeActivity::Reacting);
        assert_eq!(node.time(), 2.5 * 3600.0);
        assert_eq!(node.cost(), 0.0);
        assert_eq!(node.output(), Some(ids::FERNITE_ALLOY));
        assert_eq!(node.quantity(), 500.0);
        // Fractional cycles keep fractional inputs.
        assert_eq!(node.materials().get(ids::SCANDIUM), 250.0);
        assert_eq!(node.materials().get(ids::HYDROCARBONS), 250.0);
    }

    #[test]
    fn alchemy_reprocesses_and_nets_feedback() {
        let env = sample::Environment::new();
        let resolver = env.resolver();
        let factor = env.character.reprocessing_factor(ids::UNREFINED_FERNITE_ALLOY);

        let raw = resolver
            .react(ids::UNREFINED_FERNITE_ALLOY_REACTION, 1.0, false, false, RecursionBudget::NONE)
            .unwrap();
        assert!(matches!(
            raw.detail(),
            ProcessDetail::Reaction { outputs, .. } if outputs.get(ids::UNREFINED_FERNITE_ALLOY) == 200.0
        ));
        assert_eq!(raw.materials().get(ids::SCANDIUM), 100.0);

        let refined = resolver
            .react(ids::UNREFINED_FERNITE_ALLOY_REACTION, 1.0, true, true, RecursionBudget::NONE)
            .unwrap();
        // 200 unrefined in batches of 100, each yielding 50 alloy and 20 scandium.
        let outputs = match refined.detail() {
            ProcessDetail::Reaction { outputs, .. } => outputs.clone(),
            other => panic!("unexpected detail {other:?}"),
        };
        assert!(!outputs.contains(ids::UNREFINED_FERNITE_ALLOY));
        assert!((outputs.get(ids::FERNITE_ALLOY) - 100.0 * factor).abs() < 1e-9);
        assert!(!outputs.contains(ids::SCANDIUM));
        assert!((refined.materials().get(ids::SCANDIUM) - (100.0 - 40.0 * factor)).abs() < 1e-9);
        assert_eq!(refined.materials().get(ids::SILICATES), 100.0);

        // The node is labelled with the refined yield, not the consumed unrefined item.
        assert_eq!(refined.output(), Some(ids::FERNITE_ALLOY));
        assert!((refined.quantity() - 100.0 * factor).abs() < 1e-9);
        assert_eq!(raw.output(), Some(ids::UNREFINED_FERNITE_ALLOY));
        assert_eq!(raw.quantity(), 200.0);
    }

    #[test]
    fn exact_reaction_hits_requested_units() {
        let env = sample::Environment::new();
        let node = env
            .resolver()
            .react_exact(
                ids::UNREFINED_FERNITE_ALLOY_REACTION,
                ids::FERNITE_ALLOY,
                1000.0,
                RecursionBudget::NONE,
            )
            .unwrap();
        assert_eq!(node.output(), Some(ids::FERNITE_ALLOY));
        assert!((node.quantity() - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn best_reaction_prefers_cheaper_alchemy() {
        let env = sample::Environment::new();
        let node = env
            .resolver()
            .best_reaction(ids::FERNITE_ALLOY, 1000.0, RecursionBudget::NONE)
            .unwrap();
        assert_eq!(node.source(), ids::UNREFINED_FERNITE_ALLOY_REACTION);
    }

    #[test]
    fn reaction_recursion_expands_intermediates() {
        let env = sample::Environment::new();
        let resolver = env.resolver();

        let shallow = resolver
            .best_reaction(ids::FERNITE_CARBIDE, 10_000.0, RecursionBudget::NONE)
            .unwrap();
        assert_eq!(shallow.source(), ids::FERNITE_CARBIDE_REACTION);
        assert!(shallow.materials().contains(ids::FERNITE_ALLOY));

        let deep = resolver
            .best_reaction(ids::FERNITE_CARBIDE, 10_000.0, RecursionBudget::new(0, 1))
            .unwrap();
        assert!(!deep.materials().contains(ids::FERNITE_ALLOY));
        assert_eq!(deep.children().len(), 1);
        assert!((deep.children()[0].quantity() - 100.0).abs() < 1e-6);
    }

    #[test]
    fn inputs_netted_away_by_feedback_are_bought() {
        let env = sample::Environment::new();
        let resolver = env.resolver();

        // Scandium only comes back from reprocessing the alchemy output it feeds.
        assert!(env.catalog.is_reaction_product(ids::SCANDIUM));
        assert_eq!(
            resolver
                .best_reaction(ids::SCANDIUM, 100.0, RecursionBudget::NONE)
                .unwrap_err(),
            IndustryError::NoReactionPath(ids::SCANDIUM)
        );

        let node = resolver
            .react(ids::FERNITE_ALLOY_REACTION, 1.0, true, true, RecursionBudget::new(0, 1))
            .unwrap();
        assert!(node.children().is_empty());
        assert_eq!(node.materials().get(ids::SCANDIUM), 100.0);
    }

    #[test]
    fn raw_materials_have_no_path() {
        let env = sample::Environment::new();
        let err = env
            .resolver()
            .best_reaction(ids::TRITANIUM, 1.0, RecursionBudget::NONE)
            .unwrap_err();
        assert_eq!(err, IndustryError::NoReactionPath(ids::TRITANIUM));
    }
}
