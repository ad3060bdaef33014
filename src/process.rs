//! Process tree nodes and their rollups

use std::collections::BTreeMap;

use crate::error::Result;
use crate::models::{FacilityId, LocationId, RecipeActivity, TypeId};
use crate::pricing::PriceContext;
use crate::quantity::{MaterialMap, SkillMap};
use crate::sources::{Catalog, Pricing};

/// Outcome parameters of an invention job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InventionResult {
    pub probability: f64,
    /// Runs on each invented copy.
    pub runs: u32,
    pub me: i32,
    pub te: i32,
    pub attempts: u32,
    pub target: Option<TypeId>,
    pub decryptor: Option<TypeId>,
}

/// Activity-specific facts about a node.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessDetail {
    Manufacture { me: i32, te: i32, portions: f64 },
    Copy { copies: u32, runs: u32 },
    Research { start: i32, end: i32 },
    Invention(InventionResult),
    /// Reaction cycles and the (possibly reprocessed and netted) yield.
    Reaction { cycles: f64, outputs: MaterialMap },
}

/// One resolved industry job and the jobs that feed it.
///
/// `materials` holds only what this job buys; inputs resolved into child
/// jobs are not listed here, so rollups never count them twice.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessNode {
    activity: RecipeActivity,
    source: TypeId,
    output: Option<TypeId>,
    quantity: f64,
    time: f64,
    cost: f64,
    materials: MaterialMap,
    skills: SkillMap,
    facility: Option<FacilityId>,
    location: Option<LocationId>,
    detail: ProcessDetail,
    children: Vec<ProcessNode>,
}

/// Everything needed to put a market value on a tree.
pub struct Valuation<'a> {
    pub catalog: &'a dyn Catalog,
    pub pricing: &'a dyn Pricing,
    /// Fraction of the sell price kept after fees and tax.
    pub sell_tax_factor: f64,
    pub buy: PriceContext,
    pub sell: PriceContext,
}

/// Market cost of buying every entry of `materials`.
pub fn purchase_cost(
    materials: &MaterialMap,
    pricing: &dyn Pricing,
    ctx: &PriceContext,
) -> Result<f64> {
    let mut total = 0.0;
    for (item, qty) in materials.iter() {
        total += pricing.buy_price(item, ctx.region, ctx.max_age)? * qty;
    }
    Ok(total)
}

impl ProcessNode {
    pub fn new(
        activity: RecipeActivity,
        source: TypeId,
        output: Option<TypeId>,
        quantity: f64,
        detail: ProcessDetail,
    ) -> Self {
        Self {
            activity,
            source,
            output,
            quantity,
            time: 0.0,
            cost: 0.0,
            materials: MaterialMap::new(),
            skills: SkillMap::new(),
            facility: None,
            location: None,
            detail,
            children: Vec::new(),
        }
    }

    pub fn with_time(mut self, time: f64) -> Self {
        self.time = time;
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_materials(mut self, materials: MaterialMap) -> Self {
        self.materials = materials;
        self
    }

    pub fn with_skills(mut self, skills: SkillMap) -> Self {
        self.skills = skills;
        self
    }

    pub fn with_site(mut self, facility: FacilityId, location: LocationId) -> Self {
        self.facility = Some(facility);
        self.location = Some(location);
        self
    }

    pub fn with_child(mut self, child: ProcessNode) -> Self {
        self.children.push(child);
        self
    }

    pub(crate) fn push_child(&mut self, child: ProcessNode) {
        self.children.push(child);
    }

    pub(crate) fn materials_mut(&mut self) -> &mut MaterialMap {
        &mut self.materials
    }

    pub fn activity(&self) -> RecipeActivity {
        self.activity
    }

    /// Blueprint, relic or reaction formula the job runs.
    pub fn source(&self) -> TypeId {
        self.source
    }

    pub fn output(&self) -> Option<TypeId> {
        self.output
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Job installation cost, excluding materials.
    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn materials(&self) -> &MaterialMap {
        &self.materials
    }

    pub fn skills(&self) -> &SkillMap {
        &self.skills
    }

    pub fn facility(&self) -> Option<FacilityId> {
        self.facility
    }

    pub fn location(&self) -> Option<LocationId> {
        self.location
    }

    pub fn detail(&self) -> &ProcessDetail {
        &self.detail
    }

    pub fn children(&self) -> &[ProcessNode] {
        &self.children
    }

    /// Success chance of an invention node; `None` for deterministic jobs.
    pub fn probability(&self) -> Option<f64> {
        match &self.detail {
            ProcessDetail::Invention(result) => Some(result.probability),
            _ => None,
        }
    }

    /// Number of nodes in the tree, this one included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(ProcessNode::node_count).sum::<usize>()
    }

    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(ProcessNode::depth).max().unwrap_or(0)
    }

    // -----------------------------------------------------------------------
    // Per-attempt rollups
    // -----------------------------------------------------------------------

    /// Leaf purchase requirements of the whole tree.
    pub fn total_materials(&self) -> MaterialMap {
        let mut total = self.materials.clone();
        for child in &self.children {
            total.merge(&child.total_materials());
        }
        total
    }

    /// Highest level of each skill required anywhere in the tree.
    pub fn total_skills(&self) -> SkillMap {
        let mut total = self.skills.clone();
        for child in &self.children {
            total.merge(&child.total_skills());
        }
        total
    }

    pub fn total_time(&self) -> f64 {
        self.time + self.children.iter().map(ProcessNode::total_time).sum::<f64>()
    }

    pub fn total_times_by_activity(&self) -> BTreeMap<RecipeActivity, f64> {
        let mut buckets = BTreeMap::new();
        self.collect_times(&mut buckets);
        buckets
    }

    fn collect_times(&self, buckets: &mut BTreeMap<RecipeActivity, f64>) {
        *buckets.entry(self.activity).or_insert(0.0) += self.time;
        for child in &self.children {
            child.collect_times(buckets);
        }
    }

    /// Installation costs of every job in the tree, excluding materials.
    pub fn total_process_cost(&self) -> f64 {
        self.cost
            + self
                .children
                .iter()
                .map(ProcessNode::total_process_cost)
                .sum::<f64>()
    }

    /// Job costs plus the market cost of every leaf material.
    pub fn total_cost(&self, pricing: &dyn Pricing, ctx: &PriceContext) -> Result<f64> {
        Ok(self.total_process_cost() + purchase_cost(&self.total_materials(), pricing, ctx)?)
    }

    /// Blueprint copies never reach the market, whatever the original trades at.
    fn is_sellable(&self, catalog: &dyn Catalog) -> bool {
        if matches!(self.detail, ProcessDetail::Copy { .. }) {
            return false;
        }
        self.output
            .and_then(|item| catalog.item(item).ok())
            .is_some_and(|info| info.sellable)
    }

    /// Sale value of the output less the cost of producing it.
    ///
    /// Nodes whose output cannot be sold (research, invention) are pure cost:
    /// their value is the profit of any sellable children minus everything else.
    pub fn total_profit(&self, valuation: &Valuation<'_>) -> Result<f64> {
        if let Some(item) = self.output.filter(|_| self.is_sellable(valuation.catalog)) {
            let price =
                valuation
                    .pricing
                    .sell_price(item, valuation.sell.region, valuation.sell.max_age)?;
            let revenue = price * self.quantity * valuation.sell_tax_factor;
            return Ok(revenue - self.total_cost(valuation.pricing, &valuation.buy)?);
        }

        let mut profit =
            -(self.cost + purchase_cost(&self.materials, valuation.pricing, &valuation.buy)?);
        for child in &self.children {
            if child.is_sellable(valuation.catalog) {
                profit += child.total_profit(valuation)?;
            } else {
                profit -= child.total_cost(valuation.pricing, &valuation.buy)?;
            }
        }
        Ok(profit)
    }

    // -----------------------------------------------------------------------
    // Until-success rollups
    // -----------------------------------------------------------------------

    /// Spreads a per-attempt amount over the expected number of attempts.
    /// An attempt that can never succeed costs without bound.
    fn per_success(&self, attempt: f64) -> f64 {
        match self.probability() {
            Some(p) if p > 0.0 => attempt / p,
            Some(_) => f64::INFINITY,
            None => attempt,
        }
    }

    /// Expected job time spent on this node to obtain one success.
    pub fn success_time(&self) -> f64 {
        self.per_success(self.time)
    }

    pub fn success_process_cost(&self) -> f64 {
        self.per_success(self.cost)
    }

    pub fn success_materials(&self) -> Result<MaterialMap> {
        Ok(self.materials.scaled(self.per_success(1.0))?)
    }

    pub fn success_cost(&self, pricing: &dyn Pricing, ctx: &PriceContext) -> Result<f64> {
        let attempt = self.cost + purchase_cost(&self.materials, pricing, ctx)?;
        Ok(self.per_success(attempt))
    }

    /// Tree time with invention subtrees repeated until they succeed.
    pub fn total_success_time(&self) -> f64 {
        if self.probability().is_some() {
            return self.per_success(self.total_time());
        }
        self.time
            + self
                .children
                .iter()
                .map(ProcessNode::total_success_time)
                .sum::<f64>()
    }

    pub fn total_success_process_cost(&self) -> f64 {
        if self.probability().is_some() {
            return self.per_success(self.total_process_cost());
        }
        self.cost
            + self
                .children
                .iter()
                .map(ProcessNode::total_success_process_cost)
                .sum::<f64>()
    }

    pub fn total_success_materials(&self) -> Result<MaterialMap> {
        if self.probability().is_some() {
            return Ok(self.total_materials().scaled(self.per_success(1.0))?);
        }
        let mut total = self.materials.clone();
        for child in &self.children {
            total.merge(&child.total_success_materials()?);
        }
        Ok(total)
    }

    pub fn total_success_cost(&self, pricing: &dyn Pricing, ctx: &PriceContext) -> Result<f64> {
        Ok(self.total_success_process_cost()
            + purchase_cost(&self.total_success_materials()?, pricing, ctx)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemInfo;
    use crate::catalog::MemoryCatalog;
    use crate::pricing::{PriceBook, Quote};
    use crate::models::RegionId;
    use std::time::Duration;

    const HUB: RegionId = RegionId(10000002);

    fn ctx() -> PriceContext {
        PriceContext::new(HUB, Duration::from_secs(3600))
    }

    fn manufacture(time: f64) -> ProcessNode {
        ProcessNode::new(
            RecipeActivity::Manufacturing,
            TypeId(1),
            Some(TypeId(2)),
            1.0,
            ProcessDetail::Manufacture {
                me: 0,
                te: 0,
                portions: 1.0,
            },
        )
        .with_time(time)
    }

    fn invention(probability: f64) -> ProcessNode {
        ProcessNode::new(
            RecipeActivity::Inventing,
            TypeId(1),
            None,
            1.0,
            ProcessDetail::Invention(InventionResult {
                probability,
                runs: 10,
                me: -2,
                te: -4,
                attempts: 1,
                target: None,
                decryptor: None,
            }),
        )
    }

    #[test]
    fn time_rollup_is_additive_and_order_free() {
        let forward = manufacture(5.0)
            .with_child(manufacture(10.0))
            .with_child(manufacture(20.0));
        let reverse = manufacture(5.0)
            .with_child(manufacture(20.0))
            .with_child(manufacture(10.0));
        assert_eq!(forward.total_time(), 35.0);
        assert_eq!(reverse.total_time(), 35.0);
        assert_eq!(forward.node_count(), 3);
        assert_eq!(forward.depth(), 2);
    }

    #[test]
    fn skill_rollup_keeps_maximum() {
        let skill = TypeId(3380);
        let child = manufacture(1.0).with_skills([(skill, 4)].into_iter().collect());
        let parent = manufacture(1.0)
            .with_skills([(skill, 2)].into_iter().collect())
            .with_child(child);
        assert_eq!(parent.total_skills().level(skill), 4);
    }

    #[test]
    fn times_bucket_by_activity() {
        let tree = manufacture(100.0)
            .with_child(invention(0.5).with_time(40.0))
            .with_child(manufacture(10.0));
        let buckets = tree.total_times_by_activity();
        assert_eq!(buckets[&RecipeActivity::Manufacturing], 110.0);
        assert_eq!(buckets[&RecipeActivity::Inventing], 40.0);
    }

    #[test]
    fn success_cost_divides_by_probability() {
        let node = invention(0.25).with_cost(100.0);
        let book = PriceBook::new();
        assert_eq!(node.success_cost(&book, &ctx()).unwrap(), 400.0);
        assert_eq!(node.success_process_cost(), 400.0);
        // Raw per-attempt metrics are untouched.
        assert_eq!(node.cost(), 100.0);
        assert_eq!(node.total_cost(&book, &ctx()).unwrap(), 100.0);
    }

    #[test]
    fn impossible_success_is_unbounded() {
        let node = invention(0.0).with_time(40.0).with_cost(0.0);
        let book = PriceBook::new();
        assert_eq!(node.success_time(), f64::INFINITY);
        assert_eq!(node.success_process_cost(), f64::INFINITY);
        assert_eq!(node.success_cost(&book, &ctx()).unwrap(), f64::INFINITY);
        assert_eq!(node.total_success_time(), f64::INFINITY);
        assert!(node.success_materials().is_err());
    }

    #[test]
    fn success_rollup_weights_only_invention_subtrees() {
        let tree = manufacture(100.0)
            .with_cost(10.0)
            .with_child(invention(0.5).with_time(40.0).with_cost(20.0));
        assert_eq!(tree.total_time(), 140.0);
        assert_eq!(tree.total_success_time(), 180.0);
        assert_eq!(tree.total_success_process_cost(), 50.0);
    }

    #[test]
    fn profit_of_sellable_output_subtracts_tree_cost() {
        let mut catalog = MemoryCatalog::new();
        catalog.add_item(ItemInfo {
            id: TypeId(2),
            name: "Widget".to_string(),
            group_id: 1,
            category_id: 7,
            portion_size: 1,
            sellable: true,
        });
        let mut book = PriceBook::new().with_clock(0);
        book.set_sell(TypeId(2), HUB, Quote { price: 1000.0, updated_at: 0 });
        book.set_buy(TypeId(34), HUB, Quote { price: 5.0, updated_at: 0 });

        let node = ProcessNode::new(
            RecipeActivity::Manufacturing,
            TypeId(1),
            Some(TypeId(2)),
            2.0,
            ProcessDetail::Manufacture { me: 0, te: 0, portions: 2.0 },
        )
        .with_cost(50.0)
        .with_materials([(TypeId(34), 100.0)].into_iter().collect());

        let valuation = Valuation {
            catalog: &catalog,
            pricing: &book,
            sell_tax_factor: 0.9,
            buy: ctx(),
            sell: ctx(),
        };
        let profit = node.total_profit(&valuation).unwrap();
        assert!((profit - (2000.0 * 0.9 - 50.0 - 500.0)).abs() < 1e-9);

        let research = ProcessNode::new(
            RecipeActivity::MaterialResearch,
            TypeId(1),
            None,
            1.0,
            ProcessDetail::Research { start: 0, end: 1 },
        )
        .with_cost(30.0)
        .with_child(node);
        let profit = research.total_profit(&valuation).unwrap();
        assert!((profit - (2000.0 * 0.9 - 50.0 - 500.0 - 30.0)).abs() < 1e-9);
    }
}
