//! Plain-text rendering of process trees and plan summaries

use std::fmt;

use tracing::warn;

use crate::models::{RecipeActivity, TypeId};
use crate::process::{ProcessDetail, ProcessNode, Valuation, purchase_cost};
use crate::sources::{Catalog, Character};

fn name(catalog: &dyn Catalog, id: TypeId) -> String {
    catalog
        .item(id)
        .map(|i| i.name.clone())
        .unwrap_or_else(|_| format!("#{id}"))
}

/// `1d 2h 3m 4s`, dropping leading zero units.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).ceil() as u64;
    let (days, rest) = (total / 86400, total % 86400);
    let (hours, rest) = (rest / 3600, rest % 3600);
    let (minutes, secs) = (rest / 60, rest % 60);

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 || !parts.is_empty() {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 || !parts.is_empty() {
        parts.push(format!("{minutes}m"));
    }
    parts.push(format!("{secs}s"));
    parts.join(" ")
}

fn describe(node: &ProcessNode, catalog: &dyn Catalog) -> String {
    let source = name(catalog, node.source());
    match node.detail() {
        ProcessDetail::Manufacture { me, te, portions } => format!(
            "Manufacture {:.0}x {} ({portions:.2} runs of {source}, ME {me} TE {te})",
            node.quantity(),
            node.output().map_or_else(String::new, |o| name(catalog, o)),
        ),
        ProcessDetail::Copy { copies, runs } => {
            format!("Copy {source}: {copies} copies x {runs} runs")
        }
        ProcessDetail::Research { start, end } => {
            format!("{} {source}: level {start} -> {end}", node.activity())
        }
        ProcessDetail::Invention(result) => {
            let target = result
                .target
                .map_or_else(|| "any".to_string(), |t| name(catalog, t));
            format!(
                "Invent {target} from {source}: {} attempts at {:.1}% ({} runs, ME {} TE {})",
                result.attempts,
                result.probability * 100.0,
                result.runs,
                result.me,
                result.te
            )
        }
        ProcessDetail::Reaction { cycles, .. } => format!(
            "React {:.2}x {} ({cycles:.2} cycles of {source})",
            node.quantity(),
            node.output().map_or_else(String::new, |o| name(catalog, o)),
        ),
    }
}

/// Format a process tree as an indented listing
pub fn format_process_tree(node: &ProcessNode, catalog: &dyn Catalog, indent: usize) -> String {
    let mut output = String::new();
    let prefix = "  ".repeat(indent);

    output.push_str(&format!(
        "{prefix}{} [{}, job cost {:.2}]\n",
        describe(node, catalog),
        format_duration(node.time()),
        node.cost()
    ));
    for (item, qty) in node.materials().iter() {
        output.push_str(&format!("{prefix}  buy {qty:.2} {}\n", name(catalog, item)));
    }
    for child in node.children() {
        output.push_str(&format_process_tree(child, catalog, indent + 1));
    }

    output
}

/// Totals of a resolved plan
#[derive(Debug)]
pub struct PlanSummary {
    pub title: String,
    pub jobs: usize,
    pub total_time: f64,
    /// Expected time when invention jobs are repeated until they succeed.
    pub success_time: Option<f64>,
    pub times_by_activity: Vec<(RecipeActivity, f64)>,
    pub process_cost: f64,
    pub material_cost: Option<f64>,
    pub profit: Option<f64>,
    pub materials: Vec<(String, f64)>,
    /// (skill, required level, trained level)
    pub skills: Vec<(String, u8, u8)>,
}

/// Generate a summary of a process tree
///
/// Missing or stale prices leave the affected totals empty rather than
/// failing the whole summary.
pub fn summarize_plan(
    node: &ProcessNode,
    title: &str,
    valuation: &Valuation<'_>,
    character: &dyn Character,
) -> PlanSummary {
    let catalog = valuation.catalog;
    let materials_map = node.total_materials();

    let material_cost = match purchase_cost(&materials_map, valuation.pricing, &valuation.buy) {
        Ok(cost) => Some(cost),
        Err(e) => {
            warn!(error = %e, "material cost unavailable");
            None
        }
    };
    let profit = match node.total_profit(valuation) {
        Ok(profit) => Some(profit),
        Err(e) => {
            warn!(error = %e, "profit unavailable");
            None
        }
    };

    let total_time = node.total_time();
    let success_time = Some(node.total_success_time()).filter(|t| (t - total_time).abs() > 1e-9);

    let mut materials: Vec<_> = materials_map
        .iter()
        .map(|(item, qty)| (name(catalog, item), qty))
        .collect();
    materials.sort_by(|a, b| a.0.cmp(&b.0));

    let mut skills: Vec<_> = node
        .total_skills()
        .iter()
        .map(|(skill, level)| (name(catalog, skill), level, character.skill_level(skill)))
        .collect();
    skills.sort_by(|a, b| a.0.cmp(&b.0));

    PlanSummary {
        title: title.to_string(),
        jobs: node.node_count(),
        total_time,
        success_time,
        times_by_activity: node.total_times_by_activity().into_iter().collect(),
        process_cost: node.total_process_cost(),
        material_cost,
        profit,
        materials,
        skills,
    }
}

fn money(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a (missing prices)".to_string(), |v| format!("{v:.2}"))
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Plan Summary ===")?;
        writeln!(f, "Target: {}", self.title)?;
        writeln!(f, "Jobs:   {}", self.jobs)?;
        writeln!(f)?;

        writeln!(f, "Time:")?;
        for (activity, time) in &self.times_by_activity {
            writeln!(f, "  {activity}: {}", format_duration(*time))?;
        }
        writeln!(f, "  Total: {}", format_duration(self.total_time))?;
        if let Some(expected) = self.success_time {
            writeln!(f, "  Expected until success: {}", format_duration(expected))?;
        }
        writeln!(f)?;

        writeln!(f, "Materials to buy:")?;
        for (name, qty) in &self.materials {
            writeln!(f, "  {qty:.2} {name}")?;
        }
        writeln!(f)?;

        writeln!(f, "Skills required:")?;
        for (name, required, trained) in &self.skills {
            let flag = if trained < required { "  (missing)" } else { "" };
            writeln!(f, "  {name} {required}{flag}")?;
        }
        writeln!(f)?;

        writeln!(f, "Cost:")?;
        writeln!(f, "  Jobs:      {:.2}", self.process_cost)?;
        writeln!(f, "  Materials: {}", money(self.material_cost))?;
        let total = self.material_cost.map(|m| m + self.process_cost);
        writeln!(f, "  Total:     {}", money(total))?;
        writeln!(f, "  Profit:    {}", money(self.profit))?;

        Ok(())
    }
}
