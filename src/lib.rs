//! Industry process calculator
//!
//! Resolves manufacturing, copying, research, invention and reaction jobs
//! into process trees with rolled-up materials, skills, time, cost and profit.

pub mod catalog;
pub mod character;
pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod models;
pub mod modifier;
pub mod pricing;
pub mod process;
pub mod quantity;
pub mod report;
pub mod reprocess;
pub mod resolver;
pub mod sample;
pub mod sources;

pub use error::{IndustryError, Result};
pub use models::{CopyRuns, RecipeActivity, TypeId};
pub use process::ProcessNode;
pub use resolver::{BlueprintLevels, RecursionBudget, Resolver, ResolverSettings};
