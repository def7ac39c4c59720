//! Parameterized life-cycle impact model evaluation
//!
//! This crate compiles an impact model (a tree of product components whose
//! amounts and impacts are formulas over named parameters) and evaluates it.
//! It supports:
//! - Float and enum parameters, with enum variants exposed to formulas as
//!   one-hot indicator variables
//! - A formula language compiled once at model construction
//! - Bottom-up aggregation of scaled impacts per indicator
//! - Monte Carlo and Latin hypercube batches with per-sample failure reporting
//! - Sobol sensitivity indices with a Saltelli design
//! - Score tables with normalisation and weighting
//!
//! # Builder DSL
//!
//! ```ignore
//! use impactrun_core::{ImpactModel, NodeBuilder, ImpactModelBuilder, ParameterBuilder};
//!
//! let definition = ImpactModelBuilder::new()
//!     .parameter(ParameterBuilder::float("lifespan", 5.0).bounds(2.0, 8.0))
//!     .tree(NodeBuilder::new("laptop")
//!         .child(NodeBuilder::new("manufacturing").impact("climate_change", "120 / lifespan"))
//!         .child(NodeBuilder::new("use_phase").amount("lifespan").impact("climate_change", 8.0)))
//!     .build();
//!
//! let model = ImpactModel::from_definition(&definition)?;
//! let result = model.evaluate_default()?;
//! println!("{:?}", result.totals());
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod analysis;
pub mod error;
pub mod evaluate;
pub mod formula;
pub mod impact_model;
pub mod metrics;
pub mod simulation;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod config;
pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use config::{
    ImpactModelBuilder, ImpactModelDefinition, NodeBuilder, ParameterBuilder, SamplingConfig,
};
pub use impact_model::ImpactModel;
pub use simulation::BatchProgress;
