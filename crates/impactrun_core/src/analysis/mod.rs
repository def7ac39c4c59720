//! Variance-based global sensitivity analysis.
//!
//! A [`SensitivityScheme`] owns the statistics: it generates a design in the
//! unit hypercube and turns one scalar output per design row into Sobol
//! indices. [`run_sensitivity`] owns the mapping in between, from design rows
//! to parameter points to tree evaluations.
//!
//! ```ignore
//! use impactrun_core::analysis::{Saltelli, SensitivityConfig, run_sensitivity};
//! use impactrun_core::simulation::BatchProgress;
//!
//! let config = SensitivityConfig { base_samples: 512, ..Default::default() };
//! let progress = BatchProgress::new();
//! let result = run_sensitivity(model.registry(), model.tree(), &Saltelli, &config, &progress)?;
//! for (name, st) in result.parameters.iter().zip(&result.root[0].total_order) {
//!     println!("{name}: {st:.3}");
//! }
//! ```

mod config;
mod evaluator;
mod sobol;

pub use config::*;
pub use evaluator::*;
pub use sobol::*;
