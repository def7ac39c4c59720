//! Command-line front end for impactrun models
//!
//! Loads a YAML impact model, hands it to `impactrun_core` and renders the
//! outcome as JSON. Evaluation logic lives entirely in the core crate.

pub mod commands;
pub mod io;
pub mod logging;

pub use logging::init_logging;
