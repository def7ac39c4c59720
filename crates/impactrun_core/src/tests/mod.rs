//! Integration tests for the impact model engine
//!
//! Tests are organized by topic:
//! - `basic` - Tree construction, aggregation and evaluation failures
//! - `formulas` - Formula language through whole models
//! - `parameters` - Enum indicators, bounds and value expressions
//! - `sampling` - Batch sampling, reproducibility and failure collection
//! - `sensitivity` - Sobol indices over compiled models
//! - `builder_dsl` - Builder DSL and model file round trips
//! - `scores` - Score tables built from evaluations

mod basic;
mod formulas;
mod sampling;
mod scores;
mod sensitivity;
