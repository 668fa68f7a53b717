//! Verification pipeline for directory-entry suggestions.
//!
//! A suggestion flows through format checks, a browser reachability probe
//! (with LLM-backed URL repair on failure), geocoding, website content
//! matching, cross-referencing against external directories, and conflict
//! detection. Outcomes are combined into one weighted confidence score and
//! mapped to an approve/flag/reject decision, with an ordered event trace and
//! a cost ledger produced along the way.

pub mod analyst;
pub mod autofix;
pub mod checks;
pub mod conflicts;
pub mod cost;
pub mod decision;
pub mod intake;
pub mod pipeline;
pub mod scheduler;
pub mod scoring;
pub mod search;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

#[cfg(test)]
mod pipeline_tests;

pub use decision::DecisionThresholds;
pub use pipeline::{Verifier, VerifierConfig, VerifierDeps};
