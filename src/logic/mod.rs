//! Logic Module - Analysis Engines
//!
//! Baseline, equivalence probe, header minimizer and identity probe, plus
//! the run that chains them.

// Core types
pub mod headers;
pub mod snapshot;
pub mod types;
pub mod similarity;

// Engines
pub mod baseline;
pub mod probe;
pub mod minimizer;
pub mod identity;
pub mod analyzer;

#[cfg(test)]
pub mod testing;
