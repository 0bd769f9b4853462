//! Data layer for the volumetry tooling.
//!
//! Loads spreadsheet bytes into tables, normalizes roster and volumetry
//! tables, aggregates service counts and merges tables for the compile flow.

pub mod aggregator;
pub mod compiler;
pub mod loader;
pub mod report;
pub mod roster;
pub mod volumetry;

#[cfg(test)]
mod test_fixtures;

pub use volumetria_core as core;
