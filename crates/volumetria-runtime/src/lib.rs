//! Runtime layer for the volumetry tooling.
//!
//! Holds the session context that carries a loaded roster between actions
//! and the file sinks that persist reports and compiled workbooks.

pub mod export;
pub mod session;

pub use volumetria_core as core;
pub use volumetria_data as data;
