//! Shared foundation for the volumetry tooling.
//!
//! Holds the schema-flexible table model, identifier normalization, the
//! error taxonomy, command-line settings and text formatting helpers.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;

pub use error::{Result, VolumetriaError, Warning};
pub use models::{CellValue, Column, Identifier, TabularDataset};
