use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the volumetry tooling.
#[derive(Error, Debug)]
pub enum VolumetriaError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bytes could not be parsed by any applicable spreadsheet format.
    #[error("Não foi possível abrir '{filename}': {cause}")]
    Load { filename: String, cause: String },

    /// A required column is absent from an input table.
    #[error("A planilha {table} precisa ter a coluna '{column}'")]
    MissingColumn { table: String, column: String },

    /// A report was requested before any roster was loaded.
    #[error("Nenhuma planilha de usuários carregada")]
    NoRoster,

    /// A dataset was assembled with mismatched or duplicate columns.
    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    /// Writing a report or workbook failed.
    #[error("Export error: {0}")]
    Export(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A JSON document could not be produced or parsed.
    #[error("Failed to process JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VolumetriaError {
    pub fn missing_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        VolumetriaError::MissingColumn {
            table: table.into(),
            column: column.into(),
        }
    }
}

/// Convenience alias used throughout the volumetria crates.
pub type Result<T> = std::result::Result<T, VolumetriaError>;

// ── Warnings ──────────────────────────────────────────────────────────────────

/// Non-fatal conditions surfaced alongside a successful result.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// An authorization filter was requested but the join column is absent;
    /// the data passed through unfiltered.
    MissingJoinColumn { column: String },
    /// The selection or filter produced no rows.
    EmptyResult { context: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MissingJoinColumn { column } => write!(
                f,
                "Coluna '{}' não encontrada em um dos arquivos a compilar.",
                column
            ),
            Warning::EmptyResult { context } => write!(f, "{}", context),
        }
    }
}
