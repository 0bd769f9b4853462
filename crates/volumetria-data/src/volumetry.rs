//! Volumetry normalization: per-row user and service-type key.

use tracing::debug;
use volumetria_core::error::{Result, VolumetriaError};
use volumetria_core::models::{columns, CellValue, Identifier, TabularDataset};

/// Table label used in validation messages.
pub const VOLUMETRY_TABLE: &str = "de volumetria";

/// Separator between the service type and its disambiguating suffix.
pub const SERVICE_KEY_SEPARATOR: char = '#';

/// Bucket for rows without a service type value.
pub const UNTYPED_SERVICE: &str = "(sem tipo)";

/// One service record with a usable identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumetryRecord {
    /// Row index in the normalized dataset.
    pub row: usize,
    pub user: Identifier,
    pub service_type: String,
}

/// Normalized volumetry table plus the records derived from it.
#[derive(Debug, Clone)]
pub struct VolumetryModel {
    /// The table with `USUARIO`, `JUSTIFICATIVA` and `IDREGISTROCONTROLADO`
    /// rewritten in place.
    pub dataset: TabularDataset,
    /// Rows that carry an identifier, in table order.
    pub records: Vec<VolumetryRecord>,
}

impl VolumetryModel {
    /// Rows dropped because the user cell was empty.
    pub fn rows_without_user(&self) -> usize {
        self.dataset.row_count() - self.records.len()
    }
}

/// Validate and normalize a raw volumetry table.
///
/// * `USUARIO` is required and normalized as an [`Identifier`].
/// * `JUSTIFICATIVA` text cells get every `;` replaced by `:`.
/// * `IDREGISTROCONTROLADO` is cut at the first `#`, keeping the prefix.
pub fn normalize_volumetry(mut dataset: TabularDataset) -> Result<VolumetryModel> {
    if !dataset.has_column(columns::USER) {
        return Err(VolumetriaError::missing_column(VOLUMETRY_TABLE, columns::USER));
    }

    dataset.map_column(columns::JUSTIFICATION, |cell| match cell {
        CellValue::Text(s) => CellValue::Text(s.replace(';', ":")),
        other => other.clone(),
    });

    dataset.map_column(columns::CONTROLLED_RECORD_ID, |cell| match cell.as_text() {
        Some(text) => CellValue::Text(service_key(&text).to_string()),
        None => CellValue::Null,
    });

    dataset.map_column(columns::USER, |cell| match Identifier::from_cell(cell) {
        Some(id) => CellValue::Text(id.to_string()),
        None => CellValue::Null,
    });

    let records: Vec<VolumetryRecord> = (0..dataset.row_count())
        .filter_map(|row| {
            let user = dataset
                .cell(row, columns::USER)
                .and_then(Identifier::from_cell)?;
            let service_type = dataset
                .cell(row, columns::CONTROLLED_RECORD_ID)
                .and_then(CellValue::as_text)
                .unwrap_or_else(|| UNTYPED_SERVICE.to_string());
            Some(VolumetryRecord {
                row,
                user,
                service_type,
            })
        })
        .collect();

    debug!(
        "Volumetry: {} rows, {} with user",
        dataset.row_count(),
        records.len()
    );

    Ok(VolumetryModel { dataset, records })
}

/// Prefix of a compound record id before the first [`SERVICE_KEY_SEPARATOR`].
pub fn service_key(raw: &str) -> &str {
    raw.split(SERVICE_KEY_SEPARATOR).next().unwrap_or(raw)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
