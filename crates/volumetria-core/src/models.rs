use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

use crate::error::{Result, VolumetriaError};

/// Column names the pipeline looks up by exact, case-sensitive match.
pub mod columns {
    pub const USER: &str = "USUARIO";
    pub const LEADERSHIP: &str = "LIDERANCA";
    pub const JUSTIFICATION: &str = "JUSTIFICATIVA";
    pub const CONTROLLED_RECORD_ID: &str = "IDREGISTROCONTROLADO";
    pub const ACTIVITY_START: &str = "DATAHORAINICIOATIVIDADE";
    pub const ACTIVITY_END: &str = "DATAHORAFIMATIVIDADE";
}

// ── CellValue ─────────────────────────────────────────────────────────────────

/// A single spreadsheet cell after ingestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Empty or missing cell.
    Null,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Date-time without timezone, as spreadsheets store them.
    DateTime(NaiveDateTime),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// String form of the cell, or `None` for nulls.
    ///
    /// Integral numbers render without a fractional part (`42.0` → `"42"`)
    /// so numeric identifiers read from a workbook compare equal to their
    /// textual spelling.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(n) => Some(format_number_cell(*n)),
            CellValue::Bool(b) => Some(b.to_string()),
            CellValue::DateTime(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(s) => write!(f, "{}", s),
            None => Ok(()),
        }
    }
}

fn format_number_cell(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Parse the date-time spellings commonly found in exported spreadsheets.
///
/// Accepts ISO (`2024-03-01T08:30:00`, `2024-03-01 08:30:00`), Brazilian
/// day-first (`01/03/2024 08:30:00`, `01/03/2024 08:30`) and bare dates.
pub fn parse_datetime_text(text: &str) -> Option<NaiveDateTime> {
    let trimmed = text.trim();
    const DATETIME_FORMATS: [&str; 6] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt);
        }
    }
    for fmt in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

// ── Identifier ────────────────────────────────────────────────────────────────

/// A normalized user/account token: trimmed and upper-cased, never empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Normalize a raw token. Returns `None` when nothing is left after trimming.
    pub fn normalize(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_uppercase();
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    /// Normalize the string form of a cell; nulls are dropped, not coerced.
    pub fn from_cell(cell: &CellValue) -> Option<Self> {
        cell.as_text().and_then(|s| Self::normalize(&s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ── TabularDataset ────────────────────────────────────────────────────────────

/// A named column of cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub cells: Vec<CellValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<CellValue>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }
}

/// Ordered, schema-flexible table: named columns of equal length.
///
/// Column names are unique within a dataset and every column holds exactly
/// [`row_count`](TabularDataset::row_count) cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TabularDataset {
    columns: Vec<Column>,
    row_count: usize,
}

impl TabularDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dataset from a header row and data rows.
    ///
    /// Headers go through [`unique_headers`]; short rows are padded with
    /// nulls and cells beyond the header width are ignored.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let names = unique_headers(headers);
        let row_count = rows.len();
        let mut columns: Vec<Column> = names
            .into_iter()
            .map(|name| Column::new(name, Vec::with_capacity(row_count)))
            .collect();

        for row in rows {
            let mut cells = row.into_iter();
            for column in columns.iter_mut() {
                column.cells.push(cells.next().unwrap_or(CellValue::Null));
            }
        }

        Self { columns, row_count }
    }

    /// Build a dataset from already-shaped columns, enforcing the invariants.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let row_count = columns.first().map(|c| c.cells.len()).unwrap_or(0);
        let mut seen: HashSet<&str> = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(VolumetriaError::InvalidDataset(format!(
                    "duplicate column '{}'",
                    column.name
                )));
            }
            if column.cells.len() != row_count {
                return Err(VolumetriaError::InvalidDataset(format!(
                    "column '{}' has {} cells, expected {}",
                    column.name,
                    column.cells.len(),
                    row_count
                )));
            }
        }
        Ok(Self { columns, row_count })
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Cell at `row` in column `name`, if both exist.
    pub fn cell(&self, row: usize, name: &str) -> Option<&CellValue> {
        self.column(name).and_then(|c| c.cells.get(row))
    }

    /// Rewrite every cell of column `name` in place.
    ///
    /// Returns `false` when the column does not exist.
    pub fn map_column(&mut self, name: &str, mut f: impl FnMut(&CellValue) -> CellValue) -> bool {
        match self.column_mut(name) {
            Some(column) => {
                for cell in column.cells.iter_mut() {
                    *cell = f(cell);
                }
                true
            }
            None => false,
        }
    }

    /// New dataset with only the rows for which `keep(row_index)` is true.
    pub fn filter_rows(&self, mut keep: impl FnMut(usize) -> bool) -> Self {
        let kept: Vec<usize> = (0..self.row_count).filter(|&i| keep(i)).collect();
        let columns = self
            .columns
            .iter()
            .map(|c| Column::new(c.name.clone(), kept.iter().map(|&i| c.cells[i].clone()).collect()))
            .collect();
        Self {
            columns,
            row_count: kept.len(),
        }
    }
}

/// Make header names usable as unique column keys.
///
/// Blank headers become `Unnamed: <index>`; repeated names get `.1`, `.2`, …
/// appended in order of appearance.
pub fn unique_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(headers.len());

    for (index, header) in headers.into_iter().enumerate() {
        let trimmed = header.trim();
        let base = if trimmed.is_empty() {
            format!("Unnamed: {}", index)
        } else {
            trimmed.to_string()
        };

        let mut name = base.clone();
        let mut suffix = 1;
        while seen.contains(&name) {
            name = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        seen.insert(name.clone());
        out.push(name);
    }

    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
