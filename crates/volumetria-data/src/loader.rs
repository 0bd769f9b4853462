//! Spreadsheet loading with format dispatch and fallback.
//!
//! Turns uploaded bytes into a [`TabularDataset`]. The filename extension
//! picks the parser; files of unknown type walk an ordered chain of parsers
//! and the first success wins. A workbook named `.xlsx` that is not a zip
//! container is retried once as a legacy `.xls`.

use std::fmt;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Ods, Range, Reader, Xls, Xlsx};
use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, warn};
use volumetria_core::error::{Result, VolumetriaError};
use volumetria_core::models::{parse_datetime_text, CellValue, TabularDataset};

/// Local file header signature of a zip container (`PK\x03\x04`).
const ZIP_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// OLE2 compound document signature used by legacy `.xls` workbooks.
const OLE2_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Extensions handled by the zip-based OOXML parser.
const OOXML_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xltx", "xltm"];

// ── Parse strategies ──────────────────────────────────────────────────────────

/// One way of turning bytes into a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// Office Open XML (`.xlsx` and friends).
    Xlsx,
    /// Legacy BIFF binary (`.xls`).
    Xls,
    /// OpenDocument spreadsheet (`.ods`).
    Ods,
    /// Let calamine sniff the container format.
    Sniff,
}

impl fmt::Display for ParseStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseStrategy::Xlsx => write!(f, "xlsx"),
            ParseStrategy::Xls => write!(f, "xls"),
            ParseStrategy::Ods => write!(f, "ods"),
            ParseStrategy::Sniff => write!(f, "auto"),
        }
    }
}

impl ParseStrategy {
    /// Parse `bytes` with this strategy, reading the first worksheet.
    fn parse(self, bytes: &[u8]) -> std::result::Result<TabularDataset, String> {
        let cursor = Cursor::new(bytes);
        let range = match self {
            ParseStrategy::Xlsx => {
                let mut wb = Xlsx::new(cursor).map_err(|e| e.to_string())?;
                first_sheet(&mut wb)?
            }
            ParseStrategy::Xls => {
                let mut wb = Xls::new(cursor).map_err(|e| e.to_string())?;
                first_sheet(&mut wb)?
            }
            ParseStrategy::Ods => {
                let mut wb = Ods::new(cursor).map_err(|e| e.to_string())?;
                first_sheet(&mut wb)?
            }
            ParseStrategy::Sniff => {
                let mut wb = open_workbook_auto_from_rs(cursor).map_err(|e| e.to_string())?;
                first_sheet(&mut wb)?
            }
        };
        Ok(range_to_dataset(&range))
    }
}

/// Ordered strategies to try for a lower-cased file extension.
pub fn strategies_for(extension: Option<&str>) -> Vec<ParseStrategy> {
    match extension {
        Some(ext) if OOXML_EXTENSIONS.contains(&ext) => vec![ParseStrategy::Xlsx],
        Some("xls") => vec![ParseStrategy::Xls],
        Some("ods") => vec![ParseStrategy::Ods],
        _ => vec![
            ParseStrategy::Xlsx,
            ParseStrategy::Xls,
            ParseStrategy::Sniff,
        ],
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Load a spreadsheet from raw bytes.
///
/// `filename_hint` only guides format dispatch and error messages. Either the
/// whole first worksheet is returned or a [`VolumetriaError::Load`] carrying
/// every attempted strategy's failure.
pub fn load(bytes: &[u8], filename_hint: Option<&str>) -> Result<TabularDataset> {
    let extension = filename_hint.and_then(extension_of);
    let strategies = strategies_for(extension.as_deref());
    let display_name = filename_hint.unwrap_or("arquivo").to_string();

    let mut causes: Vec<String> = Vec::new();

    for strategy in &strategies {
        debug!("Trying {} parser for {}", strategy, display_name);
        match strategy.parse(bytes) {
            Ok(dataset) => {
                debug!(
                    "Loaded {} with {} parser: {} rows, {} columns",
                    display_name,
                    strategy,
                    dataset.row_count(),
                    dataset.columns().len()
                );
                return Ok(dataset);
            }
            Err(cause) => causes.push(format!("{}: {}", strategy, cause)),
        }
    }

    // A `.xls` saved under an OOXML extension: one retry as legacy binary.
    if strategies == [ParseStrategy::Xlsx] && !is_zip_container(bytes) {
        warn!(
            "{} is not a zip container; retrying as legacy .xls",
            display_name
        );
        match ParseStrategy::Xls.parse(bytes) {
            Ok(dataset) => return Ok(dataset),
            Err(cause) => causes.push(format!(
                "{}: {} (esse arquivo parece ser .xls salvo com extensão .{})",
                ParseStrategy::Xls,
                cause,
                extension.as_deref().unwrap_or("xlsx")
            )),
        }
    }

    Err(VolumetriaError::Load {
        filename: display_name,
        cause: causes.join("; "),
    })
}

/// Read `path` from disk and [`load`] it, using the file name as the hint.
pub fn load_path(path: &Path) -> Result<TabularDataset> {
    let bytes = std::fs::read(path).map_err(|source| VolumetriaError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let hint = path.file_name().map(|n| n.to_string_lossy().to_string());
    load(&bytes, hint.as_deref())
}

/// `true` when `bytes` open with a zip local-file-header and not an OLE2 header.
pub fn is_zip_container(bytes: &[u8]) -> bool {
    bytes.starts_with(&ZIP_SIGNATURE) && !bytes.starts_with(&OLE2_SIGNATURE)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
}

fn first_sheet<RS, W>(workbook: &mut W) -> std::result::Result<Range<Data>, String>
where
    RS: Read + Seek,
    W: Reader<RS>,
    W::Error: fmt::Display,
{
    match workbook.worksheet_range_at(0) {
        Some(Ok(range)) => Ok(range),
        Some(Err(e)) => Err(e.to_string()),
        None => Err("workbook has no worksheets".to_string()),
    }
}

/// First row becomes the header; fully-empty data rows are dropped.
fn range_to_dataset(range: &Range<Data>) -> TabularDataset {
    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return TabularDataset::new();
    };

    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| cell_to_value(cell).as_text().unwrap_or_default())
        .collect();

    let data: Vec<Vec<CellValue>> = rows
        .map(|row| row.iter().map(cell_to_value).collect::<Vec<_>>())
        .filter(|row| row.iter().any(|c| !c.is_null()))
        .collect();

    TabularDataset::from_rows(headers, data)
}

fn cell_to_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Null,
        Data::String(s) if s.is_empty() => CellValue::Null,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64())
            .map(CellValue::DateTime)
            .unwrap_or(CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) => parse_datetime_text(s)
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) => CellValue::Null,
    }
}

/// Convert an Excel 1900-system serial (days since 1899-12-30) to a date-time.
fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    // Out-of-range serials saturate here and are rejected by `try_seconds`.
    let seconds = (serial * 86_400.0).round() as i64;
    base.checked_add_signed(chrono::Duration::try_seconds(seconds)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
