//! File sinks for reports and compiled workbooks.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeZone, Timelike};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet, XlsxError};
use volumetria_core::error::{Result, VolumetriaError};
use volumetria_core::models::{columns, parse_datetime_text, CellValue, TabularDataset};
use volumetria_data::report::{render_json, render_text, VolumetryReport};

/// Sheet name of the compiled workbook.
pub const COMPILED_SHEET: &str = "Dados";

/// Excel number format for date-time cells.
pub const DATETIME_FORMAT: &str = "dd/mm/yyyy hh:mm:ss";

/// Excel number format for time-only cells.
pub const TIME_FORMAT: &str = "hh:mm:ss";

/// Columns whose text cells are written as date-times when they parse as one.
const DATETIME_COLUMNS: [&str; 2] = [columns::ACTIVITY_START, columns::ACTIVITY_END];

// ── Report files ──────────────────────────────────────────────────────────────

/// Output format of a report file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    /// Parse the `--format` setting.
    pub fn from_setting(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "text" | "txt" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            other => Err(VolumetriaError::Config(format!(
                "unknown report format '{}'",
                other
            ))),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
        }
    }
}

/// `relatorio_volumetria_<YYYYmmdd_HHMMSS>.<ext>`
pub fn report_file_name<Tz: TimeZone>(now: &DateTime<Tz>, format: ReportFormat) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "relatorio_volumetria_{}.{}",
        now.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

/// `compilado_personalizado_<dd-mm-YYYY_HH-MM>.xlsx`
pub fn compiled_file_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("compilado_personalizado_{}.xlsx", now.format("%d-%m-%Y_%H-%M"))
}

/// Write `report` into `dir` and return the created path.
pub fn write_report(report: &VolumetryReport, format: ReportFormat, dir: &Path) -> Result<PathBuf> {
    let body = match format {
        ReportFormat::Text => render_text(report),
        ReportFormat::Json => render_json(report)?,
    };
    let path = dir.join(report_file_name(&Local::now(), format));
    std::fs::write(&path, body).map_err(|e| {
        VolumetriaError::Export(format!("cannot write {}: {}", path.display(), e))
    })?;
    tracing::info!(path = %path.display(), "report written");
    Ok(path)
}

// ── Compiled workbook ─────────────────────────────────────────────────────────

/// Write the compiled table as a single-sheet `.xlsx` into `dir`.
///
/// Returns `Ok(None)` without touching the filesystem when `dataset` has no
/// rows.
pub fn write_compiled_xlsx(dataset: &TabularDataset, dir: &Path) -> Result<Option<PathBuf>> {
    if dataset.is_empty() {
        tracing::warn!("compiled dataset is empty; no workbook written");
        return Ok(None);
    }

    let path = dir.join(compiled_file_name(&Local::now()));
    let mut workbook = build_workbook(dataset).map_err(export_error)?;
    workbook.save(&path).map_err(export_error)?;

    tracing::info!(
        path = %path.display(),
        rows = dataset.row_count(),
        "compiled workbook written"
    );
    Ok(Some(path))
}

fn build_workbook(dataset: &TabularDataset) -> std::result::Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let formats = DateFormats {
        datetime: Format::new().set_num_format(DATETIME_FORMAT),
        time: Format::new().set_num_format(TIME_FORMAT),
    };

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(COMPILED_SHEET)?;

    for (col, column) in dataset.columns().iter().enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, &column.name, &header_format)?;

        let parse_text_dates = DATETIME_COLUMNS.contains(&column.name.as_str());
        for (row, cell) in column.cells.iter().enumerate() {
            let row = row as u32 + 1;
            match cell {
                CellValue::Null => {}
                CellValue::Text(s) => match parse_text_dates.then(|| parse_datetime_text(s)).flatten() {
                    Some(dt) => write_datetime(worksheet, row, col, &dt, &formats)?,
                    None => {
                        worksheet.write_string(row, col, s)?;
                    }
                },
                CellValue::Number(n) => {
                    worksheet.write_number(row, col, *n)?;
                }
                CellValue::Bool(b) => {
                    worksheet.write_boolean(row, col, *b)?;
                }
                CellValue::DateTime(dt) => write_datetime(worksheet, row, col, dt, &formats)?,
            }
        }
    }

    worksheet.autofit();
    Ok(workbook)
}

struct DateFormats {
    datetime: Format,
    time: Format,
}

/// Write a date-time cell.
///
/// Excel dates start at 1900-01-01. Time-only cells come back from the loader
/// on the serial epoch (1899-12-30) and are written as times; any other date
/// outside 1900..=9999 is written as text.
fn write_datetime(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    dt: &NaiveDateTime,
    formats: &DateFormats,
) -> std::result::Result<(), XlsxError> {
    if dt.date() == excel_epoch() {
        let time = ExcelDateTime::from_hms(dt.hour() as u16, dt.minute() as u8, dt.second())?;
        worksheet.write_datetime_with_format(row, col, &time, &formats.time)?;
        return Ok(());
    }
    if !(1900..=9999).contains(&dt.year()) {
        worksheet.write_string(row, col, dt.format("%d/%m/%Y %H:%M:%S").to_string())?;
        return Ok(());
    }
    let excel = ExcelDateTime::from_ymd(dt.year() as u16, dt.month() as u8, dt.day() as u8)?
        .and_hms(dt.hour() as u16, dt.minute() as u8, dt.second())?;
    worksheet.write_datetime_with_format(row, col, &excel, &formats.datetime)?;
    Ok(())
}

/// Day zero of the Excel 1900 date system as the loader maps it.
fn excel_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

fn export_error(e: XlsxError) -> VolumetriaError {
    VolumetriaError::Export(e.to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
