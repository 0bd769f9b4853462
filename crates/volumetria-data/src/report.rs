//! Report pipeline and renderers.
//!
//! Normalizes a volumetry table against a roster, aggregates it for one
//! selection and renders the result as the per-member breakdown, the team
//! summary (text or table) or JSON.

use chrono::Local;
use serde::Serialize;
use volumetria_core::error::{Result, Warning};
use volumetria_core::formatting::{format_decimal, render_text_table, Align};
use volumetria_core::models::TabularDataset;

use crate::aggregator::{AggregationResult, Selection, ServiceAggregator, TeamSummaryRow};
use crate::roster::RosterModel;
use crate::volumetry::normalize_volumetry;

/// Title line placed above the per-member breakdown in report files.
pub const BREAKDOWN_TITLE: &str = "Relatório de Volumetria:";
/// Title line placed above the team summary in report files.
pub const SUMMARY_TITLE: &str = "Resumo Total de Serviços:";

const NO_SERVICES_LINE: &str = "    - Nenhum fluxo encontrado.";
const EMPTY_SUMMARY: &str = "Sem serviços para o filtro atual.";

// ── Public types ──────────────────────────────────────────────────────────────

/// Metadata produced alongside the aggregation.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// ISO-8601 local timestamp when this report was generated.
    pub generated_at: String,
    /// Selector as the user typed it, after resolution.
    pub selection: String,
    pub roster_rows: usize,
    pub volumetry_rows: usize,
    /// Volumetry rows dropped because `USUARIO` was empty.
    pub rows_without_user: usize,
    /// Wall-clock seconds spent normalizing and aggregating.
    pub processing_time_seconds: f64,
}

/// The complete output of [`run_report`].
#[derive(Debug, Clone, Serialize)]
pub struct VolumetryReport {
    pub metadata: ReportMetadata,
    pub result: AggregationResult,
    pub team_summary: Vec<TeamSummaryRow>,
    pub warnings: Vec<Warning>,
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// Run the report flow for one selection.
///
/// 1. Normalize `volumetry` (fails when `USUARIO` is missing).
/// 2. Aggregate authorized rows for `selection` via [`ServiceAggregator`].
/// 3. Attach the team summary and an empty-result warning when nothing counted.
pub fn run_report(
    roster: &RosterModel,
    volumetry: TabularDataset,
    selection: &Selection,
) -> Result<VolumetryReport> {
    let start = std::time::Instant::now();

    let model = normalize_volumetry(volumetry)?;
    let result =
        ServiceAggregator::aggregate(&model, &roster.authorized, &roster.groups, selection);

    let mut warnings = Vec::new();
    if result.is_empty() {
        warnings.push(Warning::EmptyResult {
            context: format!("Nenhum serviço encontrado para o filtro '{}'.", selection),
        });
    }

    let metadata = ReportMetadata {
        generated_at: Local::now().to_rfc3339(),
        selection: selection.to_string(),
        roster_rows: roster.row_count,
        volumetry_rows: model.dataset.row_count(),
        rows_without_user: model.rows_without_user(),
        processing_time_seconds: start.elapsed().as_secs_f64(),
    };

    tracing::info!(
        selection = %selection,
        members = result.members.len(),
        grand_total = result.grand_total,
        "report ready"
    );

    Ok(VolumetryReport {
        team_summary: result.team_summary(),
        metadata,
        result,
        warnings,
    })
}

// ── Text rendering ────────────────────────────────────────────────────────────

/// Per-member breakdown, one block per member followed by a blank line.
///
/// ```text
/// Colaborador: ANA
///   Total de Serviços: 2
///     - X1: 2
/// ```
pub fn render_member_breakdown(result: &AggregationResult) -> String {
    let mut lines: Vec<String> = Vec::new();
    for member in &result.members {
        lines.push(format!("Colaborador: {}", member.member));
        lines.push(format!("  Total de Serviços: {}", member.total));
        if member.services.is_empty() {
            lines.push(NO_SERVICES_LINE.to_string());
        } else {
            for service in &member.services {
                lines.push(format!("    - {}: {}", service.service_type, service.count));
            }
        }
        lines.push(String::new());
    }
    lines.join("\n")
}

/// Team summary as text lines, or a fixed message when nothing was counted.
pub fn render_team_summary(result: &AggregationResult) -> String {
    let summary = result.team_summary();
    if summary.is_empty() {
        return EMPTY_SUMMARY.to_string();
    }

    let mut out = String::from("TOTAL POR SERVIÇO DO TIME:\n");
    let lines: Vec<String> = summary
        .iter()
        .map(|row| {
            format!(
                "- {}: {}, DIAS: {}, MÉDIA: {}",
                row.service_type,
                row.quantity,
                row.days,
                format_decimal(row.average, 2)
            )
        })
        .collect();
    out.push_str(&lines.join("\n"));
    out.push_str(&format!("\n\nTOTAL GERAL DE SERVIÇOS: {}\n", result.grand_total));
    out
}

/// Team summary as an aligned terminal table plus the grand total.
pub fn render_team_table(result: &AggregationResult) -> String {
    let summary = result.team_summary();
    if summary.is_empty() {
        return EMPTY_SUMMARY.to_string();
    }

    let rows: Vec<Vec<String>> = summary
        .iter()
        .map(|row| {
            vec![
                row.service_type.clone(),
                row.quantity.to_string(),
                row.days.to_string(),
                format_decimal(row.average, 2),
            ]
        })
        .collect();

    let table = render_text_table(
        &["Tipo de Serviço", "Quantidade", "DIAS", "MÉDIA"],
        &rows,
        &[Align::Left, Align::Right, Align::Right, Align::Right],
    );
    format!("{}\n\nTOTAL GERAL DE SERVIÇOS: {}", table, result.grand_total)
}

/// Full text document: titled breakdown, then the titled team summary when
/// anything was counted.
pub fn render_text(report: &VolumetryReport) -> String {
    let mut out = String::new();
    let breakdown = render_member_breakdown(&report.result);
    if !breakdown.trim().is_empty() {
        out.push_str(BREAKDOWN_TITLE);
        out.push_str("\n\n");
        out.push_str(&breakdown);
        out.push('\n');
    }
    if !report.team_summary.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(SUMMARY_TITLE);
        out.push_str("\n\n");
        out.push_str(&render_team_summary(&report.result));
    }
    out
}

/// Pretty-printed JSON of the whole report.
pub fn render_json(report: &VolumetryReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
