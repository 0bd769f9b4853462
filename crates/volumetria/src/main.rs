mod bootstrap;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use volumetria_core::settings::Settings;
use volumetria_core::VolumetriaError;
use volumetria_data::report::{render_member_breakdown, render_team_table};
use volumetria_runtime::export::{write_compiled_xlsx, write_report, ReportFormat};
use volumetria_runtime::session::{InputFile, Session};

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("volumetria v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::debug!(
        "Action: {}, Format: {}, Output: {}",
        settings.action,
        settings.format,
        settings.output_dir.display()
    );

    match settings.action.as_str() {
        "report" => run_report(&settings),
        "compile" => run_compile(&settings),
        "filters" => run_filters(&settings),
        unknown => bail!("Unknown action: {}", unknown),
    }
}

// ── Actions ────────────────────────────────────────────────────────────────────

fn load_session(settings: &Settings) -> Result<Session> {
    let Some(roster_path) = settings.roster.as_ref() else {
        bail!(VolumetriaError::NoRoster);
    };
    let mut session = Session::new();
    session.load_roster(&InputFile::read(roster_path)?)?;
    Ok(session)
}

fn run_filters(settings: &Settings) -> Result<()> {
    let session = load_session(settings)?;
    for option in session.filter_options()? {
        println!("{}", option);
    }
    Ok(())
}

/// One report per `--filter`; a failing filter does not stop the others.
fn run_report(settings: &Settings) -> Result<()> {
    let format = ReportFormat::from_setting(&settings.format)?;
    let volumetry_path = settings
        .volumetry
        .as_ref()
        .context("--volumetry is required for the report action")?;

    let mut session = load_session(settings)?;
    let volumetry = InputFile::read(volumetry_path)?;
    bootstrap::ensure_output_dir(&settings.output_dir)?;

    let mut failures = 0usize;
    for filter in settings.effective_filters() {
        tracing::info!("Generating report for filter {}", filter);
        let report = match session.report(&volumetry, &filter) {
            Ok(report) => report,
            Err(e) => {
                eprintln!("Erro ao processar volumetria ({}): {}", filter, e);
                failures += 1;
                continue;
            }
        };

        for warning in &report.warnings {
            tracing::warn!("{}", warning);
        }

        println!("{}", render_member_breakdown(&report.result));
        println!("{}", render_team_table(&report.result));

        let path = write_report(&report, format, &settings.output_dir)?;
        println!("\nRelatório salvo em {}\n", path.display());
    }

    if failures > 0 {
        bail!("{} report(s) failed", failures);
    }
    Ok(())
}

fn run_compile(settings: &Settings) -> Result<()> {
    let (Some(file1), Some(file2)) = (settings.file1.as_ref(), settings.file2.as_ref()) else {
        bail!(VolumetriaError::Config(
            "Envie os dois arquivos para compilar (--file1 e --file2).".to_string()
        ));
    };

    let filter_roster = match compile_filter_roster(settings)? {
        Some(path) => Some(InputFile::read(path)?),
        None => None,
    };

    let mut session = Session::new();
    let compiled = session.compile(
        &InputFile::read(file1)?,
        &InputFile::read(file2)?,
        filter_roster.as_ref(),
    )?;

    for warning in &compiled.warnings {
        tracing::warn!("{}", warning);
        eprintln!("{}", warning);
    }

    bootstrap::ensure_output_dir(&settings.output_dir)?;
    match write_compiled_xlsx(&compiled.dataset, &settings.output_dir)? {
        Some(path) => println!(
            "Arquivo compilado salvo em {} ({} linhas)",
            path.display(),
            compiled.dataset.row_count()
        ),
        None => println!("Nenhum arquivo gerado."),
    }
    Ok(())
}

/// Roster that filters compiled rows: `--filter-roster`, else a `--roster`
/// given on this command line. Persisted parameters never supply one.
fn compile_filter_roster(settings: &Settings) -> Result<Option<&PathBuf>> {
    if !settings.authorized_only {
        return Ok(None);
    }
    match settings.filter_roster.as_ref().or(settings.roster.as_ref()) {
        Some(path) => Ok(Some(path)),
        None => bail!(VolumetriaError::Config(
            "Selecione a planilha de usuários para filtrar (--filter-roster).".to_string()
        )),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
