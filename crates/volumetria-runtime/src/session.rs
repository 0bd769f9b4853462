//! Session context for the report and compile flows.
//!
//! A [`Session`] owns the most recently loaded roster and runs actions
//! against it. Every action either completes or fails on its own; a failure
//! never replaces or clears state left by an earlier success.

use std::path::Path;

use volumetria_core::error::{Result, VolumetriaError};
use volumetria_data::aggregator::Selection;
use volumetria_data::compiler::{compile, CompiledDataset};
use volumetria_data::loader;
use volumetria_data::report::{run_report, VolumetryReport};
use volumetria_data::roster::{normalize_roster, RosterModel};

// ── InputFile ─────────────────────────────────────────────────────────────────

/// Uploaded bytes plus the filename used for format dispatch and messages.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file fully into memory.
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|source| VolumetriaError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }

    fn load(&self) -> Result<volumetria_core::TabularDataset> {
        loader::load(&self.bytes, Some(&self.name))
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

/// Session-scoped state: the last successfully loaded roster.
///
/// # Example
/// ```no_run
/// use std::path::Path;
/// use volumetria_runtime::session::{InputFile, Session};
///
/// let mut session = Session::new();
/// session.load_roster(&InputFile::read(Path::new("usuarios.xlsx"))?)?;
/// let report = session.report(&InputFile::read(Path::new("volumetria.xlsx"))?, "TODOS")?;
/// println!("total: {}", report.result.grand_total);
/// # Ok::<(), volumetria_core::VolumetriaError>(())
/// ```
#[derive(Debug, Default)]
pub struct Session {
    roster: Option<RosterModel>,
    /// Human-readable description of the last failed action.
    last_error: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Load and normalize a roster, replacing the current one on success.
    pub fn load_roster(&mut self, file: &InputFile) -> Result<&RosterModel> {
        let loaded = file.load().and_then(|ds| normalize_roster(&ds));
        let roster = self.record(loaded)?;

        tracing::info!(
            file = %file.name,
            authorized = roster.authorized.len(),
            groups = roster.groups.len(),
            "roster loaded"
        );
        Ok(self.roster.insert(roster))
    }

    pub fn roster(&self) -> Option<&RosterModel> {
        self.roster.as_ref()
    }

    /// Human-readable description of the last failed action, or `None`.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Selector entries for the current roster.
    pub fn filter_options(&self) -> Result<Vec<String>> {
        Ok(self.require_roster()?.filter_options())
    }

    /// Run the report flow for `volumetry` and selector text `filter`.
    pub fn report(&mut self, volumetry: &InputFile, filter: &str) -> Result<VolumetryReport> {
        let outcome = self.run_report_inner(volumetry, filter);
        self.record(outcome)
    }

    /// Run the compile flow.
    ///
    /// `authorized_roster` is independent of the session roster: when given it
    /// is loaded and normalized for this call only, and its authorized set
    /// restricts the merged rows.
    pub fn compile(
        &mut self,
        first: &InputFile,
        second: &InputFile,
        authorized_roster: Option<&InputFile>,
    ) -> Result<CompiledDataset> {
        let outcome = Self::compile_inner(first, second, authorized_roster);
        self.record(outcome)
    }

    // ── Private helpers ───────────────────────────────────────────────────

    fn require_roster(&self) -> Result<&RosterModel> {
        self.roster.as_ref().ok_or(VolumetriaError::NoRoster)
    }

    fn run_report_inner(&self, volumetry: &InputFile, filter: &str) -> Result<VolumetryReport> {
        let roster = self.require_roster()?;
        let selection = Selection::parse(filter, roster.has_grouping);
        let dataset = volumetry.load()?;
        run_report(roster, dataset, &selection)
    }

    fn compile_inner(
        first: &InputFile,
        second: &InputFile,
        authorized_roster: Option<&InputFile>,
    ) -> Result<CompiledDataset> {
        let first_ds = first.load()?;
        let second_ds = second.load()?;
        let authorized = match authorized_roster {
            Some(file) => Some(normalize_roster(&file.load()?)?.authorized),
            None => None,
        };
        let compiled = compile(&first_ds, &second_ds, authorized.as_ref())?;
        tracing::info!(
            rows = compiled.dataset.row_count(),
            columns = compiled.dataset.columns().len(),
            filtered = authorized.is_some(),
            "compile finished"
        );
        Ok(compiled)
    }

    /// Remember the error of a failed action; successes clear it.
    fn record<T>(&mut self, outcome: Result<T>) -> Result<T> {
        match &outcome {
            Ok(_) => self.last_error = None,
            Err(e) => {
                tracing::warn!(error = %e, "action failed");
                self.last_error = Some(e.to_string());
            }
        }
        outcome
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
