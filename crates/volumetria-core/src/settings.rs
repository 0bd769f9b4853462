use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Sentinel filter value selecting every authorized user.
pub const ALL_FILTER: &str = "TODOS";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Volumetry reports and spreadsheet compilation for authorized users
#[derive(Parser, Debug, Clone)]
#[command(
    name = "volumetria",
    about = "Volumetry reports and spreadsheet compilation for authorized users",
    version
)]
pub struct Settings {
    /// Action to run
    #[arg(long, default_value = "report", value_parser = ["report", "compile", "filters"])]
    pub action: String,

    /// Roster spreadsheet (USUARIO, optional LIDERANCA)
    #[arg(long)]
    pub roster: Option<PathBuf>,

    /// Volumetry spreadsheet (USUARIO, IDREGISTROCONTROLADO, ...)
    #[arg(long)]
    pub volumetry: Option<PathBuf>,

    /// Leadership or user to report on; repeat for several reports
    #[arg(long = "filter")]
    pub filters: Vec<String>,

    /// First spreadsheet to compile
    #[arg(long)]
    pub file1: Option<PathBuf>,

    /// Second spreadsheet to compile
    #[arg(long)]
    pub file2: Option<PathBuf>,

    /// Keep only rows of authorized users when compiling
    #[arg(long)]
    pub authorized_only: bool,

    /// Roster used to filter the compiled rows
    #[arg(long)]
    pub filter_roster: Option<PathBuf>,

    /// Report output format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Directory where reports and compiled workbooks are written
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.volumetria/last_used.json`.
///
/// Only output preferences are kept. Input spreadsheets, the roster included,
/// must be named on every run.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".volumetria").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation – accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!(error = %e, "could not clear saved configuration");
            }
            return Self::apply_debug(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins over persisted values.
        if !is_arg_explicitly_set(&matches, "output_dir") {
            if let Some(v) = last.output_dir {
                settings.output_dir = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "format") {
            if let Some(v) = last.format {
                settings.format = v;
            }
        }

        settings = Self::apply_debug(settings);

        let params = LastUsedParams::from(&settings);
        if let Err(e) = params.save_to(config_path) {
            tracing::debug!(error = %e, "could not persist last-used parameters");
        }

        settings
    }

    /// Filters to run, defaulting to a single [`ALL_FILTER`] report.
    pub fn effective_filters(&self) -> Vec<String> {
        if self.filters.is_empty() {
            vec![ALL_FILTER.to_string()]
        } else {
            self.filters.clone()
        }
    }

    /// `--debug` overrides the log level.
    fn apply_debug(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            output_dir: Some(s.output_dir.clone()),
            format: Some(s.format.clone()),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tmp_config_path(tmp: &TempDir) -> PathBuf {
        LastUsedParams::config_path_in(tmp.path())
    }

    // ── LastUsedParams ───────────────────────────────────────────────────────

    #[test]
    fn test_last_used_params_save_load() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        let params = LastUsedParams {
            output_dir: Some(PathBuf::from("/data/out")),
            format: Some("json".to_string()),
        };
        params.save_to(&path).expect("save");

        let loaded = LastUsedParams::load_from(&path);
        assert_eq!(loaded.output_dir, Some(PathBuf::from("/data/out")));
        assert_eq!(loaded.format, Some("json".to_string()));
    }

    #[test]
    fn test_last_used_params_clear() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        LastUsedParams::default().save_to(&path).expect("save");
        assert!(path.exists());

        LastUsedParams::clear_at(&path).expect("clear");
        assert!(!path.exists());
    }

    #[test]
    fn test_last_used_params_default_when_missing_or_corrupt() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        assert!(LastUsedParams::load_from(&path).output_dir.is_none());

        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();
        assert!(LastUsedParams::load_from(&path).format.is_none());
    }

    // ── Settings parsing ─────────────────────────────────────────────────────

    #[test]
    fn test_settings_default_values() {
        let settings = Settings::parse_from(["volumetria"]);

        assert_eq!(settings.action, "report");
        assert!(settings.roster.is_none());
        assert!(settings.volumetry.is_none());
        assert!(settings.filters.is_empty());
        assert!(!settings.authorized_only);
        assert_eq!(settings.format, "text");
        assert_eq!(settings.output_dir, PathBuf::from("."));
        assert_eq!(settings.log_level, "INFO");
        assert!(!settings.debug);
        assert!(!settings.clear);
    }

    #[test]
    fn test_settings_repeated_filters() {
        let settings = Settings::parse_from([
            "volumetria",
            "--filter",
            "Team1",
            "--filter",
            "Team2",
        ]);
        assert_eq!(settings.filters, vec!["Team1", "Team2"]);
        assert_eq!(settings.effective_filters(), vec!["Team1", "Team2"]);
    }

    #[test]
    fn test_effective_filters_defaults_to_all() {
        let settings = Settings::parse_from(["volumetria"]);
        assert_eq!(settings.effective_filters(), vec![ALL_FILTER.to_string()]);
    }

    #[test]
    fn test_settings_compile_flags() {
        let settings = Settings::parse_from([
            "volumetria",
            "--action",
            "compile",
            "--file1",
            "a.xlsx",
            "--file2",
            "b.ods",
            "--authorized-only",
            "--filter-roster",
            "u.xls",
        ]);
        assert_eq!(settings.action, "compile");
        assert_eq!(settings.file1, Some(PathBuf::from("a.xlsx")));
        assert_eq!(settings.file2, Some(PathBuf::from("b.ods")));
        assert!(settings.authorized_only);
        assert_eq!(settings.filter_roster, Some(PathBuf::from("u.xls")));
    }

    // ── load_with_last_used ──────────────────────────────────────────────────

    #[test]
    fn test_load_with_last_used_merges_persisted_output_dir() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams {
            output_dir: Some(PathBuf::from("/saved/out")),
            ..Default::default()
        }
        .save_to(&config_path)
        .expect("save");

        let settings = Settings::load_with_last_used_impl(vec!["volumetria".into()], &config_path);
        assert_eq!(settings.output_dir, PathBuf::from("/saved/out"));
    }

    #[test]
    fn test_load_with_last_used_never_restores_roster() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        // A file written before the roster stopped being persisted.
        std::fs::create_dir_all(config_path.parent().unwrap()).unwrap();
        std::fs::write(
            &config_path,
            r#"{"roster": "/saved/usuarios.xlsx", "format": "json"}"#,
        )
        .unwrap();

        let settings = Settings::load_with_last_used_impl(
            vec![
                "volumetria".into(),
                "--action".into(),
                "compile".into(),
                "--authorized-only".into(),
            ],
            &config_path,
        );

        assert!(settings.roster.is_none());
        assert!(settings.filter_roster.is_none());
        assert_eq!(settings.format, "json");
    }

    #[test]
    fn test_load_with_last_used_cli_overrides_persisted() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams {
            format: Some("json".to_string()),
            ..Default::default()
        }
        .save_to(&config_path)
        .expect("save");

        let settings = Settings::load_with_last_used_impl(
            vec!["volumetria".into(), "--format".into(), "text".into()],
            &config_path,
        );
        assert_eq!(settings.format, "text");
    }

    #[test]
    fn test_load_with_last_used_clear_removes_file() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams::default().save_to(&config_path).expect("save");

        Settings::load_with_last_used_impl(
            vec!["volumetria".into(), "--clear".into()],
            &config_path,
        );

        assert!(!config_path.exists(), "file must be gone after --clear");
    }

    #[test]
    fn test_load_with_last_used_debug_overrides_log_level() {
        let tmp = TempDir::new().expect("tempdir");
        let settings = Settings::load_with_last_used_impl(
            vec!["volumetria".into(), "--debug".into()],
            &tmp_config_path(&tmp),
        );
        assert_eq!(settings.log_level, "DEBUG");
    }

    #[test]
    fn test_load_with_last_used_persists_after_run() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        Settings::load_with_last_used_impl(
            vec![
                "volumetria".into(),
                "--roster".into(),
                "/x/usuarios.ods".into(),
            ],
            &config_path,
        );

        let loaded = LastUsedParams::load_from(&config_path);
        assert_eq!(loaded.format, Some("text".to_string()));
        assert_eq!(loaded.output_dir, Some(PathBuf::from(".")));
        let saved = std::fs::read_to_string(&config_path).unwrap();
        assert!(!saved.contains("usuarios.ods"), "roster must not persist: {}", saved);
    }
}
