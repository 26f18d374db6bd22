// Configuration loading and parsing (config/gridiron.toml).

use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

use crate::model::UserType;
use crate::reconcile::UpsertPolicy;
use crate::translate::TeamNaming;

/// Built-in defaults, written to `config/gridiron.toml` when it is missing.
pub const DEFAULT_CONFIG: &str = include_str!("../defaults/gridiron.toml");

const CONFIG_FILE: &str = "gridiron.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub import: ImportConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file. Empty means the platform data directory.
    #[serde(default)]
    pub path: String,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl DatabaseConfig {
    /// The database file to open.
    pub fn resolved_path(&self) -> Result<PathBuf, ConfigError> {
        if !self.path.trim().is_empty() {
            return Ok(PathBuf::from(self.path.trim()));
        }
        ProjectDirs::from("", "", "gridiron")
            .map(|dirs| dirs.data_dir().join("gridiron.db"))
            .ok_or_else(|| ConfigError::ValidationError {
                field: "database.path".into(),
                message: "no platform data directory is available; set a path".into(),
            })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    pub date_time_format: String,
    pub venue_marker: String,
    #[serde(default)]
    pub team_names: TeamNaming,
    /// Name of the `actual` user that owns imported games.
    pub user: String,
    #[serde(default = "default_true")]
    pub allow_insert: bool,
    #[serde(default = "default_true")]
    pub allow_update: bool,
}

fn default_true() -> bool {
    true
}

impl ImportConfig {
    pub fn policy(&self) -> UpsertPolicy {
        UpsertPolicy {
            allow_insert: self.allow_insert,
            allow_update: self.allow_update,
        }
    }
}

/// Reference data created by `seed`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedConfig {
    #[serde(default)]
    pub conferences: Vec<String>,
    #[serde(default)]
    pub seasons: Vec<SeedSeason>,
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedSeason {
    pub name: String,
    pub year: i32,
    pub regular_season_weeks: u32,
    #[serde(default)]
    pub playoff_teams: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    pub name: String,
    #[serde(rename = "type")]
    pub user_type: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/gridiron.toml` relative to `base_dir`.
///
/// Does not write defaults; see [`load_config`].
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = std::fs::read_to_string(&path)
        .map_err(|_| ConfigError::FileNotFound { path: path.clone() })?;
    let config: Config =
        toml::from_str(&text).map_err(|e| ConfigError::ParseError { path, source: e })?;
    validate(&config)?;
    Ok(config)
}

/// Write the built-in defaults to `config/gridiron.toml` unless a file is
/// already there. Returns the files written.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let config_dir = base_dir.join("config");
    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let target = config_dir.join(CONFIG_FILE);
    match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&target)
    {
        Ok(mut dest) => {
            std::io::Write::write_all(&mut dest, DEFAULT_CONFIG.as_bytes()).map_err(|e| {
                ConfigError::DefaultsCopyError {
                    message: format!("failed to write {}: {e}", target.display()),
                }
            })?;
            Ok(vec![target])
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(vec![]),
        Err(e) => Err(ConfigError::DefaultsCopyError {
            message: format!("failed to create {}: {e}", target.display()),
        }),
    }
}

/// Ensure defaults exist under `base_dir`, then load.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_files(base_dir)?;
    load_config_from(base_dir)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    let import = &config.import;

    if import.date_time_format.trim().is_empty() {
        return Err(invalid("import.date_time_format", "must not be empty"));
    }
    if StrftimeItems::new(&import.date_time_format).any(|item| matches!(item, Item::Error)) {
        return Err(invalid(
            "import.date_time_format",
            format!("'{}' is not a valid chrono format", import.date_time_format),
        ));
    }
    if import.venue_marker.is_empty() {
        return Err(invalid("import.venue_marker", "must not be empty"));
    }
    if import.user.trim().is_empty() {
        return Err(invalid("import.user", "must not be empty"));
    }

    for (i, conference) in config.seed.conferences.iter().enumerate() {
        if conference.trim().is_empty() {
            return Err(invalid(format!("seed.conferences[{i}]"), "must not be empty"));
        }
    }

    for (i, season) in config.seed.seasons.iter().enumerate() {
        if season.name.trim().is_empty() {
            return Err(invalid(format!("seed.seasons[{i}].name"), "must not be empty"));
        }
        if season.regular_season_weeks == 0 {
            return Err(invalid(
                format!("seed.seasons[{i}].regular_season_weeks"),
                "must be greater than 0",
            ));
        }
    }

    for (i, user) in config.seed.users.iter().enumerate() {
        if user.name.trim().is_empty() {
            return Err(invalid(format!("seed.users[{i}].name"), "must not be empty"));
        }
        if UserType::parse(&user.user_type).is_none() {
            return Err(invalid(
                format!("seed.users[{i}].type"),
                format!(
                    "'{}' is not one of actual, season-long, playoff-pool, bet",
                    user.user_type
                ),
            ));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Fresh scratch directory under the system temp dir.
    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gridiron_config_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Write `config/gridiron.toml` as the defaults with one line replaced.
    fn write_config_with(dir: &Path, from: &str, to: &str) {
        assert!(DEFAULT_CONFIG.contains(from), "defaults do not contain {from:?}");
        fs::create_dir_all(dir.join("config")).unwrap();
        fs::write(
            dir.join("config").join(CONFIG_FILE),
            DEFAULT_CONFIG.replace(from, to),
        )
        .unwrap();
    }

    fn expect_invalid(dir: &Path, expected_field: &str) {
        match load_config_from(dir).unwrap_err() {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, expected_field),
            other => panic!("expected ValidationError, got: {other}"),
        }
    }

    #[test]
    fn defaults_load_and_validate() {
        let dir = scratch("defaults");
        let written = ensure_config_files(&dir).unwrap();
        assert_eq!(written, vec![dir.join("config").join(CONFIG_FILE)]);

        let config = load_config_from(&dir).expect("defaults should load");
        assert_eq!(config.import.date_time_format, "%m/%d/%Y %I:%M%p");
        assert_eq!(config.import.venue_marker, "@");
        assert_eq!(config.import.team_names, TeamNaming::Detect);
        assert_eq!(config.import.user, "actual");
        assert_eq!(config.import.policy(), UpsertPolicy::default());
        assert_eq!(config.database.busy_timeout_ms, 5000);
        assert_eq!(config.seed.conferences, vec!["AFC", "NFC"]);
        assert_eq!(config.seed.seasons[0].year, 2022);
        assert_eq!(config.seed.seasons[0].regular_season_weeks, 18);
        assert_eq!(config.seed.users[0].user_type, "actual");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn ensure_never_overwrites() {
        let dir = scratch("no_overwrite");
        write_config_with(&dir, "venue_marker = \"@\"", "venue_marker = \"at\"");

        let written = ensure_config_files(&dir).unwrap();
        assert!(written.is_empty());
        let config = load_config(&dir).unwrap();
        assert_eq!(config.import.venue_marker, "at");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = scratch("missing");
        assert!(matches!(
            load_config_from(&dir).unwrap_err(),
            ConfigError::FileNotFound { .. }
        ));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn parse_error_names_the_file() {
        let dir = scratch("parse_error");
        write_config_with(&dir, "[import]", "[import\n");
        assert!(matches!(
            load_config_from(&dir).unwrap_err(),
            ConfigError::ParseError { .. }
        ));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn rejects_malformed_date_format() {
        let dir = scratch("bad_format");
        write_config_with(
            &dir,
            "date_time_format = \"%m/%d/%Y %I:%M%p\"",
            "date_time_format = \"%m/%d/%Y %Q\"",
        );
        expect_invalid(&dir, "import.date_time_format");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn rejects_empty_venue_marker() {
        let dir = scratch("empty_marker");
        write_config_with(&dir, "venue_marker = \"@\"", "venue_marker = \"\"");
        expect_invalid(&dir, "import.venue_marker");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn rejects_zero_week_season() {
        let dir = scratch("zero_weeks");
        write_config_with(&dir, "regular_season_weeks = 18", "regular_season_weeks = 0");
        expect_invalid(&dir, "seed.seasons[0].regular_season_weeks");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn rejects_unknown_seed_user_type() {
        let dir = scratch("bad_user_type");
        write_config_with(&dir, "type = \"actual\"", "type = \"bogus\"");
        expect_invalid(&dir, "seed.users[0].type");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn rejects_unknown_team_naming() {
        let dir = scratch("bad_naming");
        write_config_with(&dir, "team_names = \"detect\"", "team_names = \"nickname\"");
        assert!(matches!(
            load_config_from(&dir).unwrap_err(),
            ConfigError::ParseError { .. }
        ));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn explicit_database_path_wins() {
        let db = DatabaseConfig {
            path: " data/test.db ".into(),
            busy_timeout_ms: 100,
        };
        assert_eq!(db.resolved_path().unwrap(), PathBuf::from("data/test.db"));
    }
}
