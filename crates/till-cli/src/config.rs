//! # Runner Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Command line (highest priority)                                    │
//! │     till --seed session.toml                                           │
//! │                                                                         │
//! │  2. Environment Variables                                              │
//! │     TILL_SEED_PATH=./session.json                                      │
//! │     TILL_LOG=debug                                                     │
//! │     TILL_PRINT_JSON=false                                              │
//! │                                                                         │
//! │  3. TOML Config File                                                   │
//! │     --config <path>, else                                              │
//! │     ~/.config/till/till.toml (Linux)                                   │
//! │     ~/Library/Application Support/com.till.till/till.toml (macOS)      │
//! │                                                                         │
//! │  4. Default Values (lowest priority)                                   │
//! │     demo session, filter "info,till_core=debug", JSON output           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # till.toml
//! [seed]
//! path = "./session.toml"
//!
//! [log]
//! filter = "info,till_core=debug"
//!
//! [output]
//! json = true
//! ```
//!
//! `RUST_LOG`, when set, still wins over `[log] filter`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CliError, CliResult};

/// Filter used when neither `RUST_LOG` nor the config names one.
pub const DEFAULT_LOG_FILTER: &str = "info,till_core=debug";

// =============================================================================
// Sections
// =============================================================================

/// Where the catalog and session script come from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedSettings {
    /// Seed file (`.toml` or `.json`). The built-in demo is used when absent.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSettings {
    /// `tracing_subscriber::EnvFilter` directive string.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings {
            filter: default_log_filter(),
        }
    }
}

/// Summary output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Print the final cart as pretty JSON instead of a text table.
    #[serde(default = "default_true")]
    pub json: bool,
}

fn default_true() -> bool {
    true
}

impl Default for OutputSettings {
    fn default() -> Self {
        OutputSettings { json: true }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete runner configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TillConfig {
    #[serde(default)]
    pub seed: SeedSettings,

    #[serde(default)]
    pub log: LogSettings,

    #[serde(default)]
    pub output: OutputSettings,

    /// File the config was read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl TillConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`config_path`, else the platform default)
    /// 3. Environment variables
    ///
    /// An explicit `config_path` that does not exist is an error; a missing
    /// platform default is not.
    pub fn load(config_path: Option<PathBuf>) -> CliResult<Self> {
        let explicit = config_path.is_some();
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                config = Self::from_file(&path)?;
            } else if explicit {
                return Err(CliError::InvalidConfig(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Reads and parses one TOML config file.
    pub fn from_file(path: &Path) -> CliResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&contents)?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> CliResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> CliResult<()> {
        if self.log.filter.trim().is_empty() {
            return Err(CliError::InvalidConfig(
                "log.filter must not be empty".into(),
            ));
        }

        if let Some(ref path) = self.seed.path {
            let supported = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("toml") | Some("json")
            );
            if !supported {
                return Err(CliError::InvalidConfig(format!(
                    "seed.path must name a .toml or .json file, got: {}",
                    path.display()
                )));
            }
        }

        Ok(())
    }

    /// Applies `TILL_*` environment variable overrides.
    fn apply_env_overrides(&mut self) -> CliResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from any `key → value` lookup.
    fn apply_overrides<F>(&mut self, var: F) -> CliResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = var("TILL_SEED_PATH") {
            self.seed.path = Some(PathBuf::from(path));
        }

        if let Some(filter) = var("TILL_LOG") {
            self.log.filter = filter;
        }

        if let Some(json) = var("TILL_PRINT_JSON") {
            self.output.json = parse_bool(&json).ok_or_else(|| {
                CliError::InvalidConfig(format!("TILL_PRINT_JSON must be a boolean, got: {}", json))
            })?;
        }

        Ok(())
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "till", "till")
            .map(|dirs| dirs.config_dir().join("till.toml"))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = TillConfig::default();
        assert_eq!(config.seed.path, None);
        assert_eq!(config.log.filter, DEFAULT_LOG_FILTER);
        assert!(config.output.json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = TillConfig::from_toml_str("[output]\njson = false\n").unwrap();
        assert!(!config.output.json);
        assert_eq!(config.log.filter, DEFAULT_LOG_FILTER);

        let config = TillConfig::from_toml_str("").unwrap();
        assert_eq!(config, TillConfig::default());
    }

    #[test]
    fn test_full_toml() {
        let config = TillConfig::from_toml_str(
            r#"
            [seed]
            path = "session.json"

            [log]
            filter = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.seed.path, Some(PathBuf::from("session.json")));
        assert_eq!(config.log.filter, "debug");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_toml() {
        let err = TillConfig::from_toml_str("[output]\njson = \"maybe\"\n").unwrap_err();
        assert!(matches!(err, CliError::Toml(_)));
    }

    #[test]
    fn test_config_validation() {
        let mut config = TillConfig::default();

        config.log.filter = "  ".to_string();
        assert!(config.validate().is_err());

        config.log.filter = "info".to_string();
        config.seed.path = Some(PathBuf::from("session.yaml"));
        assert!(config.validate().is_err());

        config.seed.path = Some(PathBuf::from("session"));
        assert!(config.validate().is_err());

        config.seed.path = Some(PathBuf::from("./seeds/session.toml"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let vars = env(&[
            ("TILL_SEED_PATH", "env.json"),
            ("TILL_LOG", "warn"),
            ("TILL_PRINT_JSON", "no"),
        ]);
        let mut config = TillConfig::default();
        config.apply_overrides(|k| vars.get(k).cloned()).unwrap();

        assert_eq!(config.seed.path, Some(PathBuf::from("env.json")));
        assert_eq!(config.log.filter, "warn");
        assert!(!config.output.json);
    }

    #[test]
    fn test_env_bad_bool() {
        let vars = env(&[("TILL_PRINT_JSON", "sometimes")]);
        let mut config = TillConfig::default();
        let err = config.apply_overrides(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, CliError::InvalidConfig(_)));
        assert!(config.output.json);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("till-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[log]\nfilter = \"till_core=trace\"\n").unwrap();

        let config = TillConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.log.filter, "till_core=trace");
        assert_eq!(config.source.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let path = std::env::temp_dir().join(format!("till-missing-{}.toml", uuid::Uuid::new_v4()));
        let err = TillConfig::load(Some(path)).unwrap_err();
        assert!(matches!(err, CliError::InvalidConfig(_)));
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" 0 "), Some(false));
        assert_eq!(parse_bool("nah"), None);
    }
}
