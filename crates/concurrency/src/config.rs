//! Validation configuration via `occ.toml`
//!
//! ```toml
//! # "scan" (default) or "indexed"
//! validation = "scan"
//! report_all_conflicts = false
//! ```

use occ_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Conventional config file name.
pub const CONFIG_FILE_NAME: &str = "occ.toml";

/// How a transaction's read set is checked against the commit window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStrategy {
    /// Walk every committed transaction in `(start_tn, finish_tn]`
    #[default]
    Scan,
    /// Look up each read key in the key → newest writer index
    Indexed,
}

impl ValidationStrategy {
    /// Parse a strategy name (`"scan"` or `"indexed"`)
    ///
    /// # Errors
    /// Returns `Error::Config` for any other string.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "scan" => Ok(ValidationStrategy::Scan),
            "indexed" => Ok(ValidationStrategy::Indexed),
            other => Err(Error::Config(format!(
                "Invalid validation strategy '{}'. Expected \"scan\" or \"indexed\".",
                other
            ))),
        }
    }

    /// Lowercase name as written in `occ.toml`
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStrategy::Scan => "scan",
            ValidationStrategy::Indexed => "indexed",
        }
    }
}

/// Database configuration loaded from `occ.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccConfig {
    /// Validation strategy: `"scan"` or `"indexed"`.
    #[serde(default)]
    pub validation: ValidationStrategy,
    /// Collect every conflicting (key, tn) pair instead of stopping at the
    /// first conflicting transaction. The commit decision is unaffected.
    #[serde(default)]
    pub report_all_conflicts: bool,
}

impl OccConfig {
    /// Set the validation strategy
    pub fn with_validation(mut self, validation: ValidationStrategy) -> Self {
        self.validation = validation;
        self
    }

    /// Set whether every conflict is reported
    pub fn with_report_all_conflicts(mut self, report_all: bool) -> Self {
        self.report_all_conflicts = report_all;
        self
    }

    /// Parse a config from TOML text
    ///
    /// # Errors
    /// Returns `Error::Config` if the text is not valid TOML or names an
    /// unknown strategy.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid occ.toml: {}", e)))
    }

    /// Read and parse a config file
    ///
    /// # Errors
    /// Returns `Error::Io` if the file cannot be read and `Error::Config`
    /// if it cannot be parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        debug!(
            target: "occ::config",
            path = %path.display(),
            validation = config.validation.as_str(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Write the commented default config to `path`
    pub fn write_default(path: &Path) -> Result<()> {
        std::fs::write(path, Self::default_toml())?;
        Ok(())
    }

    /// Serialize this config to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::Config(format!("Cannot serialize config: {}", e)))
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# occdb configuration
#
# Validation strategy: "scan" (default) or "indexed"
#   "scan"    = walk every transaction committed during the read phase
#   "indexed" = look up each read key in a key -> newest writer index
validation = "scan"

# Report every conflicting (key, tn) pair on abort instead of stopping at
# the first conflicting transaction. Does not change commit decisions.
report_all_conflicts = false
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = OccConfig::default();
        assert_eq!(config.validation, ValidationStrategy::Scan);
        assert!(!config.report_all_conflicts);
    }

    #[test]
    fn test_default_toml_parses_to_default() {
        let config = OccConfig::from_toml_str(OccConfig::default_toml()).unwrap();
        assert_eq!(config, OccConfig::default());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = OccConfig::from_toml_str("").unwrap();
        assert_eq!(config, OccConfig::default());
    }

    #[test]
    fn test_indexed_strategy() {
        let config =
            OccConfig::from_toml_str("validation = \"indexed\"\nreport_all_conflicts = true\n")
                .unwrap();
        assert_eq!(config.validation, ValidationStrategy::Indexed);
        assert!(config.report_all_conflicts);
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let err = OccConfig::from_toml_str("validation = \"backward\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_parse_strategy_names() {
        assert_eq!(ValidationStrategy::parse("scan").unwrap(), ValidationStrategy::Scan);
        assert_eq!(
            ValidationStrategy::parse("indexed").unwrap(),
            ValidationStrategy::Indexed
        );
        assert!(ValidationStrategy::parse("forward").is_err());
        assert_eq!(ValidationStrategy::Indexed.as_str(), "indexed");
    }

    #[test]
    fn test_write_default_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        OccConfig::write_default(&path).unwrap();
        assert_eq!(OccConfig::load(&path).unwrap(), OccConfig::default());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = OccConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = OccConfig::default()
            .with_validation(ValidationStrategy::Indexed)
            .with_report_all_conflicts(true);
        let text = config.to_toml_string().unwrap();
        assert_eq!(OccConfig::from_toml_str(&text).unwrap(), config);
    }
}
