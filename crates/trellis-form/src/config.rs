//! Form runtime configuration
//!
//! Defaults cover every field, so an empty TOML document is a valid
//! configuration. Environment variables override file values.

use crate::error::{FormError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding [`FormConfig::default_debounce_ms`].
pub const ENV_DEFAULT_DEBOUNCE_MS: &str = "TRELLIS_DEFAULT_DEBOUNCE_MS";
/// Environment variable overriding [`FormConfig::unexpected_error_message`].
pub const ENV_UNEXPECTED_ERROR_MESSAGE: &str = "TRELLIS_UNEXPECTED_ERROR_MESSAGE";

/// Runtime settings shared by every validator attached to a form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    /// Debounce applied to asynchronous validators that do not set their own
    pub default_debounce_ms: u64,
    /// Error reported in place of a validator fault
    pub unexpected_error_message: String,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            default_debounce_ms: 200,
            unexpected_error_message: "Unexpected error".to_owned(),
        }
    }
}

impl FormConfig {
    /// Parse a TOML document and validate it.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| FormError::config(format!("Invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file and validate it.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FormError::config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Apply overrides from the process environment.
    pub fn merge_with_env(&mut self) -> Result<()> {
        self.merge_from_vars(std::env::vars())
    }

    /// Apply overrides from `(name, value)` pairs.
    ///
    /// Unknown names are ignored.
    pub fn merge_from_vars<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in vars {
            match key.as_ref() {
                ENV_DEFAULT_DEBOUNCE_MS => {
                    let value = value.into();
                    self.default_debounce_ms = value.trim().parse().map_err(|e| {
                        FormError::config(format!("{ENV_DEFAULT_DEBOUNCE_MS}={value}: {e}"))
                    })?;
                }
                ENV_UNEXPECTED_ERROR_MESSAGE => self.unexpected_error_message = value.into(),
                _ => {}
            }
        }
        self.validate()
    }

    /// Check the configuration for values the runtime cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.unexpected_error_message.trim().is_empty() {
            return Err(FormError::config(
                "unexpected_error_message must not be empty",
            ));
        }
        Ok(())
    }

    /// [`FormConfig::default_debounce_ms`] as a duration.
    pub fn default_debounce(&self) -> Duration {
        Duration::from_millis(self.default_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_defaults() {
        let config = FormConfig::default();
        assert_eq!(config.default_debounce(), Duration::from_millis(200));
        assert_eq!(config.unexpected_error_message, "Unexpected error");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = FormConfig::from_toml_str("default_debounce_ms = 50").unwrap();
        assert_eq!(config.default_debounce_ms, 50);
        assert_eq!(config.unexpected_error_message, "Unexpected error");

        assert_eq!(FormConfig::from_toml_str("").unwrap(), FormConfig::default());
    }

    #[test]
    fn test_invalid_toml() {
        assert_matches!(
            FormConfig::from_toml_str("default_debounce_ms = \"soon\""),
            Err(FormError::Config { .. })
        );
        assert_matches!(
            FormConfig::from_toml_str("unexpected_error_message = \"  \""),
            Err(FormError::Config { .. })
        );
    }

    #[test]
    fn test_merge_from_vars() {
        let mut config = FormConfig::default();
        config
            .merge_from_vars([
                (ENV_DEFAULT_DEBOUNCE_MS, "10"),
                (ENV_UNEXPECTED_ERROR_MESSAGE, "Something went wrong"),
                ("UNRELATED", "x"),
            ])
            .unwrap();

        assert_eq!(config.default_debounce_ms, 10);
        assert_eq!(config.unexpected_error_message, "Something went wrong");
    }

    #[test]
    fn test_merge_rejects_bad_number() {
        let mut config = FormConfig::default();
        assert_matches!(
            config.merge_from_vars([(ENV_DEFAULT_DEBOUNCE_MS, "-1")]),
            Err(FormError::Config { .. })
        );
    }

    #[test]
    fn test_load_missing_file() {
        let path = Path::new("/nonexistent/trellis.toml");
        assert_matches!(FormConfig::load_from_file(path), Err(FormError::Config { .. }));
    }
}
