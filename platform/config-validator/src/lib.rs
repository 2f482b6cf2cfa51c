//! Shared environment-variable config reader.
//!
//! Every service builds its `Config` from `std::env` once at startup.
//! Reporting "DATABASE_URL is missing" and stopping there, only to
//! discover "RABBITMQ_HOST is missing" on the next run, is annoying —
//! so [`EnvReader`] accumulates every missing/unparseable variable and
//! [`EnvReader::finish`] reports them all at once.

use std::env;
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(String),

    #[error("invalid value for environment variable {key}: {message}")]
    Invalid { key: String, message: String },

    #[error("{} configuration error(s): {}", .0.len(), join_errors(.0))]
    Multiple(Vec<ConfigError>),
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Collects config errors across several reads so a misconfigured
/// service reports every problem in one shot instead of one per restart.
#[derive(Debug, Default)]
pub struct EnvReader {
    errors: Vec<ConfigError>,
}

impl EnvReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a required string variable. Returns `None` and records an
    /// error if absent; callers should still call [`Self::finish`]
    /// before unwrapping any `None` it returned.
    pub fn require(&mut self, key: &str) -> Option<String> {
        match env::var(key) {
            Ok(value) => Some(value),
            Err(_) => {
                self.errors.push(ConfigError::Missing(key.to_string()));
                None
            }
        }
    }

    /// Read an optional string variable, falling back to `default` when unset.
    pub fn optional(&mut self, key: &str, default: impl Into<String>) -> String {
        env::var(key).unwrap_or_else(|_| default.into())
    }

    /// Read and parse a required variable.
    pub fn require_parsed<T>(&mut self, key: &str) -> Option<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self.require(key)?;
        match raw.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                self.errors.push(ConfigError::Invalid {
                    key: key.to_string(),
                    message: e.to_string(),
                });
                None
            }
        }
    }

    /// Read and parse an optional variable, falling back to `default`
    /// when unset. An unparseable value is still recorded as an error
    /// rather than silently falling back — a typo'd port number should
    /// fail startup, not silently bind the wrong port.
    pub fn optional_parsed<T>(&mut self, key: &str, default: T) -> T
    where
        T: FromStr,
        T::Err: Display,
    {
        match env::var(key) {
            Err(_) => default,
            Ok(raw) => match raw.parse() {
                Ok(value) => value,
                Err(e) => {
                    self.errors.push(ConfigError::Invalid {
                        key: key.to_string(),
                        message: e.to_string(),
                    });
                    default
                }
            },
        }
    }

    /// Resolve all accumulated errors. `Ok(())` means every prior
    /// `require*` call returned `Some`/a parsed value, safe to unwrap.
    pub fn finish(self) -> Result<(), ConfigError> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.into_iter().next().unwrap()),
            _ => Err(ConfigError::Multiple(self.errors)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_returns_value_when_set() {
        env::set_var("CONFIG_VALIDATOR_TEST_A", "hello");
        let mut reader = EnvReader::new();
        let value = reader.require("CONFIG_VALIDATOR_TEST_A");
        assert_eq!(value, Some("hello".to_string()));
        assert_eq!(reader.finish(), Ok(()));
        env::remove_var("CONFIG_VALIDATOR_TEST_A");
    }

    #[test]
    fn require_records_error_when_missing() {
        env::remove_var("CONFIG_VALIDATOR_TEST_B");
        let mut reader = EnvReader::new();
        let value = reader.require("CONFIG_VALIDATOR_TEST_B");
        assert_eq!(value, None);
        assert_eq!(
            reader.finish(),
            Err(ConfigError::Missing("CONFIG_VALIDATOR_TEST_B".to_string()))
        );
    }

    #[test]
    fn optional_falls_back_to_default() {
        env::remove_var("CONFIG_VALIDATOR_TEST_C");
        let mut reader = EnvReader::new();
        assert_eq!(reader.optional("CONFIG_VALIDATOR_TEST_C", "fallback"), "fallback");
    }

    #[test]
    fn optional_parsed_falls_back_on_missing() {
        env::remove_var("CONFIG_VALIDATOR_TEST_D");
        let mut reader = EnvReader::new();
        let port: u16 = reader.optional_parsed("CONFIG_VALIDATOR_TEST_D", 8080);
        assert_eq!(port, 8080);
        assert_eq!(reader.finish(), Ok(()));
    }

    #[test]
    fn optional_parsed_records_error_on_unparseable_value() {
        env::set_var("CONFIG_VALIDATOR_TEST_E", "not-a-number");
        let mut reader = EnvReader::new();
        let port: u16 = reader.optional_parsed("CONFIG_VALIDATOR_TEST_E", 8080);
        assert_eq!(port, 8080);
        assert!(matches!(reader.finish(), Err(ConfigError::Invalid { .. })));
        env::remove_var("CONFIG_VALIDATOR_TEST_E");
    }

    #[test]
    fn finish_reports_multiple_errors_together() {
        env::remove_var("CONFIG_VALIDATOR_TEST_F");
        env::remove_var("CONFIG_VALIDATOR_TEST_G");
        let mut reader = EnvReader::new();
        reader.require("CONFIG_VALIDATOR_TEST_F");
        reader.require("CONFIG_VALIDATOR_TEST_G");
        assert!(matches!(reader.finish(), Err(ConfigError::Multiple(errors)) if errors.len() == 2));
    }
}
