//! Configuration file loading and parsing.
//!
//! This module handles loading the configuration file from disk and parsing
//! it into validated, type-safe structures.
//!
//! # Configuration File Locations
//!
//! The configuration file is optional and is searched in the following order:
//!
//! 1. Path specified on the command line (must exist)
//! 2. Default location, if present:
//!    - **Linux/macOS:** `~/.car2db-mcp/config.json`
//!    - **Windows:** `%USERPROFILE%\.car2db-mcp\config.json`
//!
//! Without a file the built-in defaults apply. Command-line flags and
//! environment variables override file values (see `main.rs`).
//!
//! # Example Configuration
//!
//! ```json
//! {
//!   "api": { "api_key": "...", "language": "en-US" },
//!   "transport": { "mode": "sse", "sse_port": 3000 },
//!   "logging": { "level": "info" }
//! }
//! ```

mod settings;

pub use settings::{
    ApiConfig, Config, LoggingConfig, TransportConfig, TransportMode, DEFAULT_SSE_PORT,
    DEMO_API_KEY,
};

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Returns the default configuration directory.
///
/// - **Linux/macOS:** `~/.car2db-mcp/`
/// - **Windows:** `%USERPROFILE%\.car2db-mcp\`
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".car2db-mcp"))
}

/// Returns the platform-specific default configuration file path.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join("config.json"))
}

/// Loads the configuration.
///
/// An explicit `path` must exist. Without one, the default location is used
/// when present, otherwise [`Config::default`].
///
/// # Errors
///
/// Returns an error if:
/// - An explicit configuration file cannot be found
/// - The file cannot be read
/// - The JSON is malformed
/// - Fields are unknown or invalid
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => match default_config_path().filter(|p| p.exists()) {
            Some(p) => p,
            None => {
                tracing::debug!("No configuration file, using defaults");
                return Ok(Config::default());
            }
        },
    };

    read_config(&config_path)
}

/// Reads and validates the configuration file at `config_path`.
fn read_config(config_path: &Path) -> Result<Config, ConfigError> {
    if !config_path.exists() {
        return Err(ConfigError::NotFound {
            path: config_path.to_path_buf(),
        });
    }

    let contents = std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
        path: config_path.to_path_buf(),
        source: e,
    })?;

    let config: Config = serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: config_path.to_path_buf(),
        source: e,
    })?;

    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn default_config_path_is_under_home() {
        let path = default_config_path().unwrap();
        assert!(path.ends_with(".car2db-mcp/config.json"));
    }

    #[test]
    fn loads_explicit_file() {
        let file = write_config(r#"{"api": {"language": "fr-FR"}, "transport": {"mode": "sse"}}"#);
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.api.language, "fr-FR");
        assert_eq!(config.transport.mode, TransportMode::Sse);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        let err = load_config(Some(&missing)).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let file = write_config("{ not json");
        let err = load_config(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let file = write_config(r#"{"logging": {"level": "chatty"}}"#);
        let err = load_config(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }
}
