//! Configuration file loading
//!
//! Services read one JSON document whose location comes from `CONFIG_PATH`.
//! Every section is expected to implement `Default`, so an absent file simply
//! yields the built-in defaults.

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

/// File used when `CONFIG_PATH` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to resolve working directory: {0}")]
    WorkingDirectory(#[source] std::io::Error),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Absolute path of the configuration file.
///
/// Relative paths are resolved against the current working directory.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let raw = std::env::var(CONFIG_PATH_ENV)
        .ok()
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let path = PathBuf::from(raw);
    if path.is_absolute() {
        return Ok(path);
    }

    let cwd = std::env::current_dir().map_err(ConfigError::WorkingDirectory)?;
    Ok(cwd.join(path))
}

/// Load a JSON configuration document.
///
/// A missing file is not an error and yields `T::default()`.
pub fn load_json<T>(path: &Path) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Default,
{
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(T::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Non-empty environment variable.
pub fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Sample {
        host: Option<String>,
        port: u16,
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let sample: Sample = load_json(&dir.path().join("absent.json")).unwrap();
        assert_eq!(sample, Sample::default());
    }

    #[test]
    fn test_partial_document() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"port": 9090}}"#).unwrap();

        let sample: Sample = load_json(file.path()).unwrap();
        assert_eq!(sample.port, 9090);
        assert_eq!(sample.host, None);
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ port: ").unwrap();

        let result: Result<Sample, _> = load_json(file.path());
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}
