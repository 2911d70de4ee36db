//! Configuration for the detector, serializable to JSON.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub server: ServerConfig,
}

/// Where the model lives and how it is executed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Candidate artifact locations, first readable one wins. Empty means
    /// the built-in search order (see [`crate::model::default_candidates`]).
    pub candidates: Vec<PathBuf>,

    /// Execution backend.
    pub backend: BackendConfig,

    /// ONNX Runtime intra-op threads (0 = runtime default).
    pub intra_threads: usize,
}

/// Which backend executes the forward pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// In-process ONNX Runtime.
    #[default]
    Onnx,
    /// External runner speaking JSON over stdio.
    Subprocess {
        program: PathBuf,
        #[serde(default)]
        args: Vec<String>,
    },
}

/// HTTP boundary settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Wall-clock ceiling for one analysis request.
    pub request_timeout_secs: u64,

    /// Largest accepted request body.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            request_timeout_secs: 30,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// Load configuration from a JSON file. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// result fails [`validate`](Self::validate).
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if let BackendConfig::Subprocess { program, .. } = &self.model.backend {
            if program.as_os_str().is_empty() {
                return Err(Error::InvalidParameter {
                    name: "model.backend.program".to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
        }

        if self.server.request_timeout_secs == 0 {
            return Err(Error::InvalidParameter {
                name: "server.request_timeout_secs".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.server.max_upload_bytes == 0 {
            return Err(Error::InvalidParameter {
                name: "server.max_upload_bytes".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.model.backend, BackendConfig::Onnx);
        assert!(config.model.candidates.is_empty());
        assert_eq!(config.server.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detector.json");
        fs::write(
            &path,
            r#"{
                "model": {
                    "candidates": ["/srv/models/model.onnx"],
                    "backend": {"kind": "subprocess", "program": "python3", "args": ["runner.py"]}
                },
                "server": {"port": 9000}
            }"#,
        )
        .unwrap();

        let config = Config::load_from_path(&path).unwrap();

        assert_eq!(config.model.candidates, vec![PathBuf::from("/srv/models/model.onnx")]);
        assert_eq!(
            config.model.backend,
            BackendConfig::Subprocess {
                program: PathBuf::from("python3"),
                args: vec!["runner.py".to_string()],
            }
        );
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detector.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            Config::load_from_path(&path),
            Err(Error::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = Config::default();
        config.server.request_timeout_secs = 0;

        assert!(matches!(
            config.validate(),
            Err(Error::InvalidParameter { .. })
        ));
    }
}
