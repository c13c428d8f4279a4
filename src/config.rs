//! Configuration types for bundle-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use utoipa::ToSchema;

/// Main configuration for the bundle engine
///
/// Every field has a sensible default, so `Config::default()` works out of
/// the box. Configuration can also be loaded from a JSON file with
/// [`Config::from_file`]; call [`Config::validate`] before constructing the
/// engine to surface bad values with the offending key.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Maximum number of simultaneously registered jobs (default: 3)
    ///
    /// Admission past this ceiling is refused, not queued.
    #[serde(default = "default_max_jobs")]
    pub max_jobs: usize,

    /// Maximum number of resource locators per job (default: 3)
    ///
    /// Reaching this quota triggers the job's orchestration.
    #[serde(default = "default_max_resources_per_job")]
    pub max_resources_per_job: usize,

    /// Allowed file extensions, dot-prefixed, case-insensitive
    /// (default: [".txt", ".pdf", ".jpeg"])
    ///
    /// A locator whose final path segment does not carry one of these
    /// extensions is rejected before any fetch happens.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,

    /// Per-fetch deadline in seconds (default: 30)
    ///
    /// Applies to each resource fetch independently, covering the whole
    /// transfer including the body. There is no job-level timeout.
    #[serde(default = "default_fetch_timeout", with = "duration_serde")]
    pub fetch_timeout: Duration,

    /// Directory where produced archives are written (default: "./archives")
    #[serde(default = "default_archive_dir")]
    pub archive_dir: PathBuf,

    /// REST API settings
    #[serde(default)]
    pub api: ApiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_jobs: default_max_jobs(),
            max_resources_per_job: default_max_resources_per_job(),
            allowed_extensions: default_allowed_extensions(),
            fetch_timeout: default_fetch_timeout(),
            archive_dir: default_archive_dir(),
            api: ApiConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    ///
    /// Missing fields take their defaults; the result is validated before
    /// being returned.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
            message: format!(
                "failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ),
            key: None,
        })?;

        let config: Config = serde_json::from_str(&contents).map_err(|e| Error::Config {
            message: format!("failed to parse config file: {}", e),
            key: None,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration, naming the offending key on failure
    pub fn validate(&self) -> Result<()> {
        if self.max_jobs == 0 {
            return Err(Error::Config {
                message: "max_jobs must be at least 1".into(),
                key: Some("max_jobs".into()),
            });
        }

        if self.max_resources_per_job == 0 {
            return Err(Error::Config {
                message: "max_resources_per_job must be at least 1".into(),
                key: Some("max_resources_per_job".into()),
            });
        }

        if self.fetch_timeout.is_zero() {
            return Err(Error::Config {
                message: "fetch_timeout must be greater than zero".into(),
                key: Some("fetch_timeout".into()),
            });
        }

        for ext in &self.allowed_extensions {
            if !ext.starts_with('.') || ext.len() < 2 {
                return Err(Error::Config {
                    message: format!("allowed extension '{}' must start with a dot", ext),
                    key: Some("allowed_extensions".into()),
                });
            }
        }

        Ok(())
    }

    /// Whether a file extension (dot-prefixed) is on the allow-list
    ///
    /// Comparison is case-insensitive on both sides.
    pub fn is_allowed_extension(&self, ext: &str) -> bool {
        let ext = ext.to_ascii_lowercase();
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.to_ascii_lowercase() == ext)
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address the API server binds to (default: 127.0.0.1:8080)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Whether to add CORS headers to API responses (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins; "*" or empty allows any origin (default: empty)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: Vec::new(),
        }
    }
}

fn default_max_jobs() -> usize {
    3
}

fn default_max_resources_per_job() -> usize {
    3
}

fn default_allowed_extensions() -> Vec<String> {
    vec![".txt".to_string(), ".pdf".to_string(), ".jpeg".to_string()]
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_archive_dir() -> PathBuf {
    PathBuf::from("./archives")
}

fn default_bind_address() -> SocketAddr {
    // Safe: the literal always parses
    "127.0.0.1:8080".parse().unwrap_or_else(|_| {
        SocketAddr::from(([127, 0, 0, 1], 8080))
    })
}

fn default_true() -> bool {
    true
}

/// Duration serialization as whole seconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_jobs, 3);
        assert_eq!(config.max_resources_per_job, 3);
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
    }

    #[test]
    fn empty_json_object_yields_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_jobs, 3);
        assert_eq!(
            config.allowed_extensions,
            vec![".txt", ".pdf", ".jpeg"]
        );
        assert!(config.api.cors_enabled);
    }

    #[test]
    fn fetch_timeout_round_trips_as_seconds() {
        let mut config = Config::default();
        config.fetch_timeout = Duration::from_secs(7);

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["fetch_timeout"], 7);

        let back: Config = serde_json::from_value(json).unwrap();
        assert_eq!(back.fetch_timeout, Duration::from_secs(7));
    }

    #[test]
    fn zero_max_jobs_fails_validation_with_key() {
        let mut config = Config::default();
        config.max_jobs = 0;

        match config.validate() {
            Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some("max_jobs")),
            other => panic!("expected Config error, got: {:?}", other),
        }
    }

    #[test]
    fn zero_fetch_timeout_fails_validation() {
        let mut config = Config::default();
        config.fetch_timeout = Duration::ZERO;

        match config.validate() {
            Err(Error::Config { key, .. }) => {
                assert_eq!(key.as_deref(), Some("fetch_timeout"))
            }
            other => panic!("expected Config error, got: {:?}", other),
        }
    }

    #[test]
    fn extension_without_dot_fails_validation() {
        let mut config = Config::default();
        config.allowed_extensions = vec!["txt".into()];

        match config.validate() {
            Err(Error::Config { key, .. }) => {
                assert_eq!(key.as_deref(), Some("allowed_extensions"))
            }
            other => panic!("expected Config error, got: {:?}", other),
        }
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        let config = Config::default();
        assert!(config.is_allowed_extension(".txt"));
        assert!(config.is_allowed_extension(".TXT"));
        assert!(!config.is_allowed_extension(".exe"));
    }

    #[test]
    fn from_file_loads_overrides_and_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"max_jobs": 10, "allowed_extensions": [".png"], "fetch_timeout": 5}"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.max_jobs, 10);
        assert_eq!(config.allowed_extensions, vec![".png"]);
        assert_eq!(config.fetch_timeout, Duration::from_secs(5));
        // untouched field keeps its default
        assert_eq!(config.max_resources_per_job, 3);
    }

    #[test]
    fn from_file_missing_file_is_config_error() {
        let result = Config::from_file("/nonexistent/config.json");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn from_file_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"max_jobs": 0}"#).unwrap();

        assert!(matches!(
            Config::from_file(&path),
            Err(Error::Config { .. })
        ));
    }
}
