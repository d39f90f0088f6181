use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Tunables read from `config/analysis.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub gateway: GatewaySettings,
    pub upload: UploadSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    /// Per-call bound on each reference store read.
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    pub max_bytes: usize,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self { timeout_ms: 3000 }
    }
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

impl GatewaySettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl AnalysisSettings {
    /// Reads `path` when given. Otherwise looks for `config/analysis.yaml`
    /// next to the workspace and falls back to defaults if it is absent.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(explicit) => PathBuf::from(explicit),
            None => {
                let candidate = default_settings_path();
                if !candidate.exists() {
                    log::info!(
                        "No analysis config at {}, using defaults",
                        candidate.display()
                    );
                    return Ok(Self::default());
                }
                candidate
            }
        };

        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let settings = Self::from_yaml(&raw)?;
        log::info!("Loaded analysis config from {}", path.display());
        Ok(settings)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        let settings: AnalysisSettings = serde_yaml::from_str(raw)?;
        if settings.gateway.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                name: "gateway.timeout_ms",
                value: "0".to_string(),
            });
        }
        Ok(settings)
    }
}

fn default_settings_path() -> PathBuf {
    match std::env::var("CARGO_MANIFEST_DIR") {
        Ok(manifest_dir) => Path::new(&manifest_dir).join("../config/analysis.yaml"),
        Err(_) => PathBuf::from("config/analysis.yaml"),
    }
}

/// Process-level settings taken from the environment (after `.env`).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub jwt_secret: Option<String>,
    pub reference_table: Option<String>,
    pub history_table: Option<String>,
    pub reference_fixtures: Option<String>,
    pub analysis_config: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = match non_empty("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                name: "PORT",
                value: raw.clone(),
            })?,
            None => 8081,
        };

        Ok(Self {
            port,
            jwt_secret: non_empty("JWT_SECRET"),
            reference_table: non_empty("DYNAMODB_REFERENCE_TABLE"),
            history_table: non_empty("DYNAMODB_HISTORY_TABLE"),
            reference_fixtures: non_empty("REFERENCE_FIXTURES"),
            analysis_config: non_empty("ANALYSIS_CONFIG"),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
