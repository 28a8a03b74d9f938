//! Run configuration: YAML file, environment and explicit overrides.
//!
//! Credentials are deliberately absent from the file format; they come from
//! `--api-key` or the backend's environment variable (`GEMINI_API_KEY`, `OPENAI_API_KEY`).

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::providers::oracle::{Backend, OracleSettings};

/// What the relevance filter does when a single check cannot reach the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FilterFailurePolicy {
    /// Stop the run (unfiltered content is not guessed about).
    #[default]
    Abort,
    /// Discard the chunk and continue.
    Skip,
    /// Keep the chunk and continue.
    Keep,
}

impl FromStr for FilterFailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "skip" | "discard" => Ok(Self::Skip),
            "keep" => Ok(Self::Keep),
            other => Err(ConfigError::InvalidValue {
                field: "on_filter_error".to_string(),
                message: format!("'{}' (expected abort, skip or keep)", other),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TcgenConfig {
    pub backend: Backend,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub batch_size: usize,
    pub min_chunk_chars: usize,
    pub max_chunk_chars: usize,
    pub parallel: usize,
    pub seed: Option<u64>,
    pub on_filter_error: FilterFailurePolicy,
}

impl Default for TcgenConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Gemini,
            model: None,
            base_url: None,
            temperature: 0.2,
            timeout_secs: 60,
            batch_size: 5,
            min_chunk_chars: 10,
            max_chunk_chars: 1000,
            parallel: 1,
            seed: None,
            on_filter_error: FilterFailurePolicy::Abort,
        }
    }
}

impl TcgenConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("batch_size", self.batch_size),
            ("parallel", self.parallel),
            ("max_chunk_chars", self.max_chunk_chars),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    message: "must be at least 1".to_string(),
                });
            }
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeout_secs".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "temperature".to_string(),
                message: format!("{} is outside 0.0..=2.0", self.temperature),
            });
        }
        Ok(())
    }

    /// Oracle settings for this config. `api_key` falls back to the backend's env var.
    pub fn oracle_settings(&self, api_key: Option<String>) -> OracleSettings {
        let api_key = api_key.or_else(|| credential_from_env(self.backend));
        OracleSettings {
            backend: self.backend,
            api_key,
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            temperature: self.temperature,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            batch_size: self.batch_size,
            min_chunk_chars: self.min_chunk_chars,
            parallel: self.parallel,
            seed: self.seed,
            on_filter_error: self.on_filter_error,
        }
    }
}

/// Knobs of the four-stage pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub batch_size: usize,
    pub min_chunk_chars: usize,
    pub parallel: usize,
    pub seed: Option<u64>,
    pub on_filter_error: FilterFailurePolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        TcgenConfig::default().pipeline_settings()
    }
}

/// Non-blank credential from the backend's environment variable.
pub fn credential_from_env(backend: Backend) -> Option<String> {
    let var = backend.credential_env()?;
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

/// Load and validate a YAML config file.
pub fn load_config(path: &Path) -> Result<TcgenConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let cfg = parse_config(&raw).map_err(|e| match e {
        ConfigError::Parse { message, .. } => ConfigError::Parse {
            path: path.display().to_string(),
            message,
        },
        other => other,
    })?;
    tracing::debug!(path = %path.display(), backend = %cfg.backend, "config loaded");
    Ok(cfg)
}

pub fn parse_config(raw: &str) -> Result<TcgenConfig, ConfigError> {
    // an empty file means "all defaults"
    if raw.trim().is_empty() {
        return Ok(TcgenConfig::default());
    }
    let cfg: TcgenConfig = serde_yaml::from_str(raw).map_err(|e| ConfigError::Parse {
        path: "<inline>".to_string(),
        message: e.to_string(),
    })?;
    cfg.validate()?;
    Ok(cfg)
}
