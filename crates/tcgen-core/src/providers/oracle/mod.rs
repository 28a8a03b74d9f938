//! Text oracle capability: submit a prompt, receive raw text.
//!
//! Backends never retry. Callers decide between propagating an [`OracleError`] and
//! substituting a local fallback.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::{ConfigError, OracleError};

pub mod fake;
pub mod gemini;
mod http;
pub mod openai;
pub mod tracing;

pub use fake::FakeOracle;
pub use gemini::GeminiOracle;
pub use openai::OpenAiOracle;
pub use self::tracing::TracingOracle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
    /// Deterministic offline backend for development and tests.
    Fake,
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Gemini => "gemini",
            Backend::OpenAi => "openai",
            Backend::Fake => "fake",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Backend::Gemini => "gemini-1.5-flash",
            Backend::OpenAi => "gpt-4-turbo",
            Backend::Fake => "fake",
        }
    }

    /// Environment variable holding this backend's credential.
    pub fn credential_env(self) -> Option<&'static str> {
        match self {
            Backend::Gemini => Some("GEMINI_API_KEY"),
            Backend::OpenAi => Some("OPENAI_API_KEY"),
            Backend::Fake => None,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" | "google-gemini" => Ok(Backend::Gemini),
            "openai" | "gpt" => Ok(Backend::OpenAi),
            "fake" => Ok(Backend::Fake),
            _ => Err(ConfigError::UnknownBackend {
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Text,
    /// Ask the backend for structured JSON output where it supports it.
    Json,
}

/// Backend-neutral prompt. Each backend decides how the system instruction and the
/// format hint are rendered on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: Option<String>,
    pub user: String,
    pub format: ResponseFormat,
}

impl Prompt {
    pub fn text(user: impl Into<String>) -> Self {
        Self {
            system: None,
            user: user.into(),
            format: ResponseFormat::Text,
        }
    }

    pub fn json(user: impl Into<String>) -> Self {
        Self {
            format: ResponseFormat::Json,
            ..Self::text(user)
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

#[async_trait]
pub trait Oracle: Send + Sync {
    async fn ask(&self, prompt: &Prompt) -> Result<String, OracleError>;

    fn backend(&self) -> Backend;

    fn model(&self) -> &str;
}

/// Everything needed to construct an oracle client.
#[derive(Debug, Clone)]
pub struct OracleSettings {
    pub backend: Backend,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub timeout: Duration,
}

impl OracleSettings {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            api_key: None,
            model: None,
            base_url: None,
            temperature: 0.2,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn model_or_default(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.backend.default_model().to_string())
    }

    /// The credential for the selected backend, if present and non-blank.
    pub fn credential(&self) -> Result<String, ConfigError> {
        let key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty());
        match (key, self.backend.credential_env()) {
            (Some(k), _) => Ok(k.to_string()),
            (None, None) => Ok(String::new()),
            (None, Some(env_var)) => Err(ConfigError::MissingCredential {
                backend: self.backend,
                env_var,
            }),
        }
    }
}

/// Build the configured backend. Fails before any network activity when the
/// credential is missing.
pub fn build_oracle(settings: &OracleSettings) -> Result<Arc<dyn Oracle>, ConfigError> {
    let api_key = settings.credential()?;
    let model = settings.model_or_default();
    let oracle: Arc<dyn Oracle> = match settings.backend {
        Backend::Gemini => Arc::new(GeminiOracle::new(
            api_key,
            model,
            settings.base_url.clone(),
            settings.temperature,
            settings.timeout,
        )?),
        Backend::OpenAi => Arc::new(OpenAiOracle::new(
            api_key,
            model,
            settings.base_url.clone(),
            settings.temperature,
            settings.timeout,
        )?),
        Backend::Fake => Arc::new(FakeOracle::new(model)),
    };
    Ok(oracle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_a_config_error() {
        let settings = OracleSettings::new(Backend::Gemini);
        let err = build_oracle(&settings).err().expect("must fail without key");
        assert!(matches!(
            err,
            ConfigError::MissingCredential {
                backend: Backend::Gemini,
                env_var: "GEMINI_API_KEY"
            }
        ));
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let settings = OracleSettings::new(Backend::OpenAi).with_api_key("   ");
        assert!(settings.credential().is_err());
    }

    #[test]
    fn fake_backend_needs_no_key() {
        let oracle = build_oracle(&OracleSettings::new(Backend::Fake)).unwrap();
        assert_eq!(oracle.backend(), Backend::Fake);
    }

    #[test]
    fn backend_parsing() {
        assert_eq!("OpenAI".parse::<Backend>().unwrap(), Backend::OpenAi);
        assert_eq!("google-gemini".parse::<Backend>().unwrap(), Backend::Gemini);
        assert!("claude".parse::<Backend>().is_err());
    }

    #[test]
    fn default_models() {
        let s = OracleSettings::new(Backend::OpenAi);
        assert_eq!(s.model_or_default(), "gpt-4-turbo");
    }
}
