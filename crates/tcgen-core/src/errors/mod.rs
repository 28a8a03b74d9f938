//! Error types for the pipeline.
//!
//! `ConfigError` and `IngestError` stop a run before any oracle call. `OracleError` is
//! recovered locally by every stage except the relevance filter under
//! [`FilterFailurePolicy::Abort`](crate::config::FilterFailurePolicy). `MalformedResponse`
//! never leaves a stage; it becomes the reason attached to a fallback value.

use std::time::Duration;

use crate::providers::oracle::Backend;

/// Configuration and credential errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No usable credential for the selected backend.
    #[error("missing API key for {backend} (set {env_var} or pass --api-key)")]
    MissingCredential {
        backend: Backend,
        env_var: &'static str,
    },

    #[error("unknown backend '{value}' (expected gemini or openai)")]
    UnknownBackend { value: String },

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("failed to read config {path}: {message}")]
    Read { path: String, message: String },

    #[error("failed to parse config {path}: {message}")]
    Parse { path: String, message: String },
}

/// A single oracle call failed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OracleError {
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("rate limited: retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("request timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("network error: {message}")]
    Network { message: String },

    #[error("server error (status {status}): {message}")]
    Server { status: u16, message: String },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The backend refused to answer (safety filter, empty candidate list).
    #[error("response blocked: {reason}")]
    Blocked { reason: String },

    #[error("invalid response: {message}")]
    InvalidResponse { message: String },
}

impl OracleError {
    /// Whether a later attempt could succeed. Informational only: nothing retries.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Timeout { .. } | Self::Network { .. } | Self::Server { .. }
        )
    }
}

/// The oracle answered but the answer could not be turned into the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedResponse {
    #[error("no JSON {expected} found in response")]
    NoJsonSpan { expected: &'static str },

    #[error("invalid JSON: {message}")]
    InvalidJson { message: String },

    #[error("unexpected shape: {message}")]
    UnexpectedShape { message: String },
}

/// Document loading failures.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("unsupported document format '{extension}' (expected .pdf, .docx, .doc, .txt or .md)")]
    UnsupportedFormat { extension: String },

    #[error("cannot read {path}: {message}")]
    Read { path: String, message: String },

    #[error("cannot extract text from {path}: {message}")]
    Extract { path: String, message: String },
}

/// Spreadsheet / report writing failures.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("cannot write {path}: {message}")]
    Write { path: String, message: String },
}

/// Hard stops surfaced by the pipeline driver.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("relevance check failed for chunk {chunk_index}: {source}")]
    FilterAborted {
        chunk_index: usize,
        #[source]
        source: OracleError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(OracleError::RateLimited { retry_after: None }.is_transient());
        assert!(OracleError::Server {
            status: 503,
            message: String::new()
        }
        .is_transient());
        assert!(!OracleError::Unauthorized {
            message: "bad key".into()
        }
        .is_transient());
        assert!(!OracleError::Blocked {
            reason: "SAFETY".into()
        }
        .is_transient());
    }

    #[test]
    fn missing_credential_names_env_var() {
        let err = ConfigError::MissingCredential {
            backend: Backend::OpenAi,
            env_var: "OPENAI_API_KEY",
        };
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
