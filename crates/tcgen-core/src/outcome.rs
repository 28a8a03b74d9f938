use std::fmt;

use crate::errors::{MalformedResponse, OracleError};

/// Why a stage substituted a locally computed value.
#[derive(Debug, Clone)]
pub enum FallbackReason {
    Oracle(OracleError),
    Malformed(MalformedResponse),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::Oracle(e) => write!(f, "oracle call failed: {}", e),
            FallbackReason::Malformed(e) => write!(f, "malformed response: {}", e),
        }
    }
}

impl From<OracleError> for FallbackReason {
    fn from(e: OracleError) -> Self {
        FallbackReason::Oracle(e)
    }
}

impl From<MalformedResponse> for FallbackReason {
    fn from(e: MalformedResponse) -> Self {
        FallbackReason::Malformed(e)
    }
}

/// Per-item result of a pipeline stage.
#[derive(Debug, Clone)]
pub enum StageOutcome<T> {
    /// Value derived from the oracle's answer.
    Ok(T),
    /// Value computed locally because the oracle failed or answered unusably.
    Fallback { value: T, reason: FallbackReason },
    /// The stage's policy refuses to guess; the run stops.
    Fatal(OracleError),
}

impl<T> StageOutcome<T> {
    pub fn fallback(value: T, reason: impl Into<FallbackReason>) -> Self {
        StageOutcome::Fallback {
            value,
            reason: reason.into(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, StageOutcome::Fallback { .. })
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            StageOutcome::Ok(v) | StageOutcome::Fallback { value: v, .. } => Some(v),
            StageOutcome::Fatal(_) => None,
        }
    }

    /// The carried value, or the fatal error.
    pub fn into_result(self) -> Result<T, OracleError> {
        match self {
            StageOutcome::Ok(v) | StageOutcome::Fallback { value: v, .. } => Ok(v),
            StageOutcome::Fatal(e) => Err(e),
        }
    }
}
