use async_trait::async_trait;

use super::{Backend, Oracle, Prompt};
use crate::errors::OracleError;

/// Offline oracle that answers every prompt with the same text.
///
/// The default answer affirms every relevance check and carries no JSON, so a run
/// exercises every fallback path deterministically.
#[derive(Debug)]
pub struct FakeOracle {
    model: String,
    fixed_response: Option<String>,
}

impl FakeOracle {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            fixed_response: None,
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.fixed_response = Some(response.into());
        self
    }
}

#[async_trait]
impl Oracle for FakeOracle {
    async fn ask(&self, _prompt: &Prompt) -> Result<String, OracleError> {
        Ok(self
            .fixed_response
            .clone()
            .unwrap_or_else(|| "예".to_string()))
    }

    fn backend(&self) -> Backend {
        Backend::Fake
    }

    fn model(&self) -> &str {
        &self.model
    }
}
