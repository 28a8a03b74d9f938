use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info_span, Instrument};

use super::{Backend, Oracle, Prompt};
use crate::errors::OracleError;

/// Wraps an oracle in an `oracle.ask` span carrying backend, model, latency and outcome.
/// Prompt text is never recorded; only its length.
pub struct TracingOracle {
    inner: Arc<dyn Oracle>,
}

impl TracingOracle {
    pub fn new(inner: Arc<dyn Oracle>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Oracle for TracingOracle {
    async fn ask(&self, prompt: &Prompt) -> Result<String, OracleError> {
        let span = info_span!(
            "oracle.ask",
            "oracle.backend" = self.inner.backend().as_str(),
            "oracle.model" = self.inner.model(),
            "prompt.chars" = prompt.user.chars().count(),
            "response.chars" = tracing::field::Empty,
            "duration_ms" = tracing::field::Empty,
            "error" = tracing::field::Empty,
            "error.transient" = tracing::field::Empty
        );

        async move {
            let start = std::time::Instant::now();
            let result = self.inner.ask(prompt).await;

            let span = tracing::Span::current();
            span.record("duration_ms", start.elapsed().as_millis() as u64);
            match &result {
                Ok(text) => {
                    span.record("response.chars", text.chars().count());
                }
                Err(e) => {
                    span.record("error", e.to_string().as_str());
                    span.record("error.transient", e.is_transient());
                    tracing::debug!(error = %e, "oracle call failed");
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    fn backend(&self) -> Backend {
        self.inner.backend()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::oracle::FakeOracle;

    #[tokio::test]
    async fn passes_through_response_and_identity() {
        let inner = Arc::new(FakeOracle::new("m").with_response("ok"));
        let oracle = TracingOracle::new(inner);
        assert_eq!(oracle.ask(&Prompt::text("hi")).await.unwrap(), "ok");
        assert_eq!(oracle.backend(), Backend::Fake);
        assert_eq!(oracle.model(), "m");
    }
}
