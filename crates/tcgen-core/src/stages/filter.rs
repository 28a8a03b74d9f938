//! Relevance filter: keeps chunks the oracle considers useful for test design.

use std::sync::Arc;

use crate::config::{FilterFailurePolicy, PipelineSettings};
use crate::errors::PipelineError;
use crate::model::Chunk;
use crate::outcome::StageOutcome;
use crate::prompts;
use crate::providers::oracle::Oracle;

use super::run_indexed;

/// Kept chunks in input order, plus the counters the run summary needs.
#[derive(Debug, Clone, Default)]
pub struct FilterReport {
    pub kept: Vec<Chunk>,
    /// Chunks dropped without an oracle call because they were too short.
    pub short: usize,
    /// Checks whose oracle call failed and were resolved by the failure policy.
    pub fallbacks: usize,
}

/// Affirmative answer in Korean or English. Anything else counts as "no".
pub fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim().to_lowercase();
    answer.contains('예') || answer.contains("yes")
}

pub fn is_too_short(text: &str, min_chars: usize) -> bool {
    text.trim().chars().count() < min_chars
}

/// One relevance check. Oracle failures are resolved by `policy`.
pub async fn check(
    oracle: &dyn Oracle,
    text: &str,
    policy: FilterFailurePolicy,
) -> StageOutcome<bool> {
    match oracle.ask(&prompts::relevance(text)).await {
        Ok(answer) => StageOutcome::Ok(is_affirmative(&answer)),
        Err(e) => match policy {
            FilterFailurePolicy::Abort => StageOutcome::Fatal(e),
            FilterFailurePolicy::Skip => StageOutcome::fallback(false, e),
            FilterFailurePolicy::Keep => StageOutcome::fallback(true, e),
        },
    }
}

type Checked = (usize, Chunk, StageOutcome<bool>);

fn is_fatal(checked: &Checked) -> bool {
    matches!(checked.2, StageOutcome::Fatal(_))
}

/// Filter `chunks`, preserving order. Fails only under [`FilterFailurePolicy::Abort`].
pub async fn run(
    oracle: Arc<dyn Oracle>,
    chunks: Vec<Chunk>,
    settings: &PipelineSettings,
) -> Result<FilterReport, PipelineError> {
    let mut report = FilterReport::default();
    let mut candidates = Vec::with_capacity(chunks.len());
    for (index, chunk) in chunks.into_iter().enumerate() {
        if is_too_short(&chunk.text, settings.min_chunk_chars) {
            tracing::debug!(stage = "filter", chunk = index, "chunk too short, dropped");
            report.short += 1;
            continue;
        }
        candidates.push((index, chunk));
    }

    let policy = settings.on_filter_error;
    let checked = run_indexed(
        candidates,
        settings.parallel,
        move |_, (index, chunk): (usize, Chunk)| {
            let oracle = oracle.clone();
            async move {
                let outcome = check(oracle.as_ref(), &chunk.text, policy).await;
                (index, chunk, outcome)
            }
        },
        is_fatal,
    )
    .await;

    for (index, chunk, outcome) in checked {
        match outcome {
            StageOutcome::Ok(keep) => {
                tracing::debug!(stage = "filter", chunk = index, keep, "relevance checked");
                if keep {
                    report.kept.push(chunk);
                }
            }
            StageOutcome::Fallback { value: keep, reason } => {
                tracing::warn!(
                    stage = "filter",
                    chunk = index,
                    keep,
                    reason = %reason,
                    "relevance check failed, applying policy"
                );
                report.fallbacks += 1;
                if keep {
                    report.kept.push(chunk);
                }
            }
            StageOutcome::Fatal(source) => {
                return Err(PipelineError::FilterAborted {
                    chunk_index: index,
                    source,
                });
            }
        }
    }

    tracing::info!(
        stage = "filter",
        kept = report.kept.len(),
        short = report.short,
        fallbacks = report.fallbacks,
        "relevance filter done"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::OracleError;
    use crate::providers::oracle::{Backend, FakeOracle, Prompt};
    use async_trait::async_trait;

    struct Failing;

    #[async_trait]
    impl Oracle for Failing {
        async fn ask(&self, _prompt: &Prompt) -> Result<String, OracleError> {
            Err(OracleError::Network {
                message: "connection refused".into(),
            })
        }
        fn backend(&self) -> Backend {
            Backend::Fake
        }
        fn model(&self) -> &str {
            "failing"
        }
    }

    #[test]
    fn affirmative_tokens() {
        assert!(is_affirmative("예"));
        assert!(is_affirmative("  YES, it is useful"));
        assert!(is_affirmative("예, 유용합니다."));
        assert!(!is_affirmative("아니오"));
        assert!(!is_affirmative("No."));
        assert!(!is_affirmative(""));
    }

    #[test]
    fn short_is_measured_in_trimmed_characters() {
        assert!(is_too_short("   짧은 문장   ", 10));
        assert!(!is_too_short("전투 중 스킬 사용 가능", 10));
    }

    #[tokio::test]
    async fn check_applies_policy_on_failure() {
        assert!(matches!(
            check(&Failing, "text", FilterFailurePolicy::Abort).await,
            StageOutcome::Fatal(_)
        ));
        let skip = check(&Failing, "text", FilterFailurePolicy::Skip).await;
        assert!(skip.is_fallback());
        assert_eq!(skip.value(), Some(&false));
        let keep = check(&Failing, "text", FilterFailurePolicy::Keep).await;
        assert_eq!(keep.value(), Some(&true));
    }

    #[tokio::test]
    async fn negative_answers_drop_chunks() {
        let oracle = Arc::new(FakeOracle::new("m").with_response("아니오"));
        let chunks = vec![Chunk::new("전투 시스템은 턴제로 진행된다.")];
        let report = run(oracle, chunks, &PipelineSettings::default())
            .await
            .unwrap();
        assert!(report.kept.is_empty());
        assert_eq!(report.short, 0);
    }

    #[tokio::test]
    async fn abort_reports_the_failing_chunk() {
        let chunks = vec![Chunk::new("짧음"), Chunk::new("인벤토리는 최대 50칸이다.")];
        let err = run(Arc::new(Failing), chunks, &PipelineSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::FilterAborted { chunk_index: 1, .. }
        ));
    }
}
