//! Quality validator: one rubric scoring call per draft.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::errors::MalformedResponse;
use crate::extract;
use crate::model::{DraftTestcase, RubricScore, ScoredTestcase};
use crate::outcome::StageOutcome;
use crate::prompts;
use crate::providers::oracle::Oracle;

use super::run_indexed;

const ACCURACY_KEYS: &[&str] = &["정확성", "accuracy"];
const CLARITY_KEYS: &[&str] = &["명확성", "clarity"];
const UNIQUENESS_KEYS: &[&str] = &["중복성", "uniqueness"];
const COMPLETENESS_KEYS: &[&str] = &["완전성", "completeness"];

/// Score every draft; output order follows input order.
pub async fn run(
    oracle: Arc<dyn Oracle>,
    drafts: Vec<DraftTestcase>,
    parallel: usize,
) -> Vec<StageOutcome<ScoredTestcase>> {
    run_indexed(
        drafts,
        parallel,
        move |index, draft: DraftTestcase| {
            let oracle = oracle.clone();
            async move {
                match score(oracle.as_ref(), &draft).await {
                    StageOutcome::Ok(rubric) => {
                        tracing::debug!(stage = "validate", draft = index, total = rubric.total, "scored");
                        StageOutcome::Ok(ScoredTestcase::new(draft, rubric))
                    }
                    StageOutcome::Fallback { value, reason } => {
                        tracing::warn!(
                            stage = "validate",
                            draft = index,
                            reason = %reason,
                            "scoring failed, using default score"
                        );
                        StageOutcome::Fallback {
                            value: ScoredTestcase::new(draft, value),
                            reason,
                        }
                    }
                    StageOutcome::Fatal(e) => StageOutcome::Fatal(e),
                }
            }
        },
        never_halts,
    )
    .await
}

fn never_halts(_: &StageOutcome<ScoredTestcase>) -> bool {
    false
}

/// Rubric for one draft. Never fatal: failures keep [`RubricScore::default`].
pub async fn score(oracle: &dyn Oracle, draft: &DraftTestcase) -> StageOutcome<RubricScore> {
    match oracle.ask(&prompts::quality(draft)).await {
        Ok(answer) => match parse(&answer) {
            Ok(rubric) => StageOutcome::Ok(rubric),
            Err(e) => StageOutcome::fallback(RubricScore::default(), e),
        },
        Err(e) => StageOutcome::fallback(RubricScore::default(), e),
    }
}

/// Parse the rubric components. The oracle's own total is ignored: it is recomputed
/// from the (clamped) components, and a missing component counts as zero.
pub fn parse(answer: &str) -> Result<RubricScore, MalformedResponse> {
    let value = extract::object_lenient(answer)?;
    let Value::Object(obj) = value else {
        return Err(MalformedResponse::UnexpectedShape {
            message: "rubric is not an object".to_string(),
        });
    };
    Ok(RubricScore::new(
        component(&obj, ACCURACY_KEYS)?,
        component(&obj, CLARITY_KEYS)?,
        component(&obj, UNIQUENESS_KEYS)?,
        component(&obj, COMPLETENESS_KEYS)?,
    ))
}

fn component(obj: &Map<String, Value>, keys: &[&str]) -> Result<u32, MalformedResponse> {
    let Some(value) = keys.iter().find_map(|k| obj.get(*k)) else {
        return Ok(0);
    };
    let points = match value {
        Value::Null => Some(0.0),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('점').trim().parse::<f64>().ok(),
        _ => None,
    };
    match points {
        Some(p) if p.is_finite() => Ok(p.round().max(0.0) as u32),
        _ => Err(MalformedResponse::UnexpectedShape {
            message: format!("{} is not a number: {}", keys[0], value),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Grade, TestKind};
    use crate::providers::oracle::FakeOracle;

    fn draft() -> DraftTestcase {
        DraftTestcase {
            major: "UI".into(),
            medium: "메뉴".into(),
            minor: "진입".into(),
            kind: TestKind::Normal,
            description: "메인 메뉴 진입".into(),
            precondition: "로그인 완료".into(),
            expected_result: "메인 메뉴 표시".into(),
            notes: String::new(),
        }
    }

    #[test]
    fn total_is_recomputed_from_components() {
        let rubric =
            parse(r#"{"정확성": 35, "명확성": 18, "중복성": 17, "완전성": 19, "총점": 100}"#).unwrap();
        assert_eq!(rubric.total, 35 + 18 + 17 + 19);
    }

    #[test]
    fn missing_components_count_as_zero() {
        let rubric = parse(r#"평가: {"정확성": 40, "명확성": 20}"#).unwrap();
        assert_eq!(rubric.total, 60);
        assert_eq!(rubric.uniqueness, 0);
    }

    #[test]
    fn numeric_strings_and_floats_are_accepted() {
        let rubric =
            parse(r#"{"accuracy": "32점", "clarity": 17.6, "uniqueness": "15", "completeness": null}"#)
                .unwrap();
        assert_eq!(rubric.accuracy, 32);
        assert_eq!(rubric.clarity, 18);
        assert_eq!(rubric.total, 32 + 18 + 15);
    }

    #[test]
    fn non_numeric_component_is_malformed() {
        assert!(parse(r#"{"정확성": "높음"}"#).is_err());
        assert!(parse("점수를 매길 수 없습니다").is_err());
    }

    #[tokio::test]
    async fn malformed_answer_keeps_default_score() {
        let oracle = FakeOracle::new("m").with_response("좋은 테스트케이스입니다");
        let outcome = score(&oracle, &draft()).await;
        assert!(outcome.is_fallback());
        assert_eq!(outcome.value(), Some(&RubricScore::default()));
    }

    #[tokio::test]
    async fn run_attaches_score_and_grade() {
        let oracle = Arc::new(
            FakeOracle::new("m")
                .with_response(r#"{"정확성": 38, "명확성": 18, "중복성": 18, "완전성": 18, "총점": 70}"#),
        );
        let scored = run(oracle, vec![draft(), draft()], 2).await;
        assert_eq!(scored.len(), 2);
        let first = scored[0].value().unwrap();
        assert_eq!(first.score, 92);
        assert_eq!(first.grade, Grade::Green);
        assert_eq!(first.draft, draft());
    }
}
