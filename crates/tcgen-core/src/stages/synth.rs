//! Testcase synthesizer: one oracle call per batch of chunks.
//!
//! A batch whose answer cannot be used gets one generic record per chunk, with
//! categories drawn at random from the taxonomy. Randomness comes from a per-batch
//! `StdRng` so a seeded run is reproducible at any pool width.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::{Map, Value};

use crate::errors::MalformedResponse;
use crate::extract;
use crate::model::{Chunk, DraftTestcase, Taxonomy, TestKind};
use crate::outcome::StageOutcome;
use crate::prompts;
use crate::providers::oracle::Oracle;

use super::run_indexed;

const FALLBACK_PRECONDITION: &str = "기본 게임 환경에서 테스트";
const FALLBACK_EXPECTED: &str = "기획서 내용과 일치하는 결과 확인";
/// Characters of chunk text quoted in a fallback description.
const FALLBACK_EXCERPT: usize = 50;

const MAJOR_KEYS: &[&str] = &["대분류", "major"];
const MEDIUM_KEYS: &[&str] = &["중분류", "medium"];
const MINOR_KEYS: &[&str] = &["소분류", "minor"];
const KIND_KEYS: &[&str] = &["구분", "kind", "type"];
const DESCRIPTION_KEYS: &[&str] = &["테스트 내용", "테스트내용", "description"];
const PRECONDITION_KEYS: &[&str] = &["테스트 조건", "테스트조건", "precondition", "condition"];
const EXPECTED_KEYS: &[&str] = &["기대 결과", "기대결과", "expected_result", "expected"];
const NOTES_KEYS: &[&str] = &["비고", "notes", "note"];

/// Synthesize drafts for `chunks` in batches of `batch_size`. Returns one outcome per
/// batch, in batch order.
pub async fn run(
    oracle: Arc<dyn Oracle>,
    chunks: Vec<Chunk>,
    taxonomy: Arc<Taxonomy>,
    batch_size: usize,
    parallel: usize,
    seed: u64,
) -> Vec<StageOutcome<Vec<DraftTestcase>>> {
    let batches: Vec<Vec<Chunk>> = chunks
        .chunks(batch_size.max(1))
        .map(|b| b.to_vec())
        .collect();

    run_indexed(
        batches,
        parallel,
        move |index, batch: Vec<Chunk>| {
            let oracle = oracle.clone();
            let taxonomy = taxonomy.clone();
            async move {
                let mut rng = batch_rng(seed, index);
                let outcome = synthesize_batch(oracle.as_ref(), &taxonomy, &batch, &mut rng).await;
                match &outcome {
                    StageOutcome::Ok(drafts) => tracing::debug!(
                        stage = "synth",
                        batch = index,
                        drafts = drafts.len(),
                        "batch synthesized"
                    ),
                    StageOutcome::Fallback { value, reason } => tracing::warn!(
                        stage = "synth",
                        batch = index,
                        drafts = value.len(),
                        reason = %reason,
                        "batch fell back to generic testcases"
                    ),
                    StageOutcome::Fatal(_) => {}
                }
                outcome
            }
        },
        never_halts,
    )
    .await
}

fn never_halts(_: &StageOutcome<Vec<DraftTestcase>>) -> bool {
    false
}

pub fn batch_rng(seed: u64, batch_index: usize) -> StdRng {
    StdRng::seed_from_u64(seed.wrapping_add(batch_index as u64))
}

/// One batch. Never fatal.
pub async fn synthesize_batch(
    oracle: &dyn Oracle,
    taxonomy: &Taxonomy,
    batch: &[Chunk],
    rng: &mut StdRng,
) -> StageOutcome<Vec<DraftTestcase>> {
    let answer = match oracle.ask(&prompts::synthesis(taxonomy, batch)).await {
        Ok(answer) => answer,
        Err(e) => return StageOutcome::fallback(fallback_batch(batch, taxonomy, rng), e),
    };
    match parse(&answer) {
        Ok(drafts) => StageOutcome::Ok(drafts),
        Err(e) => StageOutcome::fallback(fallback_batch(batch, taxonomy, rng), e),
    }
}

/// Parse drafts from an answer: first `[...]` span, then the whole body as an array
/// or as an object with a `testcases` array.
///
/// The span only wins when it holds at least one object record, since in an object
/// answer the first array may be some other field. An empty span counts only when the
/// whole body gives nothing better.
pub fn parse(answer: &str) -> Result<Vec<DraftTestcase>, MalformedResponse> {
    let span = extract::array(answer);
    let records = match span {
        Ok(Value::Array(items)) if items.iter().any(Value::is_object) => items,
        span => match extract::whole(answer) {
            Ok(Value::Array(items)) => items,
            Ok(Value::Object(mut obj)) => match obj.remove("testcases") {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(MalformedResponse::UnexpectedShape {
                        message: "object without a testcases array".to_string(),
                    })
                }
            },
            Ok(_) => {
                return Err(MalformedResponse::UnexpectedShape {
                    message: "expected an array of testcases".to_string(),
                })
            }
            Err(_) => match span {
                Ok(Value::Array(items)) if items.is_empty() => items,
                Ok(_) => {
                    return Err(MalformedResponse::UnexpectedShape {
                        message: "array holds no testcase objects".to_string(),
                    })
                }
                // the span error says more than "expected value at line 1"
                Err(span_err) => return Err(span_err),
            },
        },
    };

    Ok(records
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(obj) => Some(draft_from_object(&obj)),
            other => {
                tracing::debug!(stage = "synth", element = %other, "non-object element dropped");
                None
            }
        })
        .collect())
}

fn draft_from_object(obj: &Map<String, Value>) -> DraftTestcase {
    let field = |keys: &[&str]| -> String {
        keys.iter()
            .find_map(|k| obj.get(*k))
            .map(stringify)
            .unwrap_or_default()
    };
    DraftTestcase {
        major: field(MAJOR_KEYS),
        medium: field(MEDIUM_KEYS),
        minor: field(MINOR_KEYS),
        kind: TestKind::parse(&field(KIND_KEYS)).unwrap_or(TestKind::Normal),
        description: field(DESCRIPTION_KEYS),
        precondition: field(PRECONDITION_KEYS),
        expected_result: field(EXPECTED_KEYS),
        notes: field(NOTES_KEYS),
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items.iter().map(stringify).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

/// One generic record per chunk.
pub fn fallback_batch(batch: &[Chunk], taxonomy: &Taxonomy, rng: &mut StdRng) -> Vec<DraftTestcase> {
    batch
        .iter()
        .map(|chunk| fallback_draft(chunk, taxonomy, rng))
        .collect()
}

pub fn fallback_draft(chunk: &Chunk, taxonomy: &Taxonomy, rng: &mut StdRng) -> DraftTestcase {
    let major = taxonomy
        .majors
        .choose(rng)
        .cloned()
        .unwrap_or_else(|| "기타".to_string());
    let medium = pick(&taxonomy.mediums_for(&major), rng);
    let minor = pick(&taxonomy.minors_for(&medium), rng);
    let kind = *TestKind::ALL.choose(rng).unwrap_or(&TestKind::Normal);
    let excerpt: String = chunk.text.chars().take(FALLBACK_EXCERPT).collect();

    DraftTestcase {
        major,
        medium,
        minor,
        kind,
        description: format!("다음 내용 검증: {}...", excerpt),
        precondition: FALLBACK_PRECONDITION.to_string(),
        expected_result: FALLBACK_EXPECTED.to_string(),
        notes: String::new(),
    }
}

// mediums_for/minors_for never return an empty list
fn pick(options: &[String], rng: &mut StdRng) -> String {
    options.choose(rng).cloned().unwrap_or_default()
}
