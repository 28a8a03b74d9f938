//! Scripted oracle for pipeline tests: answers by stage and counts calls.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tcgen_core::errors::OracleError;
use tcgen_core::{Backend, Chunk, Oracle, Prompt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Filter,
    Taxonomy,
    Synth,
    Validate,
}

impl Stage {
    const ALL: [Stage; 4] = [Stage::Filter, Stage::Taxonomy, Stage::Synth, Stage::Validate];

    /// Which stage sent `prompt`, recognised by a phrase unique to its template.
    pub fn of(prompt: &Prompt) -> Stage {
        let user = &prompt.user;
        if user.contains("유용합니까") {
            Stage::Filter
        } else if user.contains("분류체계") {
            Stage::Taxonomy
        } else if user.contains("테스트케이스 양식") {
            Stage::Synth
        } else if user.contains("품질을 평가") {
            Stage::Validate
        } else {
            panic!("unrecognised prompt: {}", user)
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

pub fn network_error() -> OracleError {
    OracleError::Network {
        message: "connection refused".to_string(),
    }
}

/// Unscripted stages fail with a network error.
pub struct ScriptedOracle {
    responses: HashMap<Stage, Result<String, OracleError>>,
    calls: [AtomicUsize; 4],
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            calls: Default::default(),
        }
    }

    pub fn always_failing() -> Self {
        Self::new()
    }

    pub fn answer(mut self, stage: Stage, text: impl Into<String>) -> Self {
        self.responses.insert(stage, Ok(text.into()));
        self
    }

    pub fn fail(mut self, stage: Stage, err: OracleError) -> Self {
        self.responses.insert(stage, Err(err));
        self
    }

    pub fn calls(&self, stage: Stage) -> usize {
        self.calls[stage.slot()].load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        Stage::ALL.iter().map(|s| self.calls(*s)).sum()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn ask(&self, prompt: &Prompt) -> Result<String, OracleError> {
        let stage = Stage::of(prompt);
        self.calls[stage.slot()].fetch_add(1, Ordering::SeqCst);
        self.responses
            .get(&stage)
            .cloned()
            .unwrap_or_else(|| Err(network_error()))
    }

    fn backend(&self) -> Backend {
        Backend::Fake
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

pub fn design_chunks(n: usize) -> Vec<Chunk> {
    (0..n)
        .map(|i| Chunk::new(format!("{}번 스킬은 마나 {}를 소모하며 쿨타임은 {}초이다.", i + 1, 10 * (i + 1), i + 3)))
        .collect()
}

pub const TAXONOMY_JSON: &str = r#"{
  "대분류": ["전투", "상점"],
  "중분류": {"전투": ["스킬", "회피"], "상점": ["구매"]},
  "소분류": {"스킬": ["쿨타임", "마나"], "구매": ["잔액 부족"]}
}"#;

pub const TWO_TESTCASES_JSON: &str = r#"다음은 생성된 테스트케이스입니다.
[
  {"대분류": "전투", "중분류": "스킬", "소분류": "쿨타임", "구분": "정상",
   "테스트 내용": "쿨타임 종료 후 스킬 재사용", "테스트 조건": "스킬 1회 사용",
   "기대 결과": "스킬이 다시 발동된다", "비고": ""},
  {"대분류": "전투", "중분류": "스킬", "소분류": "마나", "구분": "예외",
   "테스트 내용": "마나 부족 시 스킬 사용", "테스트 조건": "마나 0",
   "기대 결과": "마나 부족 메시지 표시", "비고": "UI 문구 확인"}
]"#;

pub const SCORE_JSON: &str = r#"{"정확성": 36, "명확성": 18, "중복성": 16, "완전성": 17, "총점": 99}"#;
