use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fallback medium when a major has no entry in the taxonomy.
pub const DEFAULT_MEDIUM: &str = "일반";
/// Fallback minor when a medium has no entry in the taxonomy.
pub const DEFAULT_MINOR: &str = "기본";

pub type Metadata = BTreeMap<String, serde_json::Value>;

/// A bounded span of document text plus the metadata of the page it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Chunk {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Three-level category hierarchy.
///
/// Keys of `mediums`/`minors` are not guaranteed to appear one level up; lookups go
/// through [`Taxonomy::mediums_for`] and [`Taxonomy::minors_for`], which fall back to
/// [`DEFAULT_MEDIUM`]/[`DEFAULT_MINOR`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    #[serde(rename = "대분류", alias = "majors")]
    pub majors: Vec<String>,
    #[serde(rename = "중분류", alias = "mediums", default)]
    pub mediums: IndexMap<String, Vec<String>>,
    #[serde(rename = "소분류", alias = "minors", default)]
    pub minors: IndexMap<String, Vec<String>>,
}

impl Taxonomy {
    /// Hardcoded taxonomy used whenever inference fails.
    pub fn default_hierarchy() -> Self {
        fn list(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        let mut mediums = IndexMap::new();
        mediums.insert("시스템".to_string(), list(&["로그인", "설정", "계정"]));
        mediums.insert("게임플레이".to_string(), list(&["전투", "퀘스트", "캐릭터"]));
        mediums.insert("UI".to_string(), list(&["메뉴", "HUD", "인벤토리"]));
        mediums.insert("기타".to_string(), list(&["성능", "호환성"]));

        let mut minors = IndexMap::new();
        minors.insert("로그인".to_string(), list(&["성공", "실패", "오류"]));
        minors.insert("전투".to_string(), list(&["공격", "방어", "스킬"]));
        minors.insert("메뉴".to_string(), list(&["진입", "이동", "종료"]));
        minors.insert("성능".to_string(), list(&["로딩", "프레임레이트"]));

        Self {
            majors: list(&["시스템", "게임플레이", "UI", "기타"]),
            mediums,
            minors,
        }
    }

    /// Mediums listed under `major`, or the single default medium.
    pub fn mediums_for(&self, major: &str) -> Vec<String> {
        match self.mediums.get(major) {
            Some(items) if !items.is_empty() => items.clone(),
            _ => vec![DEFAULT_MEDIUM.to_string()],
        }
    }

    /// Minors listed under `medium`, or the single default minor.
    pub fn minors_for(&self, medium: &str) -> Vec<String> {
        match self.minors.get(medium) {
            Some(items) if !items.is_empty() => items.clone(),
            _ => vec![DEFAULT_MINOR.to_string()],
        }
    }
}

/// Test case category: normal flow, exception handling, or boundary values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestKind {
    Normal,
    Exception,
    Boundary,
}

impl TestKind {
    pub const ALL: [TestKind; 3] = [TestKind::Normal, TestKind::Exception, TestKind::Boundary];

    /// Label used in prompts and in the spreadsheet.
    pub fn label(self) -> &'static str {
        match self {
            TestKind::Normal => "정상",
            TestKind::Exception => "예외",
            TestKind::Boundary => "경계",
        }
    }

    /// Accepts the Korean labels and the English names, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match raw.to_lowercase().as_str() {
            "정상" | "normal" => Some(TestKind::Normal),
            "예외" | "exception" => Some(TestKind::Exception),
            "경계" | "boundary" => Some(TestKind::Boundary),
            _ => None,
        }
    }
}

/// A test case record before scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftTestcase {
    pub major: String,
    pub medium: String,
    pub minor: String,
    pub kind: TestKind,
    pub description: String,
    pub precondition: String,
    pub expected_result: String,
    pub notes: String,
}

/// Color band derived from the total rubric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Green,
    Yellow,
    Orange,
    Red,
}

impl Grade {
    pub fn from_score(score: u32) -> Self {
        if score >= 90 {
            Grade::Green
        } else if score >= 70 {
            Grade::Yellow
        } else if score >= 50 {
            Grade::Orange
        } else {
            Grade::Red
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Grade::Green => "🟢",
            Grade::Yellow => "🟡",
            Grade::Orange => "🟠",
            Grade::Red => "🔴",
        }
    }
}

/// Rubric components. `total` is always the sum of the four components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricScore {
    pub accuracy: u32,
    pub clarity: u32,
    pub uniqueness: u32,
    pub completeness: u32,
    pub total: u32,
}

impl RubricScore {
    pub const MAX_ACCURACY: u32 = 40;
    pub const MAX_CLARITY: u32 = 20;
    pub const MAX_UNIQUENESS: u32 = 20;
    pub const MAX_COMPLETENESS: u32 = 20;

    /// Components clamped into their ranges; total recomputed.
    pub fn new(accuracy: u32, clarity: u32, uniqueness: u32, completeness: u32) -> Self {
        let accuracy = accuracy.min(Self::MAX_ACCURACY);
        let clarity = clarity.min(Self::MAX_CLARITY);
        let uniqueness = uniqueness.min(Self::MAX_UNIQUENESS);
        let completeness = completeness.min(Self::MAX_COMPLETENESS);
        Self {
            accuracy,
            clarity,
            uniqueness,
            completeness,
            total: accuracy + clarity + uniqueness + completeness,
        }
    }
}

impl Default for RubricScore {
    /// Score assumed before the oracle answers: 30/15/15/15 = 75.
    fn default() -> Self {
        Self::new(30, 15, 15, 15)
    }
}

/// Terminal record handed to the exporters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredTestcase {
    #[serde(flatten)]
    pub draft: DraftTestcase,
    pub score: u32,
    pub grade: Grade,
}

impl ScoredTestcase {
    pub fn new(draft: DraftTestcase, rubric: RubricScore) -> Self {
        Self {
            draft,
            score: rubric.total,
            grade: Grade::from_score(rubric.total),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_is_a_step_function_of_score() {
        let cases = [
            (100, Grade::Green),
            (90, Grade::Green),
            (89, Grade::Yellow),
            (70, Grade::Yellow),
            (69, Grade::Orange),
            (50, Grade::Orange),
            (49, Grade::Red),
            (0, Grade::Red),
        ];
        for (score, expected) in cases {
            assert_eq!(Grade::from_score(score), expected, "score {}", score);
        }
    }

    #[test]
    fn default_rubric_is_seventy_five_yellow() {
        let rubric = RubricScore::default();
        assert_eq!(rubric.total, 75);
        assert_eq!(Grade::from_score(rubric.total), Grade::Yellow);
    }

    #[test]
    fn rubric_components_are_clamped() {
        let rubric = RubricScore::new(55, 25, 20, 3);
        assert_eq!(rubric.accuracy, 40);
        assert_eq!(rubric.clarity, 20);
        assert_eq!(rubric.total, 40 + 20 + 20 + 3);
    }

    #[test]
    fn missing_taxonomy_keys_use_literal_defaults() {
        let tax = Taxonomy::default_hierarchy();
        assert_eq!(tax.mediums_for("없음"), vec![DEFAULT_MEDIUM.to_string()]);
        assert_eq!(tax.minors_for("설정"), vec![DEFAULT_MINOR.to_string()]);
        assert_eq!(tax.mediums_for("UI").len(), 3);
    }

    #[test]
    fn kind_parses_both_languages() {
        assert_eq!(TestKind::parse(" 예외 "), Some(TestKind::Exception));
        assert_eq!(TestKind::parse("Boundary"), Some(TestKind::Boundary));
        assert_eq!(TestKind::parse("성능"), None);
    }

    #[test]
    fn taxonomy_deserializes_from_prompt_shape() {
        let tax: Taxonomy = serde_json::from_str(
            r#"{"대분류": ["전투"], "중분류": {"전투": ["스킬"]}, "소분류": {}}"#,
        )
        .unwrap();
        assert_eq!(tax.majors, vec!["전투"]);
        assert_eq!(tax.mediums_for("전투"), vec!["스킬"]);
    }
}
