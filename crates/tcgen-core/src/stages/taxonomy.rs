//! Taxonomy builder: one oracle call over the whole filtered document.

use crate::errors::MalformedResponse;
use crate::extract;
use crate::model::{Chunk, Taxonomy};
use crate::outcome::StageOutcome;
use crate::prompts;
use crate::providers::oracle::Oracle;

/// Infer the category hierarchy. Never fails: any oracle or parse failure yields
/// [`Taxonomy::default_hierarchy`] as a fallback.
pub async fn build(oracle: &dyn Oracle, chunks: &[Chunk]) -> StageOutcome<Taxonomy> {
    let full_text = chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let outcome = match oracle.ask(&prompts::taxonomy(&full_text)).await {
        Ok(answer) => match parse(&answer) {
            Ok(taxonomy) => StageOutcome::Ok(taxonomy),
            Err(e) => StageOutcome::fallback(Taxonomy::default_hierarchy(), e),
        },
        Err(e) => StageOutcome::fallback(Taxonomy::default_hierarchy(), e),
    };

    match &outcome {
        StageOutcome::Ok(t) => tracing::info!(
            stage = "taxonomy",
            majors = t.majors.len(),
            mediums = t.mediums.len(),
            minors = t.minors.len(),
            "taxonomy inferred"
        ),
        StageOutcome::Fallback { reason, .. } => tracing::warn!(
            stage = "taxonomy",
            reason = %reason,
            "using default taxonomy"
        ),
        StageOutcome::Fatal(_) => {}
    }
    outcome
}

/// Parse an oracle answer into a taxonomy. An answer without a non-empty list of
/// majors is malformed.
pub fn parse(answer: &str) -> Result<Taxonomy, MalformedResponse> {
    let value = extract::object_lenient(answer)?;
    let mut taxonomy: Taxonomy =
        serde_json::from_value(value).map_err(|e| MalformedResponse::UnexpectedShape {
            message: e.to_string(),
        })?;
    // blank names are never offered to the synthesizer fallback
    taxonomy.majors.retain(|m| !m.trim().is_empty());
    for items in taxonomy.mediums.values_mut().chain(taxonomy.minors.values_mut()) {
        items.retain(|m| !m.trim().is_empty());
    }
    if taxonomy.majors.is_empty() {
        return Err(MalformedResponse::UnexpectedShape {
            message: "taxonomy has no majors".to_string(),
        });
    }
    Ok(taxonomy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::oracle::FakeOracle;

    #[test]
    fn parses_answer_wrapped_in_prose() {
        let answer = "분석 결과입니다:\n```json\n{\"대분류\": [\"전투\", \"상점\"], \
                      \"중분류\": {\"상점\": [\"구매\"]}, \"소분류\": {\"구매\": [\"잔액 부족\"]}}\n```";
        let taxonomy = parse(answer).unwrap();
        assert_eq!(taxonomy.majors, vec!["전투", "상점"]);
        assert_eq!(taxonomy.minors_for("구매"), vec!["잔액 부족"]);
        assert_eq!(taxonomy.mediums_for("전투"), vec!["일반"]);
    }

    #[test]
    fn english_keys_are_accepted() {
        let taxonomy = parse(r#"{"majors": ["UI"], "mediums": {"UI": ["HUD"]}}"#).unwrap();
        assert_eq!(taxonomy.mediums_for("UI"), vec!["HUD"]);
        assert!(taxonomy.minors.is_empty());
    }

    #[test]
    fn blank_names_are_dropped() {
        let taxonomy = parse(
            r#"{"대분류": [" ", "전투", ""], "중분류": {"전투": ["", "스킬"]}, "소분류": {"스킬": ["  "]}}"#,
        )
        .unwrap();
        assert_eq!(taxonomy.majors, vec!["전투"]);
        assert_eq!(taxonomy.mediums_for("전투"), vec!["스킬"]);
        assert_eq!(taxonomy.minors_for("스킬"), vec!["기본"]);
        assert!(parse(r#"{"대분류": ["  ", ""]}"#).is_err());
    }

    #[test]
    fn missing_or_empty_majors_are_malformed() {
        assert!(parse(r#"{"중분류": {}}"#).is_err());
        assert!(parse(r#"{"대분류": []}"#).is_err());
        assert!(parse(r#"{"대분류": "전투"}"#).is_err());
    }

    #[tokio::test]
    async fn refusal_falls_back_to_default() {
        let oracle = FakeOracle::new("m").with_response("죄송하지만 도와드릴 수 없습니다.");
        let outcome = build(&oracle, &[Chunk::new("전투는 실시간이다.")]).await;
        assert!(outcome.is_fallback());
        assert_eq!(outcome.value(), Some(&Taxonomy::default_hierarchy()));
    }
}
