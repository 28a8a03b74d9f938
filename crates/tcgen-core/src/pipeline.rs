//! Pipeline driver: filter, taxonomy, synthesis, validation, in that order.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::PipelineSettings;
use crate::errors::PipelineError;
use crate::model::{Chunk, Grade, ScoredTestcase, Taxonomy};
use crate::outcome::StageOutcome;
use crate::providers::oracle::{build_oracle, Backend, Oracle, OracleSettings, TracingOracle};
use crate::stages::{filter, synth, taxonomy, validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxonomySource {
    Oracle,
    Default,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeCounts {
    pub green: usize,
    pub yellow: usize,
    pub orange: usize,
    pub red: usize,
}

impl GradeCounts {
    pub fn tally(testcases: &[ScoredTestcase]) -> Self {
        let mut counts = Self::default();
        for tc in testcases {
            match tc.grade {
                Grade::Green => counts.green += 1,
                Grade::Yellow => counts.yellow += 1,
                Grade::Orange => counts.orange += 1,
                Grade::Red => counts.red += 1,
            }
        }
        counts
    }
}

/// What each stage did, fallbacks included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub chunks_in: usize,
    pub chunks_short: usize,
    pub chunks_kept: usize,
    pub filter_fallbacks: usize,
    pub taxonomy_source: TaxonomySource,
    pub batches: usize,
    pub fallback_batches: usize,
    pub drafts: usize,
    pub scoring_fallbacks: usize,
    pub seed: u64,
    pub grades: GradeCounts,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub backend: Backend,
    pub model: String,
    pub taxonomy: Taxonomy,
    pub testcases: Vec<ScoredTestcase>,
    pub summary: RunSummary,
}

pub struct Pipeline {
    oracle: Arc<dyn Oracle>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(oracle: Arc<dyn Oracle>, settings: PipelineSettings) -> Self {
        Self { oracle, settings }
    }

    /// Build the configured backend behind a tracing span. A missing credential fails
    /// here, before any oracle call.
    pub fn from_settings(
        oracle: &OracleSettings,
        settings: PipelineSettings,
    ) -> Result<Self, PipelineError> {
        let inner = build_oracle(oracle)?;
        Ok(Self::new(Arc::new(TracingOracle::new(inner)), settings))
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub async fn run(&self, chunks: Vec<Chunk>) -> Result<PipelineReport, PipelineError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let seed = self.settings.seed.unwrap_or_else(|| {
            let s = rand::random();
            tracing::info!(seed = s, "no seed provided, using generated seed");
            s
        });
        let chunks_in = chunks.len();
        tracing::info!(
            %run_id,
            backend = %self.oracle.backend(),
            model = self.oracle.model(),
            chunks = chunks_in,
            parallel = self.settings.parallel,
            "pipeline started"
        );

        let filtered = filter::run(self.oracle.clone(), chunks, &self.settings).await?;

        let (taxonomy, taxonomy_source) =
            match taxonomy::build(self.oracle.as_ref(), &filtered.kept).await {
                StageOutcome::Ok(t) => (t, TaxonomySource::Oracle),
                StageOutcome::Fallback { value, .. } => (value, TaxonomySource::Default),
                // the builder substitutes a default for every failure
                StageOutcome::Fatal(_) => (Taxonomy::default_hierarchy(), TaxonomySource::Default),
            };
        let taxonomy = Arc::new(taxonomy);

        let chunks_kept = filtered.kept.len();
        let batch_outcomes = synth::run(
            self.oracle.clone(),
            filtered.kept,
            taxonomy.clone(),
            self.settings.batch_size,
            self.settings.parallel,
            seed,
        )
        .await;
        let batches = batch_outcomes.len();
        let fallback_batches = batch_outcomes.iter().filter(|o| o.is_fallback()).count();
        let drafts: Vec<_> = batch_outcomes
            .into_iter()
            .filter_map(|o| o.into_result().ok())
            .flatten()
            .collect();
        let draft_count = drafts.len();

        let scored = validate::run(self.oracle.clone(), drafts, self.settings.parallel).await;
        let scoring_fallbacks = scored.iter().filter(|o| o.is_fallback()).count();
        let testcases: Vec<ScoredTestcase> = scored
            .into_iter()
            .filter_map(|o| o.into_result().ok())
            .collect();

        let summary = RunSummary {
            chunks_in,
            chunks_short: filtered.short,
            chunks_kept,
            filter_fallbacks: filtered.fallbacks,
            taxonomy_source,
            batches,
            fallback_batches,
            drafts: draft_count,
            scoring_fallbacks,
            seed,
            grades: GradeCounts::tally(&testcases),
        };
        tracing::info!(
            %run_id,
            testcases = testcases.len(),
            fallback_batches,
            scoring_fallbacks,
            "pipeline finished"
        );

        Ok(PipelineReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            backend: self.oracle.backend(),
            model: self.oracle.model().to_string(),
            taxonomy: Arc::unwrap_or_clone(taxonomy),
            testcases,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ConfigError;
    use crate::providers::oracle::FakeOracle;

    #[test]
    fn missing_credential_stops_before_any_call() {
        let settings = OracleSettings::new(Backend::Gemini);
        let err = Pipeline::from_settings(&settings, PipelineSettings::default())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            PipelineError::Config(ConfigError::MissingCredential { .. })
        ));
    }

    #[tokio::test]
    async fn fake_backend_runs_every_fallback_path() {
        let pipeline = Pipeline::new(
            Arc::new(FakeOracle::new("fake")),
            PipelineSettings {
                seed: Some(3),
                ..Default::default()
            },
        );
        let chunks = vec![
            Chunk::new("캐릭터는 하루에 한 번 출석 보상을 받는다."),
            Chunk::new("짧다"),
        ];
        let report = pipeline.run(chunks).await.unwrap();
        assert_eq!(report.summary.chunks_short, 1);
        assert_eq!(report.summary.chunks_kept, 1);
        assert_eq!(report.summary.taxonomy_source, TaxonomySource::Default);
        assert_eq!(report.summary.fallback_batches, 1);
        assert_eq!(report.testcases.len(), 1);
        assert_eq!(report.testcases[0].score, 75);
        assert_eq!(report.summary.grades.yellow, 1);
        assert_eq!(report.summary.seed, 3);
    }

    #[test]
    fn grade_tally() {
        let counts = GradeCounts::tally(&[]);
        assert_eq!(counts, GradeCounts::default());
    }
}
