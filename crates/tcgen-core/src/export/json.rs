use std::path::Path;

use crate::errors::ExportError;
use crate::pipeline::PipelineReport;

pub fn write_report(path: &Path, report: &PipelineReport) -> Result<(), ExportError> {
    let write_err = |message: String| ExportError::Write {
        path: path.display().to_string(),
        message,
    };
    let json = serde_json::to_string_pretty(report).map_err(|e| write_err(e.to_string()))?;
    std::fs::write(path, json).map_err(|e| write_err(e.to_string()))?;
    tracing::info!(path = %path.display(), "report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineSettings;
    use crate::pipeline::Pipeline;
    use crate::providers::oracle::FakeOracle;
    use crate::Chunk;
    use std::sync::Arc;

    #[tokio::test]
    async fn report_carries_scores_and_summary() {
        let pipeline = Pipeline::new(Arc::new(FakeOracle::new("fake")), PipelineSettings::default());
        let report = pipeline
            .run(vec![Chunk::new("상점에서 아이템을 구매할 수 있다.")])
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_report(&path, &report).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["backend"], "fake");
        assert_eq!(value["testcases"][0]["score"], 75);
        assert_eq!(value["testcases"][0]["grade"], "yellow");
        assert_eq!(value["summary"]["taxonomy_source"], "default");
    }
}
