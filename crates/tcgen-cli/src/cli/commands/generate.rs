use tcgen_core::config::load_config;
use tcgen_core::errors::ConfigError;
use tcgen_core::export::{write_report, write_testcases};
use tcgen_core::ingest::chunk_document;
use tcgen_core::{Pipeline, PipelineReport, TcgenConfig};

use crate::cli::args::GenerateArgs;
use crate::exit_codes;

pub async fn run(args: GenerateArgs) -> anyhow::Result<i32> {
    let mut cfg = match &args.config {
        Some(path) => match load_config(path) {
            Ok(cfg) => cfg,
            Err(e) => return Ok(config_error(&e)),
        },
        None => TcgenConfig::default(),
    };
    args.apply_to(&mut cfg);
    if let Err(e) = cfg.validate() {
        return Ok(config_error(&e));
    }

    // credential first: no document work without a usable key
    let oracle_settings = cfg.oracle_settings(args.api_key.clone());
    if let Err(e) = oracle_settings.credential() {
        return Ok(config_error(&e));
    }

    let chunks = match chunk_document(&args.document, cfg.max_chunk_chars) {
        Ok(chunks) if chunks.is_empty() => {
            eprintln!(
                "error: no text could be extracted from {}",
                args.document.display()
            );
            return Ok(exit_codes::INPUT_ERROR);
        }
        Ok(chunks) => chunks,
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(exit_codes::INPUT_ERROR);
        }
    };
    tracing::info!(
        document = %args.document.display(),
        chunks = chunks.len(),
        backend = %cfg.backend,
        "document loaded"
    );

    let pipeline = match Pipeline::from_settings(&oracle_settings, cfg.pipeline_settings()) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(exit_codes::for_pipeline_error(&e));
        }
    };
    let report = match pipeline.run(chunks).await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(exit_codes::for_pipeline_error(&e));
        }
    };

    if let Err(e) = write_testcases(&args.out, &report.testcases) {
        eprintln!("error: {e}");
        return Ok(exit_codes::EXPORT_ERROR);
    }
    if let Some(path) = &args.json {
        if let Err(e) = write_report(path, &report) {
            eprintln!("error: {e}");
            return Ok(exit_codes::EXPORT_ERROR);
        }
    }

    print_summary(&report, &args);
    Ok(exit_codes::SUCCESS)
}

fn config_error(err: &ConfigError) -> i32 {
    if let ConfigError::MissingCredential { env_var, .. } = err {
        eprintln!("API 키를 입력해주세요. ({env_var} 환경 변수 또는 --api-key)");
    } else {
        eprintln!("error: {err}");
    }
    exit_codes::CONFIG_ERROR
}

fn print_summary(report: &PipelineReport, args: &GenerateArgs) {
    let s = &report.summary;
    eprintln!(
        "Testcase가 성공적으로 생성되었습니다! {}건 -> {}",
        report.testcases.len(),
        args.out.display()
    );
    eprintln!(
        "  chunks: {} in, {} too short, {} kept ({} filter fallbacks)",
        s.chunks_in, s.chunks_short, s.chunks_kept, s.filter_fallbacks
    );
    eprintln!(
        "  batches: {} ({} fallback), scoring fallbacks: {}, seed: {}",
        s.batches, s.fallback_batches, s.scoring_fallbacks, s.seed
    );
    eprintln!(
        "  grades: 🟢 {}  🟡 {}  🟠 {}  🔴 {}",
        s.grades.green, s.grades.yellow, s.grades.orange, s.grades.red
    );
    if let Some(path) = &args.json {
        eprintln!("  report: {}", path.display());
    }
}
