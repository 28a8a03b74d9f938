use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tcgen_core::providers::oracle::Backend;
use tcgen_core::{FilterFailurePolicy, TcgenConfig};

#[derive(Parser, Debug)]
#[command(
    name = "tcgen",
    version,
    about = "Turn a game design document into scored QA test cases"
)]
pub struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true, env = "TCGEN_LOG_JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the full pipeline and write the test case spreadsheet
    Generate(GenerateArgs),
    /// Print the chunks a document would be split into (JSON lines on stdout)
    Chunk(ChunkArgs),
    /// Write an empty test case template spreadsheet
    Template(TemplateArgs),
    /// Print the version
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Design document (.pdf, .docx, .doc, .txt or .md)
    pub document: PathBuf,

    /// YAML config file; flags and TCGEN_* variables override its values
    #[arg(long, env = "TCGEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Oracle backend: gemini or openai
    #[arg(long, env = "TCGEN_BACKEND")]
    pub backend: Option<Backend>,

    #[arg(long, env = "TCGEN_MODEL")]
    pub model: Option<String>,

    /// Credential for the backend; defaults to GEMINI_API_KEY / OPENAI_API_KEY
    #[arg(long)]
    pub api_key: Option<String>,

    /// Override the backend endpoint (proxies, local gateways)
    #[arg(long, env = "TCGEN_BASE_URL")]
    pub base_url: Option<String>,

    #[arg(long, env = "TCGEN_TEMPERATURE")]
    pub temperature: Option<f32>,

    /// Kept chunks per synthesis request
    #[arg(long, env = "TCGEN_BATCH_SIZE")]
    pub batch_size: Option<usize>,

    /// Oracle calls in flight per stage
    #[arg(long, env = "TCGEN_PARALLEL")]
    pub parallel: Option<usize>,

    /// Seed for fallback category picks; random (and logged) when absent
    #[arg(long, env = "TCGEN_SEED")]
    pub seed: Option<u64>,

    #[arg(long, env = "TCGEN_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    #[arg(long, env = "TCGEN_MAX_CHUNK_CHARS")]
    pub max_chunk_chars: Option<usize>,

    /// What to do when a relevance check fails: abort, skip or keep
    #[arg(long, env = "TCGEN_ON_FILTER_ERROR")]
    pub on_filter_error: Option<FilterFailurePolicy>,

    #[arg(long, default_value = "generated_testcases.xlsx")]
    pub out: PathBuf,

    /// Also write the full run report as JSON
    #[arg(long)]
    pub json: Option<PathBuf>,
}

impl GenerateArgs {
    /// Layer explicit flags (and their env fallbacks) over a loaded config.
    pub fn apply_to(&self, cfg: &mut TcgenConfig) {
        if let Some(backend) = self.backend {
            cfg.backend = backend;
        }
        if let Some(model) = &self.model {
            cfg.model = Some(model.clone());
        }
        if let Some(url) = &self.base_url {
            cfg.base_url = Some(url.clone());
        }
        if let Some(t) = self.temperature {
            cfg.temperature = t;
        }
        if let Some(n) = self.batch_size {
            cfg.batch_size = n;
        }
        if let Some(n) = self.parallel {
            cfg.parallel = n;
        }
        if let Some(seed) = self.seed {
            cfg.seed = Some(seed);
        }
        if let Some(secs) = self.timeout_secs {
            cfg.timeout_secs = secs;
        }
        if let Some(n) = self.max_chunk_chars {
            cfg.max_chunk_chars = n;
        }
        if let Some(policy) = self.on_filter_error {
            cfg.on_filter_error = policy;
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ChunkArgs {
    pub document: PathBuf,

    #[arg(long, default_value_t = 1000)]
    pub max_chars: usize,
}

#[derive(Args, Debug, Clone)]
pub struct TemplateArgs {
    #[arg(long, default_value = "testcase_template.xlsx")]
    pub out: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn flags_override_config_values() {
        let cli = parse(&[
            "tcgen",
            "generate",
            "design.pdf",
            "--backend",
            "openai",
            "--batch-size",
            "2",
            "--on-filter-error",
            "keep",
        ]);
        let Command::Generate(args) = cli.cmd else {
            panic!("expected generate");
        };
        let mut cfg = TcgenConfig {
            batch_size: 9,
            seed: Some(3),
            ..Default::default()
        };
        args.apply_to(&mut cfg);
        assert_eq!(cfg.backend, Backend::OpenAi);
        assert_eq!(cfg.batch_size, 2);
        assert_eq!(cfg.on_filter_error, FilterFailurePolicy::Keep);
        assert_eq!(cfg.seed, Some(3), "unset flags leave the config alone");
    }

    #[test]
    fn unknown_backend_is_rejected_by_the_parser() {
        let err = Cli::try_parse_from(["tcgen", "generate", "d.pdf", "--backend", "claude"]);
        assert!(err.is_err());
    }

    #[test]
    fn log_json_is_global() {
        let cli = parse(&["tcgen", "template", "--log-json"]);
        assert!(cli.log_json);
    }
}
