//! Game design document to scored test cases.
//!
//! A document is loaded and chunked ([`ingest`]), then run through four oracle-backed
//! stages ([`stages`]) by the [`pipeline::Pipeline`] driver, and finally exported as a
//! spreadsheet or JSON report ([`export`]).

pub mod config;
pub mod errors;
pub mod export;
pub mod extract;
pub mod ingest;
pub mod model;
pub mod outcome;
pub mod pipeline;
mod prompts;
pub mod providers;
pub mod stages;

pub use config::{FilterFailurePolicy, PipelineSettings, TcgenConfig};
pub use model::{Chunk, DraftTestcase, Grade, RubricScore, ScoredTestcase, Taxonomy, TestKind};
pub use outcome::{FallbackReason, StageOutcome};
pub use pipeline::{Pipeline, PipelineReport, RunSummary};
pub use providers::oracle::{build_oracle, Backend, Oracle, OracleSettings, Prompt};
