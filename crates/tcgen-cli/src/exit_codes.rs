//! Exit codes of the `tcgen` binary. Part of the public contract for scripts.

use tcgen_core::errors::PipelineError;

pub const SUCCESS: i32 = 0;
pub const FILTER_ABORTED: i32 = 1; // a relevance check failed under on_filter_error=abort
pub const CONFIG_ERROR: i32 = 2; // missing credential, bad config file or flag
pub const INPUT_ERROR: i32 = 3; // unsupported, unreadable or empty document
pub const EXPORT_ERROR: i32 = 4; // spreadsheet or report could not be written

pub fn for_pipeline_error(err: &PipelineError) -> i32 {
    match err {
        PipelineError::Config(_) => CONFIG_ERROR,
        PipelineError::Ingest(_) => INPUT_ERROR,
        PipelineError::FilterAborted { .. } => FILTER_ABORTED,
    }
}
