//! Error taxonomy for the ingestion and analysis pipeline.
//!
//! Only conditions that abort a run live here. Per-view shortfalls (too few
//! days to forecast, campaigns below the A/B sample floor) are reported as
//! empty results or explicit status values by the views themselves.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A single source could not be read. Recoverable: ingestion skips it.
    #[error("failed to read source '{source_id}': {reason}")]
    SourceRead { source_id: String, reason: String },

    #[error("no input sources were provided")]
    InputNotFound,

    #[error("none of the {attempted} input source(s) yielded any data rows")]
    NoUsableData { attempted: usize },

    #[error("the canonical table has no rows after normalization")]
    EmptyInput,
}

impl PipelineError {
    pub fn source_read(source_id: impl Into<String>, reason: impl ToString) -> Self {
        PipelineError::SourceRead {
            source_id: source_id.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, PipelineError::SourceRead { .. })
    }
}
