//! Stage-tagged errors (C8, SPEC_FULL §4.8/§7).
//!
//! Every fallible call inside the orchestrator is tagged with the stage it
//! happened in at the call site, rather than inferred afterward from the
//! error text — a run's `error` column always carries an exact `[stage]`
//! prefix, never a guess.

use ingest_core::Stage;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("[{}] {message}", stage.as_str())]
pub struct PipelineError {
    pub stage: Stage,
    pub message: String,
}

impl PipelineError {
    #[must_use]
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self { stage, message: message.into() }
    }
}
