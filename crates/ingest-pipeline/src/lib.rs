//! # ingest-pipeline
//!
//! The orchestrator (C8, SPEC_FULL §4.8): extract → chunk → metadata →
//! embed → persist, with stage-tagged failure classification and the
//! best-effort extracted-block artifact snapshot. Shared by the CLI (C11)
//! and the worker (C9) as the single place a run actually gets processed.

pub mod artifact;
pub mod error;
pub mod orchestrator;

pub use error::PipelineError;
pub use orchestrator::{IngestOutcome, IngestRequest, RunConfig, create_run, execute};
