// Session pipeline: ingestion, processing, and storage

pub mod ingestion;
pub mod processing;
pub mod storage;
pub mod session;

// Re-export the session entry point
pub use session::{Pipeline, PipelineOptions, PipelineResult};
