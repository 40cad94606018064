pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod observability;
pub mod pipeline;
pub mod types;

// Application layer and its process-backed adapters
pub mod app;
pub mod infra;
