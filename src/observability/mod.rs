// Observability: metrics recorded per pipeline stage

pub mod metrics;
