pub mod config;
pub mod constants;
pub mod emoji;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod preprocess;
pub mod storage;
pub mod types;

// Layered boundaries for application and infrastructure
pub mod app;
pub mod infra;
