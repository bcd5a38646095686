pub mod config;
pub mod constants;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod report;
pub mod server;
pub mod storage;
pub mod templates;

// Layered boundaries: use cases and ports in `app`, adapters in `infra`
pub mod app;
pub mod infra;

// Entities, request shapes and validation shared across layers
pub mod domain;
