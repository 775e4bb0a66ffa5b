//! Cadenza - Chunked media transfer and job orchestration client
//!
//! Hexagonal Architecture:
//! - domain/: Pure types (chunks, uploads, jobs, progress, media)
//! - ports/: Backend and timer trait definitions
//! - adapters/: In-memory backend, HTTP server and HTTP client
//! - application/: Upload client, job poller, orchestrator, media cache
//! - config: Environment configuration
//!
//! # Features
//! - `http`: reqwest-backed client for a remote backend
//! - `local`: In-memory backend served over HTTP (axum)
//! - `full`: All features

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

// Re-exports for convenience
pub use adapters::local::{BackendSettings, InMemoryBackend};
pub use application::media_cache::{ChunkedMediaCache, MediaCacheConfig, MediaLoadState};
pub use application::orchestrator::{OrchestratorConfig, UploadOrchestrator};
pub use application::poller::{JobPoller, PollPolicy};
pub use application::upload::{UploadConfig, UploadSessionClient};
pub use config::ClientConfig;
pub use error::{BackendError, TransferError};

#[cfg(feature = "http")]
pub use adapters::remote::HttpBackend;

#[cfg(feature = "local")]
pub use config::LocalBackendConfig;
