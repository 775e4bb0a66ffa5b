//! Local adapters for tests and single-process development.

pub mod memory;

#[cfg(feature = "local")]
pub mod http;

pub use memory::{BackendSettings, InMemoryBackend};
