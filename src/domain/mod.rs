//! Domain layer - Pure types and arithmetic, no I/O besides local file helpers.

pub mod chunks;
pub mod jobs;
pub mod media;
pub mod progress;
pub mod upload;
