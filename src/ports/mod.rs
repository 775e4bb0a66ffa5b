//! Ports - Trait definitions for the backend and the timer.

pub mod clock;
pub mod jobs;
pub mod media;
pub mod upload;
