//! Adapters - Concrete implementations of ports.

pub mod local;

#[cfg(feature = "http")]
pub mod remote;

#[cfg(any(feature = "http", feature = "local"))]
pub mod wire;
