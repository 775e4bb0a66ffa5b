//! Outbound adapter for a backend reachable over HTTP.

mod http;

pub use http::HttpBackend;
