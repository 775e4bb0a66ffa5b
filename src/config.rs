//! Configuration for the client and the local development backend.

use crate::application::media_cache::MediaCacheConfig;
use crate::application::orchestrator::OrchestratorConfig;
use crate::application::poller::PollPolicy;
use crate::application::upload::UploadConfig;
use crate::domain::chunks::DEFAULT_CHUNK_SIZE;
use crate::domain::upload::DEFAULT_MAX_UPLOAD_SIZE;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Configuration for a client talking to a remote backend.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the backend HTTP API
    pub backend_url: String,
    pub upload: UploadConfig,
    pub transcription_poll: PollPolicy,
    pub summary_poll: PollPolicy,
    pub media: MediaCacheConfig,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let chunk_size = env_parse("CHUNK_SIZE", DEFAULT_CHUNK_SIZE);
        let max_total_wait = env_opt::<u64>("POLL_MAX_TOTAL_WAIT_SECS").map(Duration::from_secs);

        let transcription_default = PollPolicy::transcription();
        let summary_default = PollPolicy::summarization();

        Self {
            backend_url: env::var("BACKEND_URL")
                .unwrap_or_else(|_| String::from("http://127.0.0.1:3000")),
            upload: UploadConfig {
                chunk_size,
                batch_width: env_parse("UPLOAD_BATCH_WIDTH", UploadConfig::default().batch_width),
                batch_delay: Duration::from_millis(env_parse("UPLOAD_BATCH_DELAY_MS", 50)),
                max_upload_size: env_parse("MAX_UPLOAD_SIZE", DEFAULT_MAX_UPLOAD_SIZE),
            },
            transcription_poll: PollPolicy {
                initial_interval: env_millis(
                    "TRANSCRIPTION_POLL_INITIAL_MS",
                    transcription_default.initial_interval,
                ),
                growth_factor: env_factor(
                    "TRANSCRIPTION_POLL_GROWTH",
                    transcription_default.growth_factor,
                ),
                max_interval: env_millis(
                    "TRANSCRIPTION_POLL_MAX_MS",
                    transcription_default.max_interval,
                ),
                max_total_wait,
            },
            summary_poll: PollPolicy {
                initial_interval: env_millis(
                    "SUMMARY_POLL_INITIAL_MS",
                    summary_default.initial_interval,
                ),
                growth_factor: env_factor("SUMMARY_POLL_GROWTH", summary_default.growth_factor),
                max_interval: env_millis("SUMMARY_POLL_MAX_MS", summary_default.max_interval),
                max_total_wait,
            },
            media: MediaCacheConfig {
                chunk_size,
                preload_chunks: env_parse(
                    "MEDIA_PRELOAD_CHUNKS",
                    MediaCacheConfig::default().preload_chunks,
                ),
            },
        }
    }

    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            upload: self.upload.clone(),
            transcription_poll: self.transcription_poll.clone(),
            summary_poll: self.summary_poll.clone(),
        }
    }
}

/// Configuration for the in-memory development backend.
#[cfg(feature = "local")]
#[derive(Clone, Debug)]
pub struct LocalBackendConfig {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: String,
    /// Number of status polls a job answers `Pending` before completing
    pub pending_polls: u32,
    pub max_upload_size: u64,
}

#[cfg(feature = "local")]
impl LocalBackendConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            addr: env::var("ADDR").unwrap_or_else(|_| String::from("127.0.0.1")),
            port: env::var("PORT").unwrap_or_else(|_| String::from("3000")),
            pending_polls: env_parse("PENDING_POLLS", 3),
            max_upload_size: env_parse("MAX_UPLOAD_SIZE", DEFAULT_MAX_UPLOAD_SIZE),
        }
    }
}

fn env_opt<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable environment variable");
            None
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env_opt(key).unwrap_or(default)
}

/// Backoff multipliers must be finite and at least 1.
fn env_factor(key: &str, default: f64) -> f64 {
    match env_opt::<f64>(key) {
        Some(factor) if factor.is_finite() && factor >= 1.0 => factor,
        Some(factor) => {
            warn!(key, factor, "ignoring out of range growth factor");
            default
        }
        None => default,
    }
}

fn env_millis(key: &str, default: Duration) -> Duration {
    env_opt::<u64>(key)
        .map(Duration::from_millis)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_parse_falls_back_on_garbage() {
        env::set_var("CADENZA_TEST_GARBAGE", "not-a-number");
        assert_eq!(env_parse("CADENZA_TEST_GARBAGE", 7u64), 7);
        env::remove_var("CADENZA_TEST_GARBAGE");
    }

    #[test]
    fn test_env_millis_reads_value() {
        env::set_var("CADENZA_TEST_MILLIS", " 1500 ");
        assert_eq!(
            env_millis("CADENZA_TEST_MILLIS", Duration::ZERO),
            Duration::from_millis(1500)
        );
        env::remove_var("CADENZA_TEST_MILLIS");
        assert_eq!(env_opt::<u64>("CADENZA_TEST_MILLIS"), None);
    }

    #[test]
    fn test_env_factor_rejects_non_finite() {
        env::set_var("CADENZA_TEST_FACTOR", "inf");
        assert_eq!(env_factor("CADENZA_TEST_FACTOR", 1.2), 1.2);
        env::set_var("CADENZA_TEST_FACTOR", "NaN");
        assert_eq!(env_factor("CADENZA_TEST_FACTOR", 1.2), 1.2);
        env::set_var("CADENZA_TEST_FACTOR", "0.5");
        assert_eq!(env_factor("CADENZA_TEST_FACTOR", 1.2), 1.2);
        env::set_var("CADENZA_TEST_FACTOR", "1.5");
        assert_eq!(env_factor("CADENZA_TEST_FACTOR", 1.2), 1.5);
        env::remove_var("CADENZA_TEST_FACTOR");
    }
}
