//! Local Backend Binary - In-memory backend over HTTP
//!
//! Development server implementing the upload, job and file endpoints the
//! client talks to. Nothing is persisted.
//!
//! Environment Variables:
//! - ADDR / PORT: bind address (default 127.0.0.1:3000)
//! - PENDING_POLLS: status polls a job stays pending (default 3)
//! - MAX_UPLOAD_SIZE: largest accepted upload in bytes

use cadenza::adapters::local::http::router;
use cadenza::{BackendSettings, InMemoryBackend, LocalBackendConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = LocalBackendConfig::from_env();

    tracing_subscriber::fmt::init();

    // 1. Adapter
    let backend = InMemoryBackend::new(BackendSettings {
        pending_polls: config.pending_polls,
        max_upload_size: config.max_upload_size,
    });

    // 2. HTTP Layer
    let app = router(backend);

    // 3. Start Server
    let bind = format!("{}:{}", config.addr, config.port);
    let listener = match tokio::net::TcpListener::bind(&bind).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%bind, error = %e, "failed to bind TCP listener");
            std::process::exit(1);
        }
    };
    info!(%bind, pending_polls = config.pending_polls, "local backend listening");

    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "server failed");
        std::process::exit(1);
    }
}
