//! Application layer - Services generic over ports.

use crate::error::TransferError;
use std::future::Future;
use tokio_util::sync::CancellationToken;

pub mod media_cache;
pub mod orchestrator;
pub mod poller;
pub mod upload;

/// Run `fut` unless `cancel` fires first.
pub(crate) async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, TransferError>
where
    F: Future<Output = Result<T, TransferError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TransferError::Cancelled),
        result = fut => result,
    }
}
