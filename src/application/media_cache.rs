use super::cancellable;
use crate::domain::chunks::{ChunkLayout, DEFAULT_CHUNK_SIZE};
use crate::domain::media::{MediaDescriptor, MediaHandle};
use crate::error::TransferError;
use crate::ports::media::MediaPort;
use bytes::{Bytes, BytesMut};
use futures::future::try_join_all;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{watch, OnceCell};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct MediaCacheConfig {
    pub chunk_size: u64,
    /// Chunks fetched by [`ChunkedMediaCache::open`] before playback starts
    pub preload_chunks: u64,
}

impl Default for MediaCacheConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            preload_chunks: 3,
        }
    }
}

/// Observable state of the active media view.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MediaLoadState {
    pub is_loading: bool,
    /// Percentage of the current load done. A full load advances per chunk;
    /// any load that succeeds ends at 100.
    pub progress: f64,
    pub loaded_bytes: u64,
    /// Size reported by the backend with the first chunk
    pub total_size: Option<u64>,
    pub error: Option<String>,
    pub has_media: bool,
}

/// Chunks and assembled handle of the media currently being viewed.
struct View {
    descriptor: Option<MediaDescriptor>,
    /// Bumped whenever the view is replaced, so late results from a
    /// superseded load are dropped.
    generation: u64,
    token: CancellationToken,
    chunks: HashMap<u64, Arc<OnceCell<Bytes>>>,
    handle: Option<MediaHandle>,
}

impl View {
    fn replace(&mut self, descriptor: Option<MediaDescriptor>) {
        self.token.cancel();
        self.token = CancellationToken::new();
        self.generation += 1;
        self.chunks.clear();
        self.handle = None;
        self.descriptor = descriptor;
    }
}

/// Identifies the view a load was started against.
#[derive(Clone)]
struct Ticket {
    generation: u64,
    token: CancellationToken,
}

/// Read side: fetches byte ranges of a remote file on demand and caches
/// them by chunk index for the lifetime of one media view.
///
/// Fetches for the same index are deduplicated: a second caller waits for
/// the first caller's request instead of issuing its own. A cached chunk is
/// never replaced while the view lives.
pub struct ChunkedMediaCache<M> {
    port: M,
    config: MediaCacheConfig,
    view: Mutex<View>,
    state: watch::Sender<MediaLoadState>,
}

impl<M> ChunkedMediaCache<M>
where
    M: MediaPort,
{
    pub fn new(port: M, config: MediaCacheConfig) -> Self {
        let (state, _) = watch::channel(MediaLoadState::default());
        Self {
            port,
            config,
            view: Mutex::new(View {
                descriptor: None,
                generation: 0,
                token: CancellationToken::new(),
                chunks: HashMap::new(),
                handle: None,
            }),
            state,
        }
    }

    pub fn config(&self) -> &MediaCacheConfig {
        &self.config
    }

    pub fn subscribe(&self) -> watch::Receiver<MediaLoadState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> MediaLoadState {
        self.state.borrow().clone()
    }

    /// Most complete object assembled for the current view.
    pub fn handle(&self) -> Option<MediaHandle> {
        self.view.lock().handle.clone()
    }

    /// Indices currently held in the cache.
    pub fn cached_chunks(&self) -> Vec<u64> {
        let view = self.view.lock();
        let mut indices: Vec<u64> = view
            .chunks
            .iter()
            .filter(|(_, cell)| cell.initialized())
            .map(|(index, _)| *index)
            .collect();
        indices.sort_unstable();
        indices
    }

    /// Fetch one chunk, from the cache when present.
    pub async fn fetch_chunk(
        &self,
        descriptor: &MediaDescriptor,
        index: u64,
        cancel: &CancellationToken,
    ) -> Result<Bytes, TransferError> {
        let ticket = self.enter(descriptor);
        self.fetch(descriptor, &ticket, index, cancel).await
    }

    /// Fetch the first `preload_count` chunks concurrently and assemble them
    /// into a handle that can start playing before the rest arrives.
    pub async fn load_partial(
        &self,
        descriptor: &MediaDescriptor,
        preload_count: u64,
        cancel: &CancellationToken,
    ) -> Result<MediaHandle, TransferError> {
        let ticket = self.enter(descriptor);
        let total = self.layout(descriptor).chunk_count();
        let count = preload_count.max(1).min(total);
        self.begin(&ticket);

        let result = try_join_all((0..count).map(|index| self.fetch(descriptor, &ticket, index, cancel)))
            .await
            .map(|parts| assemble(descriptor, &parts, count == total));

        self.finish(descriptor, &ticket, result)
    }

    /// Fetch every chunk in order, reusing cached ones, and assemble the
    /// whole object. Progress is published after each chunk.
    pub async fn load_complete(
        &self,
        descriptor: &MediaDescriptor,
        cancel: &CancellationToken,
    ) -> Result<MediaHandle, TransferError> {
        let ticket = self.enter(descriptor);
        let total = self.layout(descriptor).chunk_count();
        self.begin(&ticket);

        let result = async {
            let mut parts = Vec::with_capacity(total as usize);
            let mut loaded = 0u64;
            for index in 0..total {
                let part = self.fetch(descriptor, &ticket, index, cancel).await?;
                loaded += part.len() as u64;
                parts.push(part);
                let progress = (index + 1) as f64 / total as f64 * 100.0;
                self.publish(&ticket, |s| {
                    s.progress = progress;
                    s.loaded_bytes = loaded;
                });
            }
            Ok(assemble(descriptor, &parts, true))
        }
        .await;

        self.finish(descriptor, &ticket, result)
    }

    /// Start playback of `descriptor` with the configured preload.
    pub async fn open(
        &self,
        descriptor: &MediaDescriptor,
        cancel: &CancellationToken,
    ) -> Result<MediaHandle, TransferError> {
        self.load_partial(descriptor, self.config.preload_chunks, cancel)
            .await
    }

    /// Abort in-flight fetches of the current view. Cached chunks stay.
    pub fn cancel(&self) {
        let mut view = self.view.lock();
        view.token.cancel();
        view.token = CancellationToken::new();
    }

    /// Abort in-flight fetches, drop the assembled handle and clear the cache.
    pub fn reset(&self) {
        let mut view = self.view.lock();
        if let Some(descriptor) = &view.descriptor {
            debug!(file_id = %descriptor.file_id, "media view reset");
        }
        view.replace(None);
        self.state.send_replace(MediaLoadState::default());
    }

    /// Save the current handle into `dir` under the descriptor's name.
    pub async fn download(&self, dir: &Path) -> Result<PathBuf, TransferError> {
        let (handle, name) = {
            let view = self.view.lock();
            match (&view.handle, &view.descriptor) {
                (Some(handle), Some(descriptor)) => (handle.clone(), descriptor.download_name()),
                _ => return Err(TransferError::NothingLoaded),
            }
        };
        let path = handle.save_to(&dir.join(name)).await?;
        info!(path = %path.display(), bytes = handle.len(), complete = handle.complete, "media saved");
        Ok(path)
    }

    fn layout(&self, descriptor: &MediaDescriptor) -> ChunkLayout {
        ChunkLayout::new(descriptor.total_size, self.config.chunk_size)
    }

    /// Make `descriptor` the active view, cancelling work for any other one.
    fn enter(&self, descriptor: &MediaDescriptor) -> Ticket {
        let mut view = self.view.lock();
        if view.descriptor.as_ref() != Some(descriptor) {
            debug!(file_id = %descriptor.file_id, "switching media view");
            view.replace(Some(descriptor.clone()));
            self.state.send_replace(MediaLoadState::default());
        }
        Ticket {
            generation: view.generation,
            token: view.token.clone(),
        }
    }

    async fn fetch(
        &self,
        descriptor: &MediaDescriptor,
        ticket: &Ticket,
        index: u64,
        cancel: &CancellationToken,
    ) -> Result<Bytes, TransferError> {
        let layout = self.layout(descriptor);
        let range = layout.range(index).ok_or(TransferError::ChunkOutOfRange {
            index,
            total: layout.chunk_count(),
        })?;

        let cell = {
            let mut view = self.view.lock();
            if view.generation != ticket.generation {
                return Err(TransferError::Cancelled);
            }
            view.chunks.entry(index).or_default().clone()
        };
        if let Some(bytes) = cell.get() {
            return Ok(bytes.clone());
        }

        let length = range.end - range.start;
        let init = cell.get_or_try_init(|| async {
            let chunk = self
                .port
                .get_file_chunk(&descriptor.file_id, range.start, length)
                .await
                .map_err(TransferError::from_backend)?;
            if chunk.data.len() as u64 != length {
                return Err(TransferError::Transport(format!(
                    "short read for chunk {index}: expected {length} bytes, got {}",
                    chunk.data.len()
                )));
            }
            debug!(file_id = %descriptor.file_id, index, start = range.start, length, "chunk fetched");
            self.publish(ticket, |s| s.total_size = Some(chunk.total_size));
            Ok(chunk.data)
        });

        let bytes = cancellable(&ticket.token, cancellable(cancel, async { init.await.cloned() })).await?;
        Ok(bytes)
    }

    fn begin(&self, ticket: &Ticket) {
        self.publish(ticket, |s| {
            s.is_loading = true;
            s.progress = 0.0;
            s.loaded_bytes = 0;
            s.error = None;
        });
    }

    fn finish(
        &self,
        descriptor: &MediaDescriptor,
        ticket: &Ticket,
        result: Result<MediaHandle, TransferError>,
    ) -> Result<MediaHandle, TransferError> {
        let mut view = self.view.lock();
        if view.generation != ticket.generation {
            return Err(TransferError::Cancelled);
        }

        match &result {
            Ok(handle) => {
                let keep_current = view
                    .handle
                    .as_ref()
                    .is_some_and(|current| current.len() > handle.len());
                if !keep_current {
                    view.handle = Some(handle.clone());
                }
                let loaded = view.handle.as_ref().map_or(0, |h| h.len() as u64);
                info!(file_id = %descriptor.file_id, bytes = handle.len(), complete = handle.complete, "media loaded");
                self.state.send_modify(|s| {
                    s.is_loading = false;
                    s.has_media = true;
                    s.progress = 100.0;
                    s.loaded_bytes = s.loaded_bytes.max(loaded);
                    s.error = None;
                });
            }
            Err(e) if e.is_cancelled() => {
                debug!(file_id = %descriptor.file_id, "media load cancelled");
                self.state.send_modify(|s| s.is_loading = false);
            }
            Err(e) => {
                warn!(file_id = %descriptor.file_id, error = %e, "media load failed");
                let message = e.to_string();
                self.state.send_modify(|s| {
                    s.is_loading = false;
                    s.error = Some(message);
                });
            }
        }
        result
    }

    /// Apply `update` to the published state unless the view has moved on.
    fn publish(&self, ticket: &Ticket, update: impl FnOnce(&mut MediaLoadState)) {
        let view = self.view.lock();
        if view.generation == ticket.generation {
            self.state.send_modify(update);
        }
    }
}

fn assemble(descriptor: &MediaDescriptor, parts: &[Bytes], complete: bool) -> MediaHandle {
    let len = parts.iter().map(Bytes::len).sum();
    let mut data = BytesMut::with_capacity(len);
    for part in parts {
        data.extend_from_slice(part);
    }
    MediaHandle {
        file_id: descriptor.file_id.clone(),
        content_type: descriptor.content_type.clone(),
        data: data.freeze(),
        complete,
    }
}
