use bytes::Bytes;
use cadenza::domain::progress::UploadStage;
use cadenza::domain::upload::MediaFile;
use cadenza::ports::clock::TokioClock;
use cadenza::{
    BackendSettings, ChunkedMediaCache, InMemoryBackend, MediaCacheConfig, OrchestratorConfig,
    TransferError, UploadConfig, UploadOrchestrator,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const MIB: usize = 1024 * 1024;

type Orchestrator = UploadOrchestrator<InMemoryBackend, InMemoryBackend, TokioClock>;

fn orchestrator(backend: &InMemoryBackend, upload: UploadConfig) -> Orchestrator {
    UploadOrchestrator::new(
        backend.clone(),
        backend.clone(),
        TokioClock,
        OrchestratorConfig::new(upload),
    )
}

fn recording(len: usize) -> MediaFile {
    let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
    MediaFile::new("standup.mp3", "audio/mpeg", Bytes::from(data))
}

#[tokio::test(start_paused = true)]
async fn upload_then_stream_back() {
    let backend = InMemoryBackend::new(BackendSettings {
        pending_polls: 2,
        ..BackendSettings::default()
    });
    let file = recording(3 * MIB + MIB / 2);
    let orchestrator = orchestrator(&backend, UploadConfig::default());

    let outcome = orchestrator
        .run(&file, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(backend.file_bytes(&outcome.file_id).unwrap(), file.data);
    assert!(outcome.transcription_text.contains("standup.mp3"));
    assert!(outcome.summary_text.starts_with("Summary:"));
    let state = orchestrator.state();
    assert_eq!(state.stage, UploadStage::Complete);
    assert_eq!(state.progress, 100.0);

    let descriptor = backend.describe(&outcome.file_id).unwrap();
    let cache = ChunkedMediaCache::new(backend.clone(), MediaCacheConfig::default());
    let cancel = CancellationToken::new();

    let partial = cache.open(&descriptor, &cancel).await.unwrap();
    assert!(!partial.complete);
    assert_eq!(partial.data, file.data.slice(0..3 * MIB));

    let full = cache.load_complete(&descriptor, &cancel).await.unwrap();
    assert!(full.complete);
    assert_eq!(full.data, file.data);
    assert_eq!(cache.cached_chunks(), vec![0, 1, 2, 3]);

    let dir = tempfile::tempdir().unwrap();
    let saved = cache.download(dir.path()).await.unwrap();
    assert_eq!(saved.file_name().unwrap(), "standup.mp3");
    assert_eq!(tokio::fs::read(&saved).await.unwrap(), file.data.to_vec());
}

#[tokio::test]
async fn oversized_file_is_refused_before_upload() {
    let backend = InMemoryBackend::default();
    let orchestrator = orchestrator(
        &backend,
        UploadConfig {
            max_upload_size: 1024,
            ..UploadConfig::default()
        },
    );

    let err = orchestrator
        .run(&recording(2048), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::InvalidFile(_)));
    assert_eq!(backend.open_sessions(), 0);
    let state = orchestrator.state();
    assert_eq!(state.stage, UploadStage::Error);
    assert!(state.error.is_some());
}

#[tokio::test]
async fn backend_limit_surfaces_as_rejection() {
    let backend = InMemoryBackend::new(BackendSettings {
        max_upload_size: 1024,
        ..BackendSettings::default()
    });
    let orchestrator = orchestrator(&backend, UploadConfig::default());

    let err = orchestrator
        .run(&recording(4096), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::BackendRejected(_)));
    assert_eq!(orchestrator.state().progress, 0.0);
}

#[tokio::test(start_paused = true)]
async fn second_run_is_refused_and_cancel_returns_to_idle() {
    let backend = InMemoryBackend::new(BackendSettings {
        pending_polls: 1_000,
        ..BackendSettings::default()
    });
    let orchestrator = Arc::new(orchestrator(
        &backend,
        UploadConfig {
            chunk_size: 1024,
            ..UploadConfig::default()
        },
    ));
    let cancel = CancellationToken::new();

    let first = {
        let orchestrator = orchestrator.clone();
        let cancel = cancel.clone();
        let file = recording(10_000);
        tokio::spawn(async move { orchestrator.run(&file, &cancel).await })
    };

    // Let the first run get through the upload and into transcription polling.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(orchestrator.state().stage, UploadStage::Processing);

    let err = orchestrator
        .run(&recording(10), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::UploadInProgress));

    cancel.cancel();
    assert!(first.await.unwrap().unwrap_err().is_cancelled());

    let state = orchestrator.state();
    assert_eq!(state.stage, UploadStage::Idle);
    assert_eq!(state.progress, 0.0);
    assert!(state.error.is_none());
}
