#![cfg(all(feature = "http", feature = "local"))]

use bytes::Bytes;
use cadenza::adapters::local::http::router;
use cadenza::domain::media::MediaDescriptor;
use cadenza::domain::upload::{MediaFile, StartUploadRequest};
use cadenza::ports::clock::TokioClock;
use cadenza::ports::media::MediaPort;
use cadenza::ports::upload::UploadPort;
use cadenza::{
    BackendError, BackendSettings, ChunkedMediaCache, HttpBackend, InMemoryBackend,
    MediaCacheConfig, OrchestratorConfig, PollPolicy, UploadConfig, UploadOrchestrator,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

async fn serve(backend: InMemoryBackend) -> HttpBackend {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(backend)).await.unwrap();
    });
    HttpBackend::new(format!("http://{addr}")).unwrap()
}

fn quick_poll() -> PollPolicy {
    PollPolicy {
        initial_interval: Duration::from_millis(10),
        growth_factor: 1.5,
        max_interval: Duration::from_millis(50),
        max_total_wait: Some(Duration::from_secs(10)),
    }
}

#[tokio::test]
async fn full_pipeline_over_http() {
    let backend = InMemoryBackend::new(BackendSettings {
        pending_polls: 2,
        ..BackendSettings::default()
    });
    let client = serve(backend.clone()).await;

    let data: Vec<u8> = (0..300_000u32).map(|i| (i % 199) as u8).collect();
    let file = MediaFile::new("interview.mp4", "video/mp4", Bytes::from(data));
    let upload = UploadConfig {
        chunk_size: 64 * 1024,
        batch_width: 2,
        batch_delay: Duration::ZERO,
        ..UploadConfig::default()
    };
    let orchestrator = UploadOrchestrator::new(
        client.clone(),
        client.clone(),
        TokioClock,
        OrchestratorConfig {
            upload,
            transcription_poll: quick_poll(),
            summary_poll: quick_poll(),
        },
    );

    let outcome = orchestrator
        .run(&file, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(backend.file_bytes(&outcome.file_id).unwrap(), file.data);
    assert!(outcome.summary_text.starts_with("Summary:"));

    let descriptor = MediaDescriptor::new(&outcome.file_id, file.size(), "video/mp4");
    let cache = ChunkedMediaCache::new(
        client,
        MediaCacheConfig {
            chunk_size: 100_000,
            preload_chunks: 1,
        },
    );
    let full = cache
        .load_complete(&descriptor, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(full.data, file.data);
    assert_eq!(cache.state().total_size, Some(300_000));
}

#[tokio::test]
async fn errors_keep_their_kind_over_http() {
    let backend = InMemoryBackend::default();
    let file_id = backend.insert_file("a.wav", "audio/wav", Bytes::from_static(b"0123456789"));
    let client = serve(backend).await;

    let session_id = client
        .start_upload(&StartUploadRequest {
            filename: "b.wav".to_string(),
            content_type: "audio/wav".to_string(),
            total_size: 8,
            total_chunks: 2,
        })
        .await
        .unwrap();
    client
        .upload_chunk(&session_id, 0, Bytes::from_static(b"abcd"))
        .await
        .unwrap();

    let status = client.get_upload_status(&session_id).await.unwrap();
    assert_eq!((status.uploaded_chunks, status.total_chunks), (1, 2));
    assert!(matches!(
        client.complete_upload(&session_id).await,
        Err(BackendError::Incomplete(ref m)) if m == "Not all chunks have been uploaded"
    ));
    assert!(matches!(
        client.upload_chunk(&session_id, 5, Bytes::from_static(b"x")).await,
        Err(BackendError::Rejected(_))
    ));

    let chunk = client.get_file_chunk(&file_id, 4, 4).await.unwrap();
    assert_eq!(chunk.data, Bytes::from_static(b"4567"));
    assert_eq!(chunk.total_size, 10);
    assert!(matches!(
        client.get_file_chunk(&file_id, 10, 4).await,
        Err(BackendError::Rejected(ref m)) if m == "Invalid start position"
    ));
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = HttpBackend::with_timeout(format!("http://{addr}"), Some(Duration::from_secs(2))).unwrap();
    assert!(matches!(
        client.get_file_chunk("f", 0, 1).await,
        Err(BackendError::Transport(_))
    ));
}

#[tokio::test]
async fn ids_with_reserved_characters_reach_their_route() {
    let client = serve(InMemoryBackend::default()).await;

    for id in ["a/b", "a?b", "a#b"] {
        assert!(matches!(
            client.get_upload_status(id).await,
            Err(BackendError::Rejected(ref m)) if m == "Upload session not found"
        ));
        assert!(matches!(
            client.get_file_chunk(id, 0, 1).await,
            Err(BackendError::Rejected(ref m)) if m == "File not found"
        ));
    }
}
