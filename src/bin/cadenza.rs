//! Cadenza CLI
//!
//! - `upload <path>`: chunked upload, then transcription and summary
//! - `fetch <file-id>`: chunked download of a stored file
//!
//! Environment Variables: see `ClientConfig::from_env`. Ctrl-C cancels the
//! running command.

use cadenza::domain::media::MediaDescriptor;
use cadenza::domain::upload::MediaFile;
use cadenza::ports::clock::TokioClock;
use cadenza::ports::media::MediaPort;
use cadenza::{ChunkedMediaCache, ClientConfig, HttpBackend, TransferError, UploadOrchestrator};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(name = "cadenza", version, about = "Chunked media upload and transcription client")]
struct Args {
    /// Backend base URL, overrides BACKEND_URL
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload a media file and wait for its transcript and summary
    Upload {
        path: PathBuf,

        /// Content type, guessed from the extension when omitted
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Download a stored file chunk by chunk
    Fetch {
        file_id: String,

        /// Directory the file is saved into
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// Name of the saved file, defaults to the file id
        #[arg(long)]
        name: Option<String>,

        /// Only fetch the leading preload chunks
        #[arg(long)]
        partial: bool,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    if let Err(e) = run(args).await {
        if e.is_cancelled() {
            info!("cancelled");
            process::exit(130);
        }
        error!("{}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

async fn run(args: Args) -> Result<(), TransferError> {
    let mut config = ClientConfig::from_env();
    if let Some(url) = args.backend_url {
        config.backend_url = url;
    }
    let timeout = args.timeout.map(std::time::Duration::from_secs);
    let backend = HttpBackend::with_timeout(config.backend_url.clone(), timeout)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    match args.command {
        Commands::Upload { path, content_type } => {
            upload(backend, &config, path, content_type, &cancel).await
        }
        Commands::Fetch {
            file_id,
            out,
            name,
            partial,
        } => fetch(backend, &config, file_id, out, name, partial, &cancel).await,
    }
}

async fn upload(
    backend: HttpBackend,
    config: &ClientConfig,
    path: PathBuf,
    content_type: Option<String>,
    cancel: &CancellationToken,
) -> Result<(), TransferError> {
    let file = MediaFile::from_path(&path, content_type.as_deref()).await?;
    info!(file = %path.display(), size = file.size(), content_type = %file.content_type, "uploading");

    let orchestrator =
        UploadOrchestrator::new(backend.clone(), backend, TokioClock, config.orchestrator());

    let mut rx = orchestrator.subscribe();
    let reporter = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            info!(progress = state.progress.round() as u64, stage = %state.stage, "upload");
        }
    });

    let result = orchestrator.run(&file, cancel).await;
    drop(orchestrator);
    let _ = reporter.await;
    let outcome = result?;

    println!("file id:       {}", outcome.file_id);
    println!("transcription: {}", outcome.transcription_job_id);
    println!();
    println!("{}", outcome.transcription_text);
    println!();
    println!("{}", outcome.summary_text);
    Ok(())
}

async fn fetch(
    backend: HttpBackend,
    config: &ClientConfig,
    file_id: String,
    out: PathBuf,
    name: Option<String>,
    partial: bool,
    cancel: &CancellationToken,
) -> Result<(), TransferError> {
    // A one byte read reports the total size.
    let head = backend.get_file_chunk(&file_id, 0, 1).await?;
    let descriptor = MediaDescriptor::new(&file_id, head.total_size, "application/octet-stream")
        .with_filename(name.unwrap_or_else(|| file_id.clone()));

    let cache = ChunkedMediaCache::new(backend, config.media.clone());
    let mut rx = cache.subscribe();
    let reporter = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            if state.is_loading {
                info!(
                    progress = state.progress.round() as u64,
                    loaded_bytes = state.loaded_bytes,
                    "fetching"
                );
            }
        }
    });

    let handle = if partial {
        cache.open(&descriptor, cancel).await
    } else {
        cache.load_complete(&descriptor, cancel).await
    };
    let saved = match handle {
        Ok(_) => cache.download(&out).await,
        Err(e) => Err(e),
    };
    drop(cache);
    let _ = reporter.await;

    let path = saved?;
    println!("{}", path.display());
    Ok(())
}
