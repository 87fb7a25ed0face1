use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use classroom_vision::config::Config;
use classroom_vision::inference::{
    FrameObservation, Gallery, GalleryStore, InferenceConfig, InferenceError, SessionEngine,
};
use classroom_vision::logging::init_tracing;
use classroom_vision::workers::session_runner::{channels, SessionRunner};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};

/// Replays recorded face observations through one inference session.
#[derive(Parser, Debug)]
#[command(name = "classroom-vision")]
#[command(version, about = "Replay face observations and report per-subject states", long_about = None)]
struct Args {
    /// Frames file, one JSON observation per line; stdin when omitted or `-`
    input: Option<PathBuf>,

    /// Write the session report here instead of stdout
    #[arg(short, long)]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    dotenvy::dotenv().ok();

    let config = Config::from_env();
    init_tracing(&config.log_config());

    if let Err(e) = run(config, args).await {
        tracing::error!(error = %e, "classroom-vision failed");
        std::process::exit(1);
    }
}

fn load_inference_config(config: &Config) -> Result<InferenceConfig, InferenceError> {
    match &config.inference.config_path {
        Some(path) => {
            tracing::info!(path = %path, "Loading inference config");
            InferenceConfig::from_json_file(path)
        }
        None => Ok(InferenceConfig::from_env(&config.inference)),
    }
}

fn load_gallery(config: &Config) -> Result<Gallery, InferenceError> {
    match &config.gallery_path {
        Some(path) => Gallery::load_json(path),
        None => {
            tracing::warn!("GALLERY_PATH not set, every face will be reported as unknown");
            Ok(Gallery::default())
        }
    }
}

async fn run(config: Config, args: Args) -> Result<(), InferenceError> {
    let inference_config = load_inference_config(&config)?;
    let gallery = Arc::new(GalleryStore::new(load_gallery(&config)?));
    let engine = SessionEngine::new(inference_config, gallery)?;

    let ((frames_tx, frames_rx), (records_tx, mut records_rx)) =
        channels(config.frame_channel_capacity);
    let runner = SessionRunner::spawn(engine, frames_rx, records_tx);

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(record) = records_rx.recv().await {
            let mut line = serde_json::to_vec(&record)?;
            line.push(b'\n');
            stdout.write_all(&line).await?;
        }
        stdout.flush().await?;
        Ok::<(), InferenceError>(())
    });

    let input: Box<dyn AsyncRead + Unpin + Send> = match &args.input {
        Some(path) if path.as_os_str() != "-" => Box::new(tokio::fs::File::open(path).await?),
        _ => Box::new(tokio::io::stdin()),
    };
    let mut lines = BufReader::new(input).lines();
    let mut line_no = 0_u64;
    let mut rejected = 0_u64;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        let frame: FrameObservation = match serde_json::from_str(&line) {
            Ok(f) => f,
            Err(e) => {
                rejected += 1;
                tracing::warn!(line = line_no, error = %e, "Skipping malformed frame");
                continue;
            }
        };
        if frames_tx.send(frame).await.is_err() {
            tracing::error!("Session runner stopped early");
            break;
        }
    }
    drop(frames_tx);

    let report = runner
        .await
        .map_err(|e| InferenceError::Io(std::io::Error::other(e)))?;
    writer
        .await
        .map_err(|e| InferenceError::Io(std::io::Error::other(e)))??;

    tracing::info!(lines = line_no, rejected, "Replay finished");

    let rendered = serde_json::to_string_pretty(&report)?;
    match &args.report {
        Some(path) => tokio::fs::write(path, rendered).await?,
        None => println!("{rendered}"),
    }
    Ok(())
}
