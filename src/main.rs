// This is the command-line entry point for the image uploader.
// Everything it calls goes through the library's public API in lib.rs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use image_uploader::utils::ImageFormat;
use image_uploader::{
    AppState, Connection, DeleteFileRequest, DownloadFileRequest, ListFilesRequest, Settings,
    UploadFileRequest, delete_file, download_file, list_files, upload_file,
};

#[derive(Parser, Debug)]
#[command(name = "image-uploader")]
#[command(about = "Normalize images and store them in an S3-compatible bucket")]
struct Args {
    /// Settings file holding the connection and image processing options
    #[arg(short, long, default_value = "settings.toml")]
    settings: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize an image and upload it
    Upload {
        file: PathBuf,
        /// Object name; defaults to the file stem
        #[arg(short, long)]
        name: Option<String>,
    },
    /// List the images uploaded on a day (YYYY-MM-DD)
    List {
        date: String,
        #[arg(long)]
        next_token: Option<String>,
    },
    /// Download an object to a file, or stdout
    Download {
        key: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete an object and wait until it is gone
    Delete { key: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("image_uploader=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_target(false)
        .with_ansi(true)
        // stdout carries command output
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let args = Args::parse();

    let settings = Settings::load(&args.settings)?;
    debug!("Loaded settings from {}", args.settings.display());
    let connection = settings
        .connection
        .clone()
        .context("Settings file has no [connection] section")?;

    let state = AppState::default();

    match args.command {
        Command::Upload { file, name } => {
            let name = match name {
                Some(name) => name,
                None => file_stem(&file)?,
            };
            check_extension(&file);
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;

            let response = upload_file(
                &state,
                UploadFileRequest {
                    connection,
                    image_processing: settings.image_processing,
                    name,
                    data,
                },
            )
            .await?;
            print_json(&response)?;
        }
        Command::List { date, next_token } => {
            let response = list_files(
                &state,
                ListFilesRequest {
                    connection,
                    date_string: date,
                    next_token,
                },
            )
            .await?;
            print_json(&response)?;
        }
        Command::Download { key, output } => {
            download(&state, connection, key, output).await?;
        }
        Command::Delete { key } => {
            let key = delete_file(&state, DeleteFileRequest { connection, key }).await?;
            print_json(&key)?;
        }
    }

    Ok(())
}

async fn download(state: &AppState, connection: Connection, key: String, output: Option<PathBuf>) -> Result<()> {
    let stream = download_file(state, DownloadFileRequest { connection, key: key.clone() }).await?;

    let written = match &output {
        Some(path) => {
            let file = tokio::fs::File::create(path)
                .await
                .with_context(|| format!("Failed to create {}", path.display()))?;
            copy_stream(stream, file).await?
        }
        None => copy_stream(stream, tokio::io::stdout()).await?,
    };

    info!("Downloaded {} ({} bytes)", key, written);
    Ok(())
}

async fn copy_stream<W: AsyncWrite + Unpin>(
    mut stream: image_uploader::storage::ObjectStream,
    mut writer: W,
) -> Result<u64> {
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("Failed to read object body")?;
        writer.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    writer.flush().await?;
    Ok(written)
}

/// Warns when the file extension names no supported format; the bytes still decide.
fn check_extension(path: &Path) {
    match ImageFormat::from_path(path) {
        Some(Ok(format)) => debug!("{} looks like {}", path.display(), format.name()),
        Some(Err(err)) => warn!("{}: {}", path.display(), err),
        None => {}
    }
}

fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .with_context(|| format!("Cannot derive an object name from {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
