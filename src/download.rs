//! File download functionality.

use crate::error::SyncError;
use futures_util::StreamExt;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

/// User agent sent with every request.
pub(crate) const USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Result of a completed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    /// Hex SHA-256 of the bytes written.
    pub sha256: String,
    /// Number of bytes written.
    pub size: u64,
}

/// Builds an HTTP client with the given timeout.
///
/// The timeout bounds connecting and each read separately, so a slow body
/// that keeps arriving is never cut off.
///
/// `accept_invalid_certs` exists for the open-data host only, whose
/// certificate chain does not validate. The dataset API and any other host
/// must be reached through a client built with `false`.
pub fn build_client(
    timeout: Duration,
    accept_invalid_certs: bool,
) -> Result<reqwest::Client, SyncError> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(timeout)
        .read_timeout(timeout)
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()?;
    Ok(client)
}

fn progress_bar(content_length: Option<u64>, name: &str) -> indicatif::ProgressBar {
    let pb = match content_length {
        Some(len) => {
            let pb = indicatif::ProgressBar::new(len);
            if let Ok(style) = indicatif::ProgressStyle::default_bar().template(
                "{spinner:.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg} | ETA {eta}",
            ) {
                pb.set_style(style.progress_chars("█▓▒░ "));
            }
            pb
        }
        None => {
            let pb = indicatif::ProgressBar::new_spinner();
            if let Ok(style) = indicatif::ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {bytes} {msg}")
            {
                pb.set_style(style);
            }
            pb
        }
    };
    pb.set_message(format!("⬇️  {}", name));
    pb
}

/// Streams `url` into `filename`, hashing the bytes as they are written.
///
/// The file is hashed in the same pass that writes it; it is never re-read.
/// The Content-Length header, when present, must match the received size.
pub(crate) async fn download_file(
    client: &reqwest::Client,
    url: &str,
    filename: &Path,
) -> Result<DownloadedFile, SyncError> {
    let file_display_name = filename
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(url);

    if let Some(parent) = filename.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let response = client.get(url).send().await?.error_for_status()?;
    let content_length = response.content_length();
    let pb = progress_bar(content_length, file_display_name);

    let mut file = BufWriter::new(tokio::fs::File::create(filename).await?);
    let mut hasher = Sha256::new();
    let mut size = 0u64;

    let mut byte_stream = response.bytes_stream();
    while let Some(piece) = byte_stream.next().await {
        let chunk = piece?;
        hasher.update(&chunk);
        file.write_all(&chunk).await?;
        size += chunk.len() as u64;
        pb.set_position(size);
    }
    file.flush().await?;
    pb.finish_and_clear();

    if let Some(expected) = content_length {
        if size != expected {
            return Err(SyncError::DownloadFailed(format!(
                "size mismatch for {}: expected {} bytes, got {} bytes",
                file_display_name, expected, size
            )));
        }
    }

    let sha256 = format!("{:x}", hasher.finalize());
    debug!("{} sha256={} size={}", file_display_name, sha256, size);
    Ok(DownloadedFile { sha256, size })
}

/// Formats a byte count with binary units and one decimal place.
pub fn format_size(size: u64) -> String {
    let mut value = size as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if value < 1024.0 {
            return format!("{:.1} {}", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:.1} TB", value)
}
