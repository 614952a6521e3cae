//! Main orchestration logic for a sync run.

use crate::download::{build_client, download_file, format_size};
use crate::error::SyncError;
use crate::extract::{extract_archive, extract_nested_archive, nested_archive_for, ARCHIVE_SUFFIX};
use crate::metadata::{apply_sync, load_metadata, now_rfc3339, save_metadata, SyncOutcome};
use crate::release::parse_release_file;
use crate::types::{FileRecord, SyncConfig};
use std::time::Duration;
use tokio_retry2::{Retry, RetryError};
use tracing::{error, info, warn};

/// Interval between download attempts for the same file.
const RETRY_INTERVAL_MS: u64 = 5_000;

/// Summary of a successful sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Files downloaded and processed, in configured order.
    pub files: Vec<String>,
    /// Files that failed and were skipped.
    pub failed: Vec<String>,
    /// Release version recorded in the metadata.
    pub release_version: String,
}

/// Downloads every configured file and updates the metadata record.
///
/// Files are processed one after another in the configured order. A file
/// that fails is logged and skipped; the run only fails when no file at all
/// was processed, in which case the metadata record is left untouched.
///
/// # Example
///
/// ```no_run
/// use cnssync::{sync, SyncConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let report = sync(&SyncConfig::from_env()).await?;
/// println!("synced {} files", report.files.len());
/// # Ok(())
/// # }
/// ```
pub async fn sync(config: &SyncConfig) -> Result<SyncReport, SyncError> {
    info!("🚀 Syncing CNS11643 open data from {}", config.base_url);
    std::fs::create_dir_all(&config.root_path)?;

    let metadata_path = config.metadata_path();
    let mut metadata = load_metadata(&metadata_path)?;

    // The open-data host serves an invalid certificate; this client never
    // talks to any other host.
    let client = build_client(Duration::from_secs(config.download_timeout), true)?;

    let mut downloaded = Vec::new();
    let mut failed = Vec::new();
    for filename in &config.sync_files {
        match download_and_process(config, &client, filename).await {
            Ok(record) => downloaded.push((filename.clone(), record)),
            Err(e) => {
                warn!("⚠️  {} was not processed: {}", filename, e);
                failed.push(filename.clone());
            }
        }
    }

    if downloaded.is_empty() {
        error!("❌ No file was downloaded");
        return Err(SyncError::DownloadFailed(
            "no file was downloaded successfully".to_string(),
        ));
    }

    let release_version = parse_release_file(&config.release_path());
    let files: Vec<String> = downloaded.iter().map(|(name, _)| name.clone()).collect();
    apply_sync(
        &mut metadata,
        SyncOutcome {
            files: downloaded,
            release_version: release_version.clone(),
            api_modified_date: config.api_modified_date.clone(),
            timestamp: now_rfc3339(),
        },
    );
    save_metadata(&metadata_path, &metadata)?;

    info!("✅ Sync completed, {} files processed", files.len());
    Ok(SyncReport {
        files,
        failed,
        release_version,
    })
}

/// Downloads one file and unpacks it when it is an archive.
///
/// Archives are extracted into `tables_path/<name without suffix>`, which is
/// cleared first, and then deleted. A known nested archive inside the
/// extraction directory is unpacked in place without clearing and deleted
/// as well.
pub async fn download_and_process(
    config: &SyncConfig,
    client: &reqwest::Client,
    filename: &str,
) -> Result<FileRecord, SyncError> {
    let url = format!("{}/{}", config.base_url, filename);
    let local_path = config.root_path.join(filename);
    info!("⬇️  Downloading {}", filename);

    let retry_strategy = tokio_retry2::strategy::FixedInterval::from_millis(RETRY_INTERVAL_MS)
        .take(config.download_retries);
    let downloaded = Retry::spawn(retry_strategy, || {
        let url = url.clone();
        let local_path = local_path.clone();
        async move {
            match download_file(client, &url, &local_path).await {
                Ok(downloaded) => Ok(downloaded),
                Err(e) => {
                    warn!("Failed to download {} due to error: {}", url, e);
                    RetryError::to_transient(e)
                }
            }
        }
    })
    .await?;

    let record = FileRecord {
        sha256: downloaded.sha256,
        size: downloaded.size,
        downloaded_at: now_rfc3339(),
    };

    if let Some(stem) = filename.strip_suffix(ARCHIVE_SUFFIX) {
        let extract_dir = config.tables_path.join(stem);
        extract_archive(&local_path, &extract_dir)?;
        std::fs::remove_file(&local_path)?;

        if let Some(nested) = nested_archive_for(filename) {
            extract_nested_archive(&extract_dir, nested)?;
        }
    }

    info!("✅ {} done: {}", filename, format_size(record.size));
    Ok(record)
}
