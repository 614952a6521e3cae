//! Error types for sync operations.

use std::io;
use thiserror::Error;

/// Errors that can occur while checking, downloading or unpacking the dataset.
#[derive(Error, Debug)]
pub enum SyncError {
    /// I/O error during file operations.
    #[error(transparent)]
    IoError(#[from] io::Error),

    /// HTTP transport error or non-2xx status.
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),

    /// The archive could not be read.
    #[error(transparent)]
    ZipError(#[from] zip::result::ZipError),

    /// General download failure.
    #[error("Download failed: {0}")]
    DownloadFailed(String),
}
