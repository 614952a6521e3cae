//! CNSSync - keeps a local copy of the CNS11643 open-data tables current
//!
//! This library checks the government open-data portal for a new release of
//! the CNS11643 reference tables, downloads and unpacks the changed archives,
//! and records a bounded sync history next to the data.
//!
//! # Features
//!
//! - **Update Check**: Compare the dataset API date and release version against the local record
//! - **SHA-256 Tracking**: Hash every download in a single streaming pass
//! - **Big5 File Names**: Repair archive entry names that were stored without the UTF-8 flag
//! - **Nested Archives**: Unpack the component-glyph archive shipped inside `Properties.zip`
//! - **Verification**: Check the unpacked layout before publishing it
//!
//! # Example
//!
//! ```no_run
//! use cnssync::{check_for_update, sync, SyncConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SyncConfig::from_env();
//!
//! if check_for_update(&config).await?.has_update {
//!     sync(&config).await?;
//! }
//! # Ok(())
//! # }
//! ```

mod check;
mod ci_output;
mod download;
mod error;
mod extract;
mod metadata;
mod orchestrator;
mod release;
mod types;
mod verify;

pub use check::{
    check_for_update, decide, fetch_api_modified_date, fetch_remote_release_version,
    UpdateDecision, UpdateReason,
};
pub use ci_output::CiOutput;
pub use download::{build_client, format_size};
pub use error::SyncError;
pub use extract::{
    extract_archive, extract_archive_preserving, extract_nested_archive, repair_entry_name,
};
pub use metadata::{apply_sync, load_metadata, save_metadata, SyncOutcome, HISTORY_LIMIT};
pub use orchestrator::{download_and_process, sync, SyncReport};
pub use release::{parse_release_file, parse_version};
pub use types::{FileRecord, HistoryEntry, SyncConfig, SyncMetadata, METADATA_FILE, RELEASE_FILE};
pub use verify::{verify_data, VerifyReport, REQUIRED_DIRECTORIES, REQUIRED_FILES};
