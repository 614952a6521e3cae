//! Local metadata record management.

use crate::error::SyncError;
use crate::types::{FileRecord, HistoryEntry, SyncMetadata};
use std::io;
use std::path::Path;
use std::time::SystemTime;
use tracing::{info, warn};

/// Maximum number of entries kept in `sync_history`.
pub const HISTORY_LIMIT: usize = 10;

/// Current time as an RFC 3339 UTC string.
pub(crate) fn now_rfc3339() -> String {
    humantime::format_rfc3339_micros(SystemTime::now()).to_string()
}

/// Loads the metadata record.
///
/// A missing file yields an empty record. A file that is not valid JSON is
/// logged and also treated as absent; other I/O errors are returned.
pub fn load_metadata(path: &Path) -> Result<SyncMetadata, SyncError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(SyncMetadata::default()),
        Err(e) => return Err(e.into()),
    };

    match serde_json::from_str(&content) {
        Ok(metadata) => Ok(metadata),
        Err(e) => {
            warn!("Ignoring unreadable metadata {}: {}", path.display(), e);
            Ok(SyncMetadata::default())
        }
    }
}

/// Writes the record as pretty-printed UTF-8 JSON, overwriting the file.
pub fn save_metadata(path: &Path, metadata: &SyncMetadata) -> Result<(), SyncError> {
    let json = serde_json::to_string_pretty(metadata)?;
    std::fs::write(path, json)?;
    info!("Persisted metadata to {}", path.display());
    Ok(())
}

/// Values gathered during one sync run.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    /// Files processed this run, in processing order.
    pub files: Vec<(String, FileRecord)>,
    /// Version parsed from the local release descriptor.
    pub release_version: String,
    /// Modified date reported by the dataset API.
    pub api_modified_date: String,
    /// Timestamp of the run.
    pub timestamp: String,
}

/// Applies a completed run to the record.
///
/// A history entry is prepended with the version recorded before this run,
/// the top-level fields are replaced, and the history is cut to
/// [`HISTORY_LIMIT`] entries (oldest dropped).
pub fn apply_sync(metadata: &mut SyncMetadata, outcome: SyncOutcome) {
    let entry = HistoryEntry {
        date: outcome.timestamp.clone(),
        previous_version: metadata.release_version.clone(),
        new_version: outcome.release_version.clone(),
        changed_files: outcome.files.iter().map(|(name, _)| name.clone()).collect(),
    };

    metadata.last_sync = Some(outcome.timestamp);
    metadata.api_modified_date = outcome.api_modified_date;
    metadata.release_version = outcome.release_version;
    metadata.files = outcome.files.into_iter().collect();

    metadata.sync_history.insert(0, entry);
    metadata.sync_history.truncate(HISTORY_LIMIT);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(version: &str, timestamp: &str) -> SyncOutcome {
        SyncOutcome {
            files: vec![(
                "release.txt".to_string(),
                FileRecord {
                    sha256: "ab".repeat(32),
                    size: 42,
                    downloaded_at: timestamp.to_string(),
                },
            )],
            release_version: version.to_string(),
            api_modified_date: "2025-11-12 21:55:40".to_string(),
            timestamp: timestamp.to_string(),
        }
    }

    #[test]
    fn test_load_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let metadata = load_metadata(&dir.path().join("sync_metadata.json")).unwrap();
        assert_eq!(metadata, SyncMetadata::default());
    }

    #[test]
    fn test_load_malformed_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync_metadata.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_metadata(&path).unwrap(), SyncMetadata::default());
    }

    #[test]
    fn test_load_keeps_loose_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync_metadata.json");
        std::fs::write(
            &path,
            r#"{"release_version":"20250718","api_modified_date":null,
               "sync_history":[{"new_version":"20250718"}]}"#,
        )
        .unwrap();

        let metadata = load_metadata(&path).unwrap();
        assert_eq!(metadata.release_version, "20250718");
        assert_eq!(metadata.sync_history.len(), 1);
    }

    #[test]
    fn test_apply_records_previous_version() {
        let mut metadata = SyncMetadata {
            release_version: "20250325".to_string(),
            ..Default::default()
        };
        apply_sync(&mut metadata, outcome("20250718", "2025-07-20T00:00:00Z"));

        assert_eq!(metadata.release_version, "20250718");
        assert_eq!(metadata.last_sync.as_deref(), Some("2025-07-20T00:00:00Z"));
        assert_eq!(metadata.api_modified_date, "2025-11-12 21:55:40");
        assert_eq!(metadata.files["release.txt"].size, 42);

        let entry = &metadata.sync_history[0];
        assert_eq!(entry.previous_version, "20250325");
        assert_eq!(entry.new_version, "20250718");
        assert_eq!(entry.changed_files, vec!["release.txt"]);
    }

    #[test]
    fn test_history_is_bounded_newest_first() {
        let mut metadata = SyncMetadata::default();
        for run in 0..11 {
            let version = format!("v{}", run);
            apply_sync(&mut metadata, outcome(&version, &format!("t{}", run)));
        }

        assert_eq!(metadata.sync_history.len(), HISTORY_LIMIT);
        assert_eq!(metadata.sync_history[0].new_version, "v10");
        assert_eq!(metadata.sync_history[0].previous_version, "v9");
        assert_eq!(metadata.sync_history[9].new_version, "v1");
        assert!(metadata.sync_history.iter().all(|e| e.new_version != "v0"));
    }

    #[test]
    fn test_save_writes_unescaped_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync_metadata.json");
        let mut metadata = SyncMetadata::default();
        let mut run = outcome("20250718", "2025-07-20T00:00:00Z");
        run.files[0].0 = "地政.zip".to_string();
        apply_sync(&mut metadata, run);

        save_metadata(&path, &metadata).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("地政.zip"));
        assert!(written.contains("\n  "));
        assert_eq!(load_metadata(&path).unwrap(), metadata);
    }

    #[test]
    fn test_timestamp_is_utc() {
        assert!(now_rfc3339().ends_with('Z'));
    }
}
