//! Configuration and the persisted metadata record.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Name of the metadata file written under the root path.
pub const METADATA_FILE: &str = "sync_metadata.json";

/// Name of the plain-text release descriptor.
pub const RELEASE_FILE: &str = "release.txt";

const DEFAULT_API_URL: &str = "https://data.gov.tw/api/v2/rest/dataset/5961";
const DEFAULT_BASE_URL: &str = "https://www.cns11643.gov.tw/opendata";
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;
const DEFAULT_DOWNLOAD_RETRIES: usize = 2;

/// Files fetched from the open-data host, in download order.
pub const DEFAULT_SYNC_FILES: [&str; 4] = [
    RELEASE_FILE,
    "OpenDataFilesList.csv",
    "MapingTables.zip",
    "Properties.zip",
];

/// Configuration for a single process run.
///
/// Built once from the environment at startup and passed by reference
/// everywhere else; nothing downstream reads environment variables.
///
/// # Example
///
/// ```
/// use cnssync::SyncConfig;
/// use std::collections::HashMap;
///
/// let env = HashMap::from([("PROJECT_ROOT", "/srv/cns"), ("FORCE_DOWNLOAD", "TRUE")]);
/// let config = SyncConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()));
///
/// assert!(config.force_download);
/// assert_eq!(config.metadata_path(), std::path::Path::new("/srv/cns/sync_metadata.json"));
/// ```
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Dataset metadata API (`DATA_GOV_API_URL`).
    pub api_url: String,
    /// Base URL of the open-data host (`CNS11643_BASE_URL`).
    pub base_url: String,
    /// Directory holding `release.txt`, the file list and the metadata record (`PROJECT_ROOT`).
    pub root_path: PathBuf,
    /// Directory that archives are unpacked into (`TABLES_PATH`).
    pub tables_path: PathBuf,
    /// Metadata file name, relative to `root_path`.
    pub metadata_file: String,
    /// Treat every check as "update needed" (`FORCE_DOWNLOAD`).
    pub force_download: bool,
    /// Per-request timeout for downloads in seconds (`DOWNLOAD_TIMEOUT`).
    pub download_timeout: u64,
    /// Extra attempts for a failed download before the file is skipped (`DOWNLOAD_RETRIES`).
    pub download_retries: usize,
    /// Modified date handed over from a previous `check` run (`API_MODIFIED_DATE`).
    pub api_modified_date: String,
    /// Files to download, processed in order.
    pub sync_files: Vec<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            root_path: PathBuf::from("."),
            tables_path: PathBuf::from("./Tables"),
            metadata_file: METADATA_FILE.to_string(),
            force_download: false,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            download_retries: DEFAULT_DOWNLOAD_RETRIES,
            api_modified_date: String::new(),
            sync_files: DEFAULT_SYNC_FILES.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl SyncConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Missing keys keep their defaults. Numeric values that fail to parse
    /// also fall back to the default rather than failing the run.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            api_url: lookup("DATA_GOV_API_URL").unwrap_or(defaults.api_url),
            base_url: lookup("CNS11643_BASE_URL").unwrap_or(defaults.base_url),
            root_path: lookup("PROJECT_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.root_path),
            tables_path: lookup("TABLES_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.tables_path),
            metadata_file: defaults.metadata_file,
            force_download: lookup("FORCE_DOWNLOAD")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            download_timeout: lookup("DOWNLOAD_TIMEOUT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.download_timeout),
            download_retries: lookup("DOWNLOAD_RETRIES")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.download_retries),
            api_modified_date: lookup("API_MODIFIED_DATE").unwrap_or_default(),
            sync_files: defaults.sync_files,
        }
    }

    /// Full path of the metadata record.
    pub fn metadata_path(&self) -> PathBuf {
        self.root_path.join(&self.metadata_file)
    }

    /// Full path of the local release descriptor.
    pub fn release_path(&self) -> PathBuf {
        self.root_path.join(RELEASE_FILE)
    }
}

/// Reads `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Download record for one synced file.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct FileRecord {
    /// Hex SHA-256 of the downloaded bytes.
    #[serde(default, deserialize_with = "null_as_default")]
    pub sha256: String,
    /// Size in bytes.
    #[serde(default, deserialize_with = "null_as_default")]
    pub size: u64,
    /// RFC 3339 UTC timestamp.
    #[serde(default, deserialize_with = "null_as_default")]
    pub downloaded_at: String,
}

/// One entry of the sync history, newest first in [`SyncMetadata::sync_history`].
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub previous_version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub new_version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub changed_files: Vec<String>,
}

/// The persisted metadata record (`sync_metadata.json`).
///
/// Keys this crate does not know about are kept in `extra` and written
/// back unchanged. Missing or `null` fields read as empty.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SyncMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub api_modified_date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub release_version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub files: BTreeMap<String, FileRecord>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sync_history: Vec<HistoryEntry>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> SyncConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SyncConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.api_url, "https://data.gov.tw/api/v2/rest/dataset/5961");
        assert_eq!(config.base_url, "https://www.cns11643.gov.tw/opendata");
        assert_eq!(config.download_timeout, 300);
        assert!(!config.force_download);
        assert!(config.api_modified_date.is_empty());
        for file in DEFAULT_SYNC_FILES {
            assert!(config.sync_files.iter().any(|f| f == file));
        }
    }

    #[test]
    fn test_env_override() {
        let config = config_from(&[
            ("DATA_GOV_API_URL", "https://custom.api.url"),
            ("CNS11643_BASE_URL", "https://custom.base.url"),
            ("DOWNLOAD_TIMEOUT", "45"),
            ("FORCE_DOWNLOAD", "True"),
            ("API_MODIFIED_DATE", "2025-11-12 21:55:40"),
        ]);
        assert_eq!(config.api_url, "https://custom.api.url");
        assert_eq!(config.base_url, "https://custom.base.url");
        assert_eq!(config.download_timeout, 45);
        assert!(config.force_download);
        assert_eq!(config.api_modified_date, "2025-11-12 21:55:40");
    }

    #[test]
    fn test_bad_numbers_fall_back() {
        let config = config_from(&[("DOWNLOAD_TIMEOUT", "soon"), ("FORCE_DOWNLOAD", "yes")]);
        assert_eq!(config.download_timeout, 300);
        assert!(!config.force_download);
    }

    #[test]
    fn test_metadata_path() {
        let config = config_from(&[("PROJECT_ROOT", "/data/cns")]);
        assert_eq!(
            config.metadata_path(),
            PathBuf::from("/data/cns").join(&config.metadata_file)
        );
        assert_eq!(config.release_path(), PathBuf::from("/data/cns/release.txt"));
    }

    #[test]
    fn test_metadata_keeps_unknown_keys() {
        let raw = r#"{"release_version":"20250718","note":"manual import"}"#;
        let metadata: SyncMetadata = serde_json::from_str(raw).unwrap();
        assert_eq!(metadata.release_version, "20250718");
        assert!(metadata.sync_history.is_empty());

        let written = serde_json::to_value(&metadata).unwrap();
        assert_eq!(written["note"], "manual import");
    }

    #[test]
    fn test_metadata_tolerates_loose_shape() {
        let raw = r#"{
            "api_modified_date": null,
            "release_version": "20250718",
            "files": {"release.txt": {"sha256": "ab", "size": null}},
            "sync_history": [
                {"new_version": "20250718", "previous_version": null},
                {"date": "2025-03-25T00:00:00Z", "new_version": "20250325"}
            ]
        }"#;
        let metadata: SyncMetadata = serde_json::from_str(raw).unwrap();

        assert_eq!(metadata.release_version, "20250718");
        assert_eq!(metadata.api_modified_date, "");
        assert_eq!(metadata.files["release.txt"].size, 0);
        assert_eq!(metadata.files["release.txt"].downloaded_at, "");
        assert_eq!(metadata.sync_history.len(), 2);
        assert_eq!(metadata.sync_history[0].date, "");
        assert_eq!(metadata.sync_history[0].previous_version, "");
        assert_eq!(metadata.sync_history[1].new_version, "20250325");
    }
}
