//! Completeness checks for the synced data on disk.
//!
//! Two tiers run against the root path: required directories (present and
//! not empty) and required files (present and not zero-length). The
//! metadata check is a third, optional tier. Every tier reports all of its
//! problems instead of stopping at the first one.

use crate::types::SyncConfig;
use std::path::Path;
use tracing::{error, info};

/// Directories that must exist and contain at least one entry.
pub const REQUIRED_DIRECTORIES: [&str; 6] = [
    "Tables/MapingTables",
    "Tables/MapingTables/Big5",
    "Tables/MapingTables/Unicode",
    "Tables/MapingTables/地政",
    "Tables/Properties",
    "Tables/Properties/parts",
];

/// Files that must exist and be non-empty, relative to the root path.
pub const REQUIRED_FILES: [&str; 12] = [
    "release.txt",
    "OpenDataFilesList.csv",
    "Tables/MapingTables/Big5/CNS2BIG5.txt",
    "Tables/MapingTables/Unicode/CNS2UNICODE_Unicode BMP.txt",
    "Tables/MapingTables/CNS2DCI.txt",
    "Tables/MapingTables/CNS2TAX.txt",
    "Tables/MapingTables/CNS2INC.txt",
    "Tables/MapingTables/CNS2FIN.txt",
    "Tables/Properties/CNS_phonetic.txt",
    "Tables/Properties/CNS_radical.txt",
    "Tables/Properties/CNS_stroke.txt",
    "Tables/Properties/CNS_cangjie.txt",
];

/// Errors collected by [`verify_data`], grouped by tier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub directory_errors: Vec<String>,
    pub file_errors: Vec<String>,
    pub metadata_errors: Vec<String>,
}

impl VerifyReport {
    pub fn passed(&self) -> bool {
        self.error_count() == 0
    }

    pub fn error_count(&self) -> usize {
        self.directory_errors.len() + self.file_errors.len() + self.metadata_errors.len()
    }
}

/// Checks the required directory layout under `base_path`.
pub fn verify_directories(base_path: &Path) -> Vec<String> {
    let mut errors = Vec::new();
    for dir in REQUIRED_DIRECTORIES {
        let full_path = base_path.join(dir);
        if !full_path.is_dir() {
            errors.push(format!("missing directory: {}", dir));
        } else if is_empty_dir(&full_path) {
            errors.push(format!("empty directory: {}", dir));
        }
    }
    errors
}

fn is_empty_dir(path: &Path) -> bool {
    match std::fs::read_dir(path) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => true,
    }
}

/// Checks the required files under `base_path`.
pub fn verify_files(base_path: &Path) -> Vec<String> {
    let mut errors = Vec::new();
    for file in REQUIRED_FILES {
        let full_path = base_path.join(file);
        match std::fs::metadata(&full_path) {
            Ok(meta) if meta.is_file() => {
                if meta.len() == 0 {
                    errors.push(format!("empty file: {}", file));
                }
            }
            _ => errors.push(format!("missing file: {}", file)),
        }
    }
    errors
}

/// Checks that the metadata record exists and carries a release version.
pub fn verify_metadata(metadata_path: &Path) -> Vec<String> {
    let name = metadata_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| metadata_path.display().to_string());

    let content = match std::fs::read_to_string(metadata_path) {
        Ok(content) => content,
        Err(_) => return vec![format!("missing metadata file: {}", name)],
    };

    let value: serde_json::Value = match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => return vec![format!("unreadable metadata file {}: {}", name, e)],
    };

    let has_version = value
        .get("release_version")
        .and_then(|v| v.as_str())
        .is_some_and(|v| !v.is_empty());
    if has_version {
        Vec::new()
    } else {
        vec![format!("metadata has no release version: {}", name)]
    }
}

fn report_tier(label: &str, errors: &[String], ok_message: String) {
    info!("[{}] verifying...", label);
    if errors.is_empty() {
        info!("  ✓ {}", ok_message);
    }
    for e in errors {
        error!("  ✗ {}", e);
    }
}

/// Runs all enabled checks against `config.root_path` and logs the results.
///
/// `skip_metadata` disables the metadata tier so the layout can be checked
/// before any version has been recorded.
pub fn verify_data(config: &SyncConfig, skip_metadata: bool) -> VerifyReport {
    let base_path = &config.root_path;
    info!("🔍 Verifying data under {}", base_path.display());

    let directory_errors = verify_directories(base_path);
    report_tier(
        "L1",
        &directory_errors,
        format!("{} directories present", REQUIRED_DIRECTORIES.len()),
    );

    let file_errors = verify_files(base_path);
    report_tier(
        "L2",
        &file_errors,
        format!("{} required files present", REQUIRED_FILES.len()),
    );

    let metadata_errors = if skip_metadata {
        Vec::new()
    } else {
        let errors = verify_metadata(&config.metadata_path());
        report_tier("Meta", &errors, "metadata complete".to_string());
        errors
    };

    let report = VerifyReport {
        directory_errors,
        file_errors,
        metadata_errors,
    };
    if report.passed() {
        info!("✅ Verification passed");
    } else {
        error!("❌ Verification failed: {} problem(s)", report.error_count());
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config_for(root: &Path) -> SyncConfig {
        SyncConfig {
            root_path: root.to_path_buf(),
            tables_path: root.join("Tables"),
            ..Default::default()
        }
    }

    fn create_complete_structure(root: &Path) {
        for dir in REQUIRED_DIRECTORIES {
            std::fs::create_dir_all(root.join(dir)).unwrap();
        }
        for file in REQUIRED_FILES {
            std::fs::write(root.join(file), "test").unwrap();
        }
        std::fs::write(root.join("release.txt"), "版本：20250718").unwrap();
        std::fs::write(root.join("Tables/Properties/parts/test.png"), b"test").unwrap();
        std::fs::write(root.join("Tables/MapingTables/地政/台北市.txt"), "test").unwrap();
    }

    #[test]
    fn test_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let errors = verify_directories(dir.path());
        assert_eq!(errors.len(), REQUIRED_DIRECTORIES.len());
        assert!(errors.iter().any(|e| e.contains("Tables/MapingTables")));
    }

    #[test]
    fn test_empty_directory_reported() {
        let dir = tempfile::tempdir().unwrap();
        create_complete_structure(dir.path());
        std::fs::remove_file(dir.path().join("Tables/Properties/parts/test.png")).unwrap();

        let errors = verify_directories(dir.path());
        assert_eq!(errors, vec!["empty directory: Tables/Properties/parts".to_string()]);
    }

    #[test]
    fn test_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let errors = verify_files(dir.path());
        assert_eq!(errors.len(), REQUIRED_FILES.len());
        assert!(errors.iter().any(|e| e.contains("release.txt")));
    }

    #[test]
    fn test_zero_length_file_reported() {
        let dir = tempfile::tempdir().unwrap();
        create_complete_structure(dir.path());
        std::fs::write(dir.path().join("OpenDataFilesList.csv"), b"").unwrap();

        let errors = verify_files(dir.path());
        assert_eq!(errors, vec!["empty file: OpenDataFilesList.csv".to_string()]);
    }

    #[test]
    fn test_complete_data_passes() {
        let dir = tempfile::tempdir().unwrap();
        create_complete_structure(dir.path());
        std::fs::write(
            dir.path().join("sync_metadata.json"),
            r#"{"release_version": "20250718"}"#,
        )
        .unwrap();

        let report = verify_data(&config_for(dir.path()), false);
        assert!(report.passed(), "{:?}", report);
    }

    #[test]
    fn test_skip_metadata_passes_without_record() {
        let dir = tempfile::tempdir().unwrap();
        create_complete_structure(dir.path());

        assert!(!verify_data(&config_for(dir.path()), false).passed());
        assert!(verify_data(&config_for(dir.path()), true).passed());
    }

    #[test]
    fn test_metadata_without_version() {
        let dir = tempfile::tempdir().unwrap();
        let path: PathBuf = dir.path().join("sync_metadata.json");

        assert_eq!(verify_metadata(&path).len(), 1);

        std::fs::write(&path, r#"{"release_version": ""}"#).unwrap();
        let errors = verify_metadata(&path);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("release version"));

        std::fs::write(&path, "not json").unwrap();
        assert!(verify_metadata(&path)[0].contains("unreadable"));
    }

    #[test]
    fn test_empty_tree_collects_every_tier() {
        let dir = tempfile::tempdir().unwrap();
        let report = verify_data(&config_for(dir.path()), false);
        assert!(!report.passed());
        assert!(!report.directory_errors.is_empty());
        assert!(report.file_errors.iter().any(|e| e.contains("release.txt")));
        assert_eq!(report.metadata_errors.len(), 1);
    }
}
