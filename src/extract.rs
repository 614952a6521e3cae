//! Zip archive extraction logic.
//!
//! The upstream archives store Big5 file names without the UTF-8 flag, so the
//! zip reader decodes them as code page 437. Every entry name goes through
//! [`repair_entry_name`] before it touches the filesystem.

use crate::error::SyncError;
use codepage_437::{ToCp437, CP437_CONTROL};
use encoding_rs::BIG5;
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};
use zip::ZipArchive;

/// Archive suffix that triggers extraction after download.
pub const ARCHIVE_SUFFIX: &str = ".zip";

/// Archives that ship a second archive inside, keyed by the outer file name.
const NESTED_ARCHIVES: [(&str, &str); 1] = [("Properties.zip", "CNS_component_word.zip")];

/// Returns the nested archive name shipped inside `archive_name`, if any.
pub fn nested_archive_for(archive_name: &str) -> Option<&'static str> {
    NESTED_ARCHIVES
        .iter()
        .find(|(outer, _)| *outer == archive_name)
        .map(|(_, inner)| *inner)
}

/// Returns true when every non-ASCII byte pair lies in the plain Big5 range
/// (lead 0xA1-0xF9, trail 0x40-0x7E or 0xA1-0xFE).
///
/// `encoding_rs` decodes the HKSCS superset, which also accepts leads from
/// 0x81; those names are not Big5 and must be left alone.
fn is_plain_big5(bytes: &[u8]) -> bool {
    let mut iter = bytes.iter();
    while let Some(&b) = iter.next() {
        if b < 0x80 {
            continue;
        }
        if !(0xA1..=0xF9).contains(&b) {
            return false;
        }
        match iter.next() {
            Some(&t) if (0x40..=0x7E).contains(&t) || (0xA1..=0xFE).contains(&t) => {}
            _ => return false,
        }
    }
    true
}

/// Recovers the original Big5 name from a CP437-decoded zip entry name.
///
/// The name is encoded back to CP437 bytes and those bytes decoded as Big5.
/// If either step fails the name is returned unchanged.
pub fn repair_entry_name(name: &str) -> String {
    let raw = match name.to_cp437(&CP437_CONTROL) {
        Ok(raw) => raw,
        Err(_) => return name.to_string(),
    };
    if !is_plain_big5(&raw) {
        return name.to_string();
    }
    match BIG5.decode_without_bom_handling_and_without_replacement(&raw[..]) {
        Some(decoded) => decoded.into_owned(),
        None => name.to_string(),
    }
}

/// Joins an entry name onto `dest`, refusing names that would escape it.
fn entry_target(dest: &Path, name: &str) -> Option<PathBuf> {
    let relative = Path::new(name);
    let escapes = relative.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        None
    } else {
        Some(dest.join(relative))
    }
}

/// Writes every entry of the archive below `extract_dir`.
fn unpack_entries(zip_path: &Path, extract_dir: &Path) -> Result<usize, SyncError> {
    let file = std::fs::File::open(zip_path)?;
    let mut archive = ZipArchive::new(file)?;
    let mut file_count = 0usize;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let name = repair_entry_name(entry.name());

        let Some(target_path) = entry_target(extract_dir, &name) else {
            warn!("Skipping entry outside extraction dir: {}", name);
            continue;
        };

        if entry.is_dir() {
            std::fs::create_dir_all(&target_path)?;
        } else {
            if let Some(parent) = target_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut outfile = std::fs::File::create(&target_path)?;
            std::io::copy(&mut entry, &mut outfile)?;
            file_count += 1;
        }
    }

    Ok(file_count)
}

/// Extracts a top-level archive into a freshly cleared `extract_dir`.
///
/// Any previous contents of `extract_dir` are removed first, so repeated
/// extraction of the same archive always ends in the same tree.
///
/// # Returns
///
/// The number of files written.
pub fn extract_archive(zip_path: &Path, extract_dir: &Path) -> Result<usize, SyncError> {
    if extract_dir.exists() {
        std::fs::remove_dir_all(extract_dir)?;
    }
    std::fs::create_dir_all(extract_dir)?;

    let file_count = unpack_entries(zip_path, extract_dir)?;
    info!("📂 Extracted {} files to {}", file_count, extract_dir.display());
    Ok(file_count)
}

/// Extracts an archive into `extract_dir` without clearing it.
///
/// Used for nested archives that carry their own subtree (e.g. `parts/`)
/// and are deleted right after extraction.
pub fn extract_archive_preserving(
    zip_path: &Path,
    extract_dir: &Path,
) -> Result<usize, SyncError> {
    std::fs::create_dir_all(extract_dir)?;

    let file_count = unpack_entries(zip_path, extract_dir)?;
    info!("📂 Extracted {} files to {}", file_count, extract_dir.display());
    Ok(file_count)
}

/// Extracts and deletes the named nested archive inside `parent_dir`.
///
/// # Returns
///
/// `Ok(true)` when the nested archive was present and handled,
/// `Ok(false)` when it was not found.
pub fn extract_nested_archive(parent_dir: &Path, nested_name: &str) -> Result<bool, SyncError> {
    let zip_path = parent_dir.join(nested_name);
    if !zip_path.is_file() {
        return Ok(false);
    }

    info!("📦 Processing nested archive {}", nested_name);
    extract_archive_preserving(&zip_path, parent_dir)?;
    std::fs::remove_file(&zip_path)?;
    info!("🗑️  Removed {}", nested_name);
    Ok(true)
}
