//! Release descriptor parsing.
//!
//! `release.txt` is UTF-8 with a byte-order mark and carries a line such as
//! `版本：20250718`. Both the fullwidth and the ASCII colon occur in the wild.

use std::path::Path;

const VERSION_MARKERS: [&str; 2] = ["版本：", "版本:"];
const FULLWIDTH_COLON: char = '：';
const ASCII_COLON: char = ':';

/// Decodes raw descriptor bytes, dropping a leading BOM if present.
pub fn decode_descriptor(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.strip_prefix('\u{feff}').unwrap_or(&*text).to_string()
}

/// Extracts the release version from descriptor text.
///
/// The first line carrying a version marker wins. The line is split on the
/// fullwidth colon when it contains one, otherwise on the ASCII colon, and
/// the trimmed second field is returned. Returns an empty string when no
/// line matches.
pub fn parse_version(text: &str) -> String {
    for line in text.lines() {
        if !VERSION_MARKERS.iter().any(|marker| line.contains(marker)) {
            continue;
        }
        let delimiter = if line.contains(FULLWIDTH_COLON) {
            FULLWIDTH_COLON
        } else {
            ASCII_COLON
        };
        if let Some(value) = line.split(delimiter).nth(1) {
            return value.trim().to_string();
        }
    }
    String::new()
}

/// Reads and parses the descriptor on disk; a missing or unreadable file yields `""`.
pub fn parse_release_file(path: &Path) -> String {
    match std::fs::read(path) {
        Ok(bytes) => parse_version(&decode_descriptor(&bytes)),
        Err(_) => String::new(),
    }
}
