//! Source track extraction from downloaded subtitle archives.

use std::io::{Cursor, Read};

use super::{TaskError, SOURCE_EXTENSION};

/// Largest source track read out of an archive.
pub const MAX_TRACK_BYTES: u64 = 8 * 1024 * 1024;

/// Return the bytes of the first entry, in stored order, whose name ends
/// with the source track extension (case-insensitive).
///
/// Entries that match by name but cannot be read are skipped. A track larger
/// than [`MAX_TRACK_BYTES`] fails the archive.
pub fn extract_source_track(archive_bytes: &[u8]) -> Result<Vec<u8>, TaskError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(archive_bytes))
        .map_err(|e| TaskError::Archive(e.to_string()))?;

    for i in 0..archive.len() {
        let Ok(mut entry) = archive.by_index(i) else {
            continue;
        };
        if !entry.name().to_lowercase().ends_with(SOURCE_EXTENSION) {
            continue;
        }

        // Header sizes come from the remote host; read at most one byte past the cap.
        let mut content = Vec::new();
        if entry
            .by_ref()
            .take(MAX_TRACK_BYTES + 1)
            .read_to_end(&mut content)
            .is_err()
        {
            continue;
        }
        if content.len() as u64 > MAX_TRACK_BYTES {
            return Err(TaskError::Archive(format!(
                "{} exceeds {} bytes",
                entry.name(),
                MAX_TRACK_BYTES
            )));
        }
        return Ok(content);
    }

    Err(TaskError::NoSourceTrack)
}
