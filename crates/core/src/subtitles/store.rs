//! Durable per-fid caption directory.
//!
//! Layout: `{root}/{fid}/{slot}.vtt`. A directory holding at least one
//! caption track is the cache signal; tracks never expire.

use std::io;
use std::path::PathBuf;

use tokio::fs;
use tracing::debug;

use super::{CaptionAsset, CAPTION_EXTENSION};

/// Reads and writes converted caption tracks.
#[derive(Debug, Clone)]
pub struct CaptionStore {
    root: PathBuf,
    public_path: String,
}

impl CaptionStore {
    /// `public_path` is the URL path under which `root` is served.
    pub fn new(root: impl Into<PathBuf>, public_path: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_path: public_path.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn fid_dir(&self, fid: &str) -> PathBuf {
        self.root.join(fid)
    }

    /// File name of the track stored for a 1-based slot.
    pub fn track_file_name(slot: usize) -> String {
        format!("{}.{}", slot, CAPTION_EXTENSION)
    }

    /// List stored tracks for `fid`, sorted by file name.
    ///
    /// Returns `None` when the directory is missing, unreadable, or holds no
    /// caption tracks.
    pub async fn list(&self, fid: &str, base_url: &str) -> Option<Vec<CaptionAsset>> {
        let mut names = self.track_names(fid).await.ok()?;
        if names.is_empty() {
            return None;
        }
        names.sort();

        Some(
            names
                .iter()
                .map(|name| self.asset(fid, base_url, name))
                .collect(),
        )
    }

    /// Create the directory for `fid` if needed.
    pub async fn ensure_dir(&self, fid: &str) -> io::Result<PathBuf> {
        let dir = self.fid_dir(fid);
        fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Persist a converted track for a 1-based slot and return its asset.
    ///
    /// The content is written to a temporary file first and renamed into
    /// place, so a failed write never leaves a truncated track behind.
    pub async fn write_track(
        &self,
        fid: &str,
        slot: usize,
        content: &[u8],
        base_url: &str,
    ) -> io::Result<CaptionAsset> {
        let name = Self::track_file_name(slot);
        let path = self.fid_dir(fid).join(&name);
        let partial = path.with_extension(format!("{}.part", CAPTION_EXTENSION));

        if let Err(e) = fs::write(&partial, content).await {
            let _ = fs::remove_file(&partial).await;
            return Err(e);
        }
        if let Err(e) = fs::rename(&partial, &path).await {
            let _ = fs::remove_file(&partial).await;
            return Err(e);
        }

        debug!(fid = fid, slot = slot, path = %path.display(), "Stored caption track");
        Ok(self.asset(fid, base_url, &name))
    }

    /// Remove the directory for `fid` unless it holds a caption track.
    ///
    /// Returns true when the directory was removed.
    pub async fn discard_if_empty(&self, fid: &str) -> io::Result<bool> {
        match self.track_names(fid).await {
            Ok(names) if names.is_empty() => {
                fs::remove_dir_all(self.fid_dir(fid)).await?;
                Ok(true)
            }
            Ok(_) => Ok(false),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn track_names(&self, fid: &str) -> io::Result<Vec<String>> {
        let mut entries = fs::read_dir(self.fid_dir(fid)).await?;
        let suffix = format!(".{}", CAPTION_EXTENSION);

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(true);
            if is_dir {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(&suffix) {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }

    fn asset(&self, fid: &str, base_url: &str, file_name: &str) -> CaptionAsset {
        let stem = file_name
            .strip_suffix(&format!(".{}", CAPTION_EXTENSION))
            .unwrap_or(file_name);

        CaptionAsset {
            slot: stem.parse().unwrap_or(0),
            label: format!("English {}", stem),
            src: format!(
                "{}{}/{}/{}",
                base_url.trim_end_matches('/'),
                self.public_path,
                urlencoding::encode(fid),
                urlencoding::encode(file_name)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> CaptionStore {
        CaptionStore::new(dir.path(), "/subtitles/")
    }

    #[tokio::test]
    async fn test_list_missing_dir() {
        let dir = TempDir::new().unwrap();
        assert!(store(&dir).list("abc", "http://host").await.is_none());
    }

    #[tokio::test]
    async fn test_list_ignores_other_files() {
        let dir = TempDir::new().unwrap();
        let fid_dir = dir.path().join("abc");
        std::fs::create_dir_all(fid_dir.join("nested.vtt")).unwrap();
        std::fs::write(fid_dir.join("notes.txt"), "x").unwrap();
        std::fs::write(fid_dir.join("1.vtt.part"), "x").unwrap();

        assert!(store(&dir).list("abc", "http://host").await.is_none());
    }

    #[tokio::test]
    async fn test_list_sorts_and_labels() {
        let dir = TempDir::new().unwrap();
        let fid_dir = dir.path().join("abc");
        std::fs::create_dir_all(&fid_dir).unwrap();
        for name in ["3.vtt", "1.vtt", "2.vtt"] {
            std::fs::write(fid_dir.join(name), "WEBVTT\n\n").unwrap();
        }

        let assets = store(&dir).list("abc", "http://host/").await.unwrap();
        let labels: Vec<_> = assets.iter().map(|a| a.label.as_str()).collect();
        assert_eq!(labels, vec!["English 1", "English 2", "English 3"]);
        assert_eq!(assets[0].src, "http://host/subtitles/abc/1.vtt");
        assert_eq!(assets[2].slot, 3);
    }

    #[tokio::test]
    async fn test_write_track_then_list() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.ensure_dir("abc").await.unwrap();

        let asset = store
            .write_track("abc", 2, b"WEBVTT\n\n", "http://host")
            .await
            .unwrap();
        assert_eq!(asset.slot, 2);
        assert_eq!(asset.label, "English 2");
        assert_eq!(asset.src, "http://host/subtitles/abc/2.vtt");

        let content = std::fs::read_to_string(dir.path().join("abc").join("2.vtt")).unwrap();
        assert_eq!(content, "WEBVTT\n\n");
        assert!(!dir.path().join("abc").join("2.vtt.part").exists());

        assert_eq!(store.list("abc", "http://host").await.unwrap(), vec![asset]);
    }

    #[tokio::test]
    async fn test_discard_if_empty() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        assert!(!store.discard_if_empty("missing").await.unwrap());

        store.ensure_dir("empty").await.unwrap();
        std::fs::write(dir.path().join("empty").join("1.vtt.part"), "x").unwrap();
        assert!(store.discard_if_empty("empty").await.unwrap());
        assert!(!dir.path().join("empty").exists());

        store.ensure_dir("kept").await.unwrap();
        store
            .write_track("kept", 1, b"WEBVTT\n\n", "http://host")
            .await
            .unwrap();
        assert!(!store.discard_if_empty("kept").await.unwrap());
        assert!(dir.path().join("kept").join("1.vtt").exists());
    }
}
