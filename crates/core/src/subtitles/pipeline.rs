//! Subtitle acquisition: local check, cross-reference lookup, index scrape,
//! concurrent fetch/convert, ordered assembly.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use futures::future::join_all;
use reqwest::Client;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::SubtitleConfig;
use crate::metrics::{SUBTITLE_FETCH_DURATION, SUBTITLE_RUNS, SUBTITLE_TASKS};
use crate::upstream::CrossReferenceResolver;

use super::archive::extract_source_track;
use super::convert::srt_to_vtt;
use super::scrape;
use super::store::CaptionStore;
use super::{CaptionAsset, SubtitleCandidate, SubtitleError, TaskError};

/// Maximum number of candidates fetched per run.
pub const MAX_CANDIDATES: usize = 3;

/// Substring a row's language column must contain.
pub const LANGUAGE_FILTER: &str = "English";

type TaskOutcome = (usize, Result<CaptionAsset, TaskError>);

type FidLocks = std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>;

/// Resolves caption tracks for file ids.
pub struct SubtitlePipeline {
    client: Client,
    index_base_url: String,
    store: CaptionStore,
    resolver: Arc<dyn CrossReferenceResolver>,
    task_timeout: Duration,
    /// One lock per fid with a run in progress.
    fid_locks: FidLocks,
}

impl SubtitlePipeline {
    /// Create a pipeline that resolves cross-reference ids through `resolver`.
    pub fn new(
        config: &SubtitleConfig,
        resolver: Arc<dyn CrossReferenceResolver>,
    ) -> Result<Self, SubtitleError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| SubtitleError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            index_base_url: config.index_base_url.trim_end_matches('/').to_string(),
            store: CaptionStore::new(config.storage_dir.clone(), config.public_path.clone()),
            resolver,
            task_timeout: Duration::from_secs(config.task_timeout_secs as u64),
            fid_locks: std::sync::Mutex::new(HashMap::new()),
        })
    }

    /// Return the caption tracks for `fid`, acquiring them on first request.
    ///
    /// `base_url` is the public origin prefixed to each track's `src`.
    /// Runs for the same fid are serialized; a run that finds tracks on disk
    /// performs no network access.
    pub async fn fetch(
        &self,
        fid: &str,
        base_url: &str,
    ) -> Result<Vec<CaptionAsset>, SubtitleError> {
        if let Err(e) = validate_fid(fid) {
            SUBTITLE_RUNS.with_label_values(&["invalid"]).inc();
            return Err(e);
        }

        let slot = FidSlot::acquire(&self.fid_locks, fid);
        let _running = slot.lock.lock().await;
        self.run(fid, base_url).await
    }

    async fn run(&self, fid: &str, base_url: &str) -> Result<Vec<CaptionAsset>, SubtitleError> {
        if let Some(assets) = self.store.list(fid, base_url).await {
            debug!(fid = fid, tracks = assets.len(), "Serving stored caption tracks");
            SUBTITLE_RUNS.with_label_values(&["local"]).inc();
            return Ok(assets);
        }

        let start = Instant::now();
        let result = self.acquire(fid, base_url).await;

        let outcome = match &result {
            Ok(_) => "fetched",
            Err(SubtitleError::NotFound(_)) => "not_found",
            Err(_) => "failed",
        };
        SUBTITLE_RUNS.with_label_values(&[outcome]).inc();
        SUBTITLE_FETCH_DURATION
            .with_label_values(&[outcome])
            .observe(start.elapsed().as_secs_f64());

        result
    }

    async fn acquire(&self, fid: &str, base_url: &str) -> Result<Vec<CaptionAsset>, SubtitleError> {
        let xref = self.resolve_cross_reference(fid).await?;
        let candidates = self.list_candidates(&xref).await?;
        let candidate_count = candidates.len();

        if let Err(e) = self.store.ensure_dir(fid).await {
            warn!(fid = fid, error = %e, "Failed to create caption directory");
            return Err(SubtitleError::Internal(
                "Failed to process subtitles".to_string(),
            ));
        }

        let outcomes = self.fetch_convert(fid, base_url, candidates).await;
        let assets = assemble(fid, candidate_count, outcomes);

        if assets.is_empty() {
            if let Err(e) = self.store.discard_if_empty(fid).await {
                warn!(fid = fid, error = %e, "Failed to clean up caption directory");
            }
            return Err(SubtitleError::Internal(
                "Failed to process subtitles".to_string(),
            ));
        }

        info!(
            fid = fid,
            xref = %xref,
            tracks = assets.len(),
            candidates = candidate_count,
            "Acquired caption tracks"
        );
        Ok(assets)
    }

    async fn resolve_cross_reference(&self, fid: &str) -> Result<String, SubtitleError> {
        let xref = self
            .resolver
            .resolve_cross_reference(fid)
            .await
            .map_err(|e| {
                warn!(fid = fid, error = %e, "Cross-reference lookup failed");
                SubtitleError::NotFound("Failed to fetch IMDB ID".to_string())
            })?;

        if xref.is_empty() {
            return Err(SubtitleError::NotFound("No IMDB ID found".to_string()));
        }
        Ok(xref)
    }

    async fn list_candidates(&self, xref: &str) -> Result<Vec<SubtitleCandidate>, SubtitleError> {
        let url = format!(
            "{}/movie-imdb/{}",
            self.index_base_url,
            urlencoding::encode(xref)
        );
        debug!(url = %url, "Fetching subtitle index");

        let page = get_text(&self.client, &url).await.map_err(|e| {
            warn!(xref = xref, error = %e, "Subtitle index unavailable");
            SubtitleError::NotFound("Subtitles not found".to_string())
        })?;

        let candidates: Vec<_> = scrape::parse_candidate_links(&page, LANGUAGE_FILTER)
            .into_iter()
            .take(MAX_CANDIDATES)
            .enumerate()
            .map(|(index, detail_path)| SubtitleCandidate { index, detail_path })
            .collect();

        if candidates.is_empty() {
            return Err(SubtitleError::NotFound(
                "English subtitles not found".to_string(),
            ));
        }
        Ok(candidates)
    }

    /// Run one task per candidate and collect every task's outcome.
    ///
    /// Each task reports exactly once on a channel sized to the candidate
    /// count; the channel is drained only after every task has been joined.
    async fn fetch_convert(
        &self,
        fid: &str,
        base_url: &str,
        candidates: Vec<SubtitleCandidate>,
    ) -> HashMap<usize, Result<CaptionAsset, TaskError>> {
        let context = Arc::new(FetchContext {
            client: self.client.clone(),
            index_base_url: self.index_base_url.clone(),
            store: self.store.clone(),
            fid: fid.to_string(),
            base_url: base_url.to_string(),
        });
        let task_timeout = self.task_timeout;

        let (tx, mut rx) = mpsc::channel::<TaskOutcome>(candidates.len().max(1));
        let mut handles = Vec::with_capacity(candidates.len());
        let mut indices = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let tx = tx.clone();
            let context = Arc::clone(&context);
            indices.push(candidate.index);

            handles.push(tokio::spawn(async move {
                let result =
                    match tokio::time::timeout(task_timeout, context.process(&candidate)).await {
                        Ok(result) => result,
                        Err(_) => Err(TaskError::Timeout(task_timeout)),
                    };
                // Capacity equals the task count, so this never waits.
                let _ = tx.send((candidate.index, result)).await;
            }));
        }
        drop(tx);

        let mut outcomes = HashMap::new();
        for (index, joined) in indices.into_iter().zip(join_all(handles).await) {
            if let Err(e) = joined {
                outcomes.insert(index, Err(TaskError::Panicked(e.to_string())));
            }
        }
        while let Some((index, result)) = rx.recv().await {
            outcomes.insert(index, result);
        }

        outcomes
    }
}

/// A caller's handle on the per-fid lock.
///
/// Dropping it removes the map entry once no other caller holds the same
/// fid, including when the owning request is cancelled mid-run.
struct FidSlot<'a> {
    locks: &'a FidLocks,
    fid: String,
    lock: Arc<Mutex<()>>,
}

impl<'a> FidSlot<'a> {
    fn acquire(locks: &'a FidLocks, fid: &str) -> Self {
        let lock = {
            let mut map = locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(map.entry(fid.to_string()).or_default())
        };
        Self {
            locks,
            fid: fid.to_string(),
            lock,
        }
    }
}

impl Drop for FidSlot<'_> {
    fn drop(&mut self) {
        let mut map = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // The map and this slot hold the only references: nobody is waiting.
        if Arc::strong_count(&self.lock) == 2 {
            map.remove(&self.fid);
        }
    }
}

/// Order successful tasks by candidate index, dropping failures.
///
/// Output order is the original candidate order regardless of the order in
/// which tasks completed.
pub fn assemble(
    fid: &str,
    candidate_count: usize,
    mut outcomes: HashMap<usize, Result<CaptionAsset, TaskError>>,
) -> Vec<CaptionAsset> {
    let mut assets = Vec::with_capacity(candidate_count);

    for index in 0..candidate_count {
        match outcomes.remove(&index) {
            Some(Ok(asset)) => {
                SUBTITLE_TASKS.with_label_values(&["success"]).inc();
                assets.push(asset);
            }
            Some(Err(e)) => {
                SUBTITLE_TASKS.with_label_values(&[e.kind()]).inc();
                warn!(fid = fid, slot = index + 1, error = %e, "Subtitle candidate failed");
            }
            None => {
                warn!(fid = fid, slot = index + 1, "Subtitle candidate reported no result");
            }
        }
    }

    assets
}

fn validate_fid(fid: &str) -> Result<(), SubtitleError> {
    if fid.is_empty() {
        return Err(SubtitleError::InvalidRequest("Missing FID".to_string()));
    }
    if fid == "." || fid == ".." || fid.contains(['/', '\\']) {
        return Err(SubtitleError::InvalidRequest("Invalid FID".to_string()));
    }
    Ok(())
}

/// Everything a candidate task needs, shared read-only between tasks.
struct FetchContext {
    client: Client,
    index_base_url: String,
    store: CaptionStore,
    fid: String,
    base_url: String,
}

impl FetchContext {
    async fn process(&self, candidate: &SubtitleCandidate) -> Result<CaptionAsset, TaskError> {
        let detail_url = self.detail_url(&candidate.detail_path);
        debug!(url = %detail_url, slot = candidate.index + 1, "Fetching subtitle detail page");

        let page = get_text(&self.client, &detail_url).await?;
        let descriptor = scrape::parse_download_descriptor(&page)?;
        let archive_url = scrape::decode_archive_url(&descriptor)?;

        let archive = get_bytes(&self.client, &archive_url).await?;
        let source = extract_source_track(&archive)?;
        let vtt = srt_to_vtt(&source);

        self.store
            .write_track(&self.fid, candidate.index + 1, vtt.as_bytes(), &self.base_url)
            .await
            .map_err(|e| TaskError::Persist(e.to_string()))
    }

    fn detail_url(&self, detail_path: &str) -> String {
        if detail_path.starts_with("http://") || detail_path.starts_with("https://") {
            detail_path.to_string()
        } else {
            format!("{}{}", self.index_base_url, detail_path)
        }
    }
}

async fn get_text(client: &Client, url: &str) -> Result<String, TaskError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(TaskError::Transport(format!("HTTP {} from {}", status, url)));
    }
    Ok(response.text().await?)
}

async fn get_bytes(client: &Client, url: &str) -> Result<Vec<u8>, TaskError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(TaskError::Transport(format!("HTTP {} from {}", status, url)));
    }
    Ok(response.bytes().await?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(slot: usize) -> CaptionAsset {
        CaptionAsset {
            slot,
            label: format!("English {}", slot),
            src: format!("http://host/subtitles/abc/{}.vtt", slot),
        }
    }

    #[test]
    fn test_assemble_orders_by_candidate_index() {
        // Insertion order mimics C finishing before A
        let mut outcomes = HashMap::new();
        outcomes.insert(2, Ok(asset(3)));
        outcomes.insert(1, Err(TaskError::NoDownloadLink));
        outcomes.insert(0, Ok(asset(1)));

        let assets = assemble("abc", 3, outcomes);
        assert_eq!(assets, vec![asset(1), asset(3)]);
    }

    #[test]
    fn test_assemble_all_failed() {
        let mut outcomes = HashMap::new();
        outcomes.insert(0, Err(TaskError::NoSourceTrack));
        outcomes.insert(1, Err(TaskError::Archive("bad".to_string())));

        assert!(assemble("abc", 2, outcomes).is_empty());
    }

    #[test]
    fn test_assemble_ignores_out_of_range_indices() {
        let mut outcomes = HashMap::new();
        outcomes.insert(0, Ok(asset(1)));
        outcomes.insert(5, Ok(asset(6)));

        assert_eq!(assemble("abc", 1, outcomes), vec![asset(1)]);
    }

    #[test]
    fn test_validate_fid() {
        assert_eq!(
            validate_fid(""),
            Err(SubtitleError::InvalidRequest("Missing FID".to_string()))
        );
        assert!(validate_fid("..").is_err());
        assert!(validate_fid("a/b").is_err());
        assert!(validate_fid("a\\b").is_err());
        assert!(validate_fid("123456").is_ok());
    }

    fn fid_lock_count(locks: &FidLocks) -> usize {
        locks.lock().unwrap().len()
    }

    #[test]
    fn test_fid_slot_removed_when_last_holder_drops() {
        let locks = FidLocks::default();

        let first = FidSlot::acquire(&locks, "abc");
        let second = FidSlot::acquire(&locks, "abc");
        assert!(Arc::ptr_eq(&first.lock, &second.lock));
        assert_eq!(fid_lock_count(&locks), 1);

        drop(first);
        assert_eq!(fid_lock_count(&locks), 1);

        drop(second);
        assert_eq!(fid_lock_count(&locks), 0);
    }

    #[tokio::test]
    async fn test_cancelled_fetch_releases_fid_slot() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = SubtitleConfig {
            storage_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let resolver = Arc::new(crate::testing::MockCrossReference::new());
        let pipeline = SubtitlePipeline::new(&config, resolver.clone()).unwrap();

        // Hold the fid so the request below waits on its lock
        let held = FidSlot::acquire(&pipeline.fid_locks, "abc");
        let running = held.lock.lock().await;

        let cancelled =
            tokio::time::timeout(Duration::from_millis(50), pipeline.fetch("abc", "http://host"))
                .await;
        assert!(cancelled.is_err());
        assert_eq!(fid_lock_count(&pipeline.fid_locks), 1);

        drop(running);
        drop(held);
        assert_eq!(fid_lock_count(&pipeline.fid_locks), 0);
        assert_eq!(resolver.lookup_count().await, 0);
    }
}
