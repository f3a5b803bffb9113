//! HTTP client for the upstream content host.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE, REFERER, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cache::{spawn_sweeper, CoalescingCache};
use crate::config::UpstreamConfig;
use crate::metrics::{UPSTREAM_DURATION, UPSTREAM_REQUESTS};

use super::parse;
use super::{CrossReferenceResolver, FileListing, ListingKey, QualityLink, UpstreamError};

type ListingCache = CoalescingCache<ListingKey, FileListing, UpstreamError>;

/// Upstream content host client.
///
/// Built once from an immutable [`UpstreamConfig`]; every request carries the
/// configured user agent, the XHR marker header and the session cookie.
pub struct UpstreamClient {
    client: Client,
    base_url: String,
    default_share_key: String,
    listings: Arc<ListingCache>,
    sweep_interval: Duration,
}

impl UpstreamClient {
    /// Create a new client.
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-requested-with"),
            HeaderValue::from_static("XMLHttpRequest"),
        );
        headers.insert(USER_AGENT, header_value(&config.user_agent)?);
        if !config.ui_cookie.is_empty() {
            headers.insert(COOKIE, header_value(&format!("ui={}", config.ui_cookie))?);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_share_key: config.default_share_key.clone(),
            listings: Arc::new(CoalescingCache::new(
                "file_listing",
                Duration::from_secs(config.cache_ttl_secs),
            )),
            sweep_interval: Duration::from_secs(config.cache_sweep_secs),
        })
    }

    /// Start the background task that evicts expired listings.
    pub fn spawn_cache_sweeper(&self) -> JoinHandle<()> {
        spawn_sweeper(&self.listings, self.sweep_interval)
    }

    /// List the contents of a shared folder.
    ///
    /// Results are cached per (share key, parent id). Concurrent calls for
    /// the same key share a single upstream request.
    pub async fn resolve_file_listing(
        &self,
        share_key: &str,
        parent_id: &str,
    ) -> Result<FileListing, UpstreamError> {
        let share_key = self.share_key_or_default(share_key).to_string();
        let url = format!(
            "{}/file/file_share_list?share_key={}&pwd=&parent_id={}&is_html=0",
            self.base_url,
            urlencoding::encode(&share_key),
            urlencoding::encode(parent_id)
        );
        let key = ListingKey {
            share_key,
            parent_id: parent_id.to_string(),
        };

        let client = self.client.clone();
        self.listings
            .get_or_try_load(key, move || async move {
                debug!(url = %url, "Fetching file listing");
                let body = send("files", client.get(&url)).await?;
                let entries = parse::parse_file_listing(&body)?;
                Ok(FileListing { entries })
            })
            .await
    }

    /// List the playable renditions of a file, in the host's order.
    pub async fn resolve_quality_links(
        &self,
        fid: &str,
        share_key: &str,
    ) -> Result<Vec<QualityLink>, UpstreamError> {
        let share_key = self.share_key_or_default(share_key);
        if fid.is_empty() || share_key.is_empty() {
            return Err(UpstreamError::InvalidRequest(
                "fid and shareKey are required".to_string(),
            ));
        }

        let url = format!(
            "{}/console/video_quality_list?fid={}",
            self.base_url,
            urlencoding::encode(fid)
        );
        debug!(fid = fid, share_key = share_key, "Fetching quality links");

        let request = self
            .client
            .get(&url)
            .header(REFERER, self.referer(share_key));
        let body = send("links", request).await?;

        let html = parse::extract_html_fragment(&body)?.ok_or_else(|| {
            UpstreamError::Upstream("No HTML content found in response".to_string())
        })?;

        Ok(parse::parse_quality_links(&html))
    }

    /// Look up the external catalog id of a file.
    ///
    /// Returns an empty string when the host has none.
    pub async fn resolve_cross_reference_id(
        &self,
        fid: &str,
        share_key: &str,
    ) -> Result<String, UpstreamError> {
        if fid.is_empty() {
            return Err(UpstreamError::InvalidRequest(
                "at least an fid is required".to_string(),
            ));
        }

        let url = format!(
            "{}/console/file_more_info?fid={}",
            self.base_url,
            urlencoding::encode(fid)
        );
        debug!(fid = fid, "Fetching cross-reference id");

        let request = self
            .client
            .get(&url)
            .header(REFERER, self.referer(share_key));
        let body = send("xref", request).await?;

        Ok(parse::extract_html_fragment(&body)?
            .map(|html| parse::parse_cross_reference(&html))
            .unwrap_or_default())
    }

    fn share_key_or_default<'a>(&'a self, share_key: &'a str) -> &'a str {
        if share_key.is_empty() {
            &self.default_share_key
        } else {
            share_key
        }
    }

    fn referer(&self, share_key: &str) -> String {
        format!("{}/share/{}", self.base_url, share_key)
    }
}

#[async_trait]
impl CrossReferenceResolver for UpstreamClient {
    async fn resolve_cross_reference(&self, fid: &str) -> Result<String, UpstreamError> {
        self.resolve_cross_reference_id(fid, "").await
    }
}

fn header_value(value: &str) -> Result<HeaderValue, UpstreamError> {
    HeaderValue::from_str(value)
        .map_err(|e| UpstreamError::InvalidRequest(format!("invalid header value: {}", e)))
}

/// Send a request and return the body of a successful response.
async fn send(endpoint: &'static str, request: RequestBuilder) -> Result<Vec<u8>, UpstreamError> {
    let start = Instant::now();
    let result = send_inner(request).await;

    UPSTREAM_DURATION
        .with_label_values(&[endpoint])
        .observe(start.elapsed().as_secs_f64());
    let outcome = if result.is_ok() { "success" } else { "error" };
    UPSTREAM_REQUESTS
        .with_label_values(&[endpoint, outcome])
        .inc();

    if let Err(ref e) = result {
        warn!(endpoint = endpoint, error = %e, "Upstream request failed");
    }
    result
}

async fn send_inner(request: RequestBuilder) -> Result<Vec<u8>, UpstreamError> {
    let response = request.send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(UpstreamError::Status(status.as_u16()));
    }

    Ok(response.bytes().await?.to_vec())
}
