//! Mock cross-reference resolver for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::upstream::{CrossReferenceResolver, UpstreamError};

/// Mock implementation of the CrossReferenceResolver trait.
///
/// Provides controllable behavior for testing:
/// - Return configured ids per fid (empty string otherwise)
/// - Track lookups for assertions
/// - Simulate failures
///
/// # Example
///
/// ```rust,ignore
/// use captionrelay_core::testing::MockCrossReference;
///
/// let xref = MockCrossReference::new();
/// xref.set_id("12345", "tt0133093").await;
///
/// assert_eq!(xref.resolve_cross_reference("12345").await?, "tt0133093");
/// assert_eq!(xref.lookup_count().await, 1);
/// ```
#[derive(Debug)]
pub struct MockCrossReference {
    /// Cross-reference ids by fid.
    ids: Arc<RwLock<HashMap<String, String>>>,
    /// Recorded lookups, in call order.
    lookups: Arc<RwLock<Vec<String>>>,
    /// If set, every lookup fails with this error.
    error: Arc<RwLock<Option<UpstreamError>>>,
}

impl Default for MockCrossReference {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCrossReference {
    pub fn new() -> Self {
        Self {
            ids: Arc::new(RwLock::new(HashMap::new())),
            lookups: Arc::new(RwLock::new(Vec::new())),
            error: Arc::new(RwLock::new(None)),
        }
    }

    /// Set the id returned for `fid`.
    pub async fn set_id(&self, fid: &str, xref: &str) {
        self.ids
            .write()
            .await
            .insert(fid.to_string(), xref.to_string());
    }

    /// Make every subsequent lookup fail.
    pub async fn set_error(&self, error: UpstreamError) {
        *self.error.write().await = Some(error);
    }

    pub async fn clear_error(&self) {
        *self.error.write().await = None;
    }

    /// Get all recorded lookups.
    pub async fn recorded_lookups(&self) -> Vec<String> {
        self.lookups.read().await.clone()
    }

    pub async fn lookup_count(&self) -> usize {
        self.lookups.read().await.len()
    }
}

#[async_trait]
impl CrossReferenceResolver for MockCrossReference {
    async fn resolve_cross_reference(&self, fid: &str) -> Result<String, UpstreamError> {
        self.lookups.write().await.push(fid.to_string());

        if let Some(error) = self.error.read().await.clone() {
            return Err(error);
        }

        Ok(self.ids.read().await.get(fid).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_configured_and_unknown_ids() {
        let xref = MockCrossReference::new();
        xref.set_id("1", "tt0000001").await;

        assert_eq!(xref.resolve_cross_reference("1").await.unwrap(), "tt0000001");
        assert_eq!(xref.resolve_cross_reference("2").await.unwrap(), "");
        assert_eq!(xref.recorded_lookups().await, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_error_injection() {
        let xref = MockCrossReference::new();
        xref.set_id("1", "tt0000001").await;
        xref.set_error(UpstreamError::Status(503)).await;

        assert_eq!(
            xref.resolve_cross_reference("1").await,
            Err(UpstreamError::Status(503))
        );

        xref.clear_error().await;
        assert!(xref.resolve_cross_reference("1").await.is_ok());
        assert_eq!(xref.lookup_count().await, 2);
    }
}
