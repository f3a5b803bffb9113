use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Contents of a shared folder, passed through exactly as the host sent them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileListing {
    pub entries: Vec<Value>,
}

impl FileListing {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One playable rendition of a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityLink {
    pub url: String,
    pub quality: String,
    pub name: String,
    pub speed: String,
    pub size: String,
}

/// Cache key for folder listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListingKey {
    pub share_key: String,
    pub parent_id: String,
}
