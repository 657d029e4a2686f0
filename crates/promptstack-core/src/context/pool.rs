//! Candidate pools: where library prompts and history entries come from.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use super::item::IndexedItem;

/// Supplies the candidates of one pool, in a stable order.
pub trait CandidateSource: Send + Sync {
    fn list_candidates(&self) -> Vec<IndexedItem>;
}

/// Errors loading a pool file.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("failed to read pool file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse pool file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// An in-memory pool, optionally loaded from a TOML file of `[[items]]` tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticPool {
    items: Vec<IndexedItem>,
}

#[derive(Deserialize)]
struct PoolFile {
    #[serde(default)]
    items: Vec<IndexedItem>,
}

impl StaticPool {
    pub fn new(items: Vec<IndexedItem>) -> Self {
        Self { items }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, PoolError> {
        let file: PoolFile = toml::from_str(s)?;
        Ok(Self::new(file.items))
    }

    /// Load a pool file asynchronously.
    pub async fn load(path: &Path) -> Result<Self, PoolError> {
        let content = tokio::fs::read_to_string(path).await?;
        let pool = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), items = pool.len(), "Loaded candidate pool");
        Ok(pool)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl CandidateSource for StaticPool {
    fn list_candidates(&self) -> Vec<IndexedItem> {
        self.items.clone()
    }
}
