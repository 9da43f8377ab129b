use tracing::debug;

use super::store::RenderCache;
use crate::domain::cacheability::{CacheKeys, CacheabilityMetadata};
use crate::domain::render::RenderNode;

/// A node waiting to be offered to the cache store.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheWrite {
    pub keys: CacheKeys,
    pub node: RenderNode,
    pub metadata: CacheabilityMetadata,
}

/// Writes collected during a page build, released all at once.
#[derive(Debug, Default)]
pub struct StagedWrites {
    writes: Vec<CacheWrite>,
}

impl StagedWrites {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage `node` under `keys` with its bubbled metadata. Uncacheable or
    /// unkeyed nodes are dropped.
    pub fn stage(&mut self, keys: CacheKeys, node: RenderNode) {
        let metadata = node.bubbled_cacheability();
        if keys.is_empty() || !metadata.is_cacheable() {
            debug!(keys = %keys, max_age = %metadata.max_age(), "Skipping cache write");
            return;
        }
        self.writes.push(CacheWrite {
            keys,
            node,
            metadata,
        });
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CacheWrite> {
        self.writes.iter()
    }

    /// Offer every staged write to `cache` in staging order.
    pub fn flush(self, cache: &dyn RenderCache) -> usize {
        let count = self.writes.len();
        for write in self.writes {
            cache.put(&write.keys, write.node, &write.metadata);
        }
        count
    }
}
