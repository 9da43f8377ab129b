use crate::domain::cacheability::{CacheKeys, CacheabilityMetadata};
use crate::domain::render::RenderNode;

/// External render cache store.
///
/// Implementations decide how entries are keyed on cache context values and
/// when they expire; the composer only guarantees that the keys, tags,
/// contexts and max-age it hands over are correct.
pub trait RenderCache: Send + Sync {
    /// Return a still-valid node stored under `keys`.
    fn get(&self, keys: &CacheKeys) -> Option<RenderNode>;

    /// Store `node` under `keys`. Callers never offer uncacheable nodes.
    fn put(&self, keys: &CacheKeys, node: RenderNode, metadata: &CacheabilityMetadata);

    /// Evict every entry carrying any of `tags`.
    fn invalidate_tags(&self, tags: &[&str]);
}
