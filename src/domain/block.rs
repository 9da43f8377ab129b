//! Block descriptors: the configuration-side view of a placed block.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::cacheability::{Cacheable, CacheabilityMetadata};

/// Identifier of a block, unique within a page variant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Maps a plugin's named input slots to page context names.
pub type ContextMapping = BTreeMap<String, String>;

/// A block as assigned to a region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockDescriptor {
    pub id: BlockId,
    pub region: String,
    #[serde(default)]
    pub weight: i32,
    pub plugin: String,
    #[serde(default)]
    pub configuration: Map<String, Value>,
    /// The block's own cacheability, independent of its content.
    #[serde(default)]
    pub cache: CacheabilityMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_mapping: Option<ContextMapping>,
}

impl BlockDescriptor {
    pub fn new(id: impl Into<BlockId>, region: impl Into<String>, plugin: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            region: region.into(),
            weight: 0,
            plugin: plugin.into(),
            configuration: Map::new(),
            cache: CacheabilityMetadata::default(),
            context_mapping: None,
        }
    }

    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_cache(mut self, cache: CacheabilityMetadata) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.configuration.insert(key.into(), value.into());
        self
    }

    pub fn with_context(mut self, slot: impl Into<String>, context: impl Into<String>) -> Self {
        self.context_mapping
            .get_or_insert_with(ContextMapping::new)
            .insert(slot.into(), context.into());
        self
    }

    /// Returns the context mapping when the block consumes page contexts.
    pub fn context_aware(&self) -> Option<&ContextMapping> {
        self.context_mapping.as_ref()
    }

    pub fn setting_str(&self, key: &str) -> Option<&str> {
        self.configuration.get(key).and_then(Value::as_str)
    }
}

impl From<String> for BlockId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Cacheable for BlockDescriptor {
    fn cacheability(&self) -> CacheabilityMetadata {
        self.cache.clone()
    }
}
