//! Render tree produced by the composer.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use super::cacheability::{CacheEnvelope, Cacheable, CacheabilityMetadata};

/// Summary of the block plugin behind a placed block node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockSummary {
    pub plugin_id: String,
    pub base_plugin_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derivative_id: Option<String>,
    pub configuration: Map<String, Value>,
}

impl BlockSummary {
    /// Split a `base:derivative` plugin id into its parts.
    pub fn new(plugin_id: &str, configuration: Map<String, Value>) -> Self {
        let (base, derivative) = match plugin_id.split_once(':') {
            Some((base, derivative)) => (base.to_string(), Some(derivative.to_string())),
            None => (plugin_id.to_string(), None),
        };
        Self {
            plugin_id: plugin_id.to_string(),
            base_plugin_id: base,
            derivative_id: derivative,
            configuration,
        }
    }
}

/// Child slots in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Children(Vec<(String, RenderNode)>);

impl Children {
    /// Insert or replace the node at `slot`. Replacing keeps the original
    /// position.
    pub fn insert(&mut self, slot: impl Into<String>, node: RenderNode) {
        let slot = slot.into();
        match self.0.iter_mut().find(|(name, _)| *name == slot) {
            Some((_, existing)) => *existing = node,
            None => self.0.push((slot, node)),
        }
    }

    pub fn get(&self, slot: &str) -> Option<&RenderNode> {
        self.0
            .iter()
            .find_map(|(name, node)| (name == slot).then_some(node))
    }

    pub fn get_mut(&mut self, slot: &str) -> Option<&mut RenderNode> {
        self.0
            .iter_mut()
            .find_map(|(name, node)| (name == slot).then_some(node))
    }

    pub fn contains(&self, slot: &str) -> bool {
        self.get(slot).is_some()
    }

    pub fn slots(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RenderNode)> {
        self.0.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Children {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (slot, node) in &self.0 {
            map.serialize_entry(slot, node)?;
        }
        map.end()
    }
}

/// A node of the composed page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderNode {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markup: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<BlockSummary>,
    #[serde(skip_serializing_if = "Children::is_empty")]
    pub children: Children,
    pub cache: CacheEnvelope,
}

impl RenderNode {
    pub fn markup(markup: impl Into<String>) -> Self {
        Self {
            markup: Some(markup.into()),
            ..Self::default()
        }
    }

    pub fn with_cache(mut self, cache: CacheEnvelope) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_child(mut self, slot: impl Into<String>, child: RenderNode) -> Self {
        self.children.insert(slot, child);
        self
    }

    /// Structural emptiness: no visible markup and no non-empty children.
    /// Prefix and suffix are wrappers, not content.
    pub fn is_empty(&self) -> bool {
        let has_markup = self.markup.as_deref().is_some_and(|m| !m.is_empty());
        !has_markup && self.children.iter().all(|(_, child)| child.is_empty())
    }

    pub fn child(&self, slot: &str) -> Option<&RenderNode> {
        self.children.get(slot)
    }

    /// Metadata of this node merged with every descendant's.
    pub fn bubbled_cacheability(&self) -> CacheabilityMetadata {
        let mut metadata = self.cache.metadata.clone();
        for (_, child) in self.children.iter() {
            metadata.merge_in(&child.bubbled_cacheability());
        }
        metadata
    }
}

impl Cacheable for RenderNode {
    fn cacheability(&self) -> CacheabilityMetadata {
        self.cache.metadata.clone()
    }
}
