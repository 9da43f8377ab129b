//! Page variants and the explicit context values a page build receives.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::block::{BlockDescriptor, ContextMapping};
use super::cacheability::{CacheKeys, Cacheable, CacheabilityMetadata};
use super::error::DomainError;
use super::region::RegionAssignment;

pub const PAGE_DISPLAY_KEY: &str = "page-display";

/// Typed input available to context-aware blocks and title tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextValue {
    /// Data type, e.g. `entity:node` or `string`.
    pub data_type: String,
    #[serde(default)]
    pub value: Value,
}

impl ContextValue {
    pub fn new(data_type: impl Into<String>, value: Value) -> Self {
        Self {
            data_type: data_type.into(),
            value,
        }
    }

    /// Token type for entity contexts (`entity:node` → `node`).
    pub fn token_type(&self) -> Option<&str> {
        let entity_type = self.data_type.strip_prefix("entity:")?;
        Some(match entity_type {
            "taxonomy_term" => "term",
            other => other,
        })
    }
}

/// Context values keyed by name, passed explicitly into a page build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageContexts(BTreeMap<String, ContextValue>);

impl PageContexts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: ContextValue) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ContextValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ContextValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContextValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Resolve a block's slot mapping against these contexts.
    pub fn resolve(&self, block: &BlockDescriptor, mapping: &ContextMapping) -> Result<BlockContexts, DomainError> {
        mapping
            .iter()
            .map(|(slot, name)| {
                let value = self.get(name).ok_or_else(|| {
                    DomainError::validation(format!(
                        "block `{}` maps slot `{slot}` to missing context `{name}`",
                        block.id
                    ))
                })?;
                Ok((slot.clone(), value.clone()))
            })
            .collect::<Result<BTreeMap<_, _>, DomainError>>()
            .map(BlockContexts)
    }

    /// Token data derived from entity contexts, keyed by token type.
    pub fn token_data(&self) -> TokenData {
        let mut data = TokenData::new();
        for (_, context) in self.iter() {
            if let Some(token_type) = context.token_type() {
                data.insert(token_type.to_string(), context.value.clone());
            }
        }
        data
    }
}

/// Token type → value, consumed by title rendering.
pub type TokenData = BTreeMap<String, Value>;

/// Contexts handed to a single block, keyed by the block's slot names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockContexts(BTreeMap<String, ContextValue>);

impl BlockContexts {
    pub fn get(&self, slot: &str) -> Option<&ContextValue> {
        self.0.get(slot)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One display variant of a page: title, own cacheability and blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct PageVariant {
    pub id: String,
    pub page_title: String,
    pub cache: CacheabilityMetadata,
    pub regions: RegionAssignment,
}

impl PageVariant {
    pub fn new(id: impl Into<String>, regions: RegionAssignment) -> Self {
        Self {
            id: id.into(),
            page_title: String::new(),
            cache: CacheabilityMetadata::default(),
            regions,
        }
    }

    pub fn with_title(mut self, template: impl Into<String>) -> Self {
        self.page_title = template.into();
        self
    }

    pub fn with_cache(mut self, cache: CacheabilityMetadata) -> Self {
        self.cache = cache;
        self
    }

    /// Invalidation tag owned by this variant's configuration.
    pub fn cache_tag(&self) -> String {
        format!("{PAGE_DISPLAY_KEY}:{}", self.id)
    }

    /// Keys of the page shell: `page-display:<id>`.
    pub fn shell_keys(&self) -> CacheKeys {
        CacheKeys::new([PAGE_DISPLAY_KEY, self.id.as_str()])
    }

    /// Keys of a block slot: `page-display:<id>:block:<block id>`.
    pub fn block_keys(&self, block: &BlockDescriptor) -> CacheKeys {
        self.shell_keys()
            .compose(&CacheKeys::new(["block", block.id.as_str()]))
    }
}

impl Cacheable for PageVariant {
    fn cacheability(&self) -> CacheabilityMetadata {
        self.cache.merge(&CacheabilityMetadata::permanent().with_tags([self.cache_tag()]))
    }
}
