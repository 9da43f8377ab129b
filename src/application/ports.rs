//! Collaborator traits consumed by the page composer.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::application::error::CollaboratorError;
use crate::domain::access::AccessDecision;
use crate::domain::block::BlockDescriptor;
use crate::domain::cacheability::CacheabilityMetadata;
use crate::domain::error::DomainError;
use crate::domain::page::{BlockContexts, PageContexts, TokenData};
use crate::domain::render::RenderNode;

/// Decides whether a block is visible for the given contexts.
///
/// Implementations must be deterministic for a fixed block configuration and
/// fixed context values, and must describe through the decision's
/// cacheability what the outcome depends on.
#[async_trait]
pub trait AccessEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        block: &BlockDescriptor,
        contexts: &PageContexts,
    ) -> Result<AccessDecision, CollaboratorError>;
}

/// Content-producing plugin behind a block.
#[async_trait]
pub trait BlockPlugin: Send + Sync {
    /// Build the block's content. `Ok(None)` means the block has nothing to
    /// show, which is a normal outcome.
    async fn build(
        &self,
        block: &BlockDescriptor,
        contexts: &BlockContexts,
    ) -> Result<Option<RenderNode>, CollaboratorError>;

    /// Cacheability of the block independent of its content.
    fn cache_descriptor(&self, block: &BlockDescriptor) -> CacheabilityMetadata {
        block.cache.clone()
    }
}

/// Substitutes tokens in a page title template.
pub trait TitleRenderer: Send + Sync {
    fn render_title(&self, template: &str, data: &TokenData) -> Result<String, CollaboratorError>;
}

/// Block plugins available to a composer, keyed by plugin id.
#[derive(Clone, Default)]
pub struct BlockPlugins {
    plugins: HashMap<String, Arc<dyn BlockPlugin>>,
}

impl BlockPlugins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, plugin_id: impl Into<String>, plugin: Arc<dyn BlockPlugin>) -> Self {
        self.register(plugin_id, plugin);
        self
    }

    pub fn register(&mut self, plugin_id: impl Into<String>, plugin: Arc<dyn BlockPlugin>) {
        self.plugins.insert(plugin_id.into(), plugin);
    }

    /// Resolve the plugin for `block`, falling back to the base id of a
    /// `base:derivative` plugin id.
    pub fn resolve(&self, block: &BlockDescriptor) -> Result<Arc<dyn BlockPlugin>, DomainError> {
        let base = block
            .plugin
            .split_once(':')
            .map_or(block.plugin.as_str(), |(base, _)| base);
        self.plugins
            .get(block.plugin.as_str())
            .or_else(|| self.plugins.get(base))
            .cloned()
            .ok_or_else(|| DomainError::not_found("block plugin", block.plugin.clone()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for BlockPlugins {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<&str> = self.ids().collect();
        ids.sort_unstable();
        f.debug_struct("BlockPlugins").field("plugins", &ids).finish()
    }
}
