//! Second-level deferred build: one block's content.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, instrument};

use crate::application::deferred::Deferred;
use crate::application::error::ComposeError;
use crate::application::ports::BlockPlugin;
use crate::domain::block::BlockDescriptor;
use crate::domain::page::BlockContexts;
use crate::domain::render::RenderNode;

pub(crate) const METRIC_BLOCK_EMPTY_TOTAL: &str = "tessera_block_empty_total";

/// Slot under which a block's content is placed inside its block node.
pub const CONTENT_SLOT: &str = "content";

/// Renders a placed block into its final node.
#[derive(Clone)]
pub struct BlockRenderer {
    plugin: Arc<dyn BlockPlugin>,
    block: BlockDescriptor,
    contexts: BlockContexts,
}

impl BlockRenderer {
    pub fn new(plugin: Arc<dyn BlockPlugin>, block: BlockDescriptor, contexts: BlockContexts) -> Self {
        Self {
            plugin,
            block,
            contexts,
        }
    }

    /// Wrap [`Self::render`] in a deferred build under the placeholder's keys.
    pub fn defer(self, placeholder: RenderNode) -> Deferred<RenderNode> {
        let keys = placeholder.cache.keys.clone();
        Deferred::new(keys, move || async move { self.render(placeholder).await })
    }

    /// Build the block's content into `placeholder`.
    ///
    /// Empty content collapses the block into an empty-markup node that keeps
    /// the placeholder's cache envelope, so the emptiness itself is cached
    /// until one of the block's tags is invalidated. Any metadata the content
    /// carries is merged into the envelope, empty or not.
    #[instrument(skip_all, fields(block = %self.block.id, plugin = %self.block.plugin))]
    pub async fn render(&self, placeholder: RenderNode) -> Result<RenderNode, ComposeError> {
        let content = self
            .plugin
            .build(&self.block, &self.contexts)
            .await
            .map_err(|source| ComposeError::content(&self.block.id, source))?;

        let mut envelope = placeholder.cache.clone();
        let node = match content {
            Some(content) if !content.is_empty() => {
                envelope
                    .metadata
                    .merge_in(&content.bubbled_cacheability());
                let mut node = placeholder;
                node.children.insert(CONTENT_SLOT, content);
                node
            }
            empty => {
                if let Some(content) = empty {
                    envelope
                        .metadata
                        .merge_in(&content.bubbled_cacheability());
                }
                debug!(block = %self.block.id, "Block produced no content");
                counter!(METRIC_BLOCK_EMPTY_TOTAL).increment(1);
                RenderNode::markup("")
            }
        };

        Ok(node.with_cache(envelope))
    }
}
