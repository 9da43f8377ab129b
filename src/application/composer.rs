//! Page composition: shell → regions → finalized page.
//!
//! [`PageComposer::build`] returns a cheap [`PageShell`] that carries only the
//! page cache keys. Forcing the shell places access-checked blocks into their
//! regions and yields [`PageRegions`], whose block nodes are still
//! placeholders. [`PageRegions::finalize`] forces each block build (or reuses
//! a cached copy) and applies the accumulated metadata to the root node.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;

use futures::{StreamExt, TryStreamExt, stream};
use metrics::{counter, histogram};
use tracing::{debug, info, instrument};

use crate::application::block_renderer::BlockRenderer;
use crate::application::deferred::Deferred;
use crate::application::error::ComposeError;
use crate::application::ports::{AccessEvaluator, BlockPlugin, BlockPlugins, TitleRenderer};
use crate::cache::{RenderCache, StagedWrites};
use crate::domain::block::{BlockDescriptor, BlockId};
use crate::domain::cacheability::{CacheEnvelope, CacheKeys, Cacheable, CacheabilityMetadata};
use crate::domain::page::{BlockContexts, PageContexts, PageVariant};
use crate::domain::region::region_class;
use crate::domain::render::{BlockSummary, RenderNode};

pub(crate) const METRIC_PAGE_BUILD_TOTAL: &str = "tessera_page_build_total";
pub(crate) const METRIC_PAGE_CACHE_HIT_TOTAL: &str = "tessera_page_cache_hit_total";
pub(crate) const METRIC_BLOCK_CACHE_HIT_TOTAL: &str = "tessera_block_cache_hit_total";
pub(crate) const METRIC_BLOCK_DENIED_TOTAL: &str = "tessera_block_denied_total";
pub(crate) const METRIC_PAGE_COMPOSE_MS: &str = "tessera_page_compose_ms";

const DEFAULT_BLOCK_CONCURRENCY: usize = 4;

/// Tunables for block content builds.
#[derive(Debug, Clone, Copy)]
pub struct ComposerConfig {
    /// Upper bound on block builds running at once during finalization.
    pub block_concurrency: NonZeroUsize,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            block_concurrency: NonZeroUsize::new(DEFAULT_BLOCK_CONCURRENCY)
                .unwrap_or(NonZeroUsize::MIN),
        }
    }
}

/// Composes page variants into render trees.
#[derive(Clone)]
pub struct PageComposer {
    plugins: Arc<BlockPlugins>,
    access: Arc<dyn AccessEvaluator>,
    titles: Arc<dyn TitleRenderer>,
    cache: Option<Arc<dyn RenderCache>>,
    config: ComposerConfig,
}

impl PageComposer {
    pub fn new(
        plugins: BlockPlugins,
        access: Arc<dyn AccessEvaluator>,
        titles: Arc<dyn TitleRenderer>,
    ) -> Self {
        Self {
            plugins: Arc::new(plugins),
            access,
            titles,
            cache: None,
            config: ComposerConfig::default(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn RenderCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_config(mut self, config: ComposerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// Build the page shell. Nothing beyond the shell keys is computed until
    /// the shell is forced.
    pub fn build(&self, variant: Arc<PageVariant>, contexts: Arc<PageContexts>) -> PageShell {
        let keys = variant.shell_keys();
        let node = RenderNode::default().with_cache(CacheEnvelope::keyed(keys.clone()));
        let composer = self.clone();
        let shell = node.clone();
        let regions = Deferred::new(keys, move || async move {
            composer.build_regions(variant, contexts, shell).await
        });
        PageShell { node, regions }
    }

    /// Run the whole lifecycle, consulting the cache store when one is set.
    ///
    /// A page-level hit returns the stored node without forcing anything.
    /// Otherwise cache writes are staged and only offered to the store once
    /// the page is finalized; a failed build writes nothing.
    #[instrument(skip_all, fields(page = %variant.id))]
    pub async fn render(
        &self,
        variant: Arc<PageVariant>,
        contexts: PageContexts,
    ) -> Result<RenderNode, ComposeError> {
        let started_at = Instant::now();
        let page_id = variant.id.clone();
        let shell = self.build(variant, Arc::new(contexts));

        if let Some(hit) = self.cache.as_ref().and_then(|cache| cache.get(shell.keys())) {
            debug!(page = %page_id, keys = %shell.keys(), "Page cache hit");
            counter!(METRIC_PAGE_CACHE_HIT_TOTAL).increment(1);
            return Ok(hit);
        }

        let page = shell.force().await?.finalize().await?;
        let (node, writes) = page.into_parts();

        let written = match &self.cache {
            Some(cache) => writes.flush(cache.as_ref()),
            None => 0,
        };

        counter!(METRIC_PAGE_BUILD_TOTAL).increment(1);
        histogram!(METRIC_PAGE_COMPOSE_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);
        info!(
            page = %page_id,
            tags = node.cache.metadata.tags().len(),
            max_age = %node.cache.metadata.max_age(),
            cache_writes = written,
            "Page composed"
        );

        Ok(node)
    }

    #[instrument(skip_all, fields(page = %variant.id))]
    async fn build_regions(
        self,
        variant: Arc<PageVariant>,
        contexts: Arc<PageContexts>,
        shell: RenderNode,
    ) -> Result<PageRegions, ComposeError> {
        let regions = self.prepare(&variant, &contexts)?;

        let mut accumulator = shell.cache.metadata.clone();
        accumulator.add_dependency(variant.as_ref());
        let page_tags =
            CacheabilityMetadata::permanent().with_tags(variant.cacheability().tags().iter().cloned());

        let mut node = shell;
        let mut pending = Vec::new();

        for (region, blocks) in regions {
            let mut container = RenderNode {
                prefix: Some(format!("<div class=\"{}\">", region_class(&region))),
                suffix: Some("</div>".to_string()),
                ..RenderNode::default()
            };

            let mut weight = 0u32;
            for PreparedBlock {
                block,
                plugin,
                contexts: block_contexts,
            } in blocks
            {
                let decision = self
                    .access
                    .evaluate(&block, &contexts)
                    .await
                    .map_err(|source| ComposeError::access(&block.id, source))?;
                accumulator.add_dependency(&decision);

                if !decision.is_allowed() {
                    debug!(block = %block.id, region = %region, "Block access denied");
                    counter!(METRIC_BLOCK_DENIED_TOTAL).increment(1);
                    continue;
                }

                let descriptor = plugin.cache_descriptor(&block);
                let envelope =
                    CacheEnvelope::new(variant.block_keys(&block), page_tags.merge(&descriptor));
                accumulator.merge_in(&envelope.metadata);

                let placeholder = RenderNode {
                    weight: Some(weight),
                    block: Some(BlockSummary::new(&block.plugin, block.configuration.clone())),
                    cache: envelope,
                    ..RenderNode::default()
                };
                weight += 1;

                debug!(block = %block.id, region = %region, weight = ?placeholder.weight, "Block placed");
                container
                    .children
                    .insert(block.id.as_str(), placeholder.clone());
                pending.push(PendingBlock {
                    region: region.clone(),
                    block_id: block.id.clone(),
                    build: BlockRenderer::new(plugin, block, block_contexts).defer(placeholder),
                });
            }

            node.children.insert(region, container);
        }

        let title = self
            .titles
            .render_title(&variant.page_title, &contexts.token_data())
            .map_err(|source| ComposeError::Title { source })?;
        node.title = Some(title);

        Ok(PageRegions {
            node,
            accumulator,
            pending,
            cache: self.cache.clone(),
            config: self.config,
        })
    }

    /// Validate the variant and resolve plugins and context mappings for every
    /// block before any access check or content build runs.
    fn prepare(
        &self,
        variant: &PageVariant,
        contexts: &PageContexts,
    ) -> Result<Vec<(String, Vec<PreparedBlock>)>, ComposeError> {
        variant.regions.validate()?;

        variant
            .regions
            .regions_with_blocks()
            .into_iter()
            .map(|(region, blocks)| {
                let prepared = blocks
                    .into_iter()
                    .map(|block| {
                        let plugin = self.plugins.resolve(block)?;
                        let block_contexts = match block.context_aware() {
                            Some(mapping) => contexts.resolve(block, mapping)?,
                            None => BlockContexts::default(),
                        };
                        Ok(PreparedBlock {
                            block: block.clone(),
                            plugin,
                            contexts: block_contexts,
                        })
                    })
                    .collect::<Result<Vec<_>, ComposeError>>()?;
                Ok((region.to_string(), prepared))
            })
            .collect()
    }
}

struct PreparedBlock {
    block: BlockDescriptor,
    plugin: Arc<dyn BlockPlugin>,
    contexts: BlockContexts,
}

/// First state: a page node holding only its cache keys.
#[derive(Debug)]
pub struct PageShell {
    node: RenderNode,
    regions: Deferred<PageRegions>,
}

impl PageShell {
    pub fn node(&self) -> &RenderNode {
        &self.node
    }

    pub fn keys(&self) -> &CacheKeys {
        self.regions.keys()
    }

    /// Build the regions. Only called on a cache miss for the shell keys.
    pub async fn force(self) -> Result<PageRegions, ComposeError> {
        self.regions.force().await
    }
}

/// A placed block whose content is still deferred.
#[derive(Debug)]
pub struct PendingBlock {
    region: String,
    block_id: BlockId,
    build: Deferred<RenderNode>,
}

/// Second state: regions populated with placeholder block nodes.
pub struct PageRegions {
    node: RenderNode,
    accumulator: CacheabilityMetadata,
    pending: Vec<PendingBlock>,
    cache: Option<Arc<dyn RenderCache>>,
    config: ComposerConfig,
}

impl PageRegions {
    pub fn node(&self) -> &RenderNode {
        &self.node
    }

    /// Page-level metadata accumulated so far.
    pub fn accumulator(&self) -> &CacheabilityMetadata {
        &self.accumulator
    }

    /// `(region, block id)` of every placed block, in placement order.
    pub fn placed_blocks(&self) -> impl Iterator<Item = (&str, &BlockId)> {
        self.pending
            .iter()
            .map(|pending| (pending.region.as_str(), &pending.block_id))
    }

    /// Force every block build (or reuse cached copies), then apply the
    /// accumulated metadata to the root node.
    ///
    /// Builds run concurrently up to the configured bound, but results are
    /// consumed in placement order so the tree and the accumulator do not
    /// depend on completion order.
    #[instrument(skip_all, fields(blocks = self.pending.len()))]
    pub async fn finalize(self) -> Result<FinalizedPage, ComposeError> {
        let Self {
            mut node,
            mut accumulator,
            pending,
            cache,
            config,
        } = self;

        let built: Vec<(String, BlockId, RenderNode, bool)> = stream::iter(pending)
            .map(|pending| {
                let cache = cache.clone();
                async move {
                    let PendingBlock {
                        region,
                        block_id,
                        build,
                    } = pending;
                    if let Some(hit) = cache.as_ref().and_then(|cache| cache.get(build.keys())) {
                        debug!(block = %block_id, "Block cache hit");
                        counter!(METRIC_BLOCK_CACHE_HIT_TOTAL).increment(1);
                        return Ok((region, block_id, hit, false));
                    }
                    let rendered = build.force().await?;
                    Ok::<_, ComposeError>((region, block_id, rendered, true))
                }
            })
            .buffered(config.block_concurrency.get())
            .try_collect()
            .await?;

        let mut writes = StagedWrites::new();
        for (region, block_id, rendered, fresh) in built {
            accumulator.merge_in(&rendered.bubbled_cacheability());
            if fresh {
                writes.stage(rendered.cache.keys.clone(), rendered.clone());
            }
            if let Some(container) = node.children.get_mut(&region) {
                container.children.insert(block_id.as_str(), rendered);
            }
        }

        accumulator.apply_to(&mut node.cache);
        writes.stage(node.cache.keys.clone(), node.clone());

        Ok(FinalizedPage { node, writes })
    }
}

impl std::fmt::Debug for PageRegions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageRegions")
            .field("node", &self.node)
            .field("accumulator", &self.accumulator)
            .field("pending", &self.pending)
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

/// Final state: the page node with its complete cache envelope.
#[derive(Debug)]
pub struct FinalizedPage {
    node: RenderNode,
    writes: StagedWrites,
}

impl FinalizedPage {
    pub fn node(&self) -> &RenderNode {
        &self.node
    }

    /// Cache writes the store should receive for this page.
    pub fn writes(&self) -> &StagedWrites {
        &self.writes
    }

    pub fn into_parts(self) -> (RenderNode, StagedWrites) {
        (self.node, self.writes)
    }
}
