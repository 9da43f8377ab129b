//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tessera::application::{
    AccessEvaluator, BlockPlugin, BlockPlugins, CollaboratorError, PageComposer, TitleRenderer,
};
use tessera::cache::RenderCache;
use tessera::domain::access::AccessDecision;
use tessera::domain::block::BlockDescriptor;
use tessera::domain::cacheability::{CacheEnvelope, CacheKeys, CacheabilityMetadata};
use tessera::domain::page::{BlockContexts, PageContexts, TokenData};
use tessera::domain::render::RenderNode;
use tessera::infra::title::TokenTitleRenderer;

/// In-memory render cache keyed on the storage key, evicting by tag.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (RenderNode, CacheabilityMetadata)>>,
    gets: AtomicUsize,
    hits: AtomicUsize,
    puts: AtomicUsize,
}

impl MemoryCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn contains(&self, keys: &CacheKeys) -> bool {
        self.entries
            .lock()
            .expect("cache lock")
            .contains_key(&keys.storage_key())
    }

    pub fn stored_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .expect("cache lock")
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock").len()
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

impl RenderCache for MemoryCache {
    fn get(&self, keys: &CacheKeys) -> Option<RenderNode> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let hit = self
            .entries
            .lock()
            .expect("cache lock")
            .get(&keys.storage_key())
            .map(|(node, _)| node.clone());
        if hit.is_some() {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }
        hit
    }

    fn put(&self, keys: &CacheKeys, node: RenderNode, metadata: &CacheabilityMetadata) {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.entries
            .lock()
            .expect("cache lock")
            .insert(keys.storage_key(), (node, metadata.clone()));
    }

    fn invalidate_tags(&self, tags: &[&str]) {
        self.entries
            .lock()
            .expect("cache lock")
            .retain(|_, (_, metadata)| !tags.iter().any(|tag| metadata.has_tag(tag)));
    }
}

/// Access evaluator answering from a fixed table; unknown blocks are allowed.
#[derive(Default)]
pub struct ScriptedAccess {
    decisions: BTreeMap<String, AccessDecision>,
    failing: Option<String>,
    calls: AtomicUsize,
}

impl ScriptedAccess {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, block_id: &str, decision: AccessDecision) -> Self {
        self.decisions.insert(block_id.to_string(), decision);
        self
    }

    pub fn failing_for(mut self, block_id: &str) -> Self {
        self.failing = Some(block_id.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccessEvaluator for ScriptedAccess {
    async fn evaluate(
        &self,
        block: &BlockDescriptor,
        _contexts: &PageContexts,
    ) -> Result<AccessDecision, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.as_deref() == Some(block.id.as_str()) {
            return Err(CollaboratorError::new("access backend unavailable"));
        }
        Ok(self
            .decisions
            .get(block.id.as_str())
            .cloned()
            .unwrap_or_else(|| AccessDecision::allowed(CacheabilityMetadata::permanent())))
    }
}

/// What a scripted plugin returns for one block.
#[derive(Clone)]
pub enum Script {
    Markup(String, CacheabilityMetadata),
    Empty(Option<CacheabilityMetadata>),
    Fail(String),
}

/// Block plugin driven by a per-block script, counting builds per block.
#[derive(Default)]
pub struct ScriptedPlugin {
    scripts: BTreeMap<String, Script>,
    delays: BTreeMap<String, Duration>,
    builds: Mutex<BTreeMap<String, usize>>,
    completions: Mutex<Vec<String>>,
}

impl ScriptedPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn markup(mut self, block_id: &str, markup: &str, metadata: CacheabilityMetadata) -> Self {
        self.scripts.insert(
            block_id.to_string(),
            Script::Markup(markup.to_string(), metadata),
        );
        self
    }

    pub fn empty(mut self, block_id: &str, metadata: Option<CacheabilityMetadata>) -> Self {
        self.scripts
            .insert(block_id.to_string(), Script::Empty(metadata));
        self
    }

    pub fn failing(mut self, block_id: &str, message: &str) -> Self {
        self.scripts
            .insert(block_id.to_string(), Script::Fail(message.to_string()));
        self
    }

    /// Hold the build of `block_id` for `millis` before it completes.
    pub fn delayed(mut self, block_id: &str, millis: u64) -> Self {
        self.delays
            .insert(block_id.to_string(), Duration::from_millis(millis));
        self
    }

    /// Block ids in the order their builds completed.
    pub fn completions(&self) -> Vec<String> {
        self.completions.lock().expect("completions lock").clone()
    }

    pub fn builds(&self, block_id: &str) -> usize {
        self.builds
            .lock()
            .expect("builds lock")
            .get(block_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_builds(&self) -> usize {
        self.builds.lock().expect("builds lock").values().sum()
    }
}

#[async_trait]
impl BlockPlugin for ScriptedPlugin {
    async fn build(
        &self,
        block: &BlockDescriptor,
        _contexts: &BlockContexts,
    ) -> Result<Option<RenderNode>, CollaboratorError> {
        if let Some(delay) = self.delays.get(block.id.as_str()) {
            tokio::time::sleep(*delay).await;
        }
        self.completions
            .lock()
            .expect("completions lock")
            .push(block.id.as_str().to_string());
        *self
            .builds
            .lock()
            .expect("builds lock")
            .entry(block.id.as_str().to_string())
            .or_insert(0) += 1;

        match self.scripts.get(block.id.as_str()) {
            Some(Script::Markup(markup, metadata)) => Ok(Some(
                RenderNode::markup(markup.clone())
                    .with_cache(CacheEnvelope::new(CacheKeys::default(), metadata.clone())),
            )),
            Some(Script::Empty(Some(metadata))) => Ok(Some(
                RenderNode::markup("")
                    .with_cache(CacheEnvelope::new(CacheKeys::default(), metadata.clone())),
            )),
            Some(Script::Empty(None)) => Ok(None),
            Some(Script::Fail(message)) => Err(CollaboratorError::new(message.clone())),
            None => Ok(Some(RenderNode::markup(format!(
                "<p>{}</p>",
                block.id.as_str()
            )))),
        }
    }
}

/// Title renderer that always fails.
pub struct BrokenTitles;

impl TitleRenderer for BrokenTitles {
    fn render_title(&self, _template: &str, _data: &TokenData) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::new("token service offline"))
    }
}

pub const SCRIPTED_PLUGIN: &str = "scripted";

pub fn composer(plugin: Arc<ScriptedPlugin>, access: Arc<ScriptedAccess>) -> PageComposer {
    PageComposer::new(
        BlockPlugins::new().with(SCRIPTED_PLUGIN, plugin),
        access,
        Arc::new(TokenTitleRenderer),
    )
}

pub fn block(id: &str, region: &str, weight: i32) -> BlockDescriptor {
    BlockDescriptor::new(id, region, SCRIPTED_PLUGIN).with_weight(weight)
}

pub fn tags(metadata: &CacheabilityMetadata) -> Vec<&str> {
    metadata.tags().iter().map(String::as_str).collect()
}

/// Indented outline of a render tree: slot, weight and markup per node.
pub fn outline(node: &RenderNode) -> String {
    let mut out = String::new();
    write_outline(&mut out, "page", node, 0);
    out.trim_end().to_string()
}

fn write_outline(out: &mut String, slot: &str, node: &RenderNode, depth: usize) {
    out.push_str(&"  ".repeat(depth));
    out.push_str(slot);
    if let Some(weight) = node.weight {
        out.push_str(&format!(" #{weight}"));
    }
    if let Some(prefix) = node.prefix.as_deref() {
        out.push_str(&format!(" {prefix}"));
    }
    if let Some(markup) = node.markup.as_deref() {
        out.push_str(&format!(" {markup:?}"));
    }
    out.push('\n');
    for (child_slot, child) in node.children.iter() {
        write_outline(out, child_slot, child, depth + 1);
    }
}
