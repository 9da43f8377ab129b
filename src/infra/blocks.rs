//! Block plugins shipped with the binary.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::application::error::CollaboratorError;
use crate::application::ports::{BlockPlugin, BlockPlugins};
use crate::domain::block::BlockDescriptor;
use crate::domain::cacheability::{CacheEnvelope, CacheabilityMetadata};
use crate::domain::page::BlockContexts;
use crate::domain::render::RenderNode;

pub const MARKUP_PLUGIN: &str = "markup";
pub const CONTEXT_FIELD_PLUGIN: &str = "context_field";

/// Slot a `context_field` block reads its entity from.
pub const ENTITY_SLOT: &str = "entity";

/// Plugins available to layouts loaded from disk.
pub fn default_plugins() -> BlockPlugins {
    BlockPlugins::new()
        .with(MARKUP_PLUGIN, Arc::new(MarkupBlock))
        .with(CONTEXT_FIELD_PLUGIN, Arc::new(ContextFieldBlock))
}

/// Renders `configuration.markup` verbatim.
///
/// `configuration.content_tags` lists tags the content depends on; they are
/// attached to the content even when the markup is empty.
#[derive(Debug, Default)]
pub struct MarkupBlock;

#[async_trait]
impl BlockPlugin for MarkupBlock {
    async fn build(
        &self,
        block: &BlockDescriptor,
        _contexts: &BlockContexts,
    ) -> Result<Option<RenderNode>, CollaboratorError> {
        let tags = string_list(block, "content_tags")?;
        let markup = block.setting_str("markup").unwrap_or_default();

        if markup.is_empty() && tags.is_empty() {
            return Ok(None);
        }

        Ok(Some(RenderNode::markup(markup).with_cache(CacheEnvelope::new(
            Default::default(),
            CacheabilityMetadata::permanent().with_tags(tags),
        ))))
    }
}

/// Renders one field of the entity mapped to the `entity` slot.
///
/// The content is tagged `<type>:<id>` when the entity value carries an `id`,
/// so editing the entity invalidates the block.
#[derive(Debug, Default)]
pub struct ContextFieldBlock;

#[async_trait]
impl BlockPlugin for ContextFieldBlock {
    async fn build(
        &self,
        block: &BlockDescriptor,
        contexts: &BlockContexts,
    ) -> Result<Option<RenderNode>, CollaboratorError> {
        let field = block.setting_str("field").ok_or_else(|| {
            CollaboratorError::new(format!("block `{}` has no `field` setting", block.id))
        })?;
        let entity = contexts.get(ENTITY_SLOT).ok_or_else(|| {
            CollaboratorError::new(format!(
                "block `{}` has no context mapped to `{ENTITY_SLOT}`",
                block.id
            ))
        })?;

        let mut metadata = CacheabilityMetadata::permanent();
        if let (Some(token_type), Some(id)) = (entity.token_type(), entity.value.get("id")) {
            metadata = metadata.with_tags([format!("{token_type}:{}", scalar(id))]);
        }

        let text = entity.value.get(field).map(scalar).unwrap_or_default();
        let markup = if text.is_empty() {
            String::new()
        } else {
            format!("<div class=\"field field-{field}\">{text}</div>")
        };

        Ok(Some(
            RenderNode::markup(markup).with_cache(CacheEnvelope::new(Default::default(), metadata)),
        ))
    }
}

fn string_list(block: &BlockDescriptor, key: &str) -> Result<Vec<String>, CollaboratorError> {
    match block.configuration.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    CollaboratorError::new(format!(
                        "block `{}` setting `{key}` must contain strings",
                        block.id
                    ))
                })
            })
            .collect(),
        Some(_) => Err(CollaboratorError::new(format!(
            "block `{}` setting `{key}` must be a list",
            block.id
        ))),
    }
}

/// String form of a scalar JSON value; strings are not quoted.
pub(crate) fn scalar(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
