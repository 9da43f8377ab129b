//! Role-based block visibility.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde_json::Value;

use crate::application::error::CollaboratorError;
use crate::application::ports::AccessEvaluator;
use crate::domain::access::AccessDecision;
use crate::domain::block::BlockDescriptor;
use crate::domain::cacheability::CacheabilityMetadata;
use crate::domain::page::PageContexts;

pub const CURRENT_USER_CONTEXT: &str = "current_user";
pub const ROLES_CACHE_CONTEXT: &str = "user.roles";
const ANONYMOUS_ROLE: &str = "anonymous";

/// Grants access when a block's `visibility_roles` setting is absent or
/// shares a role with the `current_user` context.
///
/// A viewer without a `current_user` context is treated as anonymous.
#[derive(Debug, Default)]
pub struct RoleAccessEvaluator;

#[async_trait]
impl AccessEvaluator for RoleAccessEvaluator {
    async fn evaluate(
        &self,
        block: &BlockDescriptor,
        contexts: &PageContexts,
    ) -> Result<AccessDecision, CollaboratorError> {
        let metadata =
            CacheabilityMetadata::permanent().with_tags([format!("config:block.{}", block.id)]);

        let Some(required) = block.configuration.get("visibility_roles") else {
            return Ok(AccessDecision::allowed(metadata));
        };
        let required = roles(required).ok_or_else(|| {
            CollaboratorError::new(format!(
                "block `{}` setting `visibility_roles` must be a list of strings",
                block.id
            ))
        })?;

        let viewer = match contexts.get(CURRENT_USER_CONTEXT) {
            Some(user) => user
                .value
                .get("roles")
                .map(|value| {
                    roles(value).ok_or_else(|| {
                        CollaboratorError::new("context `current_user` has malformed `roles`")
                    })
                })
                .transpose()?
                .unwrap_or_default(),
            None => BTreeSet::from([ANONYMOUS_ROLE.to_string()]),
        };

        let allowed = required.is_empty() || !required.is_disjoint(&viewer);
        Ok(AccessDecision::allowed_if(
            allowed,
            metadata.with_contexts([ROLES_CACHE_CONTEXT]),
        ))
    }
}

fn roles(value: &Value) -> Option<BTreeSet<String>> {
    value
        .as_array()?
        .iter()
        .map(|role| role.as_str().map(str::to_string))
        .collect()
}
