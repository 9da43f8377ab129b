use std::error::Error as StdError;

use thiserror::Error;

use crate::{
    domain::{block::BlockId, error::DomainError},
    infra::error::InfraError,
};

/// Source chain of an error flattened into messages, outermost first.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { source, messages }
    }

    /// Messages joined as `outer: inner: root`.
    pub fn chain(&self) -> String {
        self.messages.join(": ")
    }
}

/// Failure raised by a consumed collaborator (block plugin, access check,
/// title renderer).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CollaboratorError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl CollaboratorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Fatal page-build failures. Empty block content is not an error.
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("page configuration is invalid")]
    Configuration(#[from] DomainError),
    #[error("access evaluation failed for block `{block_id}`")]
    AccessEvaluation {
        block_id: BlockId,
        #[source]
        source: CollaboratorError,
    },
    #[error("content build failed for block `{block_id}`")]
    ContentBuild {
        block_id: BlockId,
        #[source]
        source: CollaboratorError,
    },
    #[error("page title rendering failed")]
    Title {
        #[source]
        source: CollaboratorError,
    },
}

impl ComposeError {
    pub fn access(block_id: &BlockId, source: CollaboratorError) -> Self {
        Self::AccessEvaluation {
            block_id: block_id.clone(),
            source,
        }
    }

    pub fn content(block_id: &BlockId, source: CollaboratorError) -> Self {
        Self::ContentBuild {
            block_id: block_id.clone(),
            source,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Compose(#[from] ComposeError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport::from_error("application::error::AppError", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_walks_the_source_chain() {
        let io = std::io::Error::other("disk on fire");
        let error = AppError::from(ComposeError::content(
            &BlockId::new("hero"),
            CollaboratorError::with_source("markup lookup failed", io),
        ));

        let report = error.report();
        assert_eq!(
            report.messages,
            vec![
                "content build failed for block `hero`".to_string(),
                "markup lookup failed".to_string(),
                "disk on fire".to_string(),
            ]
        );
        assert_eq!(
            report.chain(),
            "content build failed for block `hero`: markup lookup failed: disk on fire"
        );
    }

    #[test]
    fn configuration_errors_reach_the_binary_through_compose() {
        let error = AppError::from(ComposeError::from(DomainError::not_found(
            "block plugin",
            "missing",
        )));

        assert!(matches!(
            error,
            AppError::Compose(ComposeError::Configuration(DomainError::NotFound { .. }))
        ));
        assert_eq!(
            error.report().chain(),
            "page configuration is invalid: `block plugin` not found: missing"
        );
    }

    #[test]
    fn configuration_errors_are_flagged() {
        let error = ComposeError::from(DomainError::validation("unknown region"));
        assert!(error.is_configuration());
        assert!(!ComposeError::Title {
            source: CollaboratorError::new("x")
        }
        .is_configuration());
    }
}
