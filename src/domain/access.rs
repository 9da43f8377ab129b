use serde::{Deserialize, Serialize};

use super::cacheability::{Cacheable, CacheabilityMetadata};

/// Allow/deny result of a block visibility check, cacheable in its own right.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    allowed: bool,
    cacheability: CacheabilityMetadata,
}

impl AccessDecision {
    pub fn allowed(cacheability: CacheabilityMetadata) -> Self {
        Self {
            allowed: true,
            cacheability,
        }
    }

    pub fn denied(cacheability: CacheabilityMetadata) -> Self {
        Self {
            allowed: false,
            cacheability,
        }
    }

    pub fn allowed_if(condition: bool, cacheability: CacheabilityMetadata) -> Self {
        Self {
            allowed: condition,
            cacheability,
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }
}

impl Cacheable for AccessDecision {
    fn cacheability(&self) -> CacheabilityMetadata {
        self.cacheability.clone()
    }
}
