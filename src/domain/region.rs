//! Region catalog and the region → blocks assignment of a page variant.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::block::BlockDescriptor;
use super::error::DomainError;

/// Named placement area offered to configuration callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionDefinition {
    pub name: String,
    pub label: String,
}

/// Fixed, ordered set of regions a page layout exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionCatalog(Vec<RegionDefinition>);

impl RegionCatalog {
    pub fn new<I, N, L>(regions: I) -> Self
    where
        I: IntoIterator<Item = (N, L)>,
        N: Into<String>,
        L: Into<String>,
    {
        Self(
            regions
                .into_iter()
                .map(|(name, label)| RegionDefinition {
                    name: name.into(),
                    label: label.into(),
                })
                .collect(),
        )
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|region| region.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegionDefinition> {
        self.0.iter()
    }
}

impl Default for RegionCatalog {
    fn default() -> Self {
        Self::new([("top", "Top"), ("bottom", "Bottom")])
    }
}

/// CSS class for a region container, e.g. `block-region-top`.
pub fn region_class(region: &str) -> String {
    format!("block-region-{}", clean_css_identifier(&region.to_lowercase()))
}

/// Spaces, underscores, slashes and `[` become `-`; `]` and any other
/// character outside `[a-zA-Z0-9-]` and U+00A1 and above is dropped.
/// Runs are not collapsed.
fn clean_css_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .filter_map(|ch| match ch {
            ' ' | '_' | '/' | '[' => Some('-'),
            '-' | 'a'..='z' | 'A'..='Z' | '0'..='9' => Some(ch),
            ch if ch >= '\u{a1}' => Some(ch),
            _ => None,
        })
        .collect()
}

/// Blocks of a page variant keyed by region, in assignment order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionAssignment {
    catalog: RegionCatalog,
    blocks: Vec<BlockDescriptor>,
}

impl RegionAssignment {
    pub fn new(catalog: RegionCatalog) -> Self {
        Self {
            catalog,
            blocks: Vec::new(),
        }
    }

    pub fn with_blocks(catalog: RegionCatalog, blocks: Vec<BlockDescriptor>) -> Self {
        Self { catalog, blocks }
    }

    pub fn catalog(&self) -> &RegionCatalog {
        &self.catalog
    }

    pub fn blocks(&self) -> impl Iterator<Item = &BlockDescriptor> {
        self.blocks.iter()
    }

    /// Reject assignments to unknown regions and duplicate block ids.
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut seen = HashSet::with_capacity(self.blocks.len());
        for block in &self.blocks {
            if !self.catalog.contains(&block.region) {
                return Err(DomainError::validation(format!(
                    "block `{}` is assigned to unknown region `{}`",
                    block.id, block.region
                )));
            }
            if !seen.insert(&block.id) {
                return Err(DomainError::validation(format!(
                    "block id `{}` is assigned more than once",
                    block.id
                )));
            }
        }
        Ok(())
    }

    /// Regions in catalog order with their blocks sorted by weight. Regions
    /// without blocks are skipped; equal weights keep assignment order.
    pub fn regions_with_blocks(&self) -> Vec<(&str, Vec<&BlockDescriptor>)> {
        self.catalog
            .iter()
            .filter_map(|region| {
                let mut blocks: Vec<&BlockDescriptor> = self
                    .blocks
                    .iter()
                    .filter(|block| block.region == region.name)
                    .collect();
                if blocks.is_empty() {
                    return None;
                }
                blocks.sort_by_key(|block| block.weight);
                Some((region.name.as_str(), blocks))
            })
            .collect()
    }
}
