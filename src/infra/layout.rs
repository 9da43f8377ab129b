//! Page layouts stored as TOML files.
//!
//! ```toml
//! id = "article"
//! page_title = "[node:title]"
//!
//! [[blocks]]
//! id = "hero"
//! region = "top"
//! plugin = "markup"
//! configuration = { markup = "<h1>Welcome</h1>", content_tags = ["node:42"] }
//! cache = { tags = ["config:hero"], max_age = 600 }
//!
//! [contexts.node]
//! data_type = "entity:node"
//! value = { id = 42, title = "Composing pages" }
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::domain::block::BlockDescriptor;
use crate::domain::cacheability::CacheabilityMetadata;
use crate::domain::page::{PageContexts, PageVariant};
use crate::domain::region::{RegionAssignment, RegionCatalog};

use super::error::InfraError;

/// A page variant together with the contexts it is rendered with.
#[derive(Debug, Clone, Deserialize)]
pub struct LayoutFile {
    pub id: String,
    #[serde(default)]
    pub page_title: String,
    #[serde(default)]
    pub regions: Option<RegionCatalog>,
    #[serde(default)]
    pub cache: CacheabilityMetadata,
    #[serde(default)]
    pub blocks: Vec<BlockDescriptor>,
    #[serde(default)]
    pub contexts: PageContexts,
}

impl LayoutFile {
    pub fn parse(text: &str, path: impl Into<PathBuf>) -> Result<Self, InfraError> {
        toml::from_str(text).map_err(|source| InfraError::Layout {
            path: path.into(),
            source,
        })
    }

    pub async fn load(path: &Path) -> Result<Self, InfraError> {
        let text = tokio::fs::read_to_string(path).await?;
        let layout = Self::parse(&text, path)?;
        debug!(
            path = %path.display(),
            page = %layout.id,
            blocks = layout.blocks.len(),
            "Layout loaded"
        );
        Ok(layout)
    }

    pub fn into_parts(self) -> (PageVariant, PageContexts) {
        let catalog = self.regions.unwrap_or_default();
        let regions = RegionAssignment::with_blocks(catalog, self.blocks);
        let variant = PageVariant::new(self.id, regions)
            .with_title(self.page_title)
            .with_cache(self.cache);
        (variant, self.contexts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cacheability::MaxAge;

    const LAYOUT: &str = r#"
id = "article"
page_title = "[node:title]"
cache = { tags = ["config:article"], max_age = 3600 }

[[blocks]]
id = "hero"
region = "top"
weight = 2
plugin = "markup"
configuration = { markup = "<h1>Welcome</h1>", content_tags = ["node:42"] }
cache = { tags = ["config:hero"], max_age = 600 }

[[blocks]]
id = "title"
region = "bottom"
plugin = "context_field"
configuration = { field = "title" }
context_mapping = { entity = "node" }

[contexts.node]
data_type = "entity:node"
value = { id = 42, title = "Composing pages" }
"#;

    #[test]
    fn parses_blocks_cache_and_contexts() {
        let layout = LayoutFile::parse(LAYOUT, "article.toml").expect("layout");
        let (variant, contexts) = layout.into_parts();

        assert_eq!(variant.id, "article");
        assert_eq!(variant.page_title, "[node:title]");
        assert_eq!(variant.cache.max_age(), MaxAge::Seconds(3600));
        assert!(variant.regions.validate().is_ok());

        let blocks: Vec<&BlockDescriptor> = variant.regions.blocks().collect();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].weight, 2);
        assert_eq!(blocks[0].cache.max_age(), MaxAge::Seconds(600));
        assert!(blocks[0].context_aware().is_none());
        assert_eq!(
            blocks[1]
                .context_aware()
                .and_then(|mapping| mapping.get("entity"))
                .map(String::as_str),
            Some("node")
        );

        let node = contexts.get("node").expect("node context");
        assert_eq!(node.value["title"], "Composing pages");
    }

    #[test]
    fn custom_region_catalog() {
        let layout = LayoutFile::parse(
            r#"
id = "wide"
regions = [{ name = "main", label = "Main" }]
"#,
            "wide.toml",
        )
        .expect("layout");
        let (variant, _) = layout.into_parts();
        assert!(variant.regions.catalog().contains("main"));
        assert!(!variant.regions.catalog().contains("top"));
    }

    #[test]
    fn parse_errors_name_the_file() {
        let err = LayoutFile::parse("id = ", "broken.toml").expect_err("invalid");
        assert!(err.to_string().contains("broken.toml"));
    }

    #[tokio::test]
    async fn load_reads_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("article.toml");
        tokio::fs::write(&path, LAYOUT).await.expect("write");

        let layout = LayoutFile::load(&path).await.expect("load");
        assert_eq!(layout.blocks.len(), 2);
    }
}
