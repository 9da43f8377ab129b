//! Cacheability metadata and its merge algebra.
//!
//! Every node in a composed page carries a [`CacheEnvelope`]: the keys that
//! identify its storage slot plus the [`CacheabilityMetadata`] that says when
//! a stored copy stops being valid. Metadata bubbles up the tree through
//! [`CacheabilityMetadata::merge`]; keys never do.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Cache lifetime of a render result.
///
/// Serialised as an integer: `-1` is permanent, `0` is uncacheable, anything
/// else is a number of seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum MaxAge {
    /// Must never be stored.
    Uncacheable,
    Seconds(u32),
    /// Never expires on its own; only tag invalidation evicts it.
    #[default]
    Permanent,
}

impl MaxAge {
    /// Build a max-age from seconds, normalising zero to `Uncacheable`.
    pub fn seconds(value: u32) -> Self {
        if value == 0 {
            Self::Uncacheable
        } else {
            Self::Seconds(value)
        }
    }

    pub fn is_cacheable(self) -> bool {
        !matches!(self, Self::Uncacheable)
    }

    /// Combine two lifetimes, keeping the stricter one.
    pub fn combine(self, other: Self) -> Self {
        match (self, other) {
            (Self::Uncacheable, _) | (_, Self::Uncacheable) => Self::Uncacheable,
            (Self::Permanent, other) | (other, Self::Permanent) => other,
            (Self::Seconds(a), Self::Seconds(b)) => Self::seconds(a.min(b)),
        }
    }
}

impl PartialOrd for MaxAge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Orders lifetimes from strictest (`Uncacheable`) to loosest (`Permanent`).
impl Ord for MaxAge {
    fn cmp(&self, other: &Self) -> Ordering {
        fn rank(age: &MaxAge) -> (u8, u32) {
            match age {
                MaxAge::Uncacheable => (0, 0),
                MaxAge::Seconds(secs) => (1, *secs),
                MaxAge::Permanent => (2, 0),
            }
        }
        rank(self).cmp(&rank(other))
    }
}

impl From<i64> for MaxAge {
    fn from(value: i64) -> Self {
        match value {
            v if v < 0 => Self::Permanent,
            v => Self::seconds(u32::try_from(v).unwrap_or(u32::MAX)),
        }
    }
}

impl From<MaxAge> for i64 {
    fn from(value: MaxAge) -> Self {
        match value {
            MaxAge::Uncacheable => 0,
            MaxAge::Seconds(secs) => i64::from(secs),
            MaxAge::Permanent => -1,
        }
    }
}

impl fmt::Display for MaxAge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxAge::Uncacheable => f.write_str("uncacheable"),
            MaxAge::Seconds(secs) => write!(f, "{secs}s"),
            MaxAge::Permanent => f.write_str("permanent"),
        }
    }
}

/// Tags, contexts and max-age describing when a render result may be reused.
///
/// Sets are ordered so that identical logical inputs always serialise to
/// identical bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheabilityMetadata {
    tags: BTreeSet<String>,
    contexts: BTreeSet<String>,
    max_age: MaxAge,
}

impl CacheabilityMetadata {
    /// Permanent metadata with no tags or contexts; the identity of `merge`.
    pub fn permanent() -> Self {
        Self::default()
    }

    /// Metadata that forbids storing the result.
    pub fn uncacheable() -> Self {
        Self {
            max_age: MaxAge::Uncacheable,
            ..Self::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_contexts<I, S>(mut self, contexts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.contexts.extend(contexts.into_iter().map(Into::into));
        self
    }

    pub fn with_max_age(mut self, max_age: MaxAge) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn contexts(&self) -> &BTreeSet<String> {
        &self.contexts
    }

    pub fn max_age(&self) -> MaxAge {
        self.max_age
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn is_cacheable(&self) -> bool {
        self.max_age.is_cacheable()
    }

    /// Merge two instances. Never loosens a constraint: tag and context sets
    /// are unioned and the stricter max-age wins.
    pub fn merge(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        merged.merge_in(other);
        merged
    }

    pub fn merge_in(&mut self, other: &Self) {
        self.tags.extend(other.tags.iter().cloned());
        self.contexts.extend(other.contexts.iter().cloned());
        self.max_age = self.max_age.combine(other.max_age);
    }

    /// Merge the metadata of any cacheable dependency into `self`.
    pub fn add_dependency(&mut self, dependency: &impl Cacheable) -> &mut Self {
        self.merge_in(&dependency.cacheability());
        self
    }

    /// Overwrite the metadata half of `envelope`. Keys are owned by whoever
    /// built the node and are left alone.
    pub fn apply_to(&self, envelope: &mut CacheEnvelope) {
        envelope.metadata = self.clone();
    }
}

/// Anything that can explain when its output may be reused.
pub trait Cacheable {
    fn cacheability(&self) -> CacheabilityMetadata;
}

impl Cacheable for CacheabilityMetadata {
    fn cacheability(&self) -> CacheabilityMetadata {
        self.clone()
    }
}

/// Ordered key segments identifying a storage slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKeys(Vec<String>);

impl CacheKeys {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Append `child` segments below these keys.
    pub fn compose(&self, child: &CacheKeys) -> Self {
        let mut segments = self.0.clone();
        segments.extend(child.0.iter().cloned());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Concatenated storage key.
    pub fn storage_key(&self) -> String {
        self.0.join(":")
    }

    /// SHA-256 of the storage key, hex encoded.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.storage_key().as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl fmt::Display for CacheKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

/// Cache envelope attached to every render node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEnvelope {
    #[serde(default, skip_serializing_if = "CacheKeys::is_empty")]
    pub keys: CacheKeys,
    #[serde(flatten)]
    pub metadata: CacheabilityMetadata,
}

impl CacheEnvelope {
    pub fn keyed(keys: CacheKeys) -> Self {
        Self {
            keys,
            metadata: CacheabilityMetadata::default(),
        }
    }

    pub fn new(keys: CacheKeys, metadata: CacheabilityMetadata) -> Self {
        Self { keys, metadata }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(tags: &[&str], contexts: &[&str], max_age: MaxAge) -> CacheabilityMetadata {
        CacheabilityMetadata::permanent()
            .with_tags(tags.iter().copied())
            .with_contexts(contexts.iter().copied())
            .with_max_age(max_age)
    }

    fn samples() -> Vec<CacheabilityMetadata> {
        vec![
            CacheabilityMetadata::permanent(),
            CacheabilityMetadata::uncacheable(),
            sample(&["node:1"], &["user"], MaxAge::seconds(60)),
            sample(&["node:2", "node:1"], &[], MaxAge::seconds(30)),
            sample(&[], &["languages"], MaxAge::Permanent),
            sample(&["config:page"], &["user.roles"], MaxAge::seconds(3600)),
        ]
    }

    #[test]
    fn merge_is_commutative() {
        for a in samples() {
            for b in samples() {
                assert_eq!(a.merge(&b), b.merge(&a));
            }
        }
    }

    #[test]
    fn merge_is_associative() {
        for a in samples() {
            for b in samples() {
                for c in samples() {
                    assert_eq!(a.merge(&b).merge(&c), a.merge(&b.merge(&c)));
                }
            }
        }
    }

    #[test]
    fn permanent_is_identity() {
        for a in samples() {
            assert_eq!(a.merge(&CacheabilityMetadata::permanent()), a);
        }
    }

    #[test]
    fn uncacheable_absorbs_max_age_but_keeps_tags() {
        let a = sample(&["node:1"], &["user"], MaxAge::seconds(60));
        let merged = a.merge(&CacheabilityMetadata::uncacheable());

        assert_eq!(merged.max_age(), MaxAge::Uncacheable);
        assert!(merged.has_tag("node:1"));
        assert!(merged.contexts().contains("user"));
    }

    #[test]
    fn merge_never_loosens() {
        for a in samples() {
            for b in samples() {
                let merged = a.merge(&b);
                assert!(merged.max_age() <= a.max_age());
                assert!(merged.max_age() <= b.max_age());
                assert!(merged.tags().is_superset(a.tags()));
                assert!(merged.tags().is_superset(b.tags()));
                assert!(merged.contexts().is_superset(a.contexts()));
                assert!(merged.contexts().is_superset(b.contexts()));
            }
        }
    }

    #[test]
    fn seconds_take_the_minimum() {
        assert_eq!(
            MaxAge::seconds(60).combine(MaxAge::seconds(30)),
            MaxAge::Seconds(30)
        );
        assert_eq!(MaxAge::seconds(0), MaxAge::Uncacheable);
    }

    #[test]
    fn max_age_serialises_as_integer() {
        let json = serde_json::to_string(&sample(&[], &[], MaxAge::Permanent)).expect("json");
        assert!(json.contains("\"max_age\":-1"));

        let parsed: CacheabilityMetadata =
            serde_json::from_str(r#"{"tags":["a"],"max_age":0}"#).expect("parse");
        assert_eq!(parsed.max_age(), MaxAge::Uncacheable);
        assert!(parsed.has_tag("a"));
    }

    #[test]
    fn apply_to_overwrites_metadata_and_keeps_keys() {
        let keys = CacheKeys::new(["page-display", "home"]);
        let mut envelope = CacheEnvelope::new(keys.clone(), sample(&["stale"], &[], MaxAge::seconds(5)));
        let fresh = sample(&["fresh"], &["user"], MaxAge::seconds(90));

        fresh.apply_to(&mut envelope);
        fresh.apply_to(&mut envelope);

        assert_eq!(envelope.keys, keys);
        assert_eq!(envelope.metadata, fresh);
    }

    #[test]
    fn keys_compose_top_down() {
        let page = CacheKeys::new(["page-display", "home"]);
        let block = page.compose(&CacheKeys::new(["block", "hero"]));

        assert_eq!(block.storage_key(), "page-display:home:block:hero");
        assert_eq!(block.digest().len(), 64);
        assert_eq!(block.digest(), page.compose(&CacheKeys::new(["block", "hero"])).digest());
    }
}
