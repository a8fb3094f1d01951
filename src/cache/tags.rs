//! Tag → request key index used for group invalidation.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use super::key::RequestKey;

/// Logical group a cached response belongs to.
///
/// A `Kind` tag names a whole family (`Search`); an `Item` tag names one
/// member of it (`Business:51824753556`). Invalidating a kind also reaches
/// every item of that kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tag {
    Kind(String),
    Item { kind: String, id: String },
}

impl Tag {
    pub fn kind(kind: impl Into<String>) -> Self {
        Self::Kind(kind.into())
    }

    pub fn item(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Item {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// The family name of the tag.
    pub fn kind_name(&self) -> &str {
        match self {
            Self::Kind(kind) | Self::Item { kind, .. } => kind,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kind(kind) => f.write_str(kind),
            Self::Item { kind, id } => write!(f, "{kind}:{id}"),
        }
    }
}

/// Bidirectional tag ⇄ key index.
///
/// Not synchronized; [`RequestCache`](super::RequestCache) keeps it inside
/// its own lock.
#[derive(Debug, Default)]
pub struct TagIndex {
    by_tag: HashMap<Tag, HashSet<RequestKey>>,
    by_key: HashMap<RequestKey, HashSet<Tag>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `key` carries `tags`. Adding the same pair twice is a no-op.
    pub fn associate(&mut self, key: &RequestKey, tags: impl IntoIterator<Item = Tag>) {
        for tag in tags {
            self.by_tag
                .entry(tag.clone())
                .or_default()
                .insert(key.clone());
            self.by_key.entry(key.clone()).or_default().insert(tag);
        }
    }

    /// Every key reached by invalidating `tag`, in sorted order.
    ///
    /// For a kind tag this includes keys tagged with any item of that kind.
    pub fn keys_for(&self, tag: &Tag) -> Vec<RequestKey> {
        let mut keys = BTreeSet::new();
        match tag {
            Tag::Kind(kind) => {
                for (candidate, tagged) in &self.by_tag {
                    if candidate.kind_name() == kind {
                        keys.extend(tagged.iter().cloned());
                    }
                }
            }
            Tag::Item { .. } => {
                if let Some(tagged) = self.by_tag.get(tag) {
                    keys.extend(tagged.iter().cloned());
                }
            }
        }
        keys.into_iter().collect()
    }

    /// Tags attached to `key`.
    pub fn tags_of(&self, key: &RequestKey) -> Vec<Tag> {
        let mut tags: Vec<Tag> = self
            .by_key
            .get(key)
            .map(|t| t.iter().cloned().collect())
            .unwrap_or_default();
        tags.sort();
        tags
    }

    /// Forget `key` everywhere. Tags left with no keys are dropped.
    pub fn remove_key(&mut self, key: &RequestKey) {
        let Some(tags) = self.by_key.remove(key) else {
            return;
        };
        for tag in tags {
            if let Some(keys) = self.by_tag.get_mut(&tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.by_tag.remove(&tag);
                }
            }
        }
    }

    /// Number of distinct tags with at least one key.
    pub fn tag_count(&self) -> usize {
        self.by_tag.len()
    }
}
