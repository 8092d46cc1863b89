//! Bidirectional tag registry.
//!
//! Tracks which cached queries provide which tags so that an invalidation
//! can find every affected entry without scanning the whole cache.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use super::keys::Tag;

/// Tracks tag → queries and query → tags mappings.
///
/// Not synchronized on its own; the owning cache keeps it behind the same
/// lock as its entries so both views change together.
#[derive(Debug)]
pub struct TagRegistry<Q> {
    tag_to_queries: HashMap<Tag, HashSet<Q>>,
    query_to_tags: HashMap<Q, HashSet<Tag>>,
}

impl<Q> TagRegistry<Q>
where
    Q: Clone + Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            tag_to_queries: HashMap::new(),
            query_to_tags: HashMap::new(),
        }
    }

    /// Record the tags a query provides, replacing any earlier registration.
    pub fn register(&mut self, query: Q, tags: impl IntoIterator<Item = Tag>) {
        self.unregister(&query);

        let tags: HashSet<Tag> = tags.into_iter().collect();
        for tag in &tags {
            self.tag_to_queries
                .entry(tag.clone())
                .or_default()
                .insert(query.clone());
        }
        self.query_to_tags.insert(query, tags);
    }

    /// All queries providing `tag`.
    pub fn queries_for_tag(&self, tag: &Tag) -> HashSet<Q> {
        self.tag_to_queries.get(tag).cloned().unwrap_or_default()
    }

    /// All queries providing at least one of `tags`.
    pub fn queries_for_tags<'a>(&self, tags: impl IntoIterator<Item = &'a Tag>) -> HashSet<Q> {
        let mut matched = HashSet::new();
        for tag in tags {
            if let Some(queries) = self.tag_to_queries.get(tag) {
                matched.extend(queries.iter().cloned());
            }
        }
        matched
    }

    pub fn tags_for_query(&self, query: &Q) -> HashSet<Tag> {
        self.query_to_tags.get(query).cloned().unwrap_or_default()
    }

    /// Remove a query and drop tags nobody provides anymore.
    pub fn unregister(&mut self, query: &Q) {
        if let Some(tags) = self.query_to_tags.remove(query) {
            for tag in tags {
                if let Some(queries) = self.tag_to_queries.get_mut(&tag) {
                    queries.remove(query);
                    if queries.is_empty() {
                        self.tag_to_queries.remove(&tag);
                    }
                }
            }
        }
    }

    pub fn tag_count(&self) -> usize {
        self.tag_to_queries.len()
    }

    pub fn query_count(&self) -> usize {
        self.query_to_tags.len()
    }
}

impl<Q> Default for TagRegistry<Q>
where
    Q: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}
