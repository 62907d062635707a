//! Run-local lookups from numeric ID to resource item
//!
//! Categories, tags, authors and media are fetched once per run and then only
//! read. A lookup that misses yields `None`, which the post record renders as
//! `null`; an unknown ID is never an error.

use crate::types::ReferenceStats;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// ID → item mapping for one resource type
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ReferenceMap {
    items: BTreeMap<i64, Value>,
}

impl ReferenceMap {
    /// Index items by their integer `id` field
    ///
    /// Items without an integer `id` are skipped. A repeated ID keeps the last item.
    pub fn from_items(resource: &str, items: Vec<Value>) -> Self {
        let mut map = BTreeMap::new();
        for item in items {
            match item.get("id").and_then(Value::as_i64) {
                Some(id) => {
                    map.insert(id, item);
                }
                None => warn!(resource, "skipping item without an integer id"),
            }
        }
        Self { items: map }
    }

    /// Item with the given ID
    pub fn get(&self, id: i64) -> Option<&Value> {
        self.items.get(&id)
    }

    /// Owned copy of the item for an optional ID
    pub fn resolve(&self, id: Option<i64>) -> Option<Value> {
        id.and_then(|id| self.get(id)).cloned()
    }

    /// Resolve every ID, keeping list length and order
    pub fn resolve_all(&self, ids: &[i64]) -> Vec<Option<Value>> {
        ids.iter().map(|id| self.get(*id).cloned()).collect()
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if the mapping holds no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Reference data for one backup run
#[derive(Clone, Debug, Default)]
pub struct ReferenceStore {
    /// Categories by ID
    pub categories: ReferenceMap,
    /// Tags by ID
    pub tags: ReferenceMap,
    /// Users by ID
    pub authors: ReferenceMap,
    /// Media items by ID
    pub media: ReferenceMap,
}

impl ReferenceStore {
    /// Item counts per resource type
    pub fn stats(&self) -> ReferenceStats {
        ReferenceStats {
            categories: self.categories.len(),
            tags: self.tags.len(),
            authors: self.authors.len(),
            media: self.media.len(),
        }
    }
}

/// Layout of `taxonomies.json`
#[derive(Debug, Serialize)]
pub struct TaxonomySnapshot<'a> {
    /// Categories by ID
    pub categories: &'a ReferenceMap,
    /// Tags by ID
    pub tags: &'a ReferenceMap,
}
