//! Per-view emission index
//!
//! A [`ViewIndex`] holds everything one view has emitted: an ordered map from
//! emitted key to a bucket of `(doc_id, value)` entries, plus a reverse map
//! from document id to the key it currently sits under.
//!
//! Each live document has at most one entry. [`ViewIndex::map_item`] removes
//! the old entry before running the map function again, so re-indexing the
//! same document is idempotent.

use rustc_hash::FxHashMap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;
use tracing::{debug, warn};
use viewstore_core::{DocMeta, Document, KeySelection, QueryOptions, Row, ViewDefinition, ViewKey};
use viewstore_mapfn::{Limits, MapFunction};

/// Documents in id order, as fed to [`ViewIndex::rebuild`]
pub type DocumentMap = BTreeMap<String, Document>;

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    doc_id: String,
    value: Value,
}

/// Emission index for one (design, view) pair
#[derive(Debug)]
pub struct ViewIndex {
    name: String,
    map_source: String,
    reduce_source: Option<String>,
    /// `None` when the map source does not compile; the view then stays empty
    function: Option<Arc<MapFunction>>,
    limits: Limits,
    buckets: BTreeMap<ViewKey, Vec<Entry>>,
    by_doc: FxHashMap<String, ViewKey>,
}

impl ViewIndex {
    /// Compile `definition` into an empty index
    ///
    /// `name` only labels log lines. A map source that fails to compile is
    /// logged once here and the view indexes nothing.
    pub fn new(name: impl Into<String>, definition: &ViewDefinition, limits: Limits) -> Self {
        let name = name.into();
        let function = compile(&name, &definition.map, limits);
        ViewIndex {
            name,
            map_source: definition.map.clone(),
            reduce_source: definition.reduce.clone(),
            function,
            limits,
            buckets: BTreeMap::new(),
            by_doc: FxHashMap::default(),
        }
    }

    /// Re-index one document
    ///
    /// Drops whatever the document emitted before, then, if `document` is
    /// `Some`, runs the map function and files the emission. `None` means the
    /// document was deleted.
    pub fn map_item(&mut self, document: Option<&Document>, meta: &DocMeta) {
        self.remove_doc(&meta.id);

        let (Some(document), Some(function)) = (document, &self.function) else {
            return;
        };
        if let Some(emission) = function.emit_for(document, meta) {
            self.by_doc.insert(meta.id.clone(), emission.key.clone());
            self.buckets.entry(emission.key).or_default().push(Entry {
                doc_id: meta.id.clone(),
                value: emission.value,
            });
        }
    }

    fn remove_doc(&mut self, doc_id: &str) {
        let Some(key) = self.by_doc.remove(doc_id) else {
            return;
        };
        let Some(bucket) = self.buckets.get_mut(&key) else {
            return;
        };
        let kept: Vec<Entry> = bucket
            .iter()
            .filter(|entry| entry.doc_id != doc_id)
            .cloned()
            .collect();
        if kept.is_empty() {
            self.buckets.remove(&key);
        } else {
            *bucket = kept;
        }
    }

    /// Clear the index and re-map every document
    pub fn rebuild(&mut self, documents: &DocumentMap) {
        self.buckets.clear();
        self.by_doc.clear();
        for (id, document) in documents {
            self.map_item(Some(document), &DocMeta::new(id.as_str()));
        }
        debug!(view = %self.name, docs = documents.len(), rows = self.len(), "view rebuilt");
    }

    /// Apply a redefinition
    ///
    /// A changed map source is recompiled and the index rebuilt. The reduce
    /// source is only stored.
    pub fn update(&mut self, definition: &ViewDefinition, documents: &DocumentMap) {
        self.reduce_source = definition.reduce.clone();
        if definition.map == self.map_source {
            return;
        }
        self.map_source = definition.map.clone();
        self.function = compile(&self.name, &self.map_source, self.limits);
        self.rebuild(documents);
    }

    /// Rows matching `options`, without documents
    ///
    /// Buckets come back in collation order (reversed when `descending`),
    /// entries in the order they were indexed. `skip` and `limit` apply last.
    pub fn query(&self, options: &QueryOptions) -> Vec<Row> {
        let mut buckets: Vec<(&ViewKey, &Vec<Entry>)> = match options.selection() {
            KeySelection::Key(key) => self.buckets.get_key_value(&key).into_iter().collect(),
            KeySelection::Range(start, end) => {
                if is_empty_range(&start, &end) {
                    return Vec::new();
                }
                self.buckets.range((start, end)).collect()
            }
            KeySelection::All => self.buckets.iter().collect(),
        };

        if options.descending {
            buckets.reverse();
        }

        buckets
            .into_iter()
            .flat_map(|(key, entries)| {
                entries.iter().map(move |entry| {
                    Row::new(key.clone(), entry.value.clone(), entry.doc_id.as_str())
                })
            })
            .skip(options.skip)
            .take(options.limit.unwrap_or(usize::MAX))
            .collect()
    }

    /// Total number of emissions
    pub fn len(&self) -> usize {
        self.by_doc.len()
    }

    /// True if nothing has been emitted
    pub fn is_empty(&self) -> bool {
        self.by_doc.is_empty()
    }

    /// Number of distinct emitted keys
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Map function source
    pub fn map_source(&self) -> &str {
        &self.map_source
    }

    /// Reduce function source, if any
    pub fn reduce_source(&self) -> Option<&str> {
        self.reduce_source.as_deref()
    }

    /// Key `doc_id` is currently indexed under
    pub fn key_of(&self, doc_id: &str) -> Option<&ViewKey> {
        self.by_doc.get(doc_id)
    }
}

fn compile(name: &str, source: &str, limits: Limits) -> Option<Arc<MapFunction>> {
    match MapFunction::compile(source, limits) {
        Ok(function) => Some(Arc::new(function)),
        Err(e) => {
            warn!(view = %name, error = %e, "map function does not compile, view will stay empty");
            None
        }
    }
}

// BTreeMap::range panics on inverted bounds
fn is_empty_range(start: &Bound<ViewKey>, end: &Bound<ViewKey>) -> bool {
    match (start, end) {
        (Bound::Included(s), Bound::Included(e)) => s > e,
        (Bound::Included(s) | Bound::Excluded(s), Bound::Excluded(e))
        | (Bound::Excluded(s), Bound::Included(e)) => s >= e,
        _ => false,
    }
}
