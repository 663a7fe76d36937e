//! Design registry: named groups of views
//!
//! The registry keeps two things per design name: the definitions last
//! passed to [`DesignRegistry::create`], and the live [`ViewIndex`] set built
//! from them. `delete` drops only the definitions, so views of a deleted
//! design stay queryable until the design is created again.

use crate::view::{DocumentMap, ViewIndex};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use tracing::debug;
use viewstore_core::{DesignDocument, DocMeta, Document, InvalidQuery, QueryOptions, Result, Row};
use viewstore_mapfn::Limits;

/// All designs and their view indexes
#[derive(Debug)]
pub struct DesignRegistry {
    definitions: FxHashMap<String, DesignDocument>,
    views: FxHashMap<String, BTreeMap<String, ViewIndex>>,
    limits: Limits,
}

impl DesignRegistry {
    /// Empty registry; new views compile with `limits`
    pub fn new(limits: Limits) -> Self {
        DesignRegistry {
            definitions: FxHashMap::default(),
            views: FxHashMap::default(),
            limits,
        }
    }

    /// Install or redefine a design
    ///
    /// Views missing from `design` are dropped, new views are built over
    /// `documents` right away, and views present in both are updated in
    /// place (rebuilt only if their map source changed).
    pub fn create(&mut self, name: &str, design: DesignDocument, documents: &DocumentMap) {
        let view_set = self.views.entry(name.to_string()).or_default();

        let before = view_set.len();
        view_set.retain(|view_name, _| design.views.contains_key(view_name));
        let removed = before - view_set.len();

        let mut added = 0;
        for (view_name, definition) in &design.views {
            match view_set.get_mut(view_name) {
                Some(view) => view.update(definition, documents),
                None => {
                    let full_name = format!("{}/{}", name, view_name);
                    let mut view = ViewIndex::new(full_name, definition, self.limits);
                    view.rebuild(documents);
                    view_set.insert(view_name.clone(), view);
                    added += 1;
                }
            }
        }

        debug!(design = %name, views = design.views.len(), added, removed, "design created");
        self.definitions.insert(name.to_string(), design);
    }

    /// Stored definitions, empty if the design is unknown
    pub fn get(&self, name: &str) -> DesignDocument {
        self.definitions.get(name).cloned().unwrap_or_default()
    }

    /// Forget the stored definitions
    pub fn delete(&mut self, name: &str) {
        if self.definitions.remove(name).is_some() {
            debug!(design = %name, "design definitions deleted");
        }
    }

    /// Accepted for API parity; there is nothing to publish
    pub fn publish(&self, name: &str) {
        debug!(design = %name, "design publish is a no-op");
    }

    /// Query one view, without document hydration
    pub fn query(&self, design: &str, view: &str, options: &QueryOptions) -> Result<Vec<Row>> {
        Ok(self.view(design, view)?.query(options))
    }

    /// Look up a live view
    pub fn view(&self, design: &str, view: &str) -> Result<&ViewIndex> {
        let view_set = self
            .views
            .get(design)
            .ok_or_else(|| InvalidQuery::UnknownDesign(design.to_string()))?;
        let index = view_set.get(view).ok_or_else(|| InvalidQuery::UnknownView {
            design: design.to_string(),
            view: view.to_string(),
        })?;
        Ok(index)
    }

    /// Forward a document change to every view of every design
    pub fn notify(&mut self, meta: &DocMeta, document: Option<&Document>) {
        for view_set in self.views.values_mut() {
            for view in view_set.values_mut() {
                view.map_item(document, meta);
            }
        }
    }

    /// Names of designs that have live views
    pub fn design_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.views.keys().cloned().collect();
        names.sort();
        names
    }
}
