use serde_json::Value;
use std::collections::HashMap;

/// Concrete path -> value observed during one walk.
///
/// Borrowed from the document being walked, so an index can never outlive
/// or leak into another document. Only keys accepted by
/// [`path::is_addressable_key`](crate::path::is_addressable_key) are indexed,
/// so no entry contains `*` and distinct document nodes never share a path.
#[derive(Debug, Default)]
pub struct PathIndex<'doc> {
    entries: HashMap<String, &'doc Value>,
}

impl<'doc> PathIndex<'doc> {
    pub fn new() -> Self {
        PathIndex {
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, path: String, value: &'doc Value) {
        self.entries.insert(path, value);
    }

    pub fn get(&self, path: &str) -> Option<&'doc Value> {
        self.entries.get(path).copied()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
