//! Single-pass indexing walk with per-node extraction
//!
//! The walk runs on an explicit work list. Visiting a mapping indexes all of
//! its children before descending into any of them, and schedules extraction
//! for the mapping itself after its whole subtree. By the time a record is
//! assembled at a node, every ancestor, every ancestor's sibling and every
//! earlier array sibling is therefore already in the path index.

use crate::error::{Result, ShredError};
use crate::path::{self, ROOT};
use crate::shred::alias;
use crate::shred::index::PathIndex;
use crate::shred::spec::{SpecSet, TableSpec};
use crate::shred::validate::RecordValidator;
use crate::types::{Record, RecordError, ResultSet, ShredConfig};
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

enum Frame<'doc> {
    Visit {
        value: &'doc Value,
        path: String,
        depth: usize,
    },
    Extract {
        node: &'doc Map<String, Value>,
        path: String,
    },
}

/// Counters for one walked document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub paths_indexed: usize,
    pub rows: usize,
    pub errors: usize,
}

/// Walks documents against a compiled spec set
pub struct Walker<'a, V: ?Sized> {
    specs: &'a SpecSet,
    validator: &'a V,
    config: &'a ShredConfig,
}

impl<'a, V: RecordValidator + ?Sized> Walker<'a, V> {
    pub fn new(specs: &'a SpecSet, validator: &'a V, config: &'a ShredConfig) -> Self {
        Walker {
            specs,
            validator,
            config,
        }
    }

    /// Walk one document with a fresh path index, appending rows and record
    /// errors to the given accumulators.
    pub fn walk(
        &self,
        document: &Value,
        results: &mut ResultSet,
        errors: &mut Vec<RecordError>,
    ) -> Result<WalkStats> {
        let mut index = PathIndex::new();
        let mut stats = WalkStats::default();
        let mut stack = vec![Frame::Visit {
            value: document,
            path: ROOT.to_string(),
            depth: 0,
        }];
        index.insert(ROOT.to_string(), document);

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Visit { value, path, depth } => {
                    if depth > self.config.max_depth {
                        return Err(ShredError::DepthLimitExceeded {
                            path,
                            limit: self.config.max_depth,
                        });
                    }
                    match value {
                        Value::Object(map) => {
                            let mut children = Vec::new();
                            for (key, child) in map {
                                if !path::is_addressable_key(key) {
                                    trace!(path = %path, key = %key, "skipping key that cannot be addressed");
                                    continue;
                                }
                                let child_path = path::child_key(&path, key);
                                index.insert(child_path.clone(), child);
                                if is_container(child) {
                                    children.push(Frame::Visit {
                                        value: child,
                                        path: child_path,
                                        depth: depth + 1,
                                    });
                                }
                            }
                            stack.push(Frame::Extract { node: map, path });
                            stack.extend(children.into_iter().rev());
                        }
                        Value::Array(items) => {
                            let mut children = Vec::new();
                            for (i, item) in items.iter().enumerate() {
                                let item_path = path::child_index(&path, i);
                                index.insert(item_path.clone(), item);
                                if is_container(item) {
                                    children.push(Frame::Visit {
                                        value: item,
                                        path: item_path,
                                        depth: depth + 1,
                                    });
                                }
                            }
                            stack.extend(children.into_iter().rev());
                        }
                        _ => {}
                    }
                }
                Frame::Extract { node, path } => {
                    for spec in self.specs.iter().filter(|s| s.attaches_at(&path)) {
                        let record = build_record(spec, node, &path, &index);
                        trace!(table = %spec.name, path = %path, "extracting record");
                        match self.validator.validate(spec, record) {
                            Ok(row) => {
                                results.push(&spec.name, row);
                                stats.rows += 1;
                            }
                            Err(field_errors) => {
                                warn!(
                                    table = %spec.name,
                                    path = %path,
                                    failures = field_errors.len(),
                                    "record failed validation"
                                );
                                errors.push(RecordError {
                                    path: path.clone(),
                                    table: spec.name.clone(),
                                    errors: field_errors,
                                });
                                stats.errors += 1;
                            }
                        }
                    }
                }
            }
        }

        stats.paths_indexed = index.len();
        debug!(
            paths = stats.paths_indexed,
            rows = stats.rows,
            errors = stats.errors,
            "walked document"
        );
        Ok(stats)
    }
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

/// Assemble the raw field mapping of `spec` for the mapping node at `path`
pub fn build_record(
    spec: &TableSpec,
    node: &Map<String, Value>,
    path: &str,
    index: &PathIndex<'_>,
) -> Record {
    let mut record = Record::new(path);
    for field in &spec.fields {
        let value = if field.is_local {
            node.get(&field.name).cloned()
        } else {
            alias::resolve(&field.alias, path)
                .and_then(|resolved| index.get(&resolved))
                .cloned()
        };
        record.push(field.name.clone(), value);
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shred::spec::{FieldSchema, TableSchema};
    use crate::shred::validate::AcceptAll;
    use serde_json::json;

    fn walk(schemas: &[TableSchema], doc: &Value, config: &ShredConfig) -> Result<(ResultSet, Vec<RecordError>)> {
        let specs = SpecSet::compile(schemas)?;
        let mut results = ResultSet::with_tables(specs.iter().map(|s| s.name.clone()));
        let mut errors = Vec::new();
        Walker::new(&specs, &AcceptAll, config).walk(doc, &mut results, &mut errors)?;
        Ok((results, errors))
    }

    #[test]
    fn test_extraction_is_post_order() {
        let schemas = vec![
            TableSchema::new("node").field(FieldSchema::new("name", "root.kids[*].name")),
            TableSchema::new("top").field(FieldSchema::new("name", "root.name")),
        ];
        let doc = json!({"name": "top", "kids": [{"name": "a"}, {"name": "b"}]});

        let (results, _) = walk(&schemas, &doc, &ShredConfig::default()).unwrap();
        let names: Vec<_> = results.rows("node").iter().map(|r| r["name"].clone()).collect();
        assert_eq!(names, vec![json!("a"), json!("b")]);
        assert_eq!(results.rows("top")[0]["name"], json!("top"));
    }

    #[test]
    fn test_ancestor_sibling_visible_regardless_of_key_order() {
        // "code" follows "lines" in the document but is still resolvable.
        let schemas = vec![TableSchema::new("line")
            .field(FieldSchema::new("qty", "root.lines[*].qty"))
            .field(FieldSchema::new("order_code", "root.code"))];
        let doc: Value = serde_json::from_str(r#"{"lines": [{"qty": 1}], "code": "X"}"#).unwrap();

        let (results, _) = walk(&schemas, &doc, &ShredConfig::default()).unwrap();
        assert_eq!(results.rows("line")[0]["order_code"], json!("X"));
    }

    #[test]
    fn test_local_fields_read_from_node() {
        let schemas = vec![TableSchema::new("kid")
            .field(FieldSchema::new("id", "root.kids[*].id"))
            .field(FieldSchema::local("label"))];
        let doc = json!({"kids": [{"id": 1, "label": "one"}, {"id": 2}]});

        let (results, _) = walk(&schemas, &doc, &ShredConfig::default()).unwrap();
        let rows = results.rows("kid");
        assert_eq!(rows[0]["label"], json!("one"));
        assert_eq!(rows[1]["label"], Value::Null);
    }

    #[test]
    fn test_unaddressable_keys_are_not_indexed() {
        let schemas = vec![
            TableSchema::new("t")
                .field(FieldSchema::new("code", "root.code"))
                .field(FieldSchema::new("b", "root.a.b"))
                .field(FieldSchema::local("a.b")),
            TableSchema::new("w").field(FieldSchema::new("v", "root.w[*].v")),
        ];
        let doc: Value =
            serde_json::from_str(r#"{"code": "X", "a": {"b": 2}, "a.b": 1, "w[0]": {"v": 9}}"#).unwrap();

        let specs = SpecSet::compile(&schemas).unwrap();
        let mut results = ResultSet::with_tables(specs.iter().map(|s| s.name.clone()));
        let stats = Walker::new(&specs, &AcceptAll, &ShredConfig::default())
            .walk(&doc, &mut results, &mut Vec::new())
            .unwrap();

        // root, root.code, root.a, root.a.b
        assert_eq!(stats.paths_indexed, 4);
        assert_eq!(specs.get("t").unwrap().attachment_pattern(), ROOT);
        let row = &results.rows("t")[0];
        assert_eq!(row["b"], json!(2));
        assert_eq!(row["a.b"], json!(1));
        assert!(results.rows("w").is_empty());
    }

    #[test]
    fn test_scalar_root_yields_nothing() {
        let schemas = vec![TableSchema::new("t").field(FieldSchema::new("v", "root.v"))];
        let (results, errors) = walk(&schemas, &json!(42), &ShredConfig::default()).unwrap();
        assert_eq!(results.total_rows(), 0);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_nested_arrays_are_indexed() {
        let schemas = vec![TableSchema::new("cell").field(FieldSchema::new("v", "root.grid[*][*].v"))];
        let doc = json!({"grid": [[{"v": 1}, {"v": 2}], [{"v": 3}]]});

        let (results, _) = walk(&schemas, &doc, &ShredConfig::default()).unwrap();
        let values: Vec<_> = results.rows("cell").iter().map(|r| r["v"].clone()).collect();
        assert_eq!(values, vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn test_depth_limit() {
        let schemas = vec![TableSchema::new("t").field(FieldSchema::new("v", "root.v"))];
        let doc = json!({"a": {"b": {"c": {}}}});
        let config = ShredConfig { max_depth: 2 };

        match walk(&schemas, &doc, &config) {
            Err(ShredError::DepthLimitExceeded { path, limit }) => {
                assert_eq!(path, "root.a.b.c");
                assert_eq!(limit, 2);
            }
            other => panic!("expected depth error, got {other:?}"),
        }
    }

    #[test]
    fn test_very_deep_document_does_not_overflow() {
        // json! would re-serialize the growing tree recursively; move values instead.
        let mut doc = json!({"leaf": true});
        for _ in 0..4_000 {
            let mut wrapper = Map::new();
            wrapper.insert("n".to_string(), doc);
            doc = Value::Object(wrapper);
        }
        let schemas = vec![TableSchema::new("t").field(FieldSchema::new("v", "root.v"))];
        let config = ShredConfig { max_depth: 10_000 };

        let specs = SpecSet::compile(&schemas).unwrap();
        let mut results = ResultSet::with_tables(specs.iter().map(|s| s.name.clone()));
        let mut errors = Vec::new();
        let stats = Walker::new(&specs, &AcceptAll, &config)
            .walk(&doc, &mut results, &mut errors)
            .unwrap();
        assert_eq!(stats, WalkStats { paths_indexed: 4_002, rows: 1, errors: 0 });
        assert_eq!(results.rows("t").len(), 1);
        // serde_json drops nested values recursively; unwind it iteratively.
        let mut current = doc;
        while let Value::Object(mut map) = current {
            current = map.remove("n").unwrap_or(Value::Null);
        }
    }
}
