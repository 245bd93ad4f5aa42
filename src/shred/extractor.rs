use crate::error::Result;
use crate::shred::spec::{SpecSet, TableSchema};
use crate::shred::validate::{AcceptAll, RecordValidator};
use crate::shred::walker::Walker;
use crate::types::{Extraction, ResultSet, ShredConfig};
use serde_json::Value;
use tracing::info;

/// Shreds documents into table rows using specs compiled once up front
pub struct Extractor<V = AcceptAll> {
    specs: SpecSet,
    validator: V,
    config: ShredConfig,
}

impl Extractor<AcceptAll> {
    /// An extractor that accepts every assembled record
    pub fn accepting(schemas: &[TableSchema]) -> Result<Self> {
        Self::new(schemas, AcceptAll)
    }
}

impl<V: RecordValidator> Extractor<V> {
    pub fn new(schemas: &[TableSchema], validator: V) -> Result<Self> {
        Self::with_config(schemas, validator, ShredConfig::default())
    }

    pub fn with_config(schemas: &[TableSchema], validator: V, config: ShredConfig) -> Result<Self> {
        let specs = SpecSet::compile(schemas)?;
        info!(tables = specs.len(), "compiled table specs");
        Ok(Extractor {
            specs,
            validator,
            config,
        })
    }

    pub fn specs(&self) -> &SpecSet {
        &self.specs
    }

    pub fn config(&self) -> &ShredConfig {
        &self.config
    }

    /// Shred a single document; a top-level array is walked as one document
    pub fn parse(&self, document: &Value) -> Result<Extraction> {
        self.parse_batch(std::slice::from_ref(document))
    }

    /// Shred each document independently, accumulating rows and errors
    pub fn parse_batch(&self, documents: &[Value]) -> Result<Extraction> {
        let mut extraction = Extraction {
            results: self.empty_results(),
            errors: Vec::new(),
        };
        let walker = Walker::new(&self.specs, &self.validator, &self.config);
        for document in documents {
            walker.walk(document, &mut extraction.results, &mut extraction.errors)?;
        }
        Ok(extraction)
    }

    /// Shred an input value: a top-level array is a batch of documents,
    /// anything else is one document
    pub fn run(&self, input: &Value) -> Result<Extraction> {
        match input {
            Value::Array(documents) => self.parse_batch(documents),
            document => self.parse(document),
        }
    }

    fn empty_results(&self) -> ResultSet {
        ResultSet::with_tables(self.specs.iter().map(|s| s.name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shred::spec::FieldSchema;
    use crate::types::{FieldError, Record, Row};
    use crate::shred::spec::TableSpec;
    use serde_json::json;

    fn item_schemas() -> Vec<TableSchema> {
        vec![TableSchema::new("item")
            .field(FieldSchema::new("order_id", "root.id"))
            .field(FieldSchema::new("id", "root.items[*].id"))]
    }

    #[test]
    fn test_results_preseeded_with_every_table() {
        let extractor = Extractor::accepting(&item_schemas()).unwrap();
        let extraction = extractor.parse(&json!({"id": 1})).unwrap();

        assert_eq!(extraction.results.table_names().collect::<Vec<_>>(), vec!["item"]);
        assert!(extraction.results.rows("item").is_empty());
        assert!(extraction.is_clean());
    }

    #[test]
    fn test_run_treats_top_level_array_as_batch() {
        let extractor = Extractor::accepting(&item_schemas()).unwrap();
        let input = json!([
            {"id": "A", "items": [{"id": 1}, {"id": 2}]},
            {"id": "B", "items": [{"id": 3}]}
        ]);

        let extraction = extractor.run(&input).unwrap();
        let pairs: Vec<_> = extraction
            .results
            .rows("item")
            .iter()
            .map(|r| (r["order_id"].clone(), r["id"].clone()))
            .collect();
        assert_eq!(
            pairs,
            vec![(json!("A"), json!(1)), (json!("A"), json!(2)), (json!("B"), json!(3))]
        );

        // Walked as one document, the array elements live under root[i].
        let whole = extractor.parse(&input).unwrap();
        assert!(whole.results.rows("item").is_empty());
    }

    #[test]
    fn test_batch_does_not_leak_index_between_documents() {
        let extractor = Extractor::accepting(&item_schemas()).unwrap();
        let docs = vec![
            json!({"id": "A", "items": [{"id": 1}]}),
            json!({"items": [{"id": 2}]}),
        ];

        let extraction = extractor.parse_batch(&docs).unwrap();
        let rows = extraction.results.rows("item");
        assert_eq!(rows[0]["order_id"], json!("A"));
        assert_eq!(rows[1]["order_id"], Value::Null);
    }

    #[test]
    fn test_each_call_starts_fresh() {
        let extractor = Extractor::accepting(&item_schemas()).unwrap();
        let doc = json!({"id": "A", "items": [{"id": 1}]});

        let first = extractor.parse(&doc).unwrap();
        let second = extractor.parse(&doc).unwrap();
        assert_eq!(first, second);
        assert_eq!(second.results.rows("item").len(), 1);
    }

    #[test]
    fn test_custom_validator_failures_are_collected() {
        let reject_odd = |_: &TableSpec, record: Record| -> std::result::Result<Row, Vec<FieldError>> {
            match record.get("id").and_then(Value::as_i64) {
                Some(id) if id % 2 == 1 => Err(vec![FieldError::custom("id", "odd id")]),
                _ => Ok(record.into_row()),
            }
        };
        let extractor = Extractor::new(&item_schemas(), reject_odd).unwrap();
        let doc = json!({"id": "A", "items": [{"id": 1}, {"id": 2}, {"id": 3}]});

        let extraction = extractor.parse(&doc).unwrap();
        assert_eq!(extraction.results.rows("item").len(), 1);
        let failed: Vec<_> = extraction.errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(failed, vec!["root.items[0]", "root.items[2]"]);
    }

    #[test]
    fn test_invalid_schema_is_rejected() {
        let schemas = vec![TableSchema::new("empty")];
        assert!(Extractor::accepting(&schemas).is_err());
    }
}
