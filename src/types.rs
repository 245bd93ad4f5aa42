use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// A validated output row - one record of one table
pub type Row = Map<String, Value>;

/// Configuration for the shredding process
#[derive(Debug, Clone)]
pub struct ShredConfig {
    /// Maximum nesting depth of a document (the root is depth 0)
    pub max_depth: usize,
}

impl Default for ShredConfig {
    fn default() -> Self {
        ShredConfig { max_depth: 256 }
    }
}

/// Raw field mapping assembled for one (table, node) pair before validation.
///
/// Fields keep declaration order. `None` marks a value that could not be
/// found, either because the alias did not resolve or the path was never
/// indexed.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Concrete path of the attachment node
    pub path: String,
    fields: Vec<(String, Option<Value>)>,
}

impl Record {
    pub fn new(path: impl Into<String>) -> Self {
        Record {
            path: path.into(),
            fields: Vec::new(),
        }
    }

    pub fn push(&mut self, field: impl Into<String>, value: Option<Value>) {
        self.fields.push((field.into(), value));
    }

    /// The resolved value of a field; `None` for absent and undeclared fields alike.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .and_then(|(_, value)| value.as_ref())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Convert into a row, mapping absent values to `null`.
    pub fn into_row(self) -> Row {
        self.fields
            .into_iter()
            .map(|(name, value)| (name, value.unwrap_or(Value::Null)))
            .collect()
    }
}

/// Kind of a field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorKind {
    Missing,
    InvalidType,
    InvalidFormat,
    Custom,
}

/// One reason a record was rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub kind: FieldErrorKind,
    pub message: String,
}

impl FieldError {
    pub fn missing(field: impl Into<String>) -> Self {
        FieldError {
            field: field.into(),
            kind: FieldErrorKind::Missing,
            message: "field required".to_string(),
        }
    }

    pub fn invalid_type(field: impl Into<String>, expected: &str, found: &Value) -> Self {
        FieldError {
            field: field.into(),
            kind: FieldErrorKind::InvalidType,
            message: format!("expected {expected}, found {}", kind_name(found)),
        }
    }

    pub fn invalid_format(field: impl Into<String>, format: &str) -> Self {
        FieldError {
            field: field.into(),
            kind: FieldErrorKind::InvalidFormat,
            message: format!("value is not a valid {format}"),
        }
    }

    pub fn custom(field: impl Into<String>, message: impl Into<String>) -> Self {
        FieldError {
            field: field.into(),
            kind: FieldErrorKind::Custom,
            message: message.into(),
        }
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A record that failed validation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordError {
    pub path: String,
    pub table: String,
    pub errors: Vec<FieldError>,
}

/// Validated rows grouped by table, in table declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    tables: Vec<(String, Vec<Row>)>,
}

impl ResultSet {
    /// An empty result set with one (empty) entry per table
    pub fn with_tables<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ResultSet {
            tables: names.into_iter().map(|n| (n.into(), Vec::new())).collect(),
        }
    }

    pub fn push(&mut self, table: &str, row: Row) {
        match self.tables.iter_mut().find(|(name, _)| name == table) {
            Some((_, rows)) => rows.push(row),
            None => self.tables.push((table.to_string(), vec![row])),
        }
    }

    /// Rows of a table; empty for unknown tables
    pub fn rows(&self, table: &str) -> &[Row] {
        self.tables
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, rows)| rows.as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Row])> {
        self.tables
            .iter()
            .map(|(name, rows)| (name.as_str(), rows.as_slice()))
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|(name, _)| name.as_str())
    }

    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|(_, rows)| rows.len()).sum()
    }

    /// Append every row of `other`, table by table
    pub fn extend(&mut self, other: ResultSet) {
        for (table, rows) in other.tables {
            match self.tables.iter_mut().find(|(name, _)| *name == table) {
                Some((_, existing)) => existing.extend(rows),
                None => self.tables.push((table, rows)),
            }
        }
    }
}

impl Serialize for ResultSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.tables.len()))?;
        for (name, rows) in &self.tables {
            map.serialize_entry(name, rows)?;
        }
        map.end()
    }
}

/// Outcome of one extraction call: rows and collected record errors
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Extraction {
    pub results: ResultSet,
    pub errors: Vec<RecordError>,
}

impl Extraction {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn absorb(&mut self, other: Extraction) {
        self.results.extend(other.results);
        self.errors.extend(other.errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_into_row_fills_nulls() {
        let mut record = Record::new("root");
        record.push("id", Some(json!("A")));
        record.push("note", None);

        assert_eq!(record.get("id"), Some(&json!("A")));
        assert_eq!(record.get("note"), None);

        let row = record.into_row();
        assert_eq!(row.get("note"), Some(&Value::Null));
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn test_result_set_keeps_declaration_order() {
        let mut results = ResultSet::with_tables(["zeta", "alpha"]);
        results.push("alpha", Row::new());

        let names: Vec<_> = results.table_names().collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert_eq!(results.rows("alpha").len(), 1);
        assert!(results.rows("missing").is_empty());

        let json = serde_json::to_string(&results).unwrap();
        assert_eq!(json, r#"{"zeta":[],"alpha":[{}]}"#);
    }

    #[test]
    fn test_extraction_absorb() {
        let mut first = Extraction {
            results: ResultSet::with_tables(["t"]),
            errors: vec![],
        };
        let mut second = first.clone();
        second.results.push("t", Row::new());
        second.errors.push(RecordError {
            path: "root".into(),
            table: "t".into(),
            errors: vec![FieldError::missing("id")],
        });

        first.absorb(second);
        assert_eq!(first.results.total_rows(), 1);
        assert!(!first.is_clean());
    }
}
