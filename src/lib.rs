//! # json-shredder - Schema-driven JSON to tables
//!
//! Decomposes arbitrarily nested JSON documents into flat, relational rows.
//! Every target table declares its fields as path aliases into the source
//! document (`root.items[*].id`); the engine works out where each table's
//! records live, resolves ancestor values through the aliases and hands each
//! assembled record to a validator.
//!
//! ## Modules
//!
//! - **path**: path and segment syntax
//! - **shred**: spec compilation, the indexing walk, validators and writers
//!
//! ## Quick Start
//!
//! ```rust
//! use json_shredder::{Extractor, FieldSchema, TableSchema};
//! use serde_json::json;
//!
//! # fn main() -> anyhow::Result<()> {
//! let schemas = vec![
//!     TableSchema::new("user")
//!         .field(FieldSchema::new("id", "root.id").primary()),
//!     TableSchema::new("post")
//!         .field(FieldSchema::new("id", "root.posts[*].id").primary())
//!         .field(FieldSchema::new("user_id", "root.id"))
//!         .field(FieldSchema::new("title", "root.posts[*].title")),
//! ];
//!
//! let extractor = Extractor::accepting(&schemas)?;
//! let extraction = extractor.parse(&json!({
//!     "id": 1,
//!     "posts": [{"id": 10, "title": "First"}, {"id": 11, "title": "Second"}]
//! }))?;
//!
//! assert_eq!(extraction.results.rows("user").len(), 1);
//! assert_eq!(extraction.results.rows("post")[1]["user_id"], json!(1));
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use serde_json::Value;
use std::io::BufRead;

pub mod error;
pub mod path;
pub mod shred;
pub mod types;

pub use error::{ConfigError, ShredError};
pub use shred::{
    AcceptAll, Extractor, FieldKind, FieldSchema, FieldTypeValidator, RecordValidator, SchemaFile,
    SingleWriter, SpecSet, TableSchema, TableSpec, TableWriter,
};
pub use types::{Extraction, FieldError, FieldErrorKind, Record, RecordError, ResultSet, Row, ShredConfig};

/// Shred a newline-delimited JSON stream, one document per non-empty line
pub fn shred_json<R: BufRead, V: RecordValidator>(
    reader: R,
    extractor: &Extractor<V>,
) -> Result<Extraction> {
    let mut extraction = extractor.parse_batch(&[])?;

    for (number, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read line")?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(&line)
            .with_context(|| format!("Failed to parse JSON on line {}", number + 1))?;

        extraction.absorb(extractor.parse(&value)?);
    }

    Ok(extraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shred_ndjson_stream() {
        let schemas = vec![TableSchema::new("post")
            .field(FieldSchema::new("user", "root.name"))
            .field(FieldSchema::new("id", "root.posts[*].id"))];
        let extractor = Extractor::accepting(&schemas).unwrap();

        let input = "{\"name\": \"alice\", \"posts\": [{\"id\": 1}]}\n\n{\"name\": \"bob\", \"posts\": [{\"id\": 2}, {\"id\": 3}]}\n";
        let extraction = shred_json(input.as_bytes(), &extractor).unwrap();

        let users: Vec<_> = extraction.results.rows("post").iter().map(|r| r["user"].clone()).collect();
        assert_eq!(users, vec!["alice", "bob", "bob"]);
    }

    #[test]
    fn test_shred_reports_bad_line() {
        let schemas = vec![TableSchema::new("t").field(FieldSchema::local("a"))];
        let extractor = Extractor::accepting(&schemas).unwrap();

        let err = shred_json("{}\nnot json\n".as_bytes(), &extractor).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
