//! JSON shredding - decompose nested JSON into flat table rows
//!
//! Each table is declared as a list of fields whose aliases point into the
//! source document. Schemas are compiled once into a [`SpecSet`]; an
//! [`Extractor`] then walks each document a single time, indexing every
//! concrete path and extracting records wherever a table's attachment
//! pattern matches.

pub mod alias;
pub mod extractor;
pub mod index;
pub mod pattern;
pub mod spec;
pub mod validate;
pub mod walker;
pub mod writer;

pub use extractor::Extractor;
pub use index::PathIndex;
pub use pattern::{matches, PathPattern};
pub use spec::{FieldSchema, FieldSpec, ForeignKey, SchemaFile, SpecSet, TableSchema, TableSpec};
pub use validate::{AcceptAll, FieldKind, FieldTypeValidator, RecordValidator};
pub use walker::{WalkStats, Walker};
pub use writer::{SingleWriter, TableWriter};
