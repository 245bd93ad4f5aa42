//! Error types for spec compilation and document shredding.

use thiserror::Error;

/// Fatal errors raised while compiling table schemas into table specs.
///
/// An extractor is never built from a schema set that produced one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A table descriptor carries an empty name.
    #[error("table name must not be empty")]
    EmptyTableName,

    /// Two table descriptors share the same name.
    #[error("table '{table}' is declared more than once")]
    DuplicateTable { table: String },

    /// A table descriptor declares no fields.
    #[error("table '{table}' declares no fields")]
    EmptySchema { table: String },

    /// A field was declared without a source alias.
    #[error("alias is required for field '{field}' of table '{table}'")]
    MissingAlias { table: String, field: String },

    /// A field name appears twice in the same table.
    #[error("field '{field}' is declared more than once in table '{table}'")]
    DuplicateField { table: String, field: String },

    /// An alias is not a well-formed path.
    #[error("invalid alias '{alias}' for field '{field}' of table '{table}': {reason}")]
    InvalidAlias {
        table: String,
        field: String,
        alias: String,
        reason: String,
    },

    /// A derived pattern could not be compiled.
    #[error("pattern '{pattern}' of table '{table}' failed to compile: {reason}")]
    InvalidPattern {
        table: String,
        pattern: String,
        reason: String,
    },

    /// The wildcarded alias set yielded no attachment candidate.
    #[error("no attachment pattern could be inferred for table '{table}'")]
    NoAttachmentCandidate { table: String },
}

/// Errors that abort a single `parse`/`run` call.
#[derive(Debug, Error)]
pub enum ShredError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The document nests deeper than `ShredConfig::max_depth`.
    #[error("document exceeds the maximum nesting depth of {limit} at {path}")]
    DepthLimitExceeded { path: String, limit: usize },
}

pub type Result<T, E = ShredError> = std::result::Result<T, E>;
