//! Table schemas and their compilation into table specs
//!
//! A schema names a table and lists its fields, each with an alias pointing
//! into the source document. Compilation infers where in the tree a table's
//! records live (the attachment pattern) and, from foreign-key-looking
//! fields, the pattern of its parent table.

use crate::error::ConfigError;
use crate::path::{self, ROOT};
use crate::shred::pattern::PathPattern;
use crate::shred::validate::FieldKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Read;
use std::sync::Arc;
use tracing::debug;

/// Declaration of one field of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,

    /// Source path, e.g. `root.items[*].id`; an alias equal to the field name
    /// is read from the attachment node itself
    #[serde(default)]
    pub alias: Option<String>,

    #[serde(default)]
    pub primary_key: bool,

    /// Referenced column, e.g. `invoice.id`
    #[serde(default)]
    pub foreign_key: Option<String>,

    /// Only consulted by [`FieldTypeValidator`](crate::shred::validate::FieldTypeValidator)
    #[serde(default, rename = "type")]
    pub kind: FieldKind,

    #[serde(default)]
    pub optional: bool,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, alias: impl Into<String>) -> Self {
        FieldSchema {
            name: name.into(),
            alias: Some(alias.into()),
            primary_key: false,
            foreign_key: None,
            kind: FieldKind::Any,
            optional: false,
        }
    }

    /// A field read straight from the attachment node under its own name
    pub fn local(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(name.clone(), name)
    }

    pub fn primary(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn references(mut self, target: impl Into<String>) -> Self {
        self.foreign_key = Some(target.into());
        self
    }

    pub fn kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Declaration of one target table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        TableSchema {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }
}

/// On-disk schema file: `{"tables": [...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaFile {
    pub tables: Vec<TableSchema>,
}

impl SchemaFile {
    pub fn from_reader<R: Read>(reader: R) -> serde_json::Result<Self> {
        serde_json::from_reader(reader)
    }
}

impl std::str::FromStr for SchemaFile {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
    }
}

/// A compiled field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub alias: String,
    /// Read from the attachment node rather than through the path index
    pub is_local: bool,
}

/// A field inferred to reference another table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub field: String,
    pub references: Option<String>,
}

/// An immutable, compiled table description
#[derive(Debug, Clone)]
pub struct TableSpec {
    pub name: String,
    pub fields: Vec<FieldSpec>,
    pub primary_key: Option<String>,
    pub foreign_keys: Vec<ForeignKey>,
    attachment: Arc<PathPattern>,
    parent: Option<Arc<PathPattern>>,
}

impl TableSpec {
    /// Compile one table schema
    pub fn compile(schema: &TableSchema) -> Result<Self, ConfigError> {
        let table = schema.name.as_str();
        if table.is_empty() {
            return Err(ConfigError::EmptyTableName);
        }
        if schema.fields.is_empty() {
            return Err(ConfigError::EmptySchema {
                table: table.to_string(),
            });
        }

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(schema.fields.len());
        for field in &schema.fields {
            let alias = match field.alias.as_deref() {
                Some(alias) if !alias.is_empty() => alias,
                _ => {
                    return Err(ConfigError::MissingAlias {
                        table: table.to_string(),
                        field: field.name.clone(),
                    })
                }
            };
            if !seen.insert(field.name.as_str()) {
                return Err(ConfigError::DuplicateField {
                    table: table.to_string(),
                    field: field.name.clone(),
                });
            }
            path::validate(alias).map_err(|reason| ConfigError::InvalidAlias {
                table: table.to_string(),
                field: field.name.clone(),
                alias: alias.to_string(),
                reason,
            })?;

            fields.push(FieldSpec {
                name: field.name.clone(),
                alias: alias.to_string(),
                is_local: alias == field.name && !path::has_wildcard(alias),
            });
        }

        let attachment = infer_attachment(table, &fields)?;
        let primary_key = detect_primary_key(schema);
        let foreign_keys: Vec<ForeignKey> = schema
            .fields
            .iter()
            .filter(|f| Some(&f.name) != primary_key.as_ref())
            .filter(|f| f.name.ends_with("_id") || f.foreign_key.is_some())
            .map(|f| ForeignKey {
                field: f.name.clone(),
                references: f.foreign_key.clone(),
            })
            .collect();
        let parent = infer_parent(&attachment, &fields, &foreign_keys);

        let spec = TableSpec {
            name: table.to_string(),
            attachment: compile_pattern(table, &attachment)?,
            parent: parent
                .map(|p| compile_pattern(table, &p))
                .transpose()?,
            fields,
            primary_key,
            foreign_keys,
        };

        debug!(
            table = %spec.name,
            attachment = %spec.attachment,
            parent = spec.parent_pattern().unwrap_or("-"),
            fields = spec.fields.len(),
            "compiled table spec"
        );
        Ok(spec)
    }

    pub fn attachment(&self) -> &PathPattern {
        &self.attachment
    }

    pub fn attachment_pattern(&self) -> &str {
        self.attachment.as_str()
    }

    pub fn parent_pattern(&self) -> Option<&str> {
        self.parent.as_deref().map(PathPattern::as_str)
    }

    /// Whether records of this table are extracted at `concrete`
    pub fn attaches_at(&self, concrete: &str) -> bool {
        self.attachment.matches(concrete)
    }
}

/// The compiled specs of a whole schema set, in declaration order
#[derive(Debug, Clone)]
pub struct SpecSet {
    tables: Vec<TableSpec>,
}

impl SpecSet {
    pub fn compile(schemas: &[TableSchema]) -> Result<Self, ConfigError> {
        let mut names = HashSet::new();
        let mut tables = Vec::with_capacity(schemas.len());
        for schema in schemas {
            if !schema.name.is_empty() && !names.insert(schema.name.as_str()) {
                return Err(ConfigError::DuplicateTable {
                    table: schema.name.clone(),
                });
            }
            tables.push(TableSpec::compile(schema)?);
        }
        Ok(SpecSet { tables })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TableSpec> {
        self.tables.iter()
    }

    pub fn get(&self, name: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// The first other table attached where `name`'s parent pattern points
    pub fn parent_table(&self, name: &str) -> Option<&TableSpec> {
        let parent = self.get(name)?.parent_pattern()?;
        self.tables
            .iter()
            .find(|t| t.name != name && t.attachment_pattern() == parent)
    }
}

impl<'a> IntoIterator for &'a SpecSet {
    type Item = &'a TableSpec;
    type IntoIter = std::slice::Iter<'a, TableSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.iter()
    }
}

fn compile_pattern(table: &str, pattern: &str) -> Result<Arc<PathPattern>, ConfigError> {
    PathPattern::cached(pattern).map_err(|e| ConfigError::InvalidPattern {
        table: table.to_string(),
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Deepest wildcarded prefix if any alias repeats, else the deepest common prefix
fn infer_attachment(table: &str, fields: &[FieldSpec]) -> Result<String, ConfigError> {
    let wildcard: Vec<&str> = fields
        .iter()
        .filter(|f| !f.is_local && path::has_wildcard(&f.alias))
        .map(|f| f.alias.as_str())
        .collect();

    if !wildcard.is_empty() {
        return deepest_prefix(&wildcard)
            .map(str::to_string)
            .ok_or_else(|| ConfigError::NoAttachmentCandidate {
                table: table.to_string(),
            });
    }

    let prefixes: Vec<&str> = fields
        .iter()
        .filter(|f| !f.is_local)
        .map(|f| path::prefix(&f.alias))
        .collect();
    Ok(common_prefix(&prefixes).unwrap_or_else(|| ROOT.to_string()))
}

/// Prefix with the most segments; the first one wins ties
fn deepest_prefix<'a>(aliases: &[&'a str]) -> Option<&'a str> {
    aliases
        .iter()
        .copied()
        .map(path::prefix)
        .fold(None, |best: Option<&str>, candidate| match best {
            Some(b) if path::depth(b) >= path::depth(candidate) => Some(b),
            _ => Some(candidate),
        })
}

/// Prefix with the fewest segments; the first one wins ties
fn shallowest<'a>(paths: &[&'a str]) -> Option<&'a str> {
    paths
        .iter()
        .copied()
        .fold(None, |best: Option<&str>, candidate| match best {
            Some(b) if path::depth(b) <= path::depth(candidate) => Some(b),
            _ => Some(candidate),
        })
}

/// Longest run of leading segments shared by all paths. Segments with the same
/// key but different subscripts count as equal; the first path's spelling is kept.
fn common_prefix(paths: &[&str]) -> Option<String> {
    let split: Vec<Vec<&str>> = paths.iter().map(|p| path::segments(p).collect()).collect();
    let first = split.first()?;
    let shortest = split.iter().map(Vec::len).min().unwrap_or(0);

    let shared: Vec<&str> = (0..shortest)
        .map_while(|i| {
            let base = path::base_key(first[i]);
            split
                .iter()
                .all(|segments| path::base_key(segments[i]) == base)
                .then_some(first[i])
        })
        .collect();

    if shared.is_empty() {
        None
    } else {
        Some(shared.join("."))
    }
}

/// Explicit hint, then a field called `id`, then the first `_id` field
fn detect_primary_key(schema: &TableSchema) -> Option<String> {
    schema
        .fields
        .iter()
        .find(|f| f.primary_key)
        .or_else(|| schema.fields.iter().find(|f| f.name == "id"))
        .or_else(|| schema.fields.iter().find(|f| f.name.ends_with("_id")))
        .map(|f| f.name.clone())
}

/// Shallowest foreign-key prefix, moved one level up if it is the table's own pattern
fn infer_parent(attachment: &str, fields: &[FieldSpec], foreign_keys: &[ForeignKey]) -> Option<String> {
    let prefixes: Vec<&str> = foreign_keys
        .iter()
        .filter_map(|fk| fields.iter().find(|f| f.name == fk.field))
        .map(|f| {
            if f.is_local {
                attachment
            } else {
                path::prefix(&f.alias)
            }
        })
        .collect();

    let parent = shallowest(&prefixes)?;
    if parent == attachment {
        path::parent(attachment).map(str::to_string)
    } else {
        Some(parent.to_string())
    }
}
