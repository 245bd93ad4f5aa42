//! The validation boundary
//!
//! The engine hands every assembled record to a [`RecordValidator`] and never
//! interprets field types itself. Two validators ship with the crate:
//! [`AcceptAll`] and the schema-driven [`FieldTypeValidator`].

use crate::shred::spec::{TableSchema, TableSpec};
use crate::types::{FieldError, Record, Row};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

static ISO_DATETIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})?$").unwrap()
});

static ISO_DATE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap()
});

/// Turns a raw record into a row, or explains why it cannot
pub trait RecordValidator {
    fn validate(&self, table: &TableSpec, record: Record) -> Result<Row, Vec<FieldError>>;
}

impl<F> RecordValidator for F
where
    F: Fn(&TableSpec, Record) -> Result<Row, Vec<FieldError>>,
{
    fn validate(&self, table: &TableSpec, record: Record) -> Result<Row, Vec<FieldError>> {
        self(table, record)
    }
}

/// Accepts every record; absent values become `null`
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl RecordValidator for AcceptAll {
    fn validate(&self, _table: &TableSpec, record: Record) -> Result<Row, Vec<FieldError>> {
        Ok(record.into_row())
    }
}

/// Declared type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Any,
    String,
    Integer,
    Number,
    Boolean,
    /// ISO-8601 date-time string
    DateTime,
    /// ISO-8601 calendar date string
    Date,
    Object,
    Array,
}

impl FieldKind {
    fn name(self) -> &'static str {
        match self {
            FieldKind::Any => "any",
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::DateTime => "datetime",
            FieldKind::Date => "date",
            FieldKind::Object => "object",
            FieldKind::Array => "array",
        }
    }

    fn check(self, field: &str, value: &Value) -> Result<(), FieldError> {
        let type_ok = match self {
            FieldKind::Any => true,
            FieldKind::String | FieldKind::DateTime | FieldKind::Date => value.is_string(),
            FieldKind::Integer => {
                value.is_i64() || value.is_u64() || value.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            FieldKind::Number => value.is_number(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::Object => value.is_object(),
            FieldKind::Array => value.is_array(),
        };
        if !type_ok {
            let expected = match self {
                FieldKind::DateTime | FieldKind::Date => "string",
                other => other.name(),
            };
            return Err(FieldError::invalid_type(field, expected, value));
        }

        let format = match self {
            FieldKind::DateTime => Some(&*ISO_DATETIME_REGEX),
            FieldKind::Date => Some(&*ISO_DATE_REGEX),
            _ => None,
        };
        match (format, value.as_str()) {
            (Some(regex), Some(s)) if !regex.is_match(s) => {
                Err(FieldError::invalid_format(field, self.name()))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
struct FieldRule {
    name: String,
    kind: FieldKind,
    optional: bool,
}

/// Checks presence and declared kinds from the table schemas.
///
/// A field is required unless marked `optional`. Typed fields treat `null`
/// like an absent value; `any` fields accept `null` but not absence. Every
/// failing field of a record is reported. Records of tables the validator
/// was not built for pass through unchanged.
#[derive(Debug, Clone, Default)]
pub struct FieldTypeValidator {
    tables: HashMap<String, Vec<FieldRule>>,
}

impl FieldTypeValidator {
    pub fn from_schemas(schemas: &[TableSchema]) -> Self {
        let tables = schemas
            .iter()
            .map(|schema| {
                let rules = schema
                    .fields
                    .iter()
                    .map(|f| FieldRule {
                        name: f.name.clone(),
                        kind: f.kind,
                        optional: f.optional,
                    })
                    .collect();
                (schema.name.clone(), rules)
            })
            .collect();
        FieldTypeValidator { tables }
    }
}

impl RecordValidator for FieldTypeValidator {
    fn validate(&self, table: &TableSpec, record: Record) -> Result<Row, Vec<FieldError>> {
        let Some(rules) = self.tables.get(&table.name) else {
            return Ok(record.into_row());
        };

        let mut errors = Vec::new();
        for rule in rules {
            let value = record.get(&rule.name);
            let present = match (rule.kind, value) {
                (_, None) => false,
                (FieldKind::Any, Some(_)) => true,
                (_, Some(v)) => !v.is_null(),
            };

            if !present {
                if !rule.optional {
                    errors.push(FieldError::missing(&rule.name));
                }
                continue;
            }
            if let Some(v) = value {
                if let Err(e) = rule.kind.check(&rule.name, v) {
                    errors.push(e);
                }
            }
        }

        if errors.is_empty() {
            Ok(record.into_row())
        } else {
            Err(errors)
        }
    }
}
