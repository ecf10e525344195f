//! Column metadata for exported result sets.

use serde::{Deserialize, Serialize};

/// Declared type family of a column, decided once per result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeCategory {
    /// SMALLINT, INTEGER, BIGINT.
    Integer,
    /// NUMERIC, DECIMAL.
    Decimal,
    /// DATE.
    Date,
    /// TIMESTAMP.
    Timestamp,
    /// CHAR, VARCHAR, text BLOBs and anything rendered as a quoted string.
    Text,
    /// Binary BLOBs.
    Blob,
}

/// Type name tokens that mark a column as character data.
const TEXT_FAMILY_TOKENS: &[&str] = &["CHAR", "VARCHAR", "VARYING", "CSTRING", "TEXT"];

impl TypeCategory {
    /// Classify a column from its declared type name.
    ///
    /// `surfaced_as_text` is true when the driver hands a large object to us
    /// as character data rather than raw bytes; such a column is text even
    /// though its type name says `BLOB`.
    pub fn classify(type_name: &str, surfaced_as_text: bool) -> Self {
        let upper = type_name.trim().to_ascii_uppercase();
        let base = upper
            .split(|c: char| c == '(' || c.is_whitespace())
            .next()
            .unwrap_or_default();

        match base {
            "SMALLINT" | "INTEGER" | "INT" | "BIGINT" | "INT64" => return TypeCategory::Integer,
            "NUMERIC" | "DECIMAL" => return TypeCategory::Decimal,
            "DATE" => return TypeCategory::Date,
            "TIMESTAMP" => return TypeCategory::Timestamp,
            _ => {}
        }

        let is_text_family = upper
            .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .any(|token| TEXT_FAMILY_TOKENS.contains(&token));

        if is_text_family {
            TypeCategory::Text
        } else if base == "BLOB" {
            if surfaced_as_text {
                TypeCategory::Text
            } else {
                TypeCategory::Blob
            }
        } else {
            // FLOAT, DOUBLE PRECISION, TIME, BOOLEAN ... are written in their
            // natural string form as quoted text.
            TypeCategory::Text
        }
    }
}

/// One result-set column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name, embedded verbatim in generated SQL.
    pub name: String,
    /// Declared type name as reported by the catalogue.
    pub type_name: String,
    /// Type family derived from `type_name`.
    pub category: TypeCategory,
    /// 0-based position in the row.
    pub position: usize,
}

impl ColumnDescriptor {
    /// Build a descriptor, classifying the type name.
    pub fn new(
        name: impl Into<String>,
        type_name: impl Into<String>,
        position: usize,
        surfaced_as_text: bool,
    ) -> Self {
        let type_name = type_name.into();
        let category = TypeCategory::classify(&type_name, surfaced_as_text);
        Self {
            name: name.into(),
            type_name,
            category,
            position,
        }
    }
}
