//! Typed column values carried from a row cursor to the literal serializer.
//!
//! A row source decides the variant once per column from catalogue metadata;
//! nothing downstream inspects driver types per row.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

/// Encoding a text payload was read under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SourceEncoding {
    /// The connection charset (see [`crate::codec::Codecs::for_charset`]).
    #[default]
    Native,

    /// The legacy single-byte code page, used to recover text that an
    /// upstream connection stored under the wrong charset.
    Legacy,
}

/// One column's runtime value.
///
/// Exactly one variant is active. `Text` keeps its raw bytes together with
/// the encoding they were read under so a literal never mixes encodings.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    /// SQL NULL.
    Null,

    /// SMALLINT / INTEGER / BIGINT.
    Integer(i64),

    /// NUMERIC / DECIMAL with exact scale.
    Decimal(Decimal),

    /// DATE.
    Date(NaiveDate),

    /// TIMESTAMP. Sub-second precision is dropped on export.
    Timestamp(NaiveDateTime),

    /// Character data as raw bytes plus the encoding they were read under.
    Text {
        bytes: Vec<u8>,
        encoding: SourceEncoding,
    },

    /// BLOB payload.
    Binary(Vec<u8>),
}

impl TypedValue {
    /// Create a text value from already-decoded UTF-8 text.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        TypedValue::Text {
            bytes: s.into().into_bytes(),
            encoding: SourceEncoding::Native,
        }
    }

    /// Create a text value from raw bytes read under the given encoding.
    #[must_use]
    pub fn text_bytes(bytes: Vec<u8>, encoding: SourceEncoding) -> Self {
        TypedValue::Text { bytes, encoding }
    }
}

impl From<i64> for TypedValue {
    fn from(v: i64) -> Self {
        TypedValue::Integer(v)
    }
}

impl From<i32> for TypedValue {
    fn from(v: i32) -> Self {
        TypedValue::Integer(i64::from(v))
    }
}

impl From<i16> for TypedValue {
    fn from(v: i16) -> Self {
        TypedValue::Integer(i64::from(v))
    }
}

impl From<Decimal> for TypedValue {
    fn from(v: Decimal) -> Self {
        TypedValue::Decimal(v)
    }
}

impl From<NaiveDate> for TypedValue {
    fn from(v: NaiveDate) -> Self {
        TypedValue::Date(v)
    }
}

impl From<NaiveDateTime> for TypedValue {
    fn from(v: NaiveDateTime) -> Self {
        TypedValue::Timestamp(v)
    }
}

impl From<String> for TypedValue {
    fn from(v: String) -> Self {
        TypedValue::text(v)
    }
}

impl From<&str> for TypedValue {
    fn from(v: &str) -> Self {
        TypedValue::text(v)
    }
}

impl From<Vec<u8>> for TypedValue {
    fn from(v: Vec<u8>) -> Self {
        TypedValue::Binary(v)
    }
}

impl<T: Into<TypedValue>> From<Option<T>> for TypedValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(TypedValue::Null, Into::into)
    }
}

/// A row aligned 1:1 with the cursor's column descriptors.
pub type Row = Vec<TypedValue>;
