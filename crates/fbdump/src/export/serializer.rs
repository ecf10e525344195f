//! Typed value to SQL literal serialization.
//!
//! The literal forms below are what the importer and `isql` read back, so
//! they are fixed:
//!
//! | value       | literal                          |
//! |-------------|----------------------------------|
//! | NULL        | `NULL`                           |
//! | integer     | `-42`                            |
//! | decimal     | `1234567890123.456789`           |
//! | date        | `'2024-01-31'`                   |
//! | timestamp   | `'2024-01-31 23:59:59'`          |
//! | binary/hex  | `x'DEAD'`                        |
//! | binary/b64  | `'3q0='`                         |
//! | text        | `'O''Brien'`                     |

use std::borrow::Cow;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};

use crate::codec::Codecs;
use crate::config::{BlobFormat, FormatOptions};
use crate::core::{ColumnDescriptor, SourceEncoding, TypeCategory, TypedValue};
use crate::error::DumpError;

/// Serializes typed values into SQL literal text.
#[derive(Debug, Clone, Copy)]
pub struct ValueSerializer {
    codecs: Codecs,
    options: FormatOptions,
}

impl ValueSerializer {
    /// Create a serializer for one export run.
    pub fn new(codecs: Codecs, options: FormatOptions) -> Self {
        Self { codecs, options }
    }

    /// Append the literal for `value` to `out`.
    ///
    /// Serialization always produces a literal. Text that is malformed under
    /// its declared encoding is written from the legacy code page instead,
    /// and the decoding failure is returned so the caller can report it.
    pub fn write_literal(
        &self,
        out: &mut String,
        value: &TypedValue,
        column: &ColumnDescriptor,
    ) -> Option<DumpError> {
        match value {
            TypedValue::Null => out.push_str("NULL"),
            TypedValue::Integer(v) => out.push_str(&v.to_string()),
            // rust_decimal's Display never switches to exponent form.
            TypedValue::Decimal(d) => out.push_str(&d.to_string()),
            TypedValue::Date(d) => {
                out.push('\'');
                out.push_str(&d.format("%Y-%m-%d").to_string());
                out.push('\'');
            }
            TypedValue::Timestamp(ts) => {
                out.push('\'');
                out.push_str(&ts.format("%Y-%m-%d %H:%M:%S").to_string());
                out.push('\'');
            }
            TypedValue::Binary(bytes) if column.category == TypeCategory::Text => {
                return self.write_text(out, bytes, SourceEncoding::Native, column);
            }
            TypedValue::Binary(bytes) => self.write_blob(out, bytes),
            TypedValue::Text { bytes, encoding } => {
                return self.write_text(out, bytes, *encoding, column);
            }
        }
        None
    }

    fn write_blob(&self, out: &mut String, bytes: &[u8]) {
        match self.options.blob_format {
            BlobFormat::Hex => {
                out.push_str("x'");
                out.push_str(&hex::encode_upper(bytes));
                out.push('\'');
            }
            BlobFormat::Base64 => {
                out.push('\'');
                out.push_str(&BASE64_STANDARD.encode(bytes));
                out.push('\'');
            }
        }
    }

    fn write_text(
        &self,
        out: &mut String,
        bytes: &[u8],
        encoding: SourceEncoding,
        column: &ColumnDescriptor,
    ) -> Option<DumpError> {
        let encoding = if self.options.force_legacy_text {
            SourceEncoding::Legacy
        } else {
            encoding
        };

        let (mut text, recovered): (Cow<'_, str>, _) = match self.codecs.decode(bytes, encoding) {
            Ok(text) => (text, None),
            Err(msg) => {
                let text = self
                    .codecs
                    .decode(bytes, SourceEncoding::Legacy)
                    .unwrap_or_else(|_| String::from_utf8_lossy(bytes));
                let err = DumpError::encoding(
                    &column.name,
                    format!("{}; written as {}", msg, self.codecs.legacy().name()),
                );
                (text, Some(err))
            }
        };

        if self.options.sanitize_text {
            text = Cow::Owned(sanitize_text(&text));
        }
        if self.options.escape_newlines {
            text = Cow::Owned(escape_newlines(&text));
        }

        out.reserve(text.len() + 2);
        out.push('\'');
        for c in text.chars() {
            if c == '\'' {
                out.push('\'');
            }
            out.push(c);
        }
        out.push('\'');
        recovered
    }
}

/// Strip C0 control characters other than tab, CR and LF, and map the
/// non-breaking space to an ASCII space.
pub fn sanitize_text(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            '\t' | '\r' | '\n' => Some(c),
            '\u{00}'..='\u{1F}' => None,
            '\u{A0}' => Some(' '),
            _ => Some(c),
        })
        .collect()
}

/// Replace CR with `\r` and LF with `\n`.
pub fn escape_newlines(text: &str) -> String {
    text.replace('\r', "\\r").replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn col(category: TypeCategory) -> ColumnDescriptor {
        ColumnDescriptor {
            name: "C".to_string(),
            type_name: format!("{:?}", category).to_uppercase(),
            category,
            position: 0,
        }
    }

    fn ser(options: FormatOptions) -> ValueSerializer {
        ValueSerializer::new(Codecs::default(), options)
    }

    fn render(s: &ValueSerializer, value: &TypedValue, category: TypeCategory) -> String {
        let mut out = String::new();
        let recovered = s.write_literal(&mut out, value, &col(category));
        assert!(recovered.is_none(), "unexpected recovery: {:?}", recovered);
        out
    }

    fn lit(value: TypedValue, category: TypeCategory) -> String {
        render(&ser(FormatOptions::default()), &value, category)
    }

    #[test]
    fn test_null_and_integers() {
        assert_eq!(lit(TypedValue::Null, TypeCategory::Integer), "NULL");
        assert_eq!(lit(TypedValue::Integer(0), TypeCategory::Integer), "0");
        assert_eq!(lit(TypedValue::Integer(-100), TypeCategory::Integer), "-100");
        assert_eq!(
            lit(TypedValue::Integer(9_999_999_999), TypeCategory::Integer),
            "9999999999"
        );
    }

    #[test]
    fn test_decimal_has_no_exponent() {
        let d = Decimal::from_str("1234567890123.456789").unwrap();
        assert_eq!(lit(TypedValue::Decimal(d), TypeCategory::Decimal), "1234567890123.456789");

        let tiny = Decimal::from_str("-0.0000000000000000000000001").unwrap();
        let out = lit(TypedValue::Decimal(tiny), TypeCategory::Decimal);
        assert_eq!(out, "-0.0000000000000000000000001");
        assert!(!out.contains('E') && !out.contains('e'));
    }

    #[test]
    fn test_date_and_timestamp() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(lit(TypedValue::Date(d), TypeCategory::Date), "'2024-01-31'");

        let ts = d.and_hms_milli_opt(23, 59, 58, 999).unwrap();
        assert_eq!(
            lit(TypedValue::Timestamp(ts), TypeCategory::Timestamp),
            "'2024-01-31 23:59:58'"
        );
    }

    #[test]
    fn test_binary_hex_uppercase() {
        assert_eq!(
            lit(TypedValue::Binary(vec![0xDE, 0xAD]), TypeCategory::Blob),
            "x'DEAD'"
        );
        assert_eq!(lit(TypedValue::Binary(vec![]), TypeCategory::Blob), "x''");
    }

    #[test]
    fn test_binary_base64_has_no_prefix() {
        let s = ser(FormatOptions {
            blob_format: BlobFormat::Base64,
            ..FormatOptions::default()
        });
        let out = render(&s, &TypedValue::Binary(vec![0xDE, 0xAD, 0xBE, 0xEF]), TypeCategory::Blob);
        assert_eq!(out, "'3q2+7w=='");
    }

    #[test]
    fn test_binary_in_text_column_is_text() {
        assert_eq!(
            lit(TypedValue::Binary(b"memo".to_vec()), TypeCategory::Text),
            "'memo'"
        );
    }

    #[test]
    fn test_text_quote_doubling() {
        assert_eq!(lit(TypedValue::text("O'Brien"), TypeCategory::Text), "'O''Brien'");
        assert_eq!(lit(TypedValue::text("''"), TypeCategory::Text), "''''''");
        assert_eq!(lit(TypedValue::text(""), TypeCategory::Text), "''");
    }

    #[test]
    fn test_text_keeps_terminators_and_newlines_by_default() {
        assert_eq!(
            lit(TypedValue::text("a;b\r\nc"), TypeCategory::Text),
            "'a;b\r\nc'"
        );
    }

    #[test]
    fn test_escape_newlines_order() {
        let s = ser(FormatOptions {
            escape_newlines: true,
            ..FormatOptions::default()
        });
        let out = render(&s, &TypedValue::text("l1\r\nl2\n"), TypeCategory::Text);
        assert_eq!(out, "'l1\\r\\nl2\\n'");
    }

    #[test]
    fn test_sanitize_strips_controls_and_nbsp() {
        assert_eq!(sanitize_text("a\u{0}b\u{7}c\td\re\nf"), "abc\td\re\nf");
        assert_eq!(sanitize_text("R$\u{A0}10"), "R$ 10");
        assert_eq!(sanitize_text("ação"), "ação");
    }

    #[test]
    fn test_sanitize_then_escape_then_quote() {
        let s = ser(FormatOptions {
            sanitize_text: true,
            escape_newlines: true,
            ..FormatOptions::default()
        });
        let out = render(&s, &TypedValue::text("it's\u{1}\u{A0}ok\n"), TypeCategory::Text);
        assert_eq!(out, "'it''s ok\\n'");
    }

    #[test]
    fn test_force_legacy_decodes_cp1252() {
        let s = ser(FormatOptions {
            force_legacy_text: true,
            ..FormatOptions::default()
        });
        // "Sé" in windows-1252 is not valid UTF-8.
        let value = TypedValue::text_bytes(vec![0x53, 0xE9], SourceEncoding::Native);
        assert_eq!(render(&s, &value, TypeCategory::Text), "'Sé'");
    }

    #[test]
    fn test_legacy_tag_respected_without_force() {
        let value = TypedValue::text_bytes(vec![0x53, 0xE9], SourceEncoding::Legacy);
        assert_eq!(lit(value, TypeCategory::Text), "'Sé'");
    }

    #[test]
    fn test_malformed_native_text_falls_back_to_legacy() {
        let value = TypedValue::text_bytes(b"Caf\xE9 'x'".to_vec(), SourceEncoding::Native);
        let mut out = String::from("prefix ");
        let recovered = ser(FormatOptions::default())
            .write_literal(&mut out, &value, &col(TypeCategory::Text))
            .expect("recovery reported");

        assert_eq!(out, "prefix 'Café ''x'''");
        match recovered {
            DumpError::Encoding { column, message } => {
                assert_eq!(column, "C");
                assert!(message.contains("windows-1252"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_text_literals_are_balanced() {
        let samples = ["", "'", "''", "a'b'c", "x';DROP TABLE T;--", "multi\nline"];
        for sample in samples {
            let out = lit(TypedValue::text(sample), TypeCategory::Text);
            let inner = &out[1..out.len() - 1];
            assert!(out.starts_with('\'') && out.ends_with('\''));
            assert_eq!(inner.replace("''", ""), sample.replace('\'', ""));
            assert_eq!(inner.replace("''", "'"), sample);
        }
    }
}
