//! Text codec table.
//!
//! Built once per run from the connection charset and handed to the value
//! serializer and the dump line reader. Nothing here is global or mutable.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use tracing::warn;

use crate::core::SourceEncoding;
use crate::error::{DumpError, Result};

/// Immutable pair of text encodings used by one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codecs {
    native: &'static Encoding,
    legacy: &'static Encoding,
}

impl Default for Codecs {
    fn default() -> Self {
        Self {
            native: UTF_8,
            legacy: WINDOWS_1252,
        }
    }
}

impl Codecs {
    /// Create a codec table whose native encoding follows a Firebird
    /// connection charset name (`UTF8`, `WIN1252`, `ISO8859_1`, ...).
    ///
    /// Unknown charsets fall back to UTF-8.
    pub fn for_charset(charset: &str) -> Self {
        let native = charset_encoding(charset).unwrap_or_else(|| {
            warn!("Unknown charset '{}', decoding text as UTF-8", charset);
            UTF_8
        });
        Self {
            native,
            legacy: WINDOWS_1252,
        }
    }

    /// Legacy single-byte code page used for forced recovery.
    pub fn legacy(&self) -> &'static Encoding {
        self.legacy
    }

    /// Decode a text payload under the given encoding.
    ///
    /// Native decoding is strict: a malformed sequence is reported as an
    /// error message instead of being replaced. Legacy decoding is a
    /// single-byte mapping and cannot fail.
    pub fn decode<'b>(
        &self,
        bytes: &'b [u8],
        encoding: SourceEncoding,
    ) -> std::result::Result<Cow<'b, str>, String> {
        match encoding {
            SourceEncoding::Legacy => Ok(self.legacy.decode_without_bom_handling(bytes).0),
            SourceEncoding::Native => self
                .native
                .decode_without_bom_handling_and_without_replacement(bytes)
                .ok_or_else(|| format!("malformed byte sequence under {}", self.native.name())),
        }
    }

    /// Encode statement text for a connection using the native charset.
    ///
    /// Text the charset cannot represent is refused instead of being sent
    /// with substitutes. ASCII text and UTF-8 connections borrow the input.
    pub fn encode_statement<'a>(&self, sql: &'a str) -> Result<Cow<'a, [u8]>> {
        let (bytes, _, unmappable) = self.native.encode(sql);
        if unmappable {
            return Err(DumpError::Rejected(format!(
                "statement has characters that {} cannot represent",
                self.native.name()
            )));
        }
        Ok(bytes)
    }

    /// Decode one line of a dump file. Dumps are UTF-8; malformed sequences
    /// are replaced and reported through the returned flag.
    pub fn decode_dump_line<'b>(&self, bytes: &'b [u8]) -> (Cow<'b, str>, bool) {
        let (text, had_errors) = UTF_8.decode_without_bom_handling(bytes);
        (text, had_errors)
    }
}

/// Map a Firebird charset name onto an encoding.
fn charset_encoding(charset: &str) -> Option<&'static Encoding> {
    let upper = charset.trim().to_ascii_uppercase();
    match upper.as_str() {
        "" | "NONE" | "UTF8" | "UTF-8" | "UNICODE_FSS" => Some(UTF_8),
        "ISO8859_1" | "LATIN1" => Some(WINDOWS_1252),
        "KOI8R" => Encoding::for_label(b"koi8-r"),
        "KOI8U" => Encoding::for_label(b"koi8-u"),
        "DOS866" => Encoding::for_label(b"ibm866"),
        "GBK" => Encoding::for_label(b"gbk"),
        "SJIS_0208" => Encoding::for_label(b"shift_jis"),
        "EUCJ_0208" => Encoding::for_label(b"euc-jp"),
        other => {
            if let Some(page) = other.strip_prefix("WIN") {
                Encoding::for_label(format!("windows-{}", page).as_bytes())
            } else if let Some(part) = other.strip_prefix("ISO8859_") {
                Encoding::for_label(format!("iso-8859-{}", part).as_bytes())
            } else {
                None
            }
        }
    }
}
