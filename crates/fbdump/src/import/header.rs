//! Dump header scan for the connection charset.

use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::Result;

/// Charset used when the header has no `SET NAMES` line.
pub const DEFAULT_IMPORT_CHARSET: &str = "UTF8";

/// Charset named by a `SET NAMES <charset>;` line, upper-cased.
pub fn parse_set_names(line: &str) -> Option<String> {
    let line = line.trim_start_matches(|c: char| c.is_whitespace() || c == '\u{FEFF}' || c == '\u{200B}');
    let mut tokens = line.split_whitespace();
    if !tokens.next()?.eq_ignore_ascii_case("SET") || !tokens.next()?.eq_ignore_ascii_case("NAMES") {
        return None;
    }
    let charset = tokens.next()?.replace(';', "");
    let charset = charset.trim();
    if charset.is_empty() {
        None
    } else {
        Some(charset.to_ascii_uppercase())
    }
}

/// Scan the head of a dump file for its charset, defaulting to `UTF8`.
pub async fn detect_charset(path: &Path, max_lines: usize) -> Result<String> {
    let mut reader = BufReader::new(File::open(path).await?);
    let mut buf = Vec::new();

    for _ in 0..max_lines {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        if let Some(charset) = parse_set_names(&String::from_utf8_lossy(&buf)) {
            return Ok(charset);
        }
    }
    Ok(DEFAULT_IMPORT_CHARSET.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set_names() {
        assert_eq!(parse_set_names("SET NAMES WIN1252;").as_deref(), Some("WIN1252"));
        assert_eq!(parse_set_names("  set names utf8 ;").as_deref(), Some("UTF8"));
        assert_eq!(parse_set_names("\u{FEFF}SET NAMES ISO8859_1;").as_deref(), Some("ISO8859_1"));
        assert_eq!(parse_set_names("SET SQL DIALECT 3;"), None);
        assert_eq!(parse_set_names("SET NAMES ;"), None);
        assert_eq!(parse_set_names("INSERT INTO T VALUES ('SET NAMES X')"), None);
    }

    #[tokio::test]
    async fn test_detect_charset_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.sql");
        std::fs::write(&path, "\u{FEFF}SET SQL DIALECT 3;\nSET NAMES WIN1252;\n\nCOMMIT;\n").unwrap();
        assert_eq!(detect_charset(&path, 200).await.unwrap(), "WIN1252");
    }

    #[tokio::test]
    async fn test_detect_charset_default_and_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.sql");
        let mut content = String::from("SET SQL DIALECT 3;\n");
        for i in 0..5 {
            content.push_str(&format!("INSERT INTO T VALUES ({});\n", i));
        }
        content.push_str("SET NAMES WIN1252;\n");
        std::fs::write(&path, content).unwrap();

        assert_eq!(detect_charset(&path, 3).await.unwrap(), DEFAULT_IMPORT_CHARSET);
        assert_eq!(detect_charset(&path, 200).await.unwrap(), "WIN1252");
    }

    #[tokio::test]
    async fn test_detect_charset_missing_file() {
        let err = detect_charset(Path::new("/nonexistent/dump.sql"), 200)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::DumpError::Io(_)));
    }
}
