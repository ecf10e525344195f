//! Configuration type definitions.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DumpError;

/// Root configuration structure, loadable from a YAML profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Database connection settings.
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Export defaults.
    #[serde(default)]
    pub export: ExportOptions,

    /// Import defaults.
    #[serde(default)]
    pub import: ImportOptions,
}

/// Firebird connection settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Server host (default: "localhost").
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port (default: 3050).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database path or alias on the server.
    #[serde(default)]
    pub database: String,

    /// Username (default: "SYSDBA").
    #[serde(default = "default_user")]
    pub user: String,

    /// Password (default: "masterkey").
    #[serde(default = "default_password")]
    pub password: String,

    /// Connection charset. Import overrides this with the dump's `SET NAMES`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,

    /// SQL dialect (default: 3).
    #[serde(default = "default_dialect")]
    pub dialect: u8,

    /// ODBC driver name used by the `odbc` backend.
    #[serde(default = "default_odbc_driver")]
    pub odbc_driver: String,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("charset", &self.charset)
            .field("dialect", &self.dialect)
            .field("odbc_driver", &self.odbc_driver)
            .finish()
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database: String::new(),
            user: default_user(),
            password: default_password(),
            charset: None,
            dialect: default_dialect(),
            odbc_driver: default_odbc_driver(),
        }
    }
}

/// Binary column encoding in generated literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobFormat {
    /// `x'DEADBEEF'`
    #[default]
    Hex,

    /// `'3q2+7w=='` (indistinguishable from text on re-import)
    Base64,
}

impl FromStr for BlobFormat {
    type Err = DumpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hex" => Ok(BlobFormat::Hex),
            "base64" => Ok(BlobFormat::Base64),
            other => Err(DumpError::Config(format!(
                "unknown blob format '{}', expected hex or base64",
                other
            ))),
        }
    }
}

/// Literal formatting switches for the value serializer.
///
/// Applied in a fixed order: legacy decode, sanitize, escape newlines,
/// quote escape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FormatOptions {
    /// Binary literal encoding.
    #[serde(default)]
    pub blob_format: BlobFormat,

    /// Decode every text payload under the legacy code page.
    #[serde(default)]
    pub force_legacy_text: bool,

    /// Strip C0 control characters (except tab/CR/LF) and map NBSP to space.
    #[serde(default)]
    pub sanitize_text: bool,

    /// Write CR and LF as the two-character sequences `\r` and `\n`.
    #[serde(default)]
    pub escape_newlines: bool,
}

/// Export run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Source table.
    #[serde(default)]
    pub table: String,

    /// Table name written into the INSERT statements (default: `table`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Output file (default: "dump.sql").
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// `WHERE` filter appended verbatim to the export query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,

    /// Literal formatting switches.
    #[serde(flatten)]
    pub format: FormatOptions,

    /// Insert `COMMIT;` every N rows; 0 disables (default: 50000).
    #[serde(default = "default_commit_every")]
    pub commit_every: u64,

    /// Log progress every N rows; 0 disables (default: 1000).
    #[serde(default = "default_progress_every")]
    pub progress_every: u64,

    /// Log and skip rows whose values cannot be read from the source.
    #[serde(default)]
    pub continue_on_error: bool,

    /// Per-row failure log (default: "export_errors.log").
    #[serde(default = "default_export_error_log")]
    pub error_log: PathBuf,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            table: String::new(),
            alias: None,
            output: default_output(),
            where_clause: None,
            format: FormatOptions::default(),
            commit_every: default_commit_every(),
            progress_every: default_progress_every(),
            continue_on_error: false,
            error_log: default_export_error_log(),
        }
    }
}

impl ExportOptions {
    /// Table name written into the dump.
    pub fn target_table(&self) -> &str {
        match self.alias.as_deref().map(str::trim) {
            Some(alias) if !alias.is_empty() => alias,
            _ => &self.table,
        }
    }
}

/// Import run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOptions {
    /// Dump file to replay.
    #[serde(default)]
    pub input: PathBuf,

    /// Statements per auto-commit and lines per progress report; 0 disables
    /// both (default: 1000).
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,

    /// Log failing statements and keep going.
    #[serde(default)]
    pub continue_on_error: bool,

    /// Failed-statement log, created only when a statement fails
    /// (default: "import_errors.log").
    #[serde(default = "default_import_error_log")]
    pub error_log: PathBuf,

    /// Lines scanned for `SET NAMES` before connecting (default: 200).
    #[serde(default = "default_header_scan_lines")]
    pub header_scan_lines: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            batch_size: default_batch_size(),
            continue_on_error: false,
            error_log: default_import_error_log(),
            header_scan_lines: default_header_scan_lines(),
        }
    }
}

// Default value functions for serde
fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3050
}

fn default_user() -> String {
    "SYSDBA".to_string()
}

fn default_password() -> String {
    "masterkey".to_string()
}

fn default_dialect() -> u8 {
    3
}

fn default_odbc_driver() -> String {
    "Firebird/InterBase(r) driver".to_string()
}

fn default_output() -> PathBuf {
    PathBuf::from("dump.sql")
}

fn default_commit_every() -> u64 {
    50_000
}

fn default_progress_every() -> u64 {
    1_000
}

fn default_export_error_log() -> PathBuf {
    PathBuf::from("export_errors.log")
}

fn default_batch_size() -> u64 {
    1_000
}

fn default_import_error_log() -> PathBuf {
    PathBuf::from("import_errors.log")
}

fn default_header_scan_lines() -> usize {
    200
}
