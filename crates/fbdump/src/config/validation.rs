//! Configuration validation. Runs before any file or database I/O.

use super::{ConnectionConfig, ExportOptions, ImportOptions};
use crate::error::{DumpError, Result};

/// Validate connection settings.
pub fn validate_connection(conn: &ConnectionConfig) -> Result<()> {
    if conn.database.trim().is_empty() {
        return Err(DumpError::Config(
            "database path is required (--database)".into(),
        ));
    }
    if conn.host.trim().is_empty() {
        return Err(DumpError::Config("host is required (--host)".into()));
    }
    if conn.port == 0 {
        return Err(DumpError::Config("port must be between 1 and 65535".into()));
    }
    Ok(())
}

/// Validate an export run.
pub fn validate_export(conn: &ConnectionConfig, opts: &ExportOptions) -> Result<()> {
    validate_connection(conn)?;
    if opts.table.trim().is_empty() {
        return Err(DumpError::Config("table is required (--table)".into()));
    }
    if opts.output.as_os_str().is_empty() {
        return Err(DumpError::Config("output file is required (--output)".into()));
    }
    Ok(())
}

/// Validate an import run.
pub fn validate_import(conn: &ConnectionConfig, opts: &ImportOptions) -> Result<()> {
    validate_connection(conn)?;
    if opts.input.as_os_str().is_empty() {
        return Err(DumpError::Config("input SQL file is required (--input)".into()));
    }
    if opts.header_scan_lines == 0 {
        return Err(DumpError::Config(
            "import.header_scan_lines must be at least 1".into(),
        ));
    }
    Ok(())
}
