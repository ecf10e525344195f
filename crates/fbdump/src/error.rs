//! Error types for dump export and import.

use thiserror::Error;

/// Exit code for configuration errors (missing table, bad YAML, ...).
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Exit code for connection or catalogue failures.
pub const EXIT_DATABASE_ERROR: u8 = 3;
/// Exit code for a dump statement that failed to execute.
pub const EXIT_STATEMENT_ERROR: u8 = 4;
/// Exit code for a source value that cannot be written exactly.
pub const EXIT_DATA_ERROR: u8 = 5;
/// Exit code for summary serialization failures.
pub const EXIT_JSON_ERROR: u8 = 6;
/// Exit code for file and stream I/O failures.
pub const EXIT_IO_ERROR: u8 = 7;

/// Main error type for dump operations.
#[derive(Error, Debug)]
pub enum DumpError {
    /// Configuration error (missing database path, missing table, bad YAML values).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Byte payload is malformed under the encoding it was read with.
    #[error("Encoding error in column {column}: {message}")]
    Encoding { column: String, message: String },

    /// A source value that cannot be carried into the dump intact, such as
    /// a cell cut short by the driver. Confined to one row.
    #[error("Value error in column {column}: {message}")]
    Value { column: String, message: String },

    /// A dump statement failed to execute.
    #[error("Statement starting at line {line} failed: {message}\n  SQL: {sql}")]
    Statement {
        line: u64,
        sql: String,
        message: String,
    },

    /// The database refused one statement (constraint, syntax, conversion).
    /// The connection and the open transaction stay usable.
    #[error("{0}")]
    Rejected(String),

    /// Connection, transaction or catalogue query failure.
    #[error("Database error: {0}")]
    Database(String),

    /// IO error (dump file, error log, stream reads)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DumpError {
    /// Create an Encoding error for a named column.
    pub fn encoding(column: impl Into<String>, message: impl Into<String>) -> Self {
        DumpError::Encoding {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a Value error for a named column.
    pub fn value(column: impl Into<String>, message: impl Into<String>) -> Self {
        DumpError::Value {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a Statement error anchored at the line where the statement began.
    pub fn statement(line: u64, sql: impl Into<String>, message: impl Into<String>) -> Self {
        DumpError::Statement {
            line,
            sql: sql.into(),
            message: message.into(),
        }
    }

    /// Create a Database error from any displayable driver error.
    pub fn database(err: impl std::fmt::Display) -> Self {
        DumpError::Database(err.to_string())
    }

    /// Whether the error belongs to the stream class that is never subject
    /// to continue-on-error.
    pub fn is_stream_error(&self) -> bool {
        matches!(self, DumpError::Io(_) | DumpError::Database(_))
    }

    /// Whether the error is confined to a single exported row, so the run
    /// may log it and move on under continue-on-error.
    pub fn is_row_error(&self) -> bool {
        matches!(self, DumpError::Encoding { .. } | DumpError::Value { .. })
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            DumpError::Config(_) | DumpError::Yaml(_) => EXIT_CONFIG_ERROR,
            DumpError::Database(_) => EXIT_DATABASE_ERROR,
            DumpError::Statement { .. } | DumpError::Rejected(_) => EXIT_STATEMENT_ERROR,
            DumpError::Encoding { .. } | DumpError::Value { .. } => EXIT_DATA_ERROR,
            DumpError::Json(_) => EXIT_JSON_ERROR,
            DumpError::Io(_) => EXIT_IO_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for dump operations.
pub type Result<T> = std::result::Result<T, DumpError>;
