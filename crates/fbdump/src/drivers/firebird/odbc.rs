//! Firebird access through the Firebird ODBC driver.
//!
//! **Requirements:**
//! - The `odbc` feature must be enabled
//! - The Firebird ODBC driver must be installed and registered under the
//!   name in `connection.odbc_driver`
//!
//! Values are fetched through text row sets. The driver renders binary
//! columns as hex text, which is decoded back into bytes here. A cell longer
//! than its buffer is reported as a value error for that row.
//!
//! Statement text is sent in the connection charset. Diagnostics with
//! SQLSTATE class `08` are connection failures; any other diagnostic is a
//! refused statement.
//!
//! With autocommit off every statement runs in the driver's implicit
//! transaction, so session-level `SET` statements are not isolated from it.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use odbc_api::{
    buffers::{Indicator, TextRowSet},
    handles::{AsStatementRef, Record, Statement},
    sys::SqlReturn,
    BlockCursor, Connection, ConnectionOptions, Cursor, DataType, Environment,
    ResultSetMetadata,
};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::codec::Codecs;
use crate::config::ConnectionConfig;
use crate::core::{
    ColumnDescriptor, Row, RowSource, SourceEncoding, SqlSession, TypeCategory, TypedValue,
};
use crate::error::{DumpError, Result};

use super::FirebirdDialect;

/// Rows fetched per round trip.
const FETCH_BATCH_ROWS: usize = 500;

/// Upper bound for one text cell, in bytes.
const MAX_CELL_BYTES: usize = 65536;

/// Connections live for the whole process; the environment is leaked so
/// they can borrow it for `'static`.
fn environment() -> Result<&'static Environment> {
    let env = Environment::new().map_err(|e| {
        DumpError::Database(format!(
            "Failed to create ODBC environment: {}. \
             Make sure the Firebird ODBC driver is installed.",
            e
        ))
    })?;
    Ok(Box::leak(Box::new(env)))
}

fn connect(conn: &ConnectionConfig, charset: &str) -> Result<Connection<'static>> {
    let env = environment()?;
    let connection_string = FirebirdDialect::new().odbc_connection_string(conn, charset);

    debug!(
        "ODBC connection string (credentials hidden): DRIVER={{{}}};DBNAME={};CHARSET={};...",
        conn.odbc_driver,
        conn.data_source(),
        charset
    );

    let connection = env
        .connect_with_connection_string(&connection_string, ConnectionOptions::default())
        .map_err(|e| {
            DumpError::Database(format!(
                "Failed to connect to {} via ODBC: {}. Check the database path, user and password.",
                conn.data_source(),
                e
            ))
        })?;

    info!("Connected to Firebird via ODBC: {}", conn.data_source());
    Ok(connection)
}

/// Import session over one ODBC connection with autocommit off.
pub struct OdbcSession {
    conn: Connection<'static>,
    codecs: Codecs,
}

// SAFETY: the session owns its connection handle exclusively and is only
// used from one task at a time; ODBC connection handles may move between
// threads when not used concurrently.
unsafe impl Send for OdbcSession {}

impl OdbcSession {
    /// Connect with the given session charset.
    pub fn connect(conn: &ConnectionConfig, charset: &str) -> Result<Self> {
        let connection = connect(conn, charset)?;
        connection
            .set_autocommit(false)
            .map_err(|e| DumpError::Database(format!("Failed to disable autocommit: {}", e)))?;
        Ok(Self {
            conn: connection,
            codecs: Codecs::for_charset(charset),
        })
    }

    /// Run one statement with its text in the connection charset.
    fn run_statement(&mut self, sql: &str) -> Result<()> {
        match self.codecs.encode_statement(sql)? {
            Cow::Borrowed(_) => {
                self.conn.execute(sql, ()).map_err(classify_error)?;
                Ok(())
            }
            Cow::Owned(text) => exec_direct(&self.conn, &text),
        }
    }
}

/// Execute statement text that is not valid UTF-8 through `SQLExecDirect`.
fn exec_direct(conn: &Connection<'static>, text: &[u8]) -> Result<()> {
    let length = i32::try_from(text.len())
        .map_err(|_| DumpError::Rejected("statement text is too long".to_string()))?;
    let mut prepared = conn.preallocate().map_err(classify_error)?;
    let stmt = prepared.as_stmt_ref();

    // SAFETY: the statement handle is allocated and owned by `prepared`, and
    // `text` outlives the call. The driver does not keep the pointer.
    let ret = unsafe { odbc_api::sys::SQLExecDirect(stmt.as_sys(), text.as_ptr(), length) };

    match ret {
        SqlReturn::SUCCESS | SqlReturn::SUCCESS_WITH_INFO | SqlReturn::NO_DATA => Ok(()),
        _ => {
            let mut record = Record::with_capacity(512);
            if record.fill_from(&stmt, 1) {
                Err(classify_state(record.state.as_str(), record.to_string()))
            } else {
                Err(DumpError::Rejected(
                    "statement failed without a diagnostic record".to_string(),
                ))
            }
        }
    }
}

fn classify_error(e: odbc_api::Error) -> DumpError {
    match &e {
        odbc_api::Error::Diagnostics { record, .. } => {
            classify_state(record.state.as_str(), e.to_string())
        }
        _ => DumpError::database(e),
    }
}

/// SQLSTATE class `08` means the connection is gone.
fn classify_state(state: &str, message: String) -> DumpError {
    if state.starts_with("08") {
        DumpError::Database(message)
    } else {
        DumpError::Rejected(message)
    }
}

#[async_trait]
impl SqlSession for OdbcSession {
    async fn begin(&mut self) -> Result<()> {
        // Autocommit is off: the driver opens a transaction on first use.
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.conn
            .commit()
            .map_err(|e| DumpError::Database(format!("Commit failed: {}", e)))
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        self.run_statement(sql)
    }

    async fn execute_session(&mut self, sql: &str) -> Result<()> {
        self.run_statement(sql)
    }

    async fn query_strings(&mut self, sql: &str) -> Result<Vec<String>> {
        let mut values = Vec::new();

        if let Some(mut cursor) = self.conn.execute(sql, ()).map_err(|e| {
            DumpError::Database(format!("ODBC query failed: {} - SQL: {}", e, sql))
        })? {
            let mut buffers = TextRowSet::for_cursor(256, &mut cursor, Some(1024))
                .map_err(|e| DumpError::Database(format!("Failed to create row buffer: {}", e)))?;
            let mut row_cursor = cursor
                .bind_buffer(&mut buffers)
                .map_err(|e| DumpError::Database(format!("Failed to bind buffer: {}", e)))?;

            while let Some(batch) = row_cursor
                .fetch()
                .map_err(|e| DumpError::Database(format!("Failed to fetch rows: {}", e)))?
            {
                for row_idx in 0..batch.num_rows() {
                    if let Some(bytes) = batch.at(0, row_idx) {
                        values.push(String::from_utf8_lossy(bytes).trim().to_string());
                    }
                }
            }
        }

        Ok(values)
    }
}

/// Export cursor over an ODBC result set.
pub struct OdbcRowSource<C: Cursor> {
    cursor: BlockCursor<C, TextRowSet>,
    columns: Vec<ColumnDescriptor>,
    pending: VecDeque<Result<Row>>,
    exhausted: bool,
}

// SAFETY: the cursor owns its statement and connection handles exclusively
// and the row source is only driven from one task at a time.
unsafe impl<C: Cursor> Send for OdbcRowSource<C> {}

/// Connect, run `query` and return a cursor over its rows.
pub fn open_row_source(
    conn: &ConnectionConfig,
    charset: &str,
    query: &str,
) -> Result<Box<dyn RowSource>> {
    let connection = connect(conn, charset)?;

    let mut cursor = connection
        .into_cursor(query, ())
        .map_err(|e| DumpError::Database(format!("ODBC query failed: {} - SQL: {}", e, query)))?
        .ok_or_else(|| DumpError::Database(format!("Query returned no result set: {}", query)))?;

    let columns = describe_columns(&mut cursor)?;
    let buffers = TextRowSet::for_cursor(FETCH_BATCH_ROWS, &mut cursor, Some(MAX_CELL_BYTES))
        .map_err(|e| DumpError::Database(format!("Failed to create row buffer: {}", e)))?;
    let cursor = cursor
        .bind_buffer(buffers)
        .map_err(|e| DumpError::Database(format!("Failed to bind buffer: {}", e)))?;

    Ok(Box::new(OdbcRowSource {
        cursor,
        columns,
        pending: VecDeque::with_capacity(FETCH_BATCH_ROWS),
        exhausted: false,
    }))
}

impl<C: Cursor> OdbcRowSource<C> {
    fn fill(&mut self) -> Result<()> {
        let batch = self
            .cursor
            .fetch()
            .map_err(|e| DumpError::Database(format!("Failed to fetch rows: {}", e)))?;

        let Some(batch) = batch else {
            self.exhausted = true;
            return Ok(());
        };

        for row_idx in 0..batch.num_rows() {
            let row = self
                .columns
                .iter()
                .map(|col| {
                    let max_len = batch.max_len(col.position);
                    if is_truncated(batch.indicator_at(col.position, row_idx), max_len) {
                        return Err(DumpError::value(
                            &col.name,
                            format!("value longer than {} bytes was truncated by the driver", max_len),
                        ));
                    }
                    Ok(convert_cell(batch.at(col.position, row_idx), col))
                })
                .collect();
            self.pending.push_back(row);
        }
        Ok(())
    }
}

#[async_trait]
impl<C: Cursor + 'static> RowSource for OdbcRowSource<C> {
    fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    async fn next_row(&mut self) -> Result<Option<Row>> {
        while self.pending.is_empty() && !self.exhausted {
            self.fill()?;
        }
        self.pending.pop_front().transpose()
    }
}

fn describe_columns(cursor: &mut impl ResultSetMetadata) -> Result<Vec<ColumnDescriptor>> {
    let num_cols = cursor
        .num_result_cols()
        .map_err(|e| DumpError::Database(format!("Failed to get column count: {}", e)))?;

    (1..=num_cols as u16)
        .map(|i| {
            let name = cursor
                .col_name(i)
                .map_err(|e| DumpError::Database(format!("Failed to get column name: {}", e)))?;
            let data_type = cursor
                .col_data_type(i)
                .map_err(|e| DumpError::Database(format!("Failed to get column type: {}", e)))?;
            let (type_name, surfaced_as_text) = type_name_for(data_type);
            Ok(ColumnDescriptor::new(
                name,
                type_name,
                usize::from(i - 1),
                surfaced_as_text,
            ))
        })
        .collect()
}

/// Whether the driver cut a cell down to its `max_len` byte buffer.
fn is_truncated(indicator: Indicator, max_len: usize) -> bool {
    match indicator {
        Indicator::Null => false,
        Indicator::NoTotal => true,
        Indicator::Length(len) => len > max_len,
    }
}

/// Catalogue-style type name for an ODBC data type.
fn type_name_for(data_type: DataType) -> (&'static str, bool) {
    match data_type {
        DataType::SmallInt => ("SMALLINT", false),
        DataType::Integer => ("INTEGER", false),
        DataType::BigInt => ("BIGINT", false),
        DataType::Numeric { .. } => ("NUMERIC", false),
        DataType::Decimal { .. } => ("DECIMAL", false),
        DataType::Date => ("DATE", false),
        DataType::Timestamp { .. } => ("TIMESTAMP", false),
        DataType::LongVarchar { .. } => ("BLOB", true),
        DataType::LongVarbinary { .. } | DataType::Varbinary { .. } | DataType::Binary { .. } => {
            ("BLOB", false)
        }
        DataType::Char { .. } => ("CHAR", false),
        _ => ("VARCHAR", false),
    }
}

/// Convert one text cell into a typed value for its column.
///
/// Cells that do not parse under their column's category are kept as text.
fn convert_cell(cell: Option<&[u8]>, column: &ColumnDescriptor) -> TypedValue {
    let Some(bytes) = cell else {
        return TypedValue::Null;
    };
    let native_text = || TypedValue::text_bytes(bytes.to_vec(), SourceEncoding::Native);
    let Ok(text) = std::str::from_utf8(bytes) else {
        return match column.category {
            TypeCategory::Blob => TypedValue::Binary(bytes.to_vec()),
            _ => native_text(),
        };
    };
    let text = text.trim();

    match column.category {
        TypeCategory::Integer => text
            .parse::<i64>()
            .map(TypedValue::Integer)
            .unwrap_or_else(|_| native_text()),
        TypeCategory::Decimal => Decimal::from_str(text)
            .map(TypedValue::Decimal)
            .unwrap_or_else(|_| native_text()),
        TypeCategory::Date => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map(TypedValue::Date)
            .unwrap_or_else(|_| native_text()),
        TypeCategory::Timestamp => NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
            .map(TypedValue::Timestamp)
            .unwrap_or_else(|_| native_text()),
        TypeCategory::Blob => hex::decode(text)
            .map(TypedValue::Binary)
            .unwrap_or_else(|_| TypedValue::Binary(bytes.to_vec())),
        TypeCategory::Text => native_text(),
    }
}
