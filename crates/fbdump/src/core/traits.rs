//! Database seams used by the export and import drivers.
//!
//! - [`RowSource`]: a forward-only cursor over the exported table
//! - [`SqlSession`]: the single connection an import run owns
//!
//! Both are implemented by the ODBC backend (feature `odbc`) and by the
//! in-memory doubles in the test suites.

use async_trait::async_trait;

use crate::error::Result;

use super::schema::ColumnDescriptor;
use super::value::Row;

/// Forward-only cursor over a result set.
#[async_trait]
pub trait RowSource: Send {
    /// Column metadata, fixed for the cursor's lifetime.
    fn columns(&self) -> &[ColumnDescriptor];

    /// Advance the cursor. Returns `None` when the result set is exhausted.
    async fn next_row(&mut self) -> Result<Option<Row>>;
}

/// One database connection with at most one open transaction.
///
/// Errors returned from these methods are driver errors; callers decide
/// whether a failure is a recoverable statement error or a fatal stream error.
#[async_trait]
pub trait SqlSession: Send {
    /// Start a transaction. Called only when none is open.
    async fn begin(&mut self) -> Result<()>;

    /// Commit the open transaction.
    async fn commit(&mut self) -> Result<()>;

    /// Execute a statement inside the open transaction.
    ///
    /// Statement execution has no timeout.
    async fn execute(&mut self, sql: &str) -> Result<()>;

    /// Execute a session-level statement (`SET ...`) outside any transaction.
    async fn execute_session(&mut self, sql: &str) -> Result<()>;

    /// Run a query returning one text column and collect its values.
    async fn query_strings(&mut self, sql: &str) -> Result<Vec<String>>;
}
