//! Firebird backend.
//!
//! - [`dialect`]: SQL text for queries, the dump header and index control
//! - `odbc`: live connections through the Firebird ODBC driver (feature `odbc`)

pub mod dialect;
#[cfg(feature = "odbc")]
pub mod odbc;

pub use dialect::FirebirdDialect;
#[cfg(feature = "odbc")]
pub use odbc::{open_row_source, OdbcRowSource, OdbcSession};
