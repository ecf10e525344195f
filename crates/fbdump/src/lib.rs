//! # fbdump
//!
//! Firebird table export to replayable SQL dumps, and bulk replay of such
//! dumps.
//!
//! - **Export** writes `SET SQL DIALECT`/`SET NAMES` headers, one `INSERT`
//!   per row with exact literals and periodic `COMMIT;` lines
//! - **Import** splits the dump into statements (`SET TERM` aware), disables
//!   secondary indexes per table, commits in batches and optionally logs
//!   failing statements instead of aborting
//!
//! ## Example
//!
//! ```rust,no_run
//! use fbdump::{run_export, Config};
//!
//! #[tokio::main]
//! async fn main() -> fbdump::Result<()> {
//!     let config = Config::load("fbdump.yaml")?;
//!     let summary = run_export(&config.connection, &config.export).await?;
//!     println!("Exported {} rows", summary.rows_written);
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod error_log;
pub mod export;
pub mod import;
pub mod progress;

// Re-exports for convenient access
pub use crate::core::{
    ColumnDescriptor, Row, RowSource, SourceEncoding, SqlSession, TypeCategory, TypedValue,
};
pub use codec::Codecs;
pub use config::{
    BlobFormat, Config, ConnectionConfig, ExportOptions, FormatOptions, ImportOptions,
};
pub use drivers::FirebirdDialect;
pub use error::{DumpError, Result};
pub use export::{run_export, DumpSink, ExportSummary, Exporter, FileSink, ValueSerializer};
pub use import::{
    run_import, ImportSummary, Importer, Statement, StatementKind, StatementTokenizer,
};
