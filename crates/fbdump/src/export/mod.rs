//! Table export to a replayable SQL dump.
//!
//! One pass over the source cursor: header, one INSERT per row, a `COMMIT;`
//! every `commit_every` rows and a closing `COMMIT;`.

pub mod insert;
pub mod serializer;
pub mod sink;

pub use insert::InsertBuilder;
pub use serializer::ValueSerializer;
pub use sink::{DumpSink, FileSink};

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::codec::Codecs;
use crate::config::{validate_export, ConnectionConfig, ExportOptions};
use crate::core::RowSource;
use crate::drivers::{self, FirebirdDialect};
use crate::error::Result;
use crate::error_log::ErrorLog;
use crate::progress::{per_second, Progress};

/// Result of an export run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSummary {
    /// Source table.
    pub table: String,

    /// Table name written into the dump.
    pub target_table: String,

    /// Charset declared in the dump header.
    pub charset: String,

    /// Rows fetched from the cursor.
    pub rows_read: u64,

    /// INSERT statements written.
    pub rows_written: u64,

    /// Rows logged and skipped under continue-on-error.
    pub rows_skipped: u64,

    /// Text values written from the legacy code page after failing to
    /// decode under the connection charset.
    pub values_recovered: u64,

    /// `COMMIT;` lines written.
    pub commits_written: u64,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Average throughput (rows/second).
    pub rows_per_second: i64,

    /// When the export started.
    pub started_at: DateTime<Utc>,

    /// When the export completed.
    pub completed_at: DateTime<Utc>,

    /// Failure log, present only when a row was skipped or a value
    /// recovered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_log: Option<PathBuf>,
}

impl ExportSummary {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Writes one table's rows as a dump.
pub struct Exporter {
    options: ExportOptions,
    charset: String,
    sql_dialect: u8,
    codecs: Codecs,
    dialect: FirebirdDialect,
}

impl Exporter {
    /// Create an exporter. `charset` is the connection charset written into
    /// the `SET NAMES` header line.
    pub fn new(options: ExportOptions, charset: impl Into<String>, sql_dialect: u8) -> Self {
        let charset = charset.into();
        let codecs = Codecs::for_charset(&charset);
        Self {
            options,
            charset,
            sql_dialect,
            codecs,
            dialect: FirebirdDialect::new(),
        }
    }

    /// Drain `source` into `sink`.
    pub async fn run<R, W>(&self, source: &mut R, sink: &mut W) -> Result<ExportSummary>
    where
        R: RowSource + ?Sized,
        W: DumpSink + ?Sized,
    {
        let opts = &self.options;
        let started_at = Utc::now();
        let start = Instant::now();

        info!(
            "Exporting {} as {} ({} columns)",
            opts.table,
            opts.target_table(),
            source.columns().len()
        );

        for line in self.dialect.header_lines(self.sql_dialect, &self.charset) {
            sink.write_line(&line).await?;
        }

        let serializer = ValueSerializer::new(self.codecs, opts.format);
        let builder = InsertBuilder::new(opts.target_table(), source.columns(), serializer);
        let mut error_log = ErrorLog::fresh(&opts.error_log).await?;
        let mut progress = Progress::new("Rows exported", opts.progress_every);

        let mut rows_read = 0u64;
        let mut rows_written = 0u64;
        let mut rows_skipped = 0u64;
        let mut values_recovered = 0u64;
        let mut commits_written = 0u64;
        let mut since_commit = 0u64;
        let mut recovered = Vec::new();

        loop {
            let fetched = match source.next_row().await {
                Ok(Some(row)) => Ok(row),
                Ok(None) => break,
                Err(e) => Err(e),
            };
            rows_read += 1;

            match fetched {
                Ok(row) => {
                    let sql = builder.build(&row, &mut recovered)?;
                    for err in recovered.drain(..) {
                        warn!("Row {}: {}", rows_read, err);
                        error_log
                            .record(&format!("Row {}: {}", rows_read, err))
                            .await?;
                        values_recovered += 1;
                    }
                    sink.write_line(&sql).await?;
                    rows_written += 1;
                    since_commit += 1;
                }
                Err(e) if opts.continue_on_error && e.is_row_error() => {
                    warn!("Row {} skipped: {}", rows_read, e);
                    error_log
                        .record(&format!("Row {}: {}", rows_read, e))
                        .await?;
                    rows_skipped += 1;
                }
                Err(e) => return Err(e),
            }

            if opts.commit_every > 0 && rows_read % opts.commit_every == 0 && since_commit > 0 {
                sink.write_line("COMMIT;").await?;
                commits_written += 1;
                since_commit = 0;
            }

            progress.tick(rows_read);
        }

        if opts.commit_every > 0 && since_commit > 0 {
            sink.write_line("COMMIT;").await?;
            commits_written += 1;
        }
        sink.finish().await?;

        let duration_seconds = start.elapsed().as_secs_f64();
        let summary = ExportSummary {
            table: opts.table.clone(),
            target_table: opts.target_table().to_string(),
            charset: self.charset.clone(),
            rows_read,
            rows_written,
            rows_skipped,
            values_recovered,
            commits_written,
            duration_seconds,
            rows_per_second: per_second(rows_written, duration_seconds),
            started_at,
            completed_at: Utc::now(),
            error_log: error_log.written_path(),
        };

        info!(
            "Export finished: {} rows written, {} skipped in {:.1}s ({} rows/s)",
            summary.rows_written,
            summary.rows_skipped,
            summary.duration_seconds,
            summary.rows_per_second
        );
        if let Some(path) = &summary.error_log {
            warn!("Row problems were logged to {}", path.display());
        }

        Ok(summary)
    }
}

/// Export a table from a live database into `options.output`.
///
/// Configuration is validated before anything is opened, and the output
/// file is only created once the cursor is open.
pub async fn run_export(conn: &ConnectionConfig, options: &ExportOptions) -> Result<ExportSummary> {
    validate_export(conn, options)?;

    let charset = conn.export_charset(options.format.force_legacy_text);
    let query = FirebirdDialect::new()
        .build_select_query(&options.table, options.where_clause.as_deref());

    info!("Connecting to {} (charset {})", conn.data_source(), charset);
    let mut source = drivers::open_row_source(conn, &charset, &query).await?;
    let mut sink = FileSink::create(&options.output).await?;

    let exporter = Exporter::new(options.clone(), charset, conn.dialect);
    let summary = exporter.run(source.as_mut(), &mut sink).await?;
    info!("Dump written to {}", sink.path().display());
    Ok(summary)
}
