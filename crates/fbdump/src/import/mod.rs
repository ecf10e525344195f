//! Dump replay against a live database.
//!
//! Lines are read in file order and fed to the [`StatementTokenizer`]. For
//! each completed statement the target table's secondary indexes are
//! deactivated (once per table) before the [`BatchExecutor`] applies it.
//! Indexes are reactivated and the last transaction committed at the end of
//! a successful run.

pub mod executor;
pub mod header;
pub mod indexes;
pub mod table_name;
pub mod tokenizer;

pub use executor::{ApplyOutcome, BatchExecutor};
pub use header::{detect_charset, parse_set_names, DEFAULT_IMPORT_CHARSET};
pub use indexes::IndexController;
pub use table_name::extract_table_name;
pub use tokenizer::{Statement, StatementKind, StatementTokenizer};

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::codec::Codecs;
use crate::config::{validate_import, ConnectionConfig, ImportOptions};
use crate::core::SqlSession;
use crate::drivers;
use crate::error::{DumpError, Result};
use crate::error_log::ErrorLog;
use crate::progress::{per_second, Progress};

/// Result of an import run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Charset the session was opened with.
    pub charset: String,

    /// Lines read from the dump.
    pub lines_read: u64,

    /// Statements executed successfully, `SET` and explicit `COMMIT`
    /// statements included.
    pub statements_executed: u64,

    /// Statements that failed and were logged.
    pub statements_failed: u64,

    /// Commits issued, including explicit `COMMIT` statements.
    pub commits: u64,

    /// Tables whose indexes were suppressed during the run.
    pub tables_indexed: usize,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Average throughput (statements/second).
    pub statements_per_second: i64,

    /// When the import started.
    pub started_at: DateTime<Utc>,

    /// When the import completed.
    pub completed_at: DateTime<Utc>,

    /// Failure log, present only when a statement failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_log: Option<PathBuf>,
}

impl ImportSummary {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Per-run mutable state.
struct ImportRun {
    executor: BatchExecutor,
    indexes: IndexController,
    error_log: ErrorLog,
    continue_on_error: bool,
    executed: u64,
    failed: u64,
}

impl ImportRun {
    async fn apply<S>(&mut self, session: &mut S, stmt: Statement) -> Result<()>
    where
        S: SqlSession + ?Sized,
    {
        if let Some(table) = extract_table_name(&stmt.text) {
            self.executor.ensure_transaction(session).await?;
            self.indexes.ensure_deactivated(session, &table).await?;
        }

        match self.executor.apply(session, &stmt).await? {
            ApplyOutcome::Applied | ApplyOutcome::SessionApplied | ApplyOutcome::Committed => {
                self.executed += 1
            }
            ApplyOutcome::Control => {}
            ApplyOutcome::Failed(message) => {
                self.failed += 1;
                if !self.continue_on_error {
                    return Err(DumpError::statement(stmt.line, stmt.text, message));
                }
                warn!("Line {}: statement failed: {}", stmt.line, message);
                self.error_log
                    .record(&format!(
                        "Line {}: {}\nError: {}",
                        stmt.line, stmt.text, message
                    ))
                    .await?;
            }
        }
        Ok(())
    }
}

/// Replays a dump on one session.
pub struct Importer {
    options: ImportOptions,
    codecs: Codecs,
}

impl Importer {
    pub fn new(options: ImportOptions) -> Self {
        Self {
            options,
            codecs: Codecs::default(),
        }
    }

    /// Read `reader` to the end, applying every statement on `session`.
    pub async fn run<R, S>(&self, mut reader: R, session: &mut S, charset: &str) -> Result<ImportSummary>
    where
        R: AsyncBufRead + Unpin + Send,
        S: SqlSession + ?Sized,
    {
        let opts = &self.options;
        let started_at = Utc::now();
        let start = Instant::now();

        let mut run = ImportRun {
            executor: BatchExecutor::new(opts.batch_size),
            indexes: IndexController::new(),
            error_log: ErrorLog::fresh(&opts.error_log).await?,
            continue_on_error: opts.continue_on_error,
            executed: 0,
            failed: 0,
        };
        let mut tokenizer = StatementTokenizer::new();
        let mut progress = Progress::new("Lines read", opts.batch_size);
        let mut buf = Vec::with_capacity(8 * 1024);

        let result: Result<()> = async {
            loop {
                buf.clear();
                if reader.read_until(b'\n', &mut buf).await? == 0 {
                    break;
                }
                let (line, had_errors) = self.codecs.decode_dump_line(&buf);
                if had_errors {
                    warn!(
                        "Line {}: invalid UTF-8 replaced with U+FFFD",
                        tokenizer.lines_read() + 1
                    );
                }
                for stmt in tokenizer.feed(&line) {
                    run.apply(session, stmt).await?;
                }
                progress.tick(tokenizer.lines_read());
            }
            if let Some(stmt) = tokenizer.finish() {
                run.apply(session, stmt).await?;
            }
            Ok::<(), DumpError>(())
        }
        .await;

        if let Err(e) = result {
            if run.indexes.tables_handled() > 0 {
                warn!(
                    "Import aborted; indexes on {} tables were left inactive",
                    run.indexes.tables_handled()
                );
            }
            return Err(e);
        }

        let tables_indexed = run.indexes.tables_handled();
        if tables_indexed > 0 {
            run.executor.ensure_transaction(session).await?;
            run.indexes.reactivate_all(session).await?;
        }
        run.executor.finish(session).await?;

        let duration_seconds = start.elapsed().as_secs_f64();
        let summary = ImportSummary {
            charset: charset.to_string(),
            lines_read: tokenizer.lines_read(),
            statements_executed: run.executed,
            statements_failed: run.failed,
            commits: run.executor.commits(),
            tables_indexed,
            duration_seconds,
            statements_per_second: per_second(run.executed, duration_seconds),
            started_at,
            completed_at: Utc::now(),
            error_log: run.error_log.written_path(),
        };

        info!(
            "Import finished: {} lines, {} statements in {:.1}s ({} statements/s)",
            summary.lines_read,
            summary.statements_executed,
            summary.duration_seconds,
            summary.statements_per_second
        );
        if let Some(path) = &summary.error_log {
            warn!(
                "{} statements failed, see {}",
                summary.statements_failed,
                path.display()
            );
        }

        Ok(summary)
    }
}

/// Replay `options.input` against a live database.
///
/// The charset is read from the dump header before connecting.
pub async fn run_import(conn: &ConnectionConfig, options: &ImportOptions) -> Result<ImportSummary> {
    validate_import(conn, options)?;

    let file = File::open(&options.input).await?;
    let charset = detect_charset(&options.input, options.header_scan_lines).await?;
    info!("Charset detected for connection: {}", charset);

    info!("Connecting to {}", conn.data_source());
    let mut session = drivers::open_session(conn, &charset).await?;

    let reader = BufReader::with_capacity(256 * 1024, file);
    Importer::new(options.clone())
        .run(reader, session.as_mut(), &charset)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    #[derive(Default)]
    struct MockSession {
        log: Vec<String>,
        fail_containing: Option<String>,
        reset_containing: Option<String>,
        indexes: Vec<String>,
    }

    #[async_trait]
    impl SqlSession for MockSession {
        async fn begin(&mut self) -> Result<()> {
            self.log.push("BEGIN".into());
            Ok(())
        }

        async fn commit(&mut self) -> Result<()> {
            self.log.push("COMMIT".into());
            Ok(())
        }

        async fn execute(&mut self, sql: &str) -> Result<()> {
            if let Some(needle) = &self.fail_containing {
                if sql.contains(needle.as_str()) {
                    return Err(DumpError::Rejected("unique key violation".into()));
                }
            }
            if let Some(needle) = &self.reset_containing {
                if sql.contains(needle.as_str()) {
                    let reset = std::io::Error::new(
                        std::io::ErrorKind::BrokenPipe,
                        "connection reset",
                    );
                    return Err(DumpError::Io(reset));
                }
            }
            self.log.push(sql.to_string());
            Ok(())
        }

        async fn execute_session(&mut self, sql: &str) -> Result<()> {
            self.log.push(format!("SESSION {}", sql));
            Ok(())
        }

        async fn query_strings(&mut self, _sql: &str) -> Result<Vec<String>> {
            Ok(self.indexes.clone())
        }
    }

    fn options(dir: &tempfile::TempDir) -> ImportOptions {
        ImportOptions {
            input: dir.path().join("dump.sql"),
            error_log: dir.path().join("import_errors.log"),
            ..ImportOptions::default()
        }
    }

    const DUMP: &str = "SET SQL DIALECT 3;\n\
                        SET NAMES UTF8;\n\
                        \n\
                        INSERT INTO T (A) VALUES (1);\n\
                        INSERT INTO T (A) VALUES (2);\n\
                        COMMIT;\n\
                        INSERT INTO T (A) VALUES ('x;\n\
                        y');\n";

    #[tokio::test]
    async fn test_replays_dump_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = MockSession {
            indexes: vec!["IDX_T_A".into()],
            ..MockSession::default()
        };

        let summary = Importer::new(options(&dir))
            .run(DUMP.as_bytes(), &mut session, "UTF8")
            .await
            .unwrap();

        assert_eq!(
            session.log,
            vec![
                "BEGIN",
                "ALTER INDEX \"IDX_T_A\" INACTIVE",
                "INSERT INTO T (A) VALUES (1)",
                "INSERT INTO T (A) VALUES (2)",
                "COMMIT",
                "BEGIN",
                "INSERT INTO T (A) VALUES ('x;\ny')",
                "ALTER INDEX \"IDX_T_A\" ACTIVE",
                "COMMIT",
            ]
        );
        assert_eq!(summary.lines_read, 8);
        assert_eq!(summary.statements_executed, 4);
        assert_eq!(summary.statements_failed, 0);
        assert_eq!(summary.commits, 2);
        assert_eq!(summary.tables_indexed, 1);
        assert_eq!(summary.error_log, None);
        assert!(!dir.path().join("import_errors.log").exists());
    }

    #[tokio::test]
    async fn test_failure_aborts_with_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = MockSession {
            fail_containing: Some("('x;".into()),
            ..MockSession::default()
        };

        let err = Importer::new(options(&dir))
            .run(DUMP.as_bytes(), &mut session, "UTF8")
            .await
            .unwrap_err();

        match err {
            DumpError::Statement { line, message, .. } => {
                assert_eq!(line, 7);
                assert_eq!(message, "unique key violation");
            }
            other => panic!("unexpected error: {other}"),
        }
        // No reactivation and no final commit after an abort.
        assert_eq!(session.log.last().map(String::as_str), Some("BEGIN"));
    }

    #[tokio::test]
    async fn test_continue_on_error_logs_and_proceeds() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(&dir);
        opts.continue_on_error = true;
        std::fs::write(&opts.error_log, "stale").unwrap();

        let mut session = MockSession {
            fail_containing: Some("VALUES (2)".into()),
            ..MockSession::default()
        };

        let summary = Importer::new(opts)
            .run(DUMP.as_bytes(), &mut session, "UTF8")
            .await
            .unwrap();

        assert_eq!(summary.statements_executed, 3);
        assert_eq!(summary.statements_failed, 1);
        let log = std::fs::read_to_string(summary.error_log.unwrap()).unwrap();
        assert!(!log.contains("stale"));
        assert_eq!(
            log,
            "Line 5: INSERT INTO T (A) VALUES (2)\nError: unique key violation\n\n"
        );
        assert!(session.log.contains(&"INSERT INTO T (A) VALUES (1)".to_string()));
        assert!(session.log.contains(&"INSERT INTO T (A) VALUES ('x;\ny')".to_string()));
    }

    #[tokio::test]
    async fn test_connection_reset_aborts_despite_continue_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(&dir);
        opts.continue_on_error = true;

        let mut session = MockSession {
            reset_containing: Some("VALUES (2)".into()),
            ..MockSession::default()
        };

        let err = Importer::new(opts.clone())
            .run(DUMP.as_bytes(), &mut session, "UTF8")
            .await
            .unwrap_err();

        assert!(matches!(err, DumpError::Io(_)));
        assert!(err.is_stream_error());
        assert!(!session.log.contains(&"INSERT INTO T (A) VALUES ('x;\ny')".to_string()));
        assert!(!opts.error_log.exists());
    }

    #[tokio::test]
    async fn test_stale_log_removed_on_clean_run() {
        let dir = tempfile::tempdir().unwrap();
        let opts = options(&dir);
        std::fs::write(&opts.error_log, "stale").unwrap();

        let summary = Importer::new(opts.clone())
            .run(DUMP.as_bytes(), &mut MockSession::default(), "UTF8")
            .await
            .unwrap();
        assert_eq!(summary.error_log, None);
        assert!(!opts.error_log.exists());
    }

    #[tokio::test]
    async fn test_batch_commits_and_residual_statement() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(&dir);
        opts.batch_size = 2;
        let input = "INSERT INTO T VALUES (1);\nINSERT INTO T VALUES (2);\nINSERT INTO T VALUES (3)";

        let mut session = MockSession::default();
        let summary = Importer::new(opts)
            .run(input.as_bytes(), &mut session, "UTF8")
            .await
            .unwrap();

        assert_eq!(summary.statements_executed, 3);
        assert_eq!(summary.commits, 2);
        assert_eq!(session.log.last().map(String::as_str), Some("COMMIT"));
    }

    #[tokio::test]
    async fn test_set_term_and_session_statements() {
        let dir = tempfile::tempdir().unwrap();
        let input = "\u{FEFF}SET TERM ^ ;\n\
                     CREATE PROCEDURE P AS BEGIN EXIT; END^\n\
                     SET TERM ; ^\n\
                     SET GENERATOR G TO 10;\n";

        let mut session = MockSession::default();
        let summary = Importer::new(options(&dir))
            .run(input.as_bytes(), &mut session, "UTF8")
            .await
            .unwrap();

        assert_eq!(
            session.log,
            vec![
                "BEGIN",
                "CREATE PROCEDURE P AS BEGIN EXIT; END",
                "SESSION SET GENERATOR G TO 10",
                "COMMIT",
            ]
        );
        assert_eq!(summary.statements_executed, 2);
    }

    #[tokio::test]
    async fn test_summary_json() {
        let dir = tempfile::tempdir().unwrap();
        let summary = Importer::new(options(&dir))
            .run("".as_bytes(), &mut MockSession::default(), "WIN1252")
            .await
            .unwrap();
        assert_eq!(summary.lines_read, 0);
        assert_eq!(summary.commits, 0);
        let json = summary.to_json().unwrap();
        assert!(json.contains("\"charset\": \"WIN1252\""));
    }
}
