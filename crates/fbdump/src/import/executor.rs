//! Transactional statement execution with periodic commits.

use tracing::debug;

use crate::core::SqlSession;
use crate::error::{DumpError, Result};

use super::tokenizer::{Statement, StatementKind};

/// What happened to one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Executed inside the open transaction.
    Applied,
    /// Session-level `SET` executed outside any transaction.
    SessionApplied,
    /// Explicit `COMMIT` statement: the transaction was committed and a new
    /// one opened.
    Committed,
    /// Blank text, consumed without reaching the database.
    Control,
    /// The database rejected the statement. The transaction stays open.
    Failed(String),
}

/// Applies statements on one session, committing every `batch_size`
/// successful statements.
///
/// Only a statement the database rejected ([`DumpError::Rejected`]) is
/// reported as [`ApplyOutcome::Failed`] so the caller decides whether to
/// continue. Begin/commit failures and stream errors are returned as errors.
#[derive(Debug)]
pub struct BatchExecutor {
    batch_size: u64,
    since_commit: u64,
    in_transaction: bool,
    commits: u64,
}

impl BatchExecutor {
    /// `batch_size == 0` disables mid-stream commits.
    pub fn new(batch_size: u64) -> Self {
        Self {
            batch_size,
            since_commit: 0,
            in_transaction: false,
            commits: 0,
        }
    }

    /// Commits issued so far, including explicit `COMMIT` statements.
    pub fn commits(&self) -> u64 {
        self.commits
    }

    /// Statements applied since the last commit.
    pub fn pending(&self) -> u64 {
        self.since_commit
    }

    /// Whether a transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Open a transaction unless one is already open.
    pub async fn ensure_transaction<S>(&mut self, session: &mut S) -> Result<()>
    where
        S: SqlSession + ?Sized,
    {
        if !self.in_transaction {
            session.begin().await?;
            self.in_transaction = true;
        }
        Ok(())
    }

    async fn commit_and_restart<S>(&mut self, session: &mut S) -> Result<()>
    where
        S: SqlSession + ?Sized,
    {
        if self.in_transaction {
            session.commit().await?;
            self.in_transaction = false;
            self.commits += 1;
            debug!("Committed after {} statements", self.since_commit);
        }
        self.since_commit = 0;
        self.ensure_transaction(session).await
    }

    /// Apply one statement.
    pub async fn apply<S>(&mut self, session: &mut S, stmt: &Statement) -> Result<ApplyOutcome>
    where
        S: SqlSession + ?Sized,
    {
        let sql = stmt.text.trim();
        if sql.is_empty() || sql.starts_with("--") || sql.starts_with("/*") {
            return Ok(ApplyOutcome::Control);
        }

        match stmt.kind {
            StatementKind::Commit => {
                self.commit_and_restart(session).await?;
                Ok(ApplyOutcome::Committed)
            }
            StatementKind::Set => match session.execute_session(sql).await {
                Ok(()) => Ok(ApplyOutcome::SessionApplied),
                Err(DumpError::Rejected(message)) => Ok(ApplyOutcome::Failed(message)),
                Err(e) => Err(e),
            },
            _ => {
                self.ensure_transaction(session).await?;
                match session.execute(sql).await {
                    Ok(()) => {
                        self.since_commit += 1;
                        if self.batch_size > 0 && self.since_commit >= self.batch_size {
                            self.commit_and_restart(session).await?;
                        }
                        Ok(ApplyOutcome::Applied)
                    }
                    Err(DumpError::Rejected(message)) => Ok(ApplyOutcome::Failed(message)),
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// End-of-run commit.
    pub async fn finish<S>(&mut self, session: &mut S) -> Result<()>
    where
        S: SqlSession + ?Sized,
    {
        if self.in_transaction {
            session.commit().await?;
            self.in_transaction = false;
            self.commits += 1;
        }
        self.since_commit = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Begin,
        Commit,
        Exec(String),
        Session(String),
    }

    #[derive(Default)]
    struct MockSession {
        calls: Vec<Call>,
        fail_on: Option<String>,
        disconnect_on: Option<String>,
    }

    impl MockSession {
        fn commits(&self) -> usize {
            self.calls.iter().filter(|c| **c == Call::Commit).count()
        }
    }

    #[async_trait]
    impl SqlSession for MockSession {
        async fn begin(&mut self) -> Result<()> {
            self.calls.push(Call::Begin);
            Ok(())
        }

        async fn commit(&mut self) -> Result<()> {
            self.calls.push(Call::Commit);
            Ok(())
        }

        async fn execute(&mut self, sql: &str) -> Result<()> {
            if self.fail_on.as_deref() == Some(sql) {
                return Err(DumpError::Rejected("violation of PRIMARY KEY".into()));
            }
            if self.disconnect_on.as_deref() == Some(sql) {
                return Err(DumpError::Database("connection lost".into()));
            }
            self.calls.push(Call::Exec(sql.to_string()));
            Ok(())
        }

        async fn execute_session(&mut self, sql: &str) -> Result<()> {
            self.calls.push(Call::Session(sql.to_string()));
            Ok(())
        }

        async fn query_strings(&mut self, _sql: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn stmt(text: &str) -> Statement {
        Statement {
            text: text.to_string(),
            kind: StatementKind::classify(text),
            line: 1,
        }
    }

    fn insert(i: usize) -> Statement {
        stmt(&format!("INSERT INTO T VALUES ({})", i))
    }

    #[tokio::test]
    async fn test_batch_of_two_over_five_statements() {
        let mut session = MockSession::default();
        let mut exec = BatchExecutor::new(2);

        for i in 0..5 {
            assert_eq!(exec.apply(&mut session, &insert(i)).await.unwrap(), ApplyOutcome::Applied);
        }
        assert_eq!(session.commits(), 2);
        assert_eq!(exec.pending(), 1);

        exec.finish(&mut session).await.unwrap();
        assert_eq!(session.commits(), 3);
        assert_eq!(exec.commits(), 3);
        assert!(!exec.in_transaction());
    }

    #[tokio::test]
    async fn test_zero_batch_size_never_auto_commits() {
        let mut session = MockSession::default();
        let mut exec = BatchExecutor::new(0);
        for i in 0..10 {
            exec.apply(&mut session, &insert(i)).await.unwrap();
        }
        assert_eq!(session.commits(), 0);
        exec.finish(&mut session).await.unwrap();
        assert_eq!(session.commits(), 1);
    }

    #[tokio::test]
    async fn test_explicit_commit_resets_counter() {
        let mut session = MockSession::default();
        let mut exec = BatchExecutor::new(3);

        exec.apply(&mut session, &insert(1)).await.unwrap();
        exec.apply(&mut session, &insert(2)).await.unwrap();
        assert_eq!(exec.apply(&mut session, &stmt("commit")).await.unwrap(), ApplyOutcome::Committed);
        assert_eq!(exec.pending(), 0);
        exec.apply(&mut session, &insert(3)).await.unwrap();
        exec.apply(&mut session, &insert(4)).await.unwrap();

        assert_eq!(session.commits(), 1);
        assert!(!session.calls.contains(&Call::Exec("commit".into())));
        assert_eq!(
            session.calls[..4],
            [
                Call::Begin,
                Call::Exec("INSERT INTO T VALUES (1)".into()),
                Call::Exec("INSERT INTO T VALUES (2)".into()),
                Call::Commit
            ]
        );
    }

    #[tokio::test]
    async fn test_set_runs_outside_transaction() {
        let mut session = MockSession::default();
        let mut exec = BatchExecutor::new(10);

        let outcome = exec
            .apply(&mut session, &stmt("SET GENERATOR G TO 5"))
            .await
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::SessionApplied);
        assert_eq!(session.calls, vec![Call::Session("SET GENERATOR G TO 5".into())]);
        assert!(!exec.in_transaction());
        assert_eq!(exec.pending(), 0);
    }

    #[tokio::test]
    async fn test_failure_keeps_transaction_open() {
        let mut session = MockSession {
            fail_on: Some("INSERT INTO T VALUES (2)".into()),
            ..MockSession::default()
        };
        let mut exec = BatchExecutor::new(100);

        exec.apply(&mut session, &insert(1)).await.unwrap();
        let outcome = exec.apply(&mut session, &insert(2)).await.unwrap();
        assert_eq!(outcome, ApplyOutcome::Failed("violation of PRIMARY KEY".into()));
        assert!(exec.in_transaction());
        assert_eq!(exec.pending(), 1);

        exec.apply(&mut session, &insert(3)).await.unwrap();
        assert_eq!(session.calls.iter().filter(|c| **c == Call::Begin).count(), 1);
    }

    #[tokio::test]
    async fn test_connection_loss_is_an_error() {
        let mut session = MockSession {
            disconnect_on: Some("INSERT INTO T VALUES (2)".into()),
            ..MockSession::default()
        };
        let mut exec = BatchExecutor::new(100);

        exec.apply(&mut session, &insert(1)).await.unwrap();
        let err = exec.apply(&mut session, &insert(2)).await.unwrap_err();
        assert!(err.is_stream_error());
        assert_eq!(exec.pending(), 1);
    }

    #[tokio::test]
    async fn test_blank_statement_is_noop() {
        let mut session = MockSession::default();
        let mut exec = BatchExecutor::new(1);
        assert_eq!(exec.apply(&mut session, &stmt("   ")).await.unwrap(), ApplyOutcome::Control);
        assert!(session.calls.is_empty());
    }

    #[tokio::test]
    async fn test_finish_without_transaction_is_noop() {
        let mut session = MockSession::default();
        let mut exec = BatchExecutor::new(1);
        exec.finish(&mut session).await.unwrap();
        assert!(session.calls.is_empty());
        assert_eq!(exec.commits(), 0);
    }
}
