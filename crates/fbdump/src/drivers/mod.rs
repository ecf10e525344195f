//! Database driver implementations.
//!
//! - [`firebird`]: Firebird dialect and the optional ODBC backend
//!
//! The export and import drivers only see the [`RowSource`] and
//! [`SqlSession`] seams; the functions here pick the backend compiled into
//! the build.

pub mod firebird;

pub use firebird::FirebirdDialect;

use crate::config::ConnectionConfig;
use crate::core::{RowSource, SqlSession};
use crate::error::Result;

#[cfg(not(feature = "odbc"))]
use crate::error::DumpError;

#[cfg(not(feature = "odbc"))]
fn no_backend() -> DumpError {
    DumpError::Config(
        "this build has no database backend; rebuild with `--features odbc`".to_string(),
    )
}

/// Open a cursor over `query` on a new connection.
pub async fn open_row_source(
    conn: &ConnectionConfig,
    charset: &str,
    query: &str,
) -> Result<Box<dyn RowSource>> {
    #[cfg(feature = "odbc")]
    {
        firebird::open_row_source(conn, charset, query)
    }

    #[cfg(not(feature = "odbc"))]
    {
        let _ = (conn, charset, query);
        Err(no_backend())
    }
}

/// Open an import session on a new connection.
pub async fn open_session(conn: &ConnectionConfig, charset: &str) -> Result<Box<dyn SqlSession>> {
    #[cfg(feature = "odbc")]
    {
        Ok(Box::new(firebird::OdbcSession::connect(conn, charset)?))
    }

    #[cfg(not(feature = "odbc"))]
    {
        let _ = (conn, charset);
        Err(no_backend())
    }
}

#[cfg(all(test, not(feature = "odbc")))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_backend_is_config_error() {
        let conn = ConnectionConfig::default();
        let err = open_session(&conn, "UTF8").await.err().unwrap();
        assert_eq!(err.exit_code(), crate::error::EXIT_CONFIG_ERROR);

        let err = open_row_source(&conn, "NONE", "SELECT * FROM T")
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("--features odbc"));
    }
}
