//! Firebird SQL dialect.
//!
//! Query and directive text for the export cursor, the dump header and the
//! index catalogue.

use crate::config::ConnectionConfig;

/// Firebird SQL syntax.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirebirdDialect;

impl FirebirdDialect {
    /// Create a new Firebird dialect instance.
    pub fn new() -> Self {
        Self
    }

    /// Quote an identifier with double quotes, doubling embedded quotes.
    pub fn quote_ident(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Quote a string literal.
    pub fn quote_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Export cursor query. The filter is appended verbatim.
    pub fn build_select_query(&self, table: &str, where_clause: Option<&str>) -> String {
        let mut sql = format!("SELECT * FROM {}", table);
        if let Some(filter) = where_clause.map(str::trim).filter(|w| !w.is_empty()) {
            sql.push_str(" WHERE ");
            sql.push_str(filter);
        }
        sql
    }

    /// Dump header: dialect, charset and a blank separator line.
    pub fn header_lines(&self, dialect: u8, charset: &str) -> [String; 3] {
        [
            format!("SET SQL DIALECT {};", dialect),
            format!("SET NAMES {};", charset),
            String::new(),
        ]
    }

    /// Catalogue name of a table as written in a statement.
    ///
    /// Unquoted names are stored upper case; a double-quoted name keeps its
    /// case.
    pub fn relation_name(&self, table: &str) -> String {
        let table = table.trim();
        match table.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
            Some(quoted) => quoted.replace("\"\"", "\""),
            None => table.to_uppercase(),
        }
    }

    /// Active, non-unique, non-system indexes of a relation that are not
    /// backing a constraint.
    pub fn index_list_query(&self, relation: &str) -> String {
        format!(
            "SELECT TRIM(I.RDB$INDEX_NAME) FROM RDB$INDICES I \
             WHERE I.RDB$RELATION_NAME = {} \
             AND COALESCE(I.RDB$UNIQUE_FLAG, 0) = 0 \
             AND COALESCE(I.RDB$SYSTEM_FLAG, 0) = 0 \
             AND COALESCE(I.RDB$INDEX_INACTIVE, 0) = 0 \
             AND NOT EXISTS (SELECT 1 FROM RDB$RELATION_CONSTRAINTS C \
             WHERE C.RDB$INDEX_NAME = I.RDB$INDEX_NAME) \
             ORDER BY I.RDB$INDEX_NAME",
            self.quote_literal(relation)
        )
    }

    /// `ALTER INDEX ... INACTIVE`.
    pub fn deactivate_index(&self, index: &str) -> String {
        format!("ALTER INDEX {} INACTIVE", self.quote_ident(index))
    }

    /// `ALTER INDEX ... ACTIVE`. Rebuilds the index.
    pub fn activate_index(&self, index: &str) -> String {
        format!("ALTER INDEX {} ACTIVE", self.quote_ident(index))
    }

    /// ODBC connection string for the Firebird driver.
    pub fn odbc_connection_string(&self, conn: &ConnectionConfig, charset: &str) -> String {
        format!(
            "DRIVER={{{}}};DBNAME={};UID={};PWD={};CHARSET={};DIALECT={}",
            conn.odbc_driver,
            conn.data_source(),
            conn.user,
            conn.password,
            charset,
            conn.dialect
        )
    }
}
