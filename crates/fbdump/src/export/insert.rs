//! INSERT statement builder for exported rows.

use crate::core::{ColumnDescriptor, Row};
use crate::error::{DumpError, Result};

use super::serializer::ValueSerializer;

/// Builds one `INSERT INTO <table> (<cols>) VALUES (<literals>);` line per row.
///
/// The column list is rendered once; table and column names are written
/// verbatim, unquoted.
#[derive(Debug, Clone)]
pub struct InsertBuilder {
    prefix: String,
    columns: Vec<ColumnDescriptor>,
    serializer: ValueSerializer,
}

impl InsertBuilder {
    /// Create a builder for `table` over the cursor's columns.
    pub fn new(table: &str, columns: &[ColumnDescriptor], serializer: ValueSerializer) -> Self {
        let column_list = columns
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            prefix: format!("INSERT INTO {} ({}) VALUES (", table, column_list),
            columns: columns.to_vec(),
            serializer,
        }
    }

    /// Render one row.
    ///
    /// Text values recovered from a decoding failure are still rendered and
    /// their failures pushed onto `recovered`. Fails with a database error
    /// when the row does not match the column list.
    pub fn build(&self, row: &Row, recovered: &mut Vec<DumpError>) -> Result<String> {
        if row.len() != self.columns.len() {
            return Err(DumpError::Database(format!(
                "row has {} values but the result set has {} columns",
                row.len(),
                self.columns.len()
            )));
        }

        let mut sql = String::with_capacity(self.prefix.len() + row.len() * 16 + 2);
        sql.push_str(&self.prefix);
        for (i, (value, column)) in row.iter().zip(&self.columns).enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            if let Some(err) = self.serializer.write_literal(&mut sql, value, column) {
                recovered.push(err);
            }
        }
        sql.push_str(");");
        Ok(sql)
    }
}
