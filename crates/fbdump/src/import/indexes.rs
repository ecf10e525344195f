//! Secondary index suppression during an import run.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::core::SqlSession;
use crate::drivers::FirebirdDialect;
use crate::error::Result;

/// Tracks which tables had their non-unique indexes deactivated.
///
/// Keys are catalogue relation names, so `orders` and `ORDERS` share one
/// record.
#[derive(Debug, Default)]
pub struct IndexController {
    dialect: FirebirdDialect,
    deactivated: HashMap<String, Vec<String>>,
}

impl IndexController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deactivate the table's non-unique indexes, once per run.
    ///
    /// Returns the number of indexes deactivated by this call.
    pub async fn ensure_deactivated<S>(&mut self, session: &mut S, table: &str) -> Result<usize>
    where
        S: SqlSession + ?Sized,
    {
        let relation = self.dialect.relation_name(table);
        if relation.is_empty() || self.deactivated.contains_key(&relation) {
            return Ok(0);
        }

        let indexes: Vec<String> = session
            .query_strings(&self.dialect.index_list_query(&relation))
            .await?
            .into_iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();

        for index in &indexes {
            debug!("Deactivating index {} on {}", index, relation);
            session.execute(&self.dialect.deactivate_index(index)).await?;
        }
        if !indexes.is_empty() {
            info!("{}: deactivated {} indexes", relation, indexes.len());
        }

        let count = indexes.len();
        self.deactivated.insert(relation, indexes);
        Ok(count)
    }

    /// Reactivate every recorded index and forget all records.
    ///
    /// Returns the number of indexes reactivated.
    pub async fn reactivate_all<S>(&mut self, session: &mut S) -> Result<usize>
    where
        S: SqlSession + ?Sized,
    {
        let mut count = 0;
        let mut tables: Vec<_> = self.deactivated.drain().collect();
        tables.sort_by(|a, b| a.0.cmp(&b.0));

        for (relation, indexes) in tables {
            for index in &indexes {
                debug!("Reactivating index {} on {}", index, relation);
                session.execute(&self.dialect.activate_index(index)).await?;
                count += 1;
            }
        }
        if count > 0 {
            info!("Reactivated {} indexes", count);
        }
        Ok(count)
    }

    /// Number of tables handled in this run.
    pub fn tables_handled(&self) -> usize {
        self.deactivated.len()
    }
}
