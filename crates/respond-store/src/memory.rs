//! In-memory action store (process lifetime only).

use respond_types::{Action, ActionStore, RangeQuery, RowOrder, StoreError, MAX_ROWS_PER_QUERY};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Table {
    /// Rows in insertion order; an upsert of an existing key replaces in place.
    rows: Vec<Action>,
    /// codeid -> position in `rows`.
    index: HashMap<i64, usize>,
}

/// In-memory implementation of ActionStore with the same per-select cap as the hosted table.
pub struct InMemoryActionStore {
    table: Arc<RwLock<Table>>,
}

impl InMemoryActionStore {
    pub fn new() -> Self {
        Self {
            table: Arc::new(RwLock::new(Table::default())),
        }
    }

    /// Store pre-populated with `rows`, upserted in order.
    pub fn with_rows(rows: impl IntoIterator<Item = Action>) -> Self {
        let mut table = Table::default();
        for row in rows {
            upsert_one(&mut table, row);
        }
        Self {
            table: Arc::new(RwLock::new(table)),
        }
    }

    /// Snapshot of a single row, for callers that need to inspect one key.
    pub async fn get(&self, codeid: i64) -> Option<Action> {
        let guard = self.table.read().await;
        guard.index.get(&codeid).map(|&i| guard.rows[i].clone())
    }
}

impl Default for InMemoryActionStore {
    fn default() -> Self {
        Self::new()
    }
}

fn upsert_one(table: &mut Table, row: Action) {
    match table.index.get(&row.codeid) {
        Some(&i) => table.rows[i] = row,
        None => {
            table.index.insert(row.codeid, table.rows.len());
            table.rows.push(row);
        }
    }
}

#[async_trait::async_trait]
impl ActionStore for InMemoryActionStore {
    async fn select_range(&self, query: &RangeQuery) -> Result<Vec<Action>, StoreError> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let guard = self.table.read().await;
        let mut matching: Vec<&Action> = guard
            .rows
            .iter()
            .filter(|a| query.ip.as_deref().map_or(true, |ip| a.ip == ip))
            .collect();
        if query.order == RowOrder::StartDesc {
            matching.sort_by(|a, b| b.start.cmp(&a.start));
        }
        let take = query.len().min(MAX_ROWS_PER_QUERY);
        Ok(matching
            .into_iter()
            .skip(query.from)
            .take(take)
            .cloned()
            .collect())
    }

    async fn upsert(&self, rows: &[Action]) -> Result<Option<usize>, StoreError> {
        let mut guard = self.table.write().await;
        for row in rows {
            upsert_one(&mut guard, row.clone());
        }
        Ok(Some(rows.len()))
    }

    async fn delete_all(&self) -> Result<(), StoreError> {
        let mut guard = self.table.write().await;
        guard.rows.clear();
        guard.index.clear();
        Ok(())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.table.read().await.rows.len())
    }
}
