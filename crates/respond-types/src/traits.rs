//! The external action table, as seen by the accessor and the ingestion pipeline.

use crate::Action;
use async_trait::async_trait;

/// Hard cap the hosted table applies to a single select.
pub const MAX_ROWS_PER_QUERY: usize = 1000;

/// Default table name.
pub const ACTIONS_TABLE: &str = "antigena_actions";

/// Row ordering supported by `select_range`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOrder {
    /// Insertion/storage order; what a plain select returns.
    Natural,
    StartDesc,
}

/// Range-limited select with an optional equality filter on `ip`.
///
/// `from` and `to` are inclusive row offsets, like the hosted API's `Range` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeQuery {
    pub ip: Option<String>,
    pub order: RowOrder,
    pub from: usize,
    pub to: usize,
}

impl RangeQuery {
    pub fn page(ip: Option<&str>, order: RowOrder, from: usize, page_size: usize) -> Self {
        Self {
            ip: ip.map(str::to_string),
            order,
            from,
            to: from + page_size.saturating_sub(1),
        }
    }

    /// Rows requested, before the store's own cap.
    pub fn len(&self) -> usize {
        self.to.saturating_sub(self.from) + 1
    }

    pub fn is_empty(&self) -> bool {
        self.to < self.from
    }
}

/// The four primitives the console needs from the hosted table.
///
/// Implementations must cap any single select at [`MAX_ROWS_PER_QUERY`] rows; callers page.
#[async_trait]
pub trait ActionStore: Send + Sync {
    /// Rows in `[from, to]` after filtering and ordering.
    async fn select_range(&self, query: &RangeQuery) -> Result<Vec<Action>, StoreError>;

    /// `ip` column only, natural order. Default implementation projects `select_range`.
    async fn select_ips(&self, from: usize, to: usize) -> Result<Vec<String>, StoreError> {
        let rows = self
            .select_range(&RangeQuery {
                ip: None,
                order: RowOrder::Natural,
                from,
                to,
            })
            .await?;
        Ok(rows.into_iter().map(|a| a.ip).collect())
    }

    /// Insert-or-replace keyed on `codeid`. Returns the confirmed row count when the backend
    /// reports one.
    async fn upsert(&self, rows: &[Action]) -> Result<Option<usize>, StoreError>;

    /// Remove every row. Either the table is cleared or an error is returned.
    async fn delete_all(&self) -> Result<(), StoreError>;

    /// Exact row count.
    async fn count(&self) -> Result<usize, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store error: {0}")]
    Other(String),
    #[error("store request failed with {status}: {body}")]
    Http { status: u16, body: String },
    #[error("invalid row: {0}")]
    InvalidRow(String),
}

impl StoreError {
    /// The backend's own message, without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            StoreError::Other(msg) | StoreError::InvalidRow(msg) => msg,
            StoreError::Http { body, .. } => body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_drops_variant_prefix() {
        let e = StoreError::Other("permission denied for table".to_string());
        assert_eq!(e.to_string(), "store error: permission denied for table");
        assert_eq!(e.message(), "permission denied for table");

        let e = StoreError::Http {
            status: 409,
            body: "duplicate key".to_string(),
        };
        assert_eq!(e.message(), "duplicate key");
    }
}
