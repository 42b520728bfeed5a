//! Action store implementations.

mod memory;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "rest")]
mod rest;

pub use memory::InMemoryActionStore;
pub use respond_types::{
    ActionStore, RangeQuery, RowOrder, StoreError, ACTIONS_TABLE, MAX_ROWS_PER_QUERY,
};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteActionStore;

#[cfg(feature = "rest")]
pub use rest::RestActionStore;
