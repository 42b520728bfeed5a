//! Action Store Accessor: loads rows from the injected [`ActionStore`] and derives the
//! filtered, sorted, windowed views the console shows.

mod accessor;
mod filter;
mod sort;
mod status;
mod suggest;
mod window;

pub use accessor::{build_page, collect_pages, ActionAccessor, LOAD_PAGE_SIZE};
pub use filter::{count_by_status, filter_actions, matches_search};
pub use respond_store::ActionStore;
pub use sort::{locale_compare, sort_actions};
pub use status::{derive_status, now_ms};
pub use suggest::{suggest_ips, SUGGESTIONS_IDLE, SUGGESTIONS_MAX};
pub use window::{VisibleWindow, PAGE_SIZE};
