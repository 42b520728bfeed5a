//! Paged loads over the injected store, plus the page builder the console consumes.

use crate::filter::{count_by_status, filter_actions};
use crate::sort::sort_actions;
use crate::window::VisibleWindow;
use respond_store::{ActionStore, RangeQuery, RowOrder, StoreError, MAX_ROWS_PER_QUERY};
use respond_types::{Action, ActionPage, ActionRow, Filters, IpCount, SortConfig};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Rows requested per select; equal to the store's per-query cap.
pub const LOAD_PAGE_SIZE: usize = MAX_ROWS_PER_QUERY;

type PageFuture<'a, T> = Pin<Box<dyn Future<Output = Result<Vec<T>, StoreError>> + Send + 'a>>;

/// Requests consecutive `[from, to]` ranges until a short page arrives.
///
/// A failed page stops paging and the rows gathered so far are returned; the error is logged,
/// never surfaced.
pub async fn collect_pages<'a, T, F>(what: &str, mut fetch: F) -> Vec<T>
where
    T: Send,
    F: FnMut(usize, usize) -> PageFuture<'a, T> + Send,
{
    let mut all = Vec::new();
    let mut from = 0usize;
    loop {
        match fetch(from, from + LOAD_PAGE_SIZE - 1).await {
            Ok(rows) => {
                let n = rows.len();
                all.extend(rows);
                if n < LOAD_PAGE_SIZE {
                    break;
                }
                from += LOAD_PAGE_SIZE;
            }
            Err(e) => {
                tracing::error!(what, offset = from, loaded = all.len(), error = %e, "page fetch failed; returning partial result");
                break;
            }
        }
    }
    all
}

/// Reads from the action table. Each call owns its accumulator; nothing is cached.
pub struct ActionAccessor {
    store: Arc<dyn ActionStore>,
}

impl ActionAccessor {
    pub fn new(store: Arc<dyn ActionStore>) -> Self {
        Self { store }
    }

    /// Every row, `start` descending.
    pub async fn load_actions(&self) -> Vec<Action> {
        self.load_scoped(None).await
    }

    /// Every row for one device IP, `start` descending.
    pub async fn load_actions_by_ip(&self, ip: &str) -> Vec<Action> {
        self.load_scoped(Some(ip)).await
    }

    async fn load_scoped(&self, ip: Option<&str>) -> Vec<Action> {
        let store = self.store.as_ref();
        let rows = collect_pages("actions", |from, to| {
            let query = RangeQuery {
                ip: ip.map(str::to_string),
                order: RowOrder::StartDesc,
                from,
                to,
            };
            Box::pin(async move { store.select_range(&query).await })
        })
        .await;
        tracing::debug!(ip = ip.unwrap_or("*"), rows = rows.len(), "actions loaded");
        rows
    }

    /// Occurrences per IP over the whole table, count descending; ties keep first-seen order.
    /// Rows with an empty IP are skipped.
    pub async fn load_unique_ips(&self) -> Vec<IpCount> {
        let store = self.store.as_ref();
        let ips = collect_pages("ips", |from, to| store.select_ips(from, to)).await;

        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut out: Vec<IpCount> = Vec::new();
        for ip in ips.into_iter().filter(|ip| !ip.is_empty()) {
            match positions.get(&ip) {
                Some(&i) => out[i].count += 1,
                None => {
                    positions.insert(ip.clone(), out.len());
                    out.push(IpCount { ip, count: 1 });
                }
            }
        }
        out.sort_by(|a, b| b.count.cmp(&a.count));
        out
    }

    /// Load (device-scoped when `ip` is set) and build one console page.
    pub async fn page(
        &self,
        ip: Option<&str>,
        filters: &Filters,
        sort: SortConfig,
        window: VisibleWindow,
        now_ms: i64,
    ) -> ActionPage {
        let actions = match ip {
            Some(ip) => self.load_actions_by_ip(ip).await,
            None => self.load_actions().await,
        };
        build_page(&actions, ip, filters, sort, window, now_ms)
    }
}

/// Filter, then sort, then cut the visible window; counts come from the unfiltered tabs.
pub fn build_page(
    actions: &[Action],
    ip: Option<&str>,
    filters: &Filters,
    sort: SortConfig,
    window: VisibleWindow,
    now_ms: i64,
) -> ActionPage {
    let counts = count_by_status(actions, filters, ip, now_ms);
    let sorted = sort_actions(&filter_actions(actions, filters, ip, now_ms), sort);
    ActionPage {
        actions: window
            .slice(&sorted)
            .iter()
            .cloned()
            .map(ActionRow::from)
            .collect(),
        total: sorted.len(),
        visible: window.visible().min(sorted.len()),
        has_more: window.has_more(sorted.len()),
        counts,
    }
}
