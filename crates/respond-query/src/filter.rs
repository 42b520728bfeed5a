//! Filter predicate and per-status badge counts.

use crate::status::derive_status;
use respond_types::{Action, Filters, StatusCounts};

/// Every clause except status tab and search. Shared by filtering and counting.
fn matches_base(a: &Action, filters: &Filters, ip: Option<&str>) -> bool {
    if let Some(ip) = ip.filter(|s| !s.is_empty()) {
        if a.ip != ip {
            return false;
        }
    }
    if let Some(from) = filters.date_from {
        if a.start < from {
            return false;
        }
    }
    if let Some(to) = filters.date_to {
        if a.start > to {
            return false;
        }
    }
    if !filters.action_type.matches(&a.action) {
        return false;
    }
    if !filters.show_manual && a.manual {
        return false;
    }
    if !filters.show_blocked && a.blocked {
        return false;
    }
    true
}

/// `needle` must already be lowercase. Missing triggerer fields contribute empty strings.
pub fn matches_search(a: &Action, needle: &str) -> bool {
    let (username, reason) = a
        .triggerer
        .as_ref()
        .map(|t| (t.username.as_str(), t.reason.as_str()))
        .unwrap_or(("", ""));
    let haystack = [
        a.ip.as_str(),
        a.label.as_str(),
        a.detail.as_str(),
        a.model.as_str(),
        a.action.as_str(),
        username,
        reason,
    ]
    .join(" ")
    .to_lowercase();
    haystack.contains(needle)
}

/// Records matching every clause of `filters`, in input order. `ip` scopes to one device.
pub fn filter_actions(
    actions: &[Action],
    filters: &Filters,
    ip: Option<&str>,
    now_ms: i64,
) -> Vec<Action> {
    let needle = (!filters.search.is_empty()).then(|| filters.search.to_lowercase());
    actions
        .iter()
        .filter(|a| matches_base(a, filters, ip))
        .filter(|a| derive_status(a, now_ms) == filters.status_tab)
        .filter(|a| needle.as_deref().map_or(true, |n| matches_search(a, n)))
        .cloned()
        .collect()
}

/// Tallies all four statuses in one pass. `status_tab` and `search` in `filters` are ignored.
pub fn count_by_status(
    actions: &[Action],
    filters: &Filters,
    ip: Option<&str>,
    now_ms: i64,
) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for a in actions.iter().filter(|a| matches_base(a, filters, ip)) {
        counts.increment(derive_status(a, now_ms));
    }
    counts
}
