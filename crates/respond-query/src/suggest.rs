//! IP suggestions for the global search box.

use respond_types::{IpCount, IpSuggestions};

/// Entries shown before anything is typed.
pub const SUGGESTIONS_IDLE: usize = 8;
/// Cap on matches for a typed query.
pub const SUGGESTIONS_MAX: usize = 12;

/// `index` is the count-descending output of `load_unique_ips`.
pub fn suggest_ips(index: &[IpCount], query: &str) -> IpSuggestions {
    let trimmed = query.trim();
    let exact_match = !trimmed.is_empty() && index.iter().any(|e| e.ip == trimmed);
    let entries = if trimmed.is_empty() {
        index.iter().take(SUGGESTIONS_IDLE).cloned().collect()
    } else {
        let q = query.to_lowercase();
        index
            .iter()
            .filter(|e| e.ip.contains(q.as_str()))
            .take(SUGGESTIONS_MAX)
            .cloned()
            .collect()
    };
    IpSuggestions {
        entries,
        exact_match,
    }
}
