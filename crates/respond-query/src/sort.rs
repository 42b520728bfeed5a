//! Column sorting over a copy of the collection.

use respond_types::{Action, SortConfig, SortDirection, SortField};
use std::cmp::Ordering;

enum SortKey {
    Text(String),
    Num(i64),
}

impl SortKey {
    fn of(a: &Action, field: SortField) -> Self {
        match field {
            SortField::Ip => SortKey::Text(a.ip.clone()),
            SortField::Label => SortKey::Text(format!("{} {}", a.label, a.detail)),
            SortField::Start => SortKey::Num(a.start),
            SortField::Expires => SortKey::Num(a.expires),
            SortField::Action => SortKey::Text(a.action.as_str().to_string()),
            SortField::Blocked => SortKey::Num(a.blocked as i64),
            SortField::Model => SortKey::Text(a.model.clone()),
            SortField::Active => SortKey::Num(a.active as i64),
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Text(a), SortKey::Text(b)) => locale_compare(a, b),
            (SortKey::Num(a), SortKey::Num(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

/// Case-insensitive ordering; on a case-only difference lowercase sorts first.
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    folded.then_with(|| b.cmp(a))
}

/// Stable sort of a copy; `actions` is left untouched and equal keys keep input order.
pub fn sort_actions(actions: &[Action], sort: SortConfig) -> Vec<Action> {
    let mut keyed: Vec<(SortKey, &Action)> = actions
        .iter()
        .map(|a| (SortKey::of(a, sort.field), a))
        .collect();
    keyed.sort_by(|(ka, _), (kb, _)| {
        let ord = ka.compare(kb);
        match sort.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
    keyed.into_iter().map(|(_, a)| a.clone()).collect()
}
