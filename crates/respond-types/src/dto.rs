//! Records, filter/sort configuration and response DTOs.

use serde::{Deserialize, Deserializer, Serialize};

/// Absent or `null` columns decode to the type's default, like the ingestion defaults.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Action category as stored in the `action` column.
///
/// Unknown strings are kept verbatim in [`ActionType::Unknown`]; ingestion does not reject
/// categories it does not recognise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionType {
    Connection,
    Gpol,
    QuarantineOutgoing,
    Pol,
    Quarantine,
    Unknown(String),
}

impl ActionType {
    pub fn as_str(&self) -> &str {
        match self {
            ActionType::Connection => "connection",
            ActionType::Gpol => "gpol",
            ActionType::QuarantineOutgoing => "quarantineOutgoing",
            ActionType::Pol => "pol",
            ActionType::Quarantine => "quarantine",
            ActionType::Unknown(s) => s.as_str(),
        }
    }

    /// Human-readable name shown in the type dropdown.
    pub fn display_label(&self) -> &str {
        match self {
            ActionType::Connection => "Connection",
            ActionType::Gpol => "Group Pattern",
            ActionType::QuarantineOutgoing => "Quarantine Outgoing",
            ActionType::Pol => "Pattern of Life",
            ActionType::Quarantine => "Quarantine",
            ActionType::Unknown(s) => s.as_str(),
        }
    }

    /// The five categories the console knows about, in dropdown order.
    pub fn known() -> [ActionType; 5] {
        [
            ActionType::Connection,
            ActionType::Gpol,
            ActionType::QuarantineOutgoing,
            ActionType::Pol,
            ActionType::Quarantine,
        ]
    }
}

impl Default for ActionType {
    fn default() -> Self {
        ActionType::Unknown(String::new())
    }
}

impl From<String> for ActionType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "connection" => ActionType::Connection,
            "gpol" => ActionType::Gpol,
            "quarantineOutgoing" => ActionType::QuarantineOutgoing,
            "pol" => ActionType::Pol,
            "quarantine" => ActionType::Quarantine,
            _ => ActionType::Unknown(s),
        }
    }
}

impl From<&str> for ActionType {
    fn from(s: &str) -> Self {
        ActionType::from(s.to_string())
    }
}

impl From<ActionType> for String {
    fn from(t: ActionType) -> Self {
        match t {
            ActionType::Unknown(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Short category shown in the table for a known action label.
pub fn category_for_label(label: &str) -> Option<&'static str> {
    match label {
        "Block connections" => Some("Network"),
        "Enforce group pattern of life" => Some("Group Policy"),
        "Block all outgoing traffic" => Some("Quarantine Out"),
        "Enforce pattern of life" => Some("Policy"),
        "Quarantine device" => Some("Quarantine"),
        _ => None,
    }
}

/// Operator who triggered a manual action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triggerer {
    pub username: String,
    pub reason: String,
}

/// One response action row. `codeid` is the upsert conflict key.
///
/// Rows written by other producers may carry `null` in any column but `codeid`; those decode
/// to the empty value instead of failing the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub codeid: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub did: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ip: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ips: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub action: ActionType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub manual: bool,
    #[serde(default)]
    pub triggerer: Option<Triggerer>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub label: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub detail: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub score: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pbid: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub model: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub modeluuid: String,
    /// Epoch milliseconds.
    #[serde(default, deserialize_with = "null_as_default")]
    pub start: i64,
    /// Epoch milliseconds.
    #[serde(default, deserialize_with = "null_as_default")]
    pub expires: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub blocked: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub active: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cleared: bool,
}

impl Action {
    /// Row with every optional column at its default; used by normalization and tests.
    pub fn with_codeid(codeid: i64) -> Self {
        Self {
            codeid,
            did: 0,
            ip: String::new(),
            ips: Vec::new(),
            action: ActionType::Unknown(String::new()),
            manual: false,
            triggerer: None,
            label: String::new(),
            detail: String::new(),
            score: 0.0,
            pbid: 0,
            model: String::new(),
            modeluuid: String::new(),
            start: 0,
            expires: 0,
            blocked: false,
            active: false,
            cleared: false,
        }
    }
}

/// Lifecycle bucket derived from `(cleared, active, start, now)`; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Pending,
    Active,
    Cleared,
    Expired,
}

impl ActionStatus {
    pub const ALL: [ActionStatus; 4] = [
        ActionStatus::Pending,
        ActionStatus::Active,
        ActionStatus::Cleared,
        ActionStatus::Expired,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionStatus::Pending => "pending",
            ActionStatus::Active => "active",
            ActionStatus::Cleared => "cleared",
            ActionStatus::Expired => "expired",
        }
    }
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action-type clause of the filter: `all` or one category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionTypeFilter {
    #[default]
    All,
    Only(ActionType),
}

impl ActionTypeFilter {
    pub fn matches(&self, action: &ActionType) -> bool {
        match self {
            ActionTypeFilter::All => true,
            ActionTypeFilter::Only(t) => t == action,
        }
    }
}

impl From<String> for ActionTypeFilter {
    fn from(s: String) -> Self {
        if s == "all" {
            ActionTypeFilter::All
        } else {
            ActionTypeFilter::Only(ActionType::from(s))
        }
    }
}

impl From<ActionTypeFilter> for String {
    fn from(f: ActionTypeFilter) -> Self {
        match f {
            ActionTypeFilter::All => "all".to_string(),
            ActionTypeFilter::Only(t) => t.into(),
        }
    }
}

/// Filter configuration held by a console view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filters {
    #[serde(default)]
    pub date_from: Option<i64>,
    #[serde(default)]
    pub date_to: Option<i64>,
    #[serde(default)]
    pub action_type: ActionTypeFilter,
    #[serde(default = "default_true")]
    pub show_manual: bool,
    #[serde(default = "default_true")]
    pub show_blocked: bool,
    #[serde(default)]
    pub search: String,
    #[serde(default = "default_status_tab")]
    pub status_tab: ActionStatus,
}

fn default_true() -> bool {
    true
}

fn default_status_tab() -> ActionStatus {
    ActionStatus::Active
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            date_from: None,
            date_to: None,
            action_type: ActionTypeFilter::All,
            show_manual: true,
            show_blocked: true,
            search: String::new(),
            status_tab: ActionStatus::Active,
        }
    }
}

/// Sortable columns. `Label` compares `label + " " + detail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    Ip,
    Label,
    Start,
    Expires,
    Action,
    Blocked,
    Model,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            field: SortField::Start,
            direction: SortDirection::Desc,
        }
    }
}

impl SortConfig {
    /// Header click: same field flips direction, a new field starts ascending.
    pub fn toggled(self, field: SortField) -> Self {
        if self.field == field {
            Self {
                field,
                direction: self.direction.flipped(),
            }
        } else {
            Self {
                field,
                direction: SortDirection::Asc,
            }
        }
    }
}

/// Per-status tallies used for tab badges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub active: usize,
    pub cleared: usize,
    pub expired: usize,
}

impl StatusCounts {
    pub fn get(&self, status: ActionStatus) -> usize {
        match status {
            ActionStatus::Pending => self.pending,
            ActionStatus::Active => self.active,
            ActionStatus::Cleared => self.cleared,
            ActionStatus::Expired => self.expired,
        }
    }

    pub fn increment(&mut self, status: ActionStatus) {
        match status {
            ActionStatus::Pending => self.pending += 1,
            ActionStatus::Active => self.active += 1,
            ActionStatus::Cleared => self.cleared += 1,
            ActionStatus::Expired => self.expired += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.active + self.cleared + self.expired
    }
}

/// Occurrences of one IP across the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpCount {
    pub ip: String,
    pub count: usize,
}

/// Phase of the admin upload page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadPhase {
    #[default]
    Idle,
    Parsing,
    Uploading,
    Done,
    Error,
}

/// Progress of an upload or purge. Inserts and updates are not distinguished.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadStats {
    pub total: usize,
    pub processed: usize,
    pub upserted: usize,
    pub errors: usize,
    pub phase: UploadPhase,
    pub message: String,
}

impl UploadStats {
    /// Stats describing a failure before any write.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            phase: UploadPhase::Error,
            message: message.into(),
            ..Self::default()
        }
    }
}

/// Base response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseResponse<T> {
    #[serde(default = "default_code")]
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub data: Option<T>,
}

fn default_code() -> i32 {
    200
}

impl<T> BaseResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: 200,
            message: "Success".to_string(),
            data: Some(data),
        }
    }

    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// A row as the console table shows it: the stored columns plus display text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRow {
    #[serde(flatten)]
    pub record: Action,
    pub type_label: String,
    #[serde(default)]
    pub category: Option<String>,
}

impl From<Action> for ActionRow {
    fn from(record: Action) -> Self {
        Self {
            type_label: record.action.display_label().to_string(),
            category: category_for_label(&record.label).map(str::to_string),
            record,
        }
    }
}

/// Entry of the action type dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTypeOption {
    pub value: String,
    pub label: String,
}

impl ActionTypeOption {
    /// `all` first, then the known categories in dropdown order.
    pub fn dropdown() -> Vec<ActionTypeOption> {
        let mut out = vec![ActionTypeOption {
            value: "all".to_string(),
            label: "All Types".to_string(),
        }];
        out.extend(ActionType::known().into_iter().map(|t| ActionTypeOption {
            label: t.display_label().to_string(),
            value: t.into(),
        }));
        out
    }
}

/// One page of a console view: the visible window plus totals for the tabs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionPage {
    pub actions: Vec<ActionRow>,
    /// Size of the filtered collection before windowing.
    pub total: usize,
    pub visible: usize,
    pub has_more: bool,
    pub counts: StatusCounts,
}

/// IP suggestions for the global search box.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpSuggestions {
    pub entries: Vec<IpCount>,
    pub exact_match: bool,
}

/// Admin page header: current stats plus exact row count (absent if the count failed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminStatus {
    pub stats: UploadStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_count: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_columns_decode_to_defaults() {
        let row = r#"{
            "codeid": 9, "did": null, "ip": "10.1.2.3", "ips": null, "action": null,
            "manual": null, "triggerer": null, "label": null, "detail": null, "score": null,
            "pbid": null, "model": null, "modeluuid": null, "start": 1700000000000,
            "expires": null, "blocked": null, "active": true, "cleared": null
        }"#;
        let a: Action = serde_json::from_str(row).unwrap();
        let mut expected = Action::with_codeid(9);
        expected.ip = "10.1.2.3".to_string();
        expected.start = 1_700_000_000_000;
        expected.active = true;
        assert_eq!(a, expected);

        let sparse: Action = serde_json::from_str(r#"{"codeid": 4, "action": "pol"}"#).unwrap();
        assert_eq!(sparse.action, ActionType::Pol);
        assert_eq!(sparse.did, 0);
    }

    #[test]
    fn header_click_toggles_sort() {
        let start = SortConfig::default();
        let by_ip = start.toggled(SortField::Ip);
        assert_eq!(by_ip.field, SortField::Ip);
        assert_eq!(by_ip.direction, SortDirection::Asc);
        assert_eq!(by_ip.toggled(SortField::Ip).direction, SortDirection::Desc);
        assert_eq!(start.toggled(SortField::Start).direction, SortDirection::Asc);
    }

    #[test]
    fn rows_carry_type_label_and_category() {
        let mut a = Action::with_codeid(1);
        a.action = ActionType::Gpol;
        a.label = "Enforce group pattern of life".to_string();
        let row = ActionRow::from(a.clone());
        assert_eq!(row.type_label, "Group Pattern");
        assert_eq!(row.category.as_deref(), Some("Group Policy"));

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["codeid"], 1);
        assert_eq!(json["action"], "gpol");
        assert_eq!(json["type_label"], "Group Pattern");

        a.label = "Something else".to_string();
        assert!(ActionRow::from(a).category.is_none());
    }

    #[test]
    fn dropdown_lists_all_then_known_types() {
        let options = ActionTypeOption::dropdown();
        let values: Vec<&str> = options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(
            values,
            vec!["all", "connection", "gpol", "quarantineOutgoing", "pol", "quarantine"]
        );
        assert_eq!(options[4].label, "Pattern of Life");
    }
}
