//! Axum server and routes.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use respond_ingest::{IngestPipeline, MAX_FILE_SIZE};
use respond_query::{now_ms, suggest_ips, ActionAccessor, VisibleWindow};
use respond_store::ActionStore;
use respond_types::{
    ActionPage, ActionStatus, ActionTypeFilter, ActionTypeOption, AdminStatus, BaseResponse,
    Filters, IpSuggestions, SortConfig, SortDirection, SortField, UploadPhase, UploadStats,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Request bodies up to this size reach the upload handler, so oversized files get the
/// size message rather than a bare 413.
const BODY_LIMIT: usize = 4 * MAX_FILE_SIZE;

pub struct AppState {
    pub accessor: ActionAccessor,
    pub pipeline: IngestPipeline,
    pub admin_secret: Option<String>,
}

impl AppState {
    pub fn new(store: Arc<dyn ActionStore>, admin_secret: Option<String>) -> Self {
        Self {
            accessor: ActionAccessor::new(Arc::clone(&store)),
            pipeline: IngestPipeline::new(store),
            admin_secret,
        }
    }

    fn authorized(&self, secret: &str) -> bool {
        self.admin_secret.as_deref() == Some(secret)
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/actions", get(handle_actions))
        .route("/devices/:ip/actions", get(handle_device_actions))
        .route("/ips", get(handle_ips))
        .route("/action-types", get(handle_action_types))
        .route("/admin/:secret/status", get(handle_admin_status))
        .route("/admin/:secret/upload", post(handle_upload))
        .route("/admin/:secret/purge", post(handle_purge))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Console view parameters. Absent values take the console defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ActionsQuery {
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub date_from: Option<i64>,
    #[serde(default)]
    pub date_to: Option<i64>,
    #[serde(default)]
    pub action_type: Option<String>,
    #[serde(default)]
    pub show_manual: Option<bool>,
    #[serde(default)]
    pub show_blocked: Option<bool>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status_tab: Option<ActionStatus>,
    #[serde(default)]
    pub sort_field: Option<SortField>,
    #[serde(default)]
    pub sort_direction: Option<SortDirection>,
    #[serde(default)]
    pub pages: Option<usize>,
}

impl ActionsQuery {
    pub fn filters(&self) -> Filters {
        let defaults = Filters::default();
        Filters {
            date_from: self.date_from,
            date_to: self.date_to,
            action_type: self
                .action_type
                .clone()
                .map(ActionTypeFilter::from)
                .unwrap_or_default(),
            show_manual: self.show_manual.unwrap_or(defaults.show_manual),
            show_blocked: self.show_blocked.unwrap_or(defaults.show_blocked),
            search: self.search.clone().unwrap_or_default(),
            status_tab: self.status_tab.unwrap_or(defaults.status_tab),
        }
    }

    pub fn sort(&self) -> SortConfig {
        let defaults = SortConfig::default();
        SortConfig {
            field: self.sort_field.unwrap_or(defaults.field),
            direction: self.sort_direction.unwrap_or(defaults.direction),
        }
    }

    pub fn window(&self) -> VisibleWindow {
        VisibleWindow::with_pages(self.pages.unwrap_or(1))
    }
}

async fn action_page(state: &AppState, ip: Option<&str>, q: &ActionsQuery) -> ActionPage {
    let now = now_ms();
    state
        .accessor
        .page(ip, &q.filters(), q.sort(), q.window(), now)
        .await
}

async fn handle_actions(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ActionsQuery>,
) -> Json<BaseResponse<ActionPage>> {
    let ip = q.ip.as_deref().filter(|s| !s.is_empty());
    let page = action_page(&state, ip, &q).await;
    tracing::debug!(total = page.total, visible = page.visible, "actions page built");
    Json(BaseResponse::ok(page))
}

async fn handle_device_actions(
    State(state): State<Arc<AppState>>,
    Path(ip): Path<String>,
    Query(q): Query<ActionsQuery>,
) -> Json<BaseResponse<ActionPage>> {
    let page = action_page(&state, Some(ip.as_str()), &q).await;
    tracing::debug!(ip = %ip, total = page.total, "device page built");
    Json(BaseResponse::ok(page))
}

#[derive(Debug, Deserialize)]
pub struct IpsQuery {
    #[serde(default)]
    pub q: String,
}

async fn handle_ips(
    State(state): State<Arc<AppState>>,
    Query(q): Query<IpsQuery>,
) -> Json<BaseResponse<IpSuggestions>> {
    let index = state.accessor.load_unique_ips().await;
    Json(BaseResponse::ok(suggest_ips(&index, &q.q)))
}

async fn handle_action_types() -> Json<BaseResponse<Vec<ActionTypeOption>>> {
    Json(BaseResponse::ok(ActionTypeOption::dropdown()))
}

fn unauthorized<T>() -> Json<BaseResponse<T>> {
    Json(BaseResponse::error(401, "Invalid access token."))
}

async fn handle_admin_status(
    State(state): State<Arc<AppState>>,
    Path(secret): Path<String>,
) -> Json<BaseResponse<AdminStatus>> {
    if !state.authorized(&secret) {
        return unauthorized();
    }
    Json(BaseResponse::ok(state.pipeline.admin_status().await))
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    #[serde(default)]
    pub filename: String,
}

/// Stats as the envelope: terminal `Done` is 200, a rejected or failed run is 400 with the
/// stats message.
fn stats_response(stats: UploadStats, failure_code: i32) -> Json<BaseResponse<UploadStats>> {
    let code = match stats.phase {
        UploadPhase::Error => failure_code,
        _ => 200,
    };
    Json(BaseResponse {
        code,
        message: stats.message.clone(),
        data: Some(stats),
    })
}

async fn handle_upload(
    State(state): State<Arc<AppState>>,
    Path(secret): Path<String>,
    Query(q): Query<UploadQuery>,
    body: Bytes,
) -> Json<BaseResponse<UploadStats>> {
    if !state.authorized(&secret) {
        return unauthorized();
    }
    let stats = state.pipeline.ingest(&q.filename, &body).await;
    stats_response(stats, 400)
}

#[derive(Debug, Default, Deserialize)]
pub struct PurgeRequest {
    #[serde(default)]
    pub confirm: bool,
}

async fn handle_purge(
    State(state): State<Arc<AppState>>,
    Path(secret): Path<String>,
    Json(req): Json<PurgeRequest>,
) -> Json<BaseResponse<UploadStats>> {
    if !state.authorized(&secret) {
        return unauthorized();
    }
    if !req.confirm {
        return Json(BaseResponse {
            code: 400,
            message: "Purge requires confirmation.".to_string(),
            data: Some(state.pipeline.stats().await),
        });
    }
    stats_response(state.pipeline.purge(true).await, 500)
}

async fn handle_health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_defaults_match_console() {
        let q = ActionsQuery::default();
        assert_eq!(q.filters(), Filters::default());
        assert_eq!(q.sort(), SortConfig::default());
        assert_eq!(q.window(), VisibleWindow::new());
    }

    #[test]
    fn query_overrides() {
        let q = ActionsQuery {
            action_type: Some("quarantine".to_string()),
            show_manual: Some(false),
            status_tab: Some(ActionStatus::Cleared),
            sort_field: Some(SortField::Ip),
            pages: Some(3),
            ..ActionsQuery::default()
        };
        let f = q.filters();
        assert_eq!(
            f.action_type,
            ActionTypeFilter::Only(respond_types::ActionType::Quarantine)
        );
        assert!(!f.show_manual);
        assert!(f.show_blocked);
        assert_eq!(f.status_tab, ActionStatus::Cleared);
        assert_eq!(q.sort().field, SortField::Ip);
        assert_eq!(q.sort().direction, SortDirection::Desc);
        assert_eq!(q.window().visible(), 150);
    }

    #[test]
    fn missing_secret_rejects_everything() {
        let state = AppState::new(Arc::new(respond_store::InMemoryActionStore::new()), None);
        assert!(!state.authorized(""));
        assert!(!state.authorized("anything"));
    }
}
