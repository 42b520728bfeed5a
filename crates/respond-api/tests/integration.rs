//! Integration tests: upload, console pages, device scope, IP suggestions, purge.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use respond_api::server::{self, AppState};
use respond_query::now_ms;
use respond_store::InMemoryActionStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

const SECRET: &str = "s3cret";

fn test_app() -> axum::Router {
    let state = Arc::new(AppState::new(
        Arc::new(InMemoryActionStore::new()),
        Some(SECRET.to_string()),
    ));
    server::router(state)
}

async fn send(app: &axum::Router, req: Request<Body>) -> Value {
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

async fn get_json(app: &axum::Router, uri: &str) -> Value {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, req).await
}

async fn upload(app: &axum::Router, filename: &str, body: Vec<u8>) -> Value {
    let req = Request::builder()
        .method("POST")
        .uri(format!("/admin/{}/upload?filename={}", SECRET, filename))
        .body(Body::from(body))
        .unwrap();
    send(app, req).await
}

async fn purge(app: &axum::Router, confirm: bool) -> Value {
    let req = Request::builder()
        .method("POST")
        .uri(format!("/admin/{}/purge", SECRET))
        .header("content-type", "application/json")
        .body(Body::from(json!({ "confirm": confirm }).to_string()))
        .unwrap();
    send(app, req).await
}

/// 60 active actions on 10.0.0.1, 5 cleared on 10.0.0.2, 3 pending on 10.0.0.3.
fn fixture() -> Vec<u8> {
    let now = now_ms();
    let mut items = Vec::new();
    for i in 0..60i64 {
        items.push(json!({
            "codeid": 1000 + i,
            "did": 7,
            "ip": "10.0.0.1",
            "action": if i % 2 == 0 { "quarantine" } else { "connection" },
            "label": "Block connections",
            "detail": format!("to port {}", 400 + i),
            "model": "Anomalous Connection / SMB Enumeration",
            "start": now - 60_000 - i,
            "expires": now + 3_600_000,
            "active": true,
            "manual": i == 0,
            "triggerer": if i == 0 { json!({ "username": "soc.admin", "reason": "Lateral movement" }) } else { Value::Null },
        }));
    }
    for i in 0..5i64 {
        items.push(json!({
            "codeid": 2000 + i,
            "did": 8,
            "ip": "10.0.0.2",
            "action": "pol",
            "start": now - 120_000,
            "expires": now + 60_000,
            "cleared": true,
        }));
    }
    for i in 0..3i64 {
        items.push(json!({
            "codeid": 3000 + i,
            "did": 9,
            "ip": "10.0.0.3",
            "action": "gpol",
            "start": now + 600_000,
            "expires": now + 1_200_000,
            "active": true,
        }));
    }
    serde_json::to_vec(&items).unwrap()
}

#[tokio::test]
async fn health() {
    let app = test_app();
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn upload_then_list_actions() {
    let app = test_app();
    let j = upload(&app, "actions.json", fixture()).await;
    assert_eq!(j["code"], 200);
    assert_eq!(j["message"], "Upload complete. 68 actions upserted, 0 errors.");
    assert_eq!(j["data"]["phase"], "done");
    assert_eq!(j["data"]["processed"], 68);

    let j = get_json(&app, "/actions").await;
    assert_eq!(j["code"], 200);
    let data = &j["data"];
    assert_eq!(data["total"], 60);
    assert_eq!(data["actions"].as_array().unwrap().len(), 50);
    assert_eq!(data["has_more"], true);
    assert_eq!(data["counts"]["active"], 60);
    assert_eq!(data["counts"]["cleared"], 5);
    assert_eq!(data["counts"]["pending"], 3);
    assert_eq!(data["counts"]["expired"], 0);
    // start descending by default
    assert_eq!(data["actions"][0]["codeid"], 1000);
    assert_eq!(data["actions"][0]["type_label"], "Quarantine");
    assert_eq!(data["actions"][0]["category"], "Network");
    assert_eq!(data["actions"][1]["type_label"], "Connection");

    let j = get_json(&app, "/actions?pages=2").await;
    assert_eq!(j["data"]["actions"].as_array().unwrap().len(), 60);
    assert_eq!(j["data"]["has_more"], false);

    let j = get_json(&app, "/actions?pages=1844674407370955161").await;
    assert_eq!(j["data"]["actions"].as_array().unwrap().len(), 60);
    assert_eq!(j["data"]["visible"], 60);
    assert_eq!(j["data"]["has_more"], false);
}

#[tokio::test]
async fn query_parameters_shape_the_page() {
    let app = test_app();
    upload(&app, "actions.json", fixture()).await;

    let j = get_json(&app, "/actions?status_tab=cleared").await;
    assert_eq!(j["data"]["total"], 5);

    let j = get_json(&app, "/actions?action_type=quarantine").await;
    assert_eq!(j["data"]["total"], 30);

    let j = get_json(&app, "/actions?show_manual=false").await;
    assert_eq!(j["data"]["total"], 59);
    assert_eq!(j["data"]["counts"]["active"], 59);

    let j = get_json(&app, "/actions?search=LATERAL").await;
    assert_eq!(j["data"]["total"], 1);
    assert_eq!(j["data"]["actions"][0]["triggerer"]["username"], "soc.admin");

    let j = get_json(&app, "/actions?sort_field=start&sort_direction=asc").await;
    assert_eq!(j["data"]["actions"][0]["codeid"], 1059);
}

#[tokio::test]
async fn device_scope_and_ip_suggestions() {
    let app = test_app();
    upload(&app, "actions.json", fixture()).await;

    let j = get_json(&app, "/devices/10.0.0.2/actions?status_tab=cleared").await;
    assert_eq!(j["data"]["total"], 5);
    assert_eq!(j["data"]["counts"]["active"], 0);
    assert!(j["data"]["actions"]
        .as_array()
        .unwrap()
        .iter()
        .all(|a| a["ip"] == "10.0.0.2"));

    let j = get_json(&app, "/ips").await;
    let entries = j["data"]["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["ip"], "10.0.0.1");
    assert_eq!(entries[0]["count"], 60);
    assert_eq!(j["data"]["exact_match"], false);

    let j = get_json(&app, "/ips?q=10.0.0.3").await;
    assert_eq!(j["data"]["exact_match"], true);
    assert_eq!(j["data"]["entries"][0]["count"], 3);
}

#[tokio::test]
async fn admin_routes_check_secret() {
    let app = test_app();
    let j = get_json(&app, "/admin/wrong/status").await;
    assert_eq!(j["code"], 401);
    assert_eq!(j["message"], "Invalid access token.");

    let req = Request::builder()
        .method("POST")
        .uri("/admin/wrong/upload?filename=a.json")
        .body(Body::from(fixture()))
        .unwrap();
    let j = send(&app, req).await;
    assert_eq!(j["code"], 401);

    let j = get_json(&app, "/actions?status_tab=pending").await;
    assert_eq!(j["data"]["total"], 0);
}

#[tokio::test]
async fn upload_rejections_reach_the_client() {
    let app = test_app();

    let j = upload(&app, "big.json", vec![b' '; 11 * 1024 * 1024]).await;
    assert_eq!(j["code"], 400);
    assert_eq!(j["message"], "File too large (11.0MB). Max is 10MB.");
    assert_eq!(j["data"]["phase"], "error");

    let j = upload(&app, "actions.csv", fixture()).await;
    assert_eq!(j["message"], "Only .json files are allowed.");

    let j = upload(&app, "actions.json", br#"{"rows": []}"#.to_vec()).await;
    assert_eq!(j["message"], "JSON must be an array of action objects.");

    let j = get_json(&app, &format!("/admin/{}/status", SECRET)).await;
    assert_eq!(j["code"], 200);
    assert_eq!(j["data"]["db_count"], 0);
    assert_eq!(j["data"]["stats"]["phase"], "error");
}

#[tokio::test]
async fn reupload_is_idempotent_and_purge_needs_confirmation() {
    let app = test_app();
    upload(&app, "actions.json", fixture()).await;
    upload(&app, "actions.json", fixture()).await;

    let j = get_json(&app, &format!("/admin/{}/status", SECRET)).await;
    assert_eq!(j["data"]["db_count"], 68);

    let j = purge(&app, false).await;
    assert_eq!(j["code"], 400);
    let j = get_json(&app, &format!("/admin/{}/status", SECRET)).await;
    assert_eq!(j["data"]["db_count"], 68);

    let j = purge(&app, true).await;
    assert_eq!(j["code"], 200);
    assert_eq!(j["message"], "All records purged.");
    let j = get_json(&app, &format!("/admin/{}/status", SECRET)).await;
    assert_eq!(j["data"]["db_count"], 0);
    assert_eq!(j["data"]["stats"]["upserted"], 0);

    let j = get_json(&app, "/actions").await;
    assert_eq!(j["data"]["total"], 0);
}

#[tokio::test]
async fn action_type_dropdown() {
    let app = test_app();
    let j = get_json(&app, "/action-types").await;
    assert_eq!(j["code"], 200);
    let options = j["data"].as_array().unwrap();
    assert_eq!(options.len(), 6);
    assert_eq!(options[0], json!({ "value": "all", "label": "All Types" }));
    assert_eq!(
        options[3],
        json!({ "value": "quarantineOutgoing", "label": "Quarantine Outgoing" })
    );
}
