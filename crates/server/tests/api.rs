use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use migration::MigratorTrait;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::Engine;
use server::{ServerState, router};

async fn app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db)
        .timezone(chrono_tz::America::Lima)
        .build()
        .await
        .unwrap();
    router(ServerState {
        engine: Arc::new(engine),
    })
}

async fn send_raw(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, bytes) = send_raw(app, method, uri, body).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn purchase(app: &Router, usd_minor: i64, rate: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/accounts/desk/purchases",
        Some(json!({ "usd_minor": usd_minor, "rate": rate, "occurred_at": "2026-03-04T09:00:00-05:00" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

#[tokio::test]
async fn trade_flow_updates_the_ledger() {
    let app = app().await;
    purchase(&app, 10_000, "3.70").await;

    let (status, sale) = send(
        &app,
        Method::POST,
        "/accounts/desk/sales",
        Some(json!({ "usd_minor": 4_000, "rate": "3.75", "occurred_at": "2026-03-04T10:00:00-05:00" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sale["kind"], "sale");
    assert_eq!(sale["pen_minor"], 15_000);
    assert_eq!(sale["profit_minor"], 200);
    assert_eq!(sale["acquisition_rate"], "3.70");
    assert_eq!(sale["blocks_used"][0]["amount_minor"], 4_000);

    let (status, ledger) = send(&app, Method::GET, "/accounts/desk/ledger", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ledger["total_minor"], 6_000);
    assert_eq!(ledger["lots"][0]["rate"], "3.70");

    let (status, listed) = send(&app, Method::GET, "/accounts/desk/operations", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["operations"].as_array().unwrap().len(), 2);
    assert_eq!(listed["operations"][0]["kind"], "sale");
}

#[tokio::test]
async fn engine_errors_map_to_statuses() {
    let app = app().await;
    purchase(&app, 3_000, "3.70").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/accounts/desk/sales",
        Some(json!({ "usd_minor": 5_000, "rate": "3.75" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().starts_with("Insufficient funds"));

    let (status, _) = send(
        &app,
        Method::POST,
        "/accounts/desk/purchases",
        Some(json!({ "usd_minor": 100, "rate": "abc" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let uri = format!("/accounts/desk/operations/{}", uuid::Uuid::new_v4());
    let (status, _) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::GET,
        "/accounts/desk/operations?period=date",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn quote_and_rates() {
    let app = app().await;

    let (status, rates) = send(&app, Method::GET, "/accounts/desk/rates", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rates["buy"], "3.70");
    assert_eq!(rates["sell"], "3.75");
    assert_eq!(rates["official"], "3.72");

    let (status, rates) = send(
        &app,
        Method::PUT,
        "/accounts/desk/rates",
        Some(json!({ "buy": "3.684", "sell": "3.80" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rates["buy"], "3.68");

    purchase(&app, 5_000, "3.60").await;
    let (status, quote) = send(
        &app,
        Method::POST,
        "/accounts/desk/sales/quote",
        Some(json!({ "usd_minor": 7_000 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["rate"], "3.80");
    assert_eq!(quote["pen_minor"], 26_600);
    assert_eq!(quote["cost_minor"], 18_000);
    assert_eq!(quote["shortfall_minor"], 2_000);

    let (_, ledger) = send(&app, Method::GET, "/accounts/desk/ledger", None).await;
    assert_eq!(ledger["total_minor"], 5_000);
}

#[tokio::test]
async fn trash_restore_and_delete() {
    let app = app().await;
    let first = purchase(&app, 5_000, "3.60").await;
    purchase(&app, 2_000, "3.70").await;
    let id = first["id"].as_str().unwrap().to_string();

    let (status, entry) = send(
        &app,
        Method::DELETE,
        &format!("/accounts/desk/operations/{id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(entry["expires_at"].is_string());

    let (_, ledger) = send(&app, Method::GET, "/accounts/desk/ledger", None).await;
    assert_eq!(ledger["total_minor"], 2_000);

    let (_, trash) = send(&app, Method::GET, "/accounts/desk/trash", None).await;
    assert_eq!(trash["entries"].as_array().unwrap().len(), 1);

    let (status, restored) = send(
        &app,
        Method::POST,
        &format!("/accounts/desk/trash/{id}/restore"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(restored["deleted_at"].is_null());

    let (_, ledger) = send(&app, Method::GET, "/accounts/desk/ledger", None).await;
    assert_eq!(ledger["total_minor"], 7_000);

    // Live operations cannot be deleted permanently.
    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/accounts/desk/trash/{id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(
        &app,
        Method::DELETE,
        &format!("/accounts/desk/operations/{id}"),
        None,
    )
    .await;
    let (status, emptied) = send(&app, Method::DELETE, "/accounts/desk/trash", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(emptied["purged"], 1);
}

#[tokio::test]
async fn edit_receipt_and_stats() {
    let app = app().await;
    purchase(&app, 5_000, "3.60").await;
    purchase(&app, 5_000, "3.70").await;
    let (_, sale) = send(
        &app,
        Method::POST,
        "/accounts/desk/sales",
        Some(json!({ "usd_minor": 4_000, "rate": "3.80", "occurred_at": "2026-03-04T11:00:00-05:00" })),
    )
    .await;
    let id = sale["id"].as_str().unwrap().to_string();

    let (status, edited) = send(
        &app,
        Method::PATCH,
        &format!("/accounts/desk/operations/{id}"),
        Some(json!({ "usd_minor": 7_000 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["profit_minor"], 1_200);
    assert_eq!(edited["blocks_used"].as_array().unwrap().len(), 2);

    let (status, bytes) = send_raw(
        &app,
        Method::GET,
        &format!("/accounts/desk/operations/{id}/receipt"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.contains("Date: 04/03/2026 11:00:00"));
    assert!(text.contains("TOTAL: S/ 266.00"));

    let (status, stats) = send(&app, Method::GET, "/accounts/desk/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_profit_minor"], 1_200);
    assert_eq!(stats["sales"], 1);
    assert_eq!(stats["purchases"], 2);
    assert_eq!(stats["profit_by_weekday_minor"][2], 1_200);
    assert_eq!(stats["dollars_available_minor"], 3_000);
}
