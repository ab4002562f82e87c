//! HTTP API behaviour, driven through the router without a socket.

use std::net::SocketAddr;
use std::sync::Arc;

use agora_engine::{Engine, EngineConfig, EngineParts, LimitConfig};
use agora_events::UnsignedEvent;
use agora_nullables::{NullClock, NullNotifier, NullRelay};
use agora_rpc::{router, RpcState, CALLER_HEADER};
use agora_tally::{build_draft, StaticDirectory, VoteIntent};
use agora_types::{Cardinality, Election, EventKinds, Position, PublicKey, Timestamp};
use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

fn key(b: u8) -> PublicKey {
    PublicKey::new([b; 32])
}

const VOTER: u8 = 0x01;
const ADMIN: u8 = 0xAD;
const A: u8 = 0x0A;

struct App {
    router: Router,
    relay: Arc<NullRelay>,
}

fn app_with(config: EngineConfig) -> App {
    let relay = Arc::new(NullRelay::new());
    let election = Election {
        year: 2025,
        start_time: None,
        end_time: Timestamp::new(10_000),
        positions: vec![Position {
            position_type: "presidency".into(),
            title: "President".into(),
            icon: "crown".into(),
            cardinality: Cardinality::Single,
            candidates: vec![key(A), key(0x0B)],
        }],
    };
    let engine = Engine::new(
        &config,
        election,
        EngineParts {
            relay: relay.clone(),
            notifier: Arc::new(NullNotifier::new()),
            clock: Arc::new(NullClock::new(1_000)),
            directory: Arc::new(
                StaticDirectory::new()
                    .with_member(key(VOTER), "full")
                    .with_member(key(ADMIN), "full"),
            ),
        },
    )
    .unwrap();
    let router = router(Arc::new(RpcState::new(Arc::new(engine), 64)))
        .layer(MockConnectInfo(SocketAddr::from(([203, 0, 113, 5], 40_000))));
    App { router, relay }
}

fn app() -> App {
    app_with(EngineConfig {
        admins: vec![key(ADMIN).to_hex()],
        ..EngineConfig::default()
    })
}

async fn call(
    router: &Router,
    method: Method,
    uri: &str,
    caller: Option<u8>,
    body: Option<Value>,
) -> (StatusCode, axum::http::HeaderMap, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(caller) = caller {
        request = request.header(CALLER_HEADER, key(caller).to_hex());
    }
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = router
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, value)
}

fn draft_body() -> Value {
    json!({ "candidate": key(A).to_hex(), "position": "presidency" })
}

#[tokio::test]
async fn election_summary_is_public() {
    let app = app();
    let (status, _, body) = call(&app.router, Method::GET, "/election", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["year"], 2025);
    assert_eq!(body["state"], "open");
    assert_eq!(body["positions"][0]["type"], "presidency");
}

#[tokio::test]
async fn standings_need_a_caller() {
    let app = app();
    let (status, _, body) = call(&app.router, Method::GET, "/standings", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "not authorized");
}

#[tokio::test]
async fn garbled_caller_header_is_a_bad_request() {
    let app = app();
    let request = Request::builder()
        .uri("/standings")
        .header(CALLER_HEADER, "not-hex")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn draft_sign_publish_and_see_it_counted() {
    let app = app();
    let (status, _, draft) = call(
        &app.router,
        Method::POST,
        "/votes/draft",
        Some(VOTER),
        Some(draft_body()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let draft: UnsignedEvent = serde_json::from_value(draft).unwrap();
    assert_eq!(draft.pubkey, key(VOTER));
    let signed = draft.into_signed("ab".repeat(64));

    let (status, _, published) = call(
        &app.router,
        Method::POST,
        "/votes",
        Some(VOTER),
        Some(serde_json::to_value(&signed).unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(published["id"], signed.id.to_hex());
    assert_eq!(app.relay.published().len(), 1);

    let (status, _, standings) =
        call(&app.router, Method::GET, "/standings", Some(VOTER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(standings["stale"], false);
    assert_eq!(standings["positions"][0]["candidates"][0]["votes"], 1);
    assert_eq!(standings["positions"][0]["viewer_voted"], true);
}

#[tokio::test]
async fn unknown_candidate_is_unprocessable() {
    let app = app();
    let body = json!({ "candidate": key(0x77).to_hex(), "position": "presidency" });
    let (status, _, _) = call(&app.router, Method::POST, "/votes/draft", Some(VOTER), Some(body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn draft_budget_is_per_origin() {
    let app = app_with(EngineConfig {
        submission_limit: LimitConfig {
            max_attempts: 1,
            window_secs: 900,
        },
        ..EngineConfig::default()
    });
    let (status, _, _) = call(&app.router, Method::POST, "/votes/draft", Some(VOTER), Some(draft_body())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, headers, _) =
        call(&app.router, Method::POST, "/votes/draft", Some(VOTER), Some(draft_body())).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(headers[header::RETRY_AFTER], "900");
}

#[tokio::test]
async fn publishing_draws_on_the_origin_budget() {
    let app = app_with(EngineConfig {
        submission_limit: LimitConfig {
            max_attempts: 1,
            window_secs: 600,
        },
        ..EngineConfig::default()
    });
    let signed = build_draft(
        &VoteIntent {
            voter: key(VOTER),
            year: 2025,
            candidate: key(A),
            position: "presidency".into(),
            cardinality: Cardinality::Single,
        },
        &EventKinds::default(),
        Timestamp::new(1_000),
    )
    .into_signed("ab".repeat(64));
    let body = serde_json::to_value(&signed).unwrap();

    let (status, _, _) = call(&app.router, Method::POST, "/votes", Some(VOTER), Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, headers, _) = call(&app.router, Method::POST, "/votes", Some(VOTER), Some(body)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(headers[header::RETRY_AFTER], "600");
    assert_eq!(app.relay.published().len(), 1);
}

#[tokio::test]
async fn login_reports_role() {
    let app = app();
    let body = json!({ "pubkey": key(ADMIN).to_hex() });
    let (status, _, reply) = call(&app.router, Method::POST, "/auth/login", None, Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["role"], "admin");

    let body = json!({ "pubkey": key(VOTER).to_hex() });
    let (_, _, reply) = call(&app.router, Method::POST, "/auth/login", None, Some(body)).await;
    assert_eq!(reply["role"], "voter");
}

#[tokio::test]
async fn admin_switch_and_log() {
    let app = app();
    let off = json!({ "enabled": false });

    let (status, _, _) = call(&app.router, Method::PUT, "/admin/voting", Some(VOTER), Some(off.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let uri = format!("/admin/voters/{}/log", key(VOTER).to_hex());
    let (status, _, log) = call(&app.router, Method::GET, &uri, Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(log, json!([]));

    let (status, _, reply) = call(&app.router, Method::PUT, "/admin/voting", Some(ADMIN), Some(off)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["state"], "closed");

    let (status, _, _) = call(&app.router, Method::POST, "/votes/draft", Some(VOTER), Some(draft_body())).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn relay_outage_before_first_board_is_unavailable() {
    let app = app();
    app.relay.go_down("connection refused");
    let (status, _, body) = call(&app.router, Method::GET, "/standings", Some(VOTER), None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("connection refused"));

    app.relay.restore();
    let (status, _, _) = call(&app.router, Method::GET, "/standings", Some(VOTER), None).await;
    assert_eq!(status, StatusCode::OK);

    app.relay.go_down("connection refused");
    let (status, _, body) = call(&app.router, Method::GET, "/standings", Some(VOTER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stale"], true);
}
