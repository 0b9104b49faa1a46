// Fake reservation backend shared by the integration tests in one binary.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};

pub const PASSWORD: &str = "secret";
pub const HEADER_LOGIN_EMAIL: &str = "header@example.com";

// Base URL published once the server thread has bound its port.
static SERVER_URL: OnceLock<String> = OnceLock::new();
static SERVER_READY: OnceLock<()> = OnceLock::new();

// Start the fake backend (once per test binary) and return its base URL.
pub fn ensure_server() -> &'static str {
    SERVER_READY.get_or_init(|| {
        let published_url = Arc::new(OnceLock::<String>::new());
        let published_url_thread = Arc::clone(&published_url);
        // Own thread and runtime so the server outlives each `#[tokio::test]` runtime.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_url_thread.set(format!("http://{}", addr));
                axum::serve(listener, app()).await.expect("server failed");
            });
        });
        wait_for_server_url_and_readiness(published_url);
    });

    SERVER_URL
        .get()
        .expect("server url should be initialized")
        .as_str()
}

fn wait_for_server_url_and_readiness(published_url: Arc<OnceLock<String>>) {
    let base_url = loop {
        if let Some(url) = published_url.get() {
            break url.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };
    let _ = SERVER_URL.set(base_url.clone());

    let addr = base_url
        .strip_prefix("http://")
        .expect("base url should use http://");
    for _ in 0..100 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    panic!("server did not become ready in time");
}

pub fn now_epoch_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default()
}

// Unsigned token carrying `claims` in its payload segment.
pub fn make_token(claims: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

pub fn token_for(email: &str, ttl_seconds: i64) -> String {
    make_token(json!({
        "sub": email,
        "role": "ROLE_USER",
        "exp": now_epoch_seconds() + ttl_seconds
    }))
}

fn app() -> Router {
    Router::new()
        .route("/api/auth/signin", post(signin))
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/me", get(me))
        .route("/api/auth/logout", post(logout))
        .route("/api/restaurants", get(search_restaurants))
        .route("/api/restaurants/{id}", get(restaurant))
        .route("/api/v3/reservations/{id}", post(create_reservation))
        .route("/echo-auth", get(echo_auth))
        .route("/plain-error", get(plain_error))
        .route("/broken-json", get(broken_json))
        .route("/text", get(text))
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

async fn signin(Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    if body["password"] != PASSWORD {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid email or password", "error": "Unauthorized" })),
        )
            .into_response();
    }

    let token = token_for(&email, 3600);
    if email == HEADER_LOGIN_EMAIL {
        return (
            [(header::AUTHORIZATION, format!("Bearer {token}"))],
            Json(json!({})),
        )
            .into_response();
    }
    Json(json!({
        "token": token,
        "user": { "id": 7, "email": email, "memberType": "USER" }
    }))
    .into_response()
}

async fn signup(Json(body): Json<Value>) -> Response {
    (
        StatusCode::CREATED,
        Json(json!({ "email": body["email"], "memberType": body["memberType"] })),
    )
        .into_response()
}

async fn me(headers: HeaderMap) -> Response {
    match bearer(&headers) {
        Some(token) if token != "revoked" => {
            Json(json!({ "email": "diner@example.com", "role": "ROLE_USER" })).into_response()
        }
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Unauthorized" })),
        )
            .into_response(),
    }
}

async fn logout() -> Response {
    (StatusCode::OK, "bye").into_response()
}

fn restaurant_json(id: i64) -> Option<Value> {
    let (name, category, remaining) = match id {
        1 => ("Bibim House", "KOREAN", 2),
        2 => ("Sushi Bar", "JAPANESE", 0),
        3 => ("Pho Noodle", "VIETNAMESE", 5),
        _ => return None,
    };
    Some(json!({
        "id": id,
        "name": name,
        "address": "Seoul",
        "category": category,
        "maxTableCount": 10,
        "remainingTableCount": remaining
    }))
}

async fn search_restaurants(Query(params): Query<HashMap<String, String>>) -> Response {
    let content: Vec<Value> = (1..=3)
        .filter_map(restaurant_json)
        .filter(|restaurant| {
            params.get("name").is_none_or(|name| {
                restaurant["name"]
                    .as_str()
                    .is_some_and(|candidate| candidate.contains(name.as_str()))
            })
        })
        .collect();
    Json(json!({ "content": content, "totalElements": content.len() })).into_response()
}

async fn restaurant(Path(id): Path<i64>) -> Response {
    match restaurant_json(id) {
        Some(value) => Json(value).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Restaurant not found" })),
        )
            .into_response(),
    }
}

async fn create_reservation(
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if bearer(&headers).is_none() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Login required" })),
        )
            .into_response();
    }
    if id == 2 {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "message": "No available tables" })),
        )
            .into_response();
    }
    Json(json!({
        "reservationId": 77,
        "status": "CONFIRMED",
        "reservationTime": body["reservationTime"]
    }))
    .into_response()
}

async fn echo_auth(headers: HeaderMap) -> Response {
    Json(json!({ "authorization": bearer(&headers) })).into_response()
}

async fn plain_error() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        [(header::CONTENT_TYPE, "text/html")],
        "<h1>down</h1>",
    )
        .into_response()
}

async fn broken_json() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        "{oops",
    )
        .into_response()
}

async fn text() -> Response {
    (StatusCode::OK, "plain words").into_response()
}
