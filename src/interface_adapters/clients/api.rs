use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap};
use reqwest::{Method, StatusCode};
use serde_json::{Map, Value, json};
use tracing::{error, warn};

use crate::domain::{ApiGateway, ApiResponse, ClientError, HttpMethod};
use crate::use_cases::session_store::SessionStore;

/// reqwest-backed gateway to the reservation backend.
///
/// Attaches `Authorization: Bearer` from the explicit token or the stored
/// one, and normalizes bodies by content type. No retries and no timeout:
/// callers that need resilience wrap this client.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    store: SessionStore,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, store: SessionStore) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            store,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // Absolute URLs are used as-is; everything else is joined to the base.
    fn resolve(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl ApiGateway for ApiClient {
    async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        explicit_token: Option<&str>,
    ) -> Result<ApiResponse, ClientError> {
        let url = self.resolve(path);
        let mut request = self.http.request(to_method(method), &url);

        let token = explicit_token
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .or_else(|| self.store.load());
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|err| {
            error!(method = ?method, path = %path, error = %err, "request failed");
            ClientError::Network(err.to_string())
        })?;

        let status = response.status();
        let content_type = content_type(response.headers());
        let header_token = header_token(response.headers());
        let text = match response.text().await {
            Ok(text) => text,
            Err(err) => {
                warn!(path = %path, error = %err, "unreadable response body");
                String::new()
            }
        };

        if !status.is_success() {
            let message = error_message(status, &content_type, &text);
            warn!(method = ?method, path = %path, status = status.as_u16(), %message, "request rejected");
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(ApiResponse::new(
            parse_body(path, &content_type, &text),
            header_token,
        ))
    }
}

fn to_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

fn content_type(headers: &HeaderMap) -> String {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

// Token handed back in the `Authorization` response header, minus `Bearer `.
fn header_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ").unwrap_or(raw);
    (!token.is_empty()).then(|| token.to_string())
}

/// Success-body normalization: JSON is parsed, text is wrapped as
/// `{text}`, anything else (or a malformed JSON body) becomes `{}`.
pub(crate) fn parse_body(path: &str, content_type: &str, text: &str) -> Value {
    if content_type.contains("application/json") {
        match serde_json::from_str(text) {
            Ok(value) => value,
            Err(err) => {
                warn!(path = %path, error = %err, "malformed json response");
                Value::Object(Map::new())
            }
        }
    } else if content_type.contains("text/") {
        json!({ "text": text })
    } else {
        Value::Object(Map::new())
    }
}

// Preference: body `message`, then body `error`, then the status line.
pub(crate) fn error_message(status: StatusCode, content_type: &str, text: &str) -> String {
    let fallback = format!(
        "Error {}: {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    );
    if !content_type.contains("application/json") {
        return fallback;
    }

    let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(text) else {
        return fallback;
    };
    ["message", "error"]
        .iter()
        .find_map(|key| {
            fields
                .get(*key)
                .and_then(Value::as_str)
                .filter(|message| !message.is_empty())
        })
        .map(str::to_string)
        .unwrap_or(fallback)
}
