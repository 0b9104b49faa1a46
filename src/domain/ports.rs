use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::{Map, Value};

use crate::domain::errors::ClientError;

// Port for retrieving the current time.
pub trait Clock: Send + Sync {
    fn now_epoch_seconds(&self) -> i64;
    // Wall-clock time in the user's zone, without an offset.
    fn now_local(&self) -> NaiveDateTime;
}

// Port for the client-local persistent key-value area.
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, String>;
    fn set(&self, key: &str, value: &str) -> Result<(), String>;
    fn remove(&self, key: &str) -> Result<(), String>;
}

// Port for moving the user to another section.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

/// Parsed response body with any `Authorization` response-header token
/// merged in under `token`.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiResponse {
    body: Value,
}

impl ApiResponse {
    pub fn new(body: Value, header_token: Option<String>) -> Self {
        let body = match (body, header_token) {
            (Value::Object(mut fields), Some(token)) => {
                fields.insert("token".to_string(), Value::String(token));
                Value::Object(fields)
            }
            // Non-object bodies cannot carry the token; wrap them.
            (other, Some(token)) => {
                let mut fields = Map::new();
                fields.insert("data".to_string(), other);
                fields.insert("token".to_string(), Value::String(token));
                Value::Object(fields)
            }
            (body, None) => body,
        };
        Self { body }
    }

    pub fn empty() -> Self {
        Self::new(Value::Object(Map::new()), None)
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn into_body(self) -> Value {
        self.body
    }

    // Token carried by the body or the authorization header.
    pub fn token(&self) -> Option<&str> {
        self.body
            .get("token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
    }

    // Explicit user object, if the response carries a non-empty one.
    pub fn user_fields(&self) -> Option<&Map<String, Value>> {
        self.body
            .get("user")
            .and_then(Value::as_object)
            .filter(|fields| !fields.is_empty())
    }
}

// Port for the backend REST surface. Implementations attach auth headers
// and normalize success and error bodies.
#[async_trait]
pub trait ApiGateway: Send + Sync {
    async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        explicit_token: Option<&str>,
    ) -> Result<ApiResponse, ClientError>;
}
