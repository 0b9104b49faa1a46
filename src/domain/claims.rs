use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// Decoded bearer-token payload. An empty map stands for "no identity".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TokenClaims(Map<String, Value>);

impl TokenClaims {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn subject(&self) -> Option<String> {
        text_field(&self.0, "sub")
    }

    // Raw role as carried by the token, casing and prefix untouched.
    pub fn role(&self) -> Option<String> {
        first_text(&self.0, &["role", "memberType", "permissions"])
    }

    // Missing or zero means the token must be treated as expired.
    pub fn expires_at(&self) -> Option<i64> {
        epoch_field(&self.0, "exp").filter(|exp| *exp != 0)
    }

    pub fn issued_at(&self) -> Option<i64> {
        epoch_field(&self.0, "iat")
    }
}

/// Canonical user shape shared by token-derived identities, login responses
/// and the cached user info in the session store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl NormalizedUser {
    /// Maps the field aliases seen across token payloads and backend user
    /// objects onto the canonical shape:
    /// id from `id | sub | user_id`, email from `email | sub`,
    /// role from `role | memberType | permissions`, `exp` passthrough.
    /// The name is the local part of the email-like value.
    pub fn from_fields(fields: &Map<String, Value>) -> Self {
        if fields.is_empty() {
            return Self::default();
        }

        let email = first_text(fields, &["email", "sub"]);
        let name = email
            .as_deref()
            .and_then(|value| value.split('@').next())
            .unwrap_or_default()
            .to_string();

        Self {
            id: first_text(fields, &["id", "sub", "user_id"]),
            email,
            name,
            role: first_text(fields, &["role", "memberType", "permissions"]),
            exp: epoch_field(fields, "exp"),
        }
    }

    pub fn from_claims(claims: &TokenClaims) -> Self {
        Self::from_fields(claims.fields())
    }

    // Last-resort identity when neither the response nor the token has one.
    pub fn from_email(email: &str) -> Self {
        Self {
            email: Some(email.to_string()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.email.is_none()
            && self.name.is_empty()
            && self.role.is_none()
            && self.exp.is_none()
    }

    pub fn role(&self) -> Option<Role> {
        self.role.as_deref().map(Role::new)
    }
}

/// Coarse permission label. Two roles are equivalent iff their upper-cased
/// forms are equal; the `ROLE_` prefix is not stripped, so `OWNER` and
/// `ROLE_OWNER` are different roles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Role(String);

impl Role {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn normalized(&self) -> String {
        self.0.to_uppercase()
    }

    pub fn matches(&self, other: &Role) -> bool {
        self.normalized() == other.normalized()
    }

    pub fn matches_any(&self, candidates: &[Role]) -> bool {
        candidates.iter().any(|candidate| self.matches(candidate))
    }
}

// Empty strings behave like absent values, as in the payloads we receive.
fn text_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(value) if !value.is_empty() => Some(value.clone()),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

fn first_text(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| text_field(fields, key))
}

fn epoch_field(fields: &Map<String, Value>, key: &str) -> Option<i64> {
    let value = fields.get(key)?;
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|seconds| seconds.floor() as i64))
}
