// Bearer-token payload decoding. Nothing here fails outward: malformed
// tokens degrade to empty claims, which callers read as "no identity".

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use tracing::debug;

use crate::domain::{Clock, DecodeError, NormalizedUser, TokenClaims};

#[derive(Clone)]
pub struct TokenCodec {
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn decode(&self, token: &str) -> TokenClaims {
        match try_decode(token) {
            Ok(claims) => claims,
            Err(err) => {
                debug!(error = %err, "failed to decode token");
                TokenClaims::default()
            }
        }
    }

    // Empty claims, a missing `exp`, or an `exp` in the past all count as expired.
    pub fn is_expired(&self, token: &str) -> bool {
        match self.decode(token).expires_at() {
            Some(exp) => exp < self.clock.now_epoch_seconds(),
            None => true,
        }
    }

    pub fn is_valid(&self, token: Option<&str>) -> bool {
        token.is_some_and(|token| !token.is_empty() && !self.is_expired(token))
    }

    // Seconds until expiry, or None when the token carries no expiry.
    pub fn remaining_seconds(&self, token: &str) -> Option<i64> {
        self.decode(token)
            .expires_at()
            .map(|exp| exp - self.clock.now_epoch_seconds())
    }

    pub fn extract_user_info(&self, token: &str) -> NormalizedUser {
        NormalizedUser::from_claims(&self.decode(token))
    }
}

fn try_decode(token: &str) -> Result<TokenClaims, DecodeError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(DecodeError::SegmentCount(segments.len()));
    }

    let bytes = STANDARD
        .decode(restore_padding(segments[1]))
        .map_err(|err| DecodeError::Base64(err.to_string()))?;

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(fields)) => Ok(TokenClaims::new(fields)),
        Ok(other) => Err(DecodeError::Payload(format!("found {other}"))),
        Err(err) => Err(DecodeError::Payload(err.to_string())),
    }
}

// Translate the URL-safe alphabet back to standard and pad to a multiple of 4.
fn restore_padding(segment: &str) -> String {
    let mut standard: String = segment
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    let missing = (4 - standard.len() % 4) % 4;
    standard.extend(std::iter::repeat_n('=', missing));
    standard
}
