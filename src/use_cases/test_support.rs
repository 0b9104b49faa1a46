use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, NaiveDateTime};
use serde_json::Value;
use tokio::sync::Notify;

use crate::domain::{
    ApiGateway, ApiResponse, ClientError, Clock, HttpMethod, KeyValueStorage, Navigator,
};

pub(crate) const NOW: i64 = 1_700_000_000;

// Builds an unsigned token whose payload segment carries `claims`.
pub(crate) fn make_token(claims: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

// Shared fixed time source for deterministic use-case tests.
pub(crate) struct FixedClock(pub(crate) i64);

impl Clock for FixedClock {
    fn now_epoch_seconds(&self) -> i64 {
        self.0
    }

    fn now_local(&self) -> NaiveDateTime {
        DateTime::from_timestamp(self.0, 0)
            .unwrap_or_default()
            .naive_utc()
    }
}

// Time source that follows tokio's clock, so paused-time tests can move
// the epoch forward with `tokio::time::advance` or a sleep.
#[derive(Clone)]
pub(crate) struct VirtualClock {
    base: i64,
    started: tokio::time::Instant,
}

impl VirtualClock {
    pub(crate) fn new(base: i64) -> Self {
        Self {
            base,
            started: tokio::time::Instant::now(),
        }
    }
}

impl Clock for VirtualClock {
    fn now_epoch_seconds(&self) -> i64 {
        self.base + self.started.elapsed().as_secs() as i64
    }

    fn now_local(&self) -> NaiveDateTime {
        DateTime::from_timestamp(self.now_epoch_seconds(), 0)
            .unwrap_or_default()
            .naive_utc()
    }
}

#[derive(Clone, Copy, Default)]
pub(crate) struct FailureFlags {
    pub get: bool,
    pub set: bool,
    pub remove: bool,
}

// Map-backed storage that can be told to fail.
#[derive(Clone, Default)]
pub(crate) struct FlakyStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
    failures: FailureFlags,
}

impl FlakyStorage {
    pub(crate) fn with_failures(mut self, failures: FailureFlags) -> Self {
        self.failures = failures;
        self
    }

    pub(crate) fn insert_raw(&self, key: &str, value: &str) {
        let mut guard = self.entries.lock().expect("entries mutex poisoned");
        guard.insert(key.to_string(), value.to_string());
    }
}

impl KeyValueStorage for FlakyStorage {
    fn get(&self, key: &str) -> Result<Option<String>, String> {
        if self.failures.get {
            return Err("get failed".to_string());
        }
        let guard = self.entries.lock().expect("entries mutex poisoned");
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        if self.failures.set {
            return Err("set failed".to_string());
        }
        self.insert_raw(key, value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), String> {
        if self.failures.remove {
            return Err("remove failed".to_string());
        }
        let mut guard = self.entries.lock().expect("entries mutex poisoned");
        guard.remove(key);
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct RecordedRequest {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Value>,
    pub token: Option<String>,
}

// Canned outcome for one gateway call.
#[derive(Clone)]
pub(crate) enum Scripted {
    Ok(Value),
    OkWithHeaderToken(Value, String),
    Api(u16, &'static str),
    Network,
}

// Gateway fake: records every call and replays scripted outcomes per path.
// Unscripted calls succeed with an empty object.
#[derive(Clone, Default)]
pub(crate) struct RecordingGateway {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    scripts: Arc<Mutex<HashMap<String, VecDeque<Scripted>>>>,
    hold: Option<Arc<Notify>>,
    in_flight: Arc<AtomicUsize>,
}

impl RecordingGateway {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    // Every call parks until the test calls `notify_one` on `gate`.
    pub(crate) fn with_hold(mut self, gate: Arc<Notify>) -> Self {
        self.hold = Some(gate);
        self
    }

    pub(crate) fn script(&self, path: &str, outcome: Scripted) {
        let mut guard = self.scripts.lock().expect("scripts mutex poisoned");
        guard.entry(path.to_string()).or_default().push_back(outcome);
    }

    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests mutex poisoned").clone()
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ApiGateway for RecordingGateway {
    async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        explicit_token: Option<&str>,
    ) -> Result<ApiResponse, ClientError> {
        self.requests
            .lock()
            .expect("requests mutex poisoned")
            .push(RecordedRequest {
                method,
                path: path.to_string(),
                body,
                token: explicit_token.map(str::to_string),
            });

        if let Some(gate) = &self.hold {
            self.in_flight.fetch_add(1, Ordering::SeqCst);
            gate.notified().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }

        let outcome = self
            .scripts
            .lock()
            .expect("scripts mutex poisoned")
            .get_mut(path)
            .and_then(VecDeque::pop_front);

        match outcome {
            None => Ok(ApiResponse::empty()),
            Some(Scripted::Ok(value)) => Ok(ApiResponse::new(value, None)),
            Some(Scripted::OkWithHeaderToken(value, token)) => {
                Ok(ApiResponse::new(value, Some(token)))
            }
            Some(Scripted::Api(status, message)) => Err(ClientError::Api {
                status,
                message: message.to_string(),
            }),
            Some(Scripted::Network) => Err(ClientError::Network("connection refused".into())),
        }
    }
}

// Navigator fake that keeps every requested path.
#[derive(Clone, Default)]
pub(crate) struct RecordingNavigator {
    visits: Arc<Mutex<Vec<String>>>,
}

impl RecordingNavigator {
    pub(crate) fn visits(&self) -> Vec<String> {
        self.visits.lock().expect("visits mutex poisoned").clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.visits
            .lock()
            .expect("visits mutex poisoned")
            .push(path.to_string());
    }
}
