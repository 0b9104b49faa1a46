// Auth session manager: owns the in-memory session, keeps the session store
// in step with it, and runs the one-second expiry countdown.
//
// State flows Unknown -> (Anonymous | Authenticated); Authenticated turns
// Expiring inside the warning window and Anonymous (flagged expired) once
// the token runs out. Subscribers see every change through a watch channel.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::{
    ApiGateway, ApiResponse, AuthError, ClientError, Clock, EXPIRY_WARNING_SECONDS, HttpMethod,
    NormalizedUser, SessionSnapshot,
};
use crate::interface_adapters::protocol::{
    Credentials, LOGOUT_PATH, ME_PATH, Registration, SIGNIN_PATH, SIGNUP_PATH, SignUpRequest,
    json_body,
};
use crate::use_cases::session_store::SessionStore;
use crate::use_cases::token_codec::TokenCodec;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

pub struct AuthSessionManager {
    gateway: Arc<dyn ApiGateway>,
    store: SessionStore,
    codec: TokenCodec,
    clock: Arc<dyn Clock>,
    state_tx: Arc<watch::Sender<SessionSnapshot>>,
    // Serializes login, logout and validation so token and user never interleave.
    op_lock: Arc<tokio::sync::Mutex<()>>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    tick_interval: Duration,
}

impl AuthSessionManager {
    pub fn new(gateway: Arc<dyn ApiGateway>, store: SessionStore, clock: Arc<dyn Clock>) -> Self {
        let (state_tx, _state_rx) = watch::channel(SessionSnapshot::unknown());
        Self {
            gateway,
            store,
            codec: TokenCodec::new(clock.clone()),
            clock,
            state_tx: Arc::new(state_tx),
            op_lock: Arc::new(tokio::sync::Mutex::new(())),
            ticker: Mutex::new(None),
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state_tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state_tx.borrow().clone()
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn remembered_email(&self) -> Option<String> {
        self.store.recall_email()
    }

    // Restores the session persisted by a previous run, if it still holds.
    pub async fn init(&self) -> SessionSnapshot {
        self.validate().await
    }

    /// Re-checks the stored token against the identity endpoint. Success
    /// re-establishes the session with fresh user data; any failure clears
    /// all stored session data and leaves the session anonymous.
    pub async fn validate(&self) -> SessionSnapshot {
        let _guard = self.op_lock.lock().await;

        let Some(token) = self.store.load() else {
            self.reset(SessionSnapshot::anonymous());
            return self.snapshot();
        };

        if !self.codec.is_valid(Some(&token)) {
            debug!("stored token is expired or unreadable; clearing session");
            self.store.clear_session();
            // A readable token that ran out is reported as an expired session.
            let lapsed = self
                .codec
                .remaining_seconds(&token)
                .is_some_and(|left| left < 0);
            self.reset(if lapsed {
                SessionSnapshot::expired()
            } else {
                SessionSnapshot::anonymous()
            });
            return self.snapshot();
        }

        match self
            .gateway
            .send(HttpMethod::Get, ME_PATH, None, Some(&token))
            .await
        {
            Ok(response) => {
                let user = self.resolve_validated_user(&response, &token);
                self.store.save_user(&user);
                self.establish(user, token);
            }
            Err(err) => {
                warn!(error = %err, "auth validation failed; clearing session");
                self.store.clear_session();
                self.reset(SessionSnapshot::anonymous());
            }
        }

        self.snapshot()
    }

    #[tracing::instrument(name = "login", skip_all, fields(email = %credentials.email))]
    pub async fn login(
        &self,
        credentials: &Credentials,
        remember: bool,
    ) -> Result<NormalizedUser, ClientError> {
        let _guard = self
            .op_lock
            .try_lock()
            .map_err(|_| AuthError::OperationInFlight)?;

        let response = self
            .gateway
            .send(
                HttpMethod::Post,
                SIGNIN_PATH,
                Some(json_body(credentials)),
                None,
            )
            .await
            .inspect_err(|err| warn!(error = %err, "login request failed"))?;

        let token = response
            .token()
            .ok_or(AuthError::NoTokenReceived)?
            .to_string();

        let mut user = response
            .user_fields()
            .map(NormalizedUser::from_fields)
            .unwrap_or_default();
        if user.is_empty() {
            user = self.codec.extract_user_info(&token);
        }
        if user.is_empty() && !credentials.email.is_empty() {
            user = NormalizedUser::from_email(&credentials.email);
        }

        self.store.save(&token);
        self.store.save_user(&user);
        if remember {
            self.store.remember_email(&credentials.email);
        }

        self.establish(user.clone(), token);
        info!("login succeeded");
        Ok(user)
    }

    // Sign-up leaves the session untouched; backend failures pass through.
    pub async fn register(&self, registration: &Registration) -> Result<Value, ClientError> {
        let response = self
            .gateway
            .send(
                HttpMethod::Post,
                SIGNUP_PATH,
                Some(json_body(&SignUpRequest::from(registration))),
                None,
            )
            .await
            .inspect_err(|err| warn!(error = %err, "registration failed"))?;
        Ok(response.into_body())
    }

    /// Best-effort remote logout, then an unconditional local clear. Only a
    /// concurrent login or logout makes this fail.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let _guard = self
            .op_lock
            .try_lock()
            .map_err(|_| AuthError::OperationInFlight)?;

        if let Some(token) = self.store.load() {
            if let Err(err) = self
                .gateway
                .send(HttpMethod::Post, LOGOUT_PATH, Some(json!({})), Some(&token))
                .await
            {
                debug!(error = %err, "remote logout failed; clearing local session anyway");
            }
        }

        self.store.clear_session();
        self.reset(SessionSnapshot::anonymous());
        info!("logged out");
        Ok(())
    }

    // Stops the countdown without touching session state.
    pub fn shutdown(&self) {
        self.stop_countdown();
    }

    fn resolve_validated_user(&self, response: &ApiResponse, token: &str) -> NormalizedUser {
        let fresh = response
            .body()
            .as_object()
            .map(NormalizedUser::from_fields)
            .unwrap_or_default();

        let mut user = if !fresh.is_empty() {
            fresh
        } else if let Some(stored) = self.store.load_user().filter(|user| !user.is_empty()) {
            stored
        } else {
            self.codec.extract_user_info(token)
        };

        if user.exp.is_none() {
            user.exp = self.codec.decode(token).expires_at();
        }
        user
    }

    fn establish(&self, user: NormalizedUser, token: String) {
        self.stop_countdown();

        let expires_at = user.exp.or_else(|| self.codec.decode(&token).expires_at());
        let remaining = expires_at.map(|exp| exp - self.clock.now_epoch_seconds());
        self.state_tx.send_replace(SessionSnapshot::authenticated(
            user,
            token.clone(),
            remaining,
        ));

        if let Some(expires_at) = expires_at {
            self.start_countdown(token, expires_at);
        }
    }

    fn reset(&self, snapshot: SessionSnapshot) {
        self.stop_countdown();
        self.state_tx.send_replace(snapshot);
    }

    fn start_countdown(&self, token: String, expires_at: i64) {
        let task = tokio::spawn(countdown(
            self.state_tx.clone(),
            self.store.clone(),
            self.op_lock.clone(),
            self.clock.clone(),
            self.tick_interval,
            token,
            expires_at,
        ));

        if let Ok(mut slot) = self.ticker.lock() {
            if let Some(previous) = slot.replace(task) {
                previous.abort();
            }
        }
    }

    fn stop_countdown(&self) {
        if let Ok(mut slot) = self.ticker.lock() {
            if let Some(task) = slot.take() {
                task.abort();
            }
        }
    }
}

impl Drop for AuthSessionManager {
    fn drop(&mut self) {
        self.stop_countdown();
    }
}

// Recomputes the remaining time every tick for the session holding `token`.
// Exits once the token expires or another session replaces it.
async fn countdown(
    state_tx: Arc<watch::Sender<SessionSnapshot>>,
    store: SessionStore,
    op_lock: Arc<tokio::sync::Mutex<()>>,
    clock: Arc<dyn Clock>,
    tick_interval: Duration,
    token: String,
    expires_at: i64,
) {
    let mut interval = tokio::time::interval(tick_interval);
    // The first tick completes immediately.
    interval.tick().await;
    let mut warned = false;

    loop {
        interval.tick().await;
        let remaining = expires_at - clock.now_epoch_seconds();

        if remaining <= 0 {
            let mut ours = false;
            state_tx.send_if_modified(|snapshot| {
                if snapshot.raw_token.as_deref() != Some(token.as_str()) {
                    return false;
                }
                ours = true;
                *snapshot = SessionSnapshot::expired();
                true
            });
            if ours {
                warn!("token has expired");
                // A login or logout holding the lock owns the store; it
                // overwrites or clears the stale token itself.
                match op_lock.try_lock() {
                    Ok(_guard) => {
                        if store.load().as_deref() == Some(token.as_str()) {
                            store.clear_session();
                        }
                    }
                    Err(_) => debug!("session operation in flight; leaving store to it"),
                }
            }
            return;
        }

        if remaining <= EXPIRY_WARNING_SECONDS && !warned {
            warn!(remaining, "token is about to expire");
            warned = true;
        }

        let mut current = true;
        state_tx.send_if_modified(|snapshot| {
            if snapshot.raw_token.as_deref() != Some(token.as_str()) {
                current = false;
                return false;
            }
            snapshot.set_remaining(remaining);
            true
        });
        if !current {
            return;
        }
    }
}
