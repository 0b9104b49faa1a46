// Per-section access policy evaluated against the current session.
//
// Evaluation itself is pure; `enforce` adds the only side effects allowed:
// one navigation per distinct redirect and remembering the attempted path
// for a single post-login redirect.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::debug;

use crate::domain::{Navigator, Role, SessionSnapshot};
use crate::use_cases::session_store::SessionStore;

pub const HOME_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/auth/login";
pub const SIGNUP_PATH: &str = "/auth/signup";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccessPolicy {
    Public,
    AnonymousOnly,
    AuthenticatedOnly,
    RoleRequired(Vec<Role>),
}

impl AccessPolicy {
    pub fn owner() -> Self {
        AccessPolicy::RoleRequired(vec![Role::new("OWNER"), Role::new("ROLE_OWNER")])
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    // Initial validation has not finished; render nothing yet.
    Pending,
    Render,
    Redirect(String),
    AccessDenied,
}

/// Section table: `/auth/*` is for anonymous visitors, `/owner/*` needs an
/// owner role, `/` is public and every other section needs a session.
pub fn policy_for(path: &str) -> AccessPolicy {
    if path == HOME_PATH {
        AccessPolicy::Public
    } else if in_section(path, "/auth") {
        AccessPolicy::AnonymousOnly
    } else if in_section(path, "/owner") {
        AccessPolicy::owner()
    } else {
        AccessPolicy::AuthenticatedOnly
    }
}

fn in_section(path: &str, section: &str) -> bool {
    path == section
        || path
            .strip_prefix(section)
            .is_some_and(|rest| rest.starts_with('/'))
}

pub fn evaluate(policy: &AccessPolicy, session: &SessionSnapshot) -> GuardDecision {
    match policy {
        AccessPolicy::Public => GuardDecision::Render,
        AccessPolicy::AnonymousOnly => {
            if session.is_authenticated() {
                GuardDecision::Redirect(HOME_PATH.to_string())
            } else if session.is_resolved() {
                GuardDecision::Render
            } else {
                GuardDecision::Pending
            }
        }
        AccessPolicy::AuthenticatedOnly => require_session(session),
        AccessPolicy::RoleRequired(roles) => match require_session(session) {
            GuardDecision::Render => {
                let allowed = session
                    .user
                    .as_ref()
                    .and_then(|user| user.role())
                    .is_some_and(|role| role.matches_any(roles));
                debug!(allowed, "role check");
                if allowed {
                    GuardDecision::Render
                } else {
                    GuardDecision::AccessDenied
                }
            }
            other => other,
        },
    }
}

fn require_session(session: &SessionSnapshot) -> GuardDecision {
    if session.is_authenticated() {
        GuardDecision::Render
    } else if session.is_resolved() {
        GuardDecision::Redirect(LOGIN_PATH.to_string())
    } else {
        GuardDecision::Pending
    }
}

pub struct RouteGuard {
    navigator: Arc<dyn Navigator>,
    // Path to return to after the next successful login.
    pending_redirect: Mutex<Option<String>>,
    // Persisted copy of the pending path, so it outlives this process.
    store: SessionStore,
    // Last (location, target) pair we navigated for.
    last_navigation: Mutex<Option<(String, String)>>,
}

impl RouteGuard {
    pub fn new(navigator: Arc<dyn Navigator>, store: SessionStore) -> Self {
        Self {
            navigator,
            pending_redirect: Mutex::new(None),
            store,
            last_navigation: Mutex::new(None),
        }
    }

    pub fn enforce(
        &self,
        policy: &AccessPolicy,
        location: &str,
        session: &SessionSnapshot,
    ) -> GuardDecision {
        let decision = evaluate(policy, session);

        let Ok(mut last) = self.last_navigation.lock() else {
            return decision;
        };
        match &decision {
            GuardDecision::Redirect(target) => {
                let key = (location.to_string(), target.clone());
                if last.as_ref() != Some(&key) {
                    if target == LOGIN_PATH {
                        self.remember(location);
                    }
                    self.navigator.navigate(target);
                    *last = Some(key);
                }
            }
            _ => *last = None,
        }

        decision
    }

    // Section-table variant of `enforce`.
    pub fn enforce_path(&self, location: &str, session: &SessionSnapshot) -> GuardDecision {
        self.enforce(&policy_for(location), location, session)
    }

    // Where to go after login: the remembered path, once, else home.
    pub fn take_post_login_destination(&self) -> String {
        let remembered = self
            .pending_redirect
            .lock()
            .ok()
            .and_then(|mut pending| pending.take());
        // Always drained so a stale stored path cannot fire later.
        let stored = self.store.take_redirect();
        remembered
            .or(stored)
            .unwrap_or_else(|| HOME_PATH.to_string())
    }

    /// Re-enforces the section table whenever the session or the location
    /// changes. Returns once either sender is dropped.
    pub async fn follow(
        &self,
        mut location: watch::Receiver<String>,
        mut session: watch::Receiver<SessionSnapshot>,
    ) {
        loop {
            let current_location = location.borrow_and_update().clone();
            let current_session = session.borrow_and_update().clone();
            self.enforce_path(&current_location, &current_session);

            tokio::select! {
                changed = location.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                changed = session.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }
    }

    fn remember(&self, location: &str) {
        if let Ok(mut pending) = self.pending_redirect.lock() {
            *pending = Some(location.to_string());
        }
        self.store.remember_redirect(location);
    }
}
