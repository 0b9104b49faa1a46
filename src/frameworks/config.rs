use std::{env, path::PathBuf};

// Runtime configuration read from the environment (and `.env`, if present).

pub fn api_base_url() -> String {
    env::var("RESERVATION_API_URL")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "http://localhost:8080".to_string())
}

// Where persisted client state lives; `None` means memory only.
pub fn session_dir() -> Option<PathBuf> {
    env::var("RESERVATION_SESSION_DIR")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            env::var("HOME")
                .ok()
                .filter(|home| !home.is_empty())
                .map(|home| PathBuf::from(home).join(".reservation_client"))
        })
}

pub fn reservation_offset_minutes() -> i64 {
    env::var("RESERVATION_OFFSET_MINUTES")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(crate::use_cases::reservation_flow::DEFAULT_OFFSET_MINUTES)
}
