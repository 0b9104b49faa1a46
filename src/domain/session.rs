use crate::domain::claims::NormalizedUser;

// Seconds before expiry at which an authenticated session turns `Expiring`.
pub const EXPIRY_WARNING_SECONDS: i64 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    // No validation attempted yet.
    Unknown,
    Anonymous,
    Authenticated,
    // Authenticated, but within the warning window before expiry.
    Expiring,
}

/// Point-in-time view of the session, published to subscribers on every
/// change. `user` is present iff `raw_token` is present and was not expired
/// at the last validation.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub user: Option<NormalizedUser>,
    pub raw_token: Option<String>,
    pub remaining_seconds: Option<i64>,
    // Set when the session ended because its token ran out.
    pub expired: bool,
}

impl SessionSnapshot {
    pub fn unknown() -> Self {
        Self {
            status: SessionStatus::Unknown,
            user: None,
            raw_token: None,
            remaining_seconds: None,
            expired: false,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            status: SessionStatus::Anonymous,
            ..Self::unknown()
        }
    }

    pub fn expired() -> Self {
        Self {
            expired: true,
            ..Self::anonymous()
        }
    }

    pub fn authenticated(user: NormalizedUser, raw_token: String, remaining: Option<i64>) -> Self {
        let remaining = remaining.map(|seconds| seconds.max(0));
        Self {
            status: status_for(remaining),
            user: Some(user),
            raw_token: Some(raw_token),
            remaining_seconds: remaining,
            expired: false,
        }
    }

    // Countdown update; keeps the status in step with the remaining time.
    pub fn set_remaining(&mut self, seconds: i64) {
        let remaining = Some(seconds.max(0));
        self.status = status_for(remaining);
        self.remaining_seconds = remaining;
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(
            self.status,
            SessionStatus::Authenticated | SessionStatus::Expiring
        )
    }

    // Initial validation has finished, whatever its outcome.
    pub fn is_resolved(&self) -> bool {
        self.status != SessionStatus::Unknown
    }
}

fn status_for(remaining: Option<i64>) -> SessionStatus {
    match remaining {
        Some(seconds) if seconds <= EXPIRY_WARNING_SECONDS => SessionStatus::Expiring,
        _ => SessionStatus::Authenticated,
    }
}

/// Renders a remaining-seconds count for display: `expired` at or below
/// zero, otherwise `H h M m S s` with leading zero units omitted.
pub fn format_remaining(seconds: i64) -> String {
    if seconds <= 0 {
        return "expired".to_string();
    }

    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}
