use chrono::{Local, NaiveDateTime, Utc};

use crate::domain::Clock;

// Wall clock backed by the operating system.
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_seconds(&self) -> i64 {
        Utc::now().timestamp()
    }

    fn now_local(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}
