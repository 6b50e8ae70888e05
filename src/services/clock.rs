//! Wall clock

use chrono::NaiveDateTime;

/// Source of the current local time
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// The system's local time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}
