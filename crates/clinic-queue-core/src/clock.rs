//! Wall-clock source for projections.

use std::sync::Arc;

use chrono::NaiveDateTime;

/// Returns the current clinic wall-clock time.
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// The machine's local time.
pub fn local_clock() -> Clock {
    Arc::new(|| chrono::Local::now().naive_local())
}

/// A clock frozen at `at` (tests, replays).
pub fn fixed_clock(at: NaiveDateTime) -> Clock {
    Arc::new(move || at)
}
