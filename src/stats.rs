//! Derived user state: level and activity streaks.

use chrono::{DateTime, Duration, Utc};

/// Points required per level step.
pub const POINTS_PER_LEVEL: u64 = 100;

/// Level for a point total: `floor(1 + points / 100)`.
pub fn level_for_points(total_points: u64) -> u64 {
    1 + total_points / POINTS_PER_LEVEL
}

/// How a streak moves when a user is seen again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreakChange {
    /// Seen again on the following day.
    Extend,
    /// A day or more was skipped; the streak restarts at 1.
    Restart,
    /// Same day; only `last_active` moves.
    Touch,
}

impl StreakChange {
    /// Whole days elapsed between `last_active` and `now`, floored.
    pub fn days_between(last_active: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
        let elapsed = now.signed_duration_since(last_active);
        elapsed.num_milliseconds().div_euclid(Duration::days(1).num_milliseconds())
    }

    pub fn between(last_active: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        match Self::days_between(last_active, now) {
            1 => StreakChange::Extend,
            d if d > 1 => StreakChange::Restart,
            _ => StreakChange::Touch,
        }
    }

    /// Streak value after applying this change to `current`.
    pub fn apply(self, current: u64) -> u64 {
        match self {
            StreakChange::Extend => current + 1,
            StreakChange::Restart => 1,
            StreakChange::Touch => current,
        }
    }
}
