//! Typed achievement requirements.
//!
//! A catalog row is turned into a [`Requirement`] once, then checked
//! against [`Facts`] gathered for the user. Checks are pure.

use crate::models::{Achievement, AchievementCategory, AchievementType, RequirementType, UserStats};

/// Rules that do not fit the count/streak shapes, keyed by achievement slug.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpecialRule {
    /// Some claim happened no later than `max_millis` after its event was created.
    ClaimWithinDuration { max_millis: i64 },
}

impl SpecialRule {
    pub const LIGHTNING_FAST_MILLIS: i64 = 60 * 60 * 1000;

    /// Rule registered for a slug, if any.
    pub fn for_slug(slug: &str) -> Option<SpecialRule> {
        match slug {
            "lightning-fast" => Some(SpecialRule::ClaimWithinDuration {
                max_millis: Self::LIGHTNING_FAST_MILLIS,
            }),
            _ => None,
        }
    }
}

/// Counter a count requirement compares against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Metric {
    EventsCreated,
    EventsAttended,
    /// Distinct events the user holds a claim for.
    DistinctEventsAttended,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Requirement {
    Count { metric: Metric, threshold: u64 },
    Streak { days: u64 },
    /// No time-limited rule exists; never satisfied.
    TimeLimited,
    Special(SpecialRule),
    /// A special achievement with no registered rule; never satisfied.
    Unsupported,
}

impl Requirement {
    pub fn for_achievement(achievement: &Achievement) -> Self {
        let threshold = u64::from(achievement.requirement_value);
        match achievement.requirement_type {
            RequirementType::Count => {
                let metric = match (achievement.achievement_type, achievement.category) {
                    (AchievementType::Creator, _) => Metric::EventsCreated,
                    (AchievementType::Participant, AchievementCategory::Attendance) => {
                        Metric::DistinctEventsAttended
                    }
                    (AchievementType::Participant, _) => Metric::EventsAttended,
                };
                Requirement::Count { metric, threshold }
            }
            RequirementType::Streak => Requirement::Streak { days: threshold },
            RequirementType::TimeLimited => Requirement::TimeLimited,
            RequirementType::Special => SpecialRule::for_slug(&achievement.slug)
                .map(Requirement::Special)
                .unwrap_or(Requirement::Unsupported),
        }
    }

    pub fn needs_distinct_events(&self) -> bool {
        matches!(
            self,
            Requirement::Count {
                metric: Metric::DistinctEventsAttended,
                ..
            }
        )
    }

    pub fn needs_claim_latencies(&self) -> bool {
        matches!(
            self,
            Requirement::Special(SpecialRule::ClaimWithinDuration { .. })
        )
    }

    /// Current value and target for requirements that accrue progress.
    fn measure(&self, facts: &Facts) -> Option<(u64, u64)> {
        match *self {
            Requirement::Count { metric, threshold } => {
                let current = match metric {
                    Metric::EventsCreated => facts.stats.events_created,
                    Metric::EventsAttended => facts.stats.events_attended,
                    Metric::DistinctEventsAttended => facts.distinct_events.unwrap_or(0),
                };
                Some((current, threshold))
            }
            Requirement::Streak { days } => Some((facts.stats.streak_days, days)),
            _ => None,
        }
    }

    pub fn is_met(&self, facts: &Facts) -> bool {
        match *self {
            Requirement::Special(SpecialRule::ClaimWithinDuration { max_millis }) => facts
                .claim_latencies_ms
                .iter()
                .any(|latency| *latency <= max_millis),
            Requirement::TimeLimited | Requirement::Unsupported => false,
            _ => self
                .measure(facts)
                .map(|(current, target)| current >= target)
                .unwrap_or(false),
        }
    }

    /// Partial progress percentage, below 100, for unmet measurable
    /// requirements. Zero when nothing has accrued or nothing can.
    pub fn progress(&self, facts: &Facts) -> u8 {
        match self.measure(facts) {
            Some((_, 0)) | None => 0,
            Some((current, target)) => (current.saturating_mul(100) / target).min(99) as u8,
        }
    }
}

/// What is known about a user during one evaluation.
#[derive(Clone, Debug)]
pub struct Facts {
    pub stats: UserStats,
    /// Loaded only if some requirement counts distinct events.
    pub distinct_events: Option<u64>,
    /// For each of the user's claims whose event still exists, milliseconds
    /// between event creation and the claim.
    pub claim_latencies_ms: Vec<i64>,
}

impl Facts {
    pub fn from_stats(stats: UserStats) -> Self {
        Self {
            stats,
            distinct_events: None,
            claim_latencies_ms: Vec::new(),
        }
    }
}
