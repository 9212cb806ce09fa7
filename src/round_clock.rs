//! Temporal state of a round, derived from wall-clock time alone.
//!
//! Nothing here is stored. Callers ask at the moment of each decision.

use crate::orm::rounds;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundState {
    /// `now < start_date`
    Upcoming,
    /// `start_date <= now <= end_date`
    Active,
    /// `now > end_date`
    Ended,
}

impl RoundState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundState::Upcoming => "UPCOMING",
            RoundState::Active => "ACTIVE",
            RoundState::Ended => "ENDED",
        }
    }
}

impl std::fmt::Display for RoundState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of a round with the given boundaries at `now`. Both boundaries are inclusive to `Active`.
pub fn state_between(
    start_date: NaiveDateTime,
    end_date: NaiveDateTime,
    now: NaiveDateTime,
) -> RoundState {
    if now < start_date {
        RoundState::Upcoming
    } else if now > end_date {
        RoundState::Ended
    } else {
        RoundState::Active
    }
}

/// State of `round` at `now`.
pub fn round_state(round: &rounds::Model, now: NaiveDateTime) -> RoundState {
    state_between(round.start_date, round.end_date, now)
}

/// Source of the current instant, in UTC.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Utc::now().naive_utc()
    }
}

/// A clock that only moves when told to. Used by tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    time: RwLock<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(initial: NaiveDateTime) -> Self {
        Self {
            time: RwLock::new(initial),
        }
    }

    pub fn set(&self, time: NaiveDateTime) {
        if let Ok(mut t) = self.time.write() {
            *t = time;
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut t) = self.time.write() {
            *t += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        match self.time.read() {
            Ok(t) => *t,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
