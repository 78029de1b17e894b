//! Pure transition function of the interval search.

use adval_core::ValidationSettings;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Search direction. `Growing` → `Shrinking` happens at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Growing,
    Shrinking,
}

/// Result of feeding one round's rate into the search.
#[derive(Debug)]
pub enum Transition {
    /// Probe the next candidate (read it from the returned state).
    Probe(IntervalSearch),
    /// The current candidate cleared the threshold.
    Found(u64),
    /// Growth hit the ceiling and the shrink budget is spent.
    Exhausted,
    /// The deadline passed before a candidate cleared the threshold.
    TimedOut,
}

/// State of one interval search. Owned by a single run; every round
/// consumes it and, if the search goes on, returns the next state.
#[derive(Debug, Clone)]
pub struct IntervalSearch {
    original: u64,
    candidate: u64,
    phase: Phase,
    shrink_budget: i64,
    deadline: DateTime<Utc>,
    threshold: f64,
    growth: f64,
    shrink: f64,
    ceiling: u64,
}

fn scale(minutes: u64, multiplier: f64) -> u64 {
    ((minutes as f64) * multiplier).ceil() as u64
}

impl IntervalSearch {
    /// Start in `Growing` at the declared interval (floored to one minute).
    pub fn new(original_minutes: u64, settings: &ValidationSettings, deadline: DateTime<Utc>) -> Self {
        let original = original_minutes.max(1);
        Self {
            original,
            candidate: original,
            phase: Phase::Growing,
            shrink_budget: i64::from(settings.max_shrink_attempts),
            deadline,
            threshold: settings.interval_success_rate,
            growth: settings.growth_multiplier,
            shrink: settings.shrink_multiplier,
            ceiling: settings.max_interval_minutes,
        }
    }

    /// Interval (minutes) the next probe must use.
    pub fn candidate(&self) -> u64 {
        self.candidate
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn shrink_budget(&self) -> i64 {
        self.shrink_budget
    }

    /// Apply the rate measured at the current candidate.
    ///
    /// Priority: success, then deadline, then grow while the next length
    /// stays under the ceiling, then switch to shrinking from the original
    /// interval, then shrink while budget remains. The budget check is
    /// inclusive (`>= 0`), so one more shrink round runs after the counter
    /// reaches zero.
    pub fn advance(mut self, rate: f64, now: DateTime<Utc>) -> Transition {
        if rate > self.threshold {
            return Transition::Found(self.candidate);
        }
        if now > self.deadline {
            return Transition::TimedOut;
        }

        match self.phase {
            Phase::Growing => {
                // Each growth round lengthens the candidate by at least a minute.
                let next = scale(self.candidate, self.growth).max(self.candidate + 1);
                if next < self.ceiling {
                    self.candidate = next;
                } else {
                    self.phase = Phase::Shrinking;
                    self.shrink_budget -= 1;
                    self.candidate = scale(self.original, self.shrink).max(1);
                }
                Transition::Probe(self)
            }
            Phase::Shrinking => {
                if self.shrink_budget >= 0 {
                    self.shrink_budget -= 1;
                    self.candidate = scale(self.candidate, self.shrink).max(1);
                    Transition::Probe(self)
                } else {
                    Transition::Exhausted
                }
            }
        }
    }
}
