use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// Unit of a [`Period`], spelled the way detector documents spell it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeUnit {
    #[serde(alias = "Millis", alias = "MILLIS", alias = "ms")]
    Milliseconds,
    #[serde(alias = "SECONDS", alias = "s")]
    Seconds,
    #[serde(alias = "MINUTES", alias = "m")]
    Minutes,
    #[serde(alias = "HOURS", alias = "h")]
    Hours,
    #[serde(alias = "DAYS", alias = "d")]
    Days,
}

impl TimeUnit {
    fn millis(self) -> i64 {
        match self {
            TimeUnit::Milliseconds => 1,
            TimeUnit::Seconds => 1_000,
            TimeUnit::Minutes => 60_000,
            TimeUnit::Hours => 3_600_000,
            TimeUnit::Days => 86_400_000,
        }
    }
}

impl std::fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeUnit::Milliseconds => write!(f, "Milliseconds"),
            TimeUnit::Seconds => write!(f, "Seconds"),
            TimeUnit::Minutes => write!(f, "Minutes"),
            TimeUnit::Hours => write!(f, "Hours"),
            TimeUnit::Days => write!(f, "Days"),
        }
    }
}

/// A length of time as `interval × unit`.
///
/// Recommendations produced by the validation engine are always expressed
/// in [`TimeUnit::Minutes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    pub interval: u64,
    pub unit: TimeUnit,
}

impl Period {
    pub fn new(interval: u64, unit: TimeUnit) -> Self {
        Self { interval, unit }
    }

    pub fn minutes(interval: u64) -> Self {
        Self::new(interval, TimeUnit::Minutes)
    }

    pub fn to_millis(&self) -> i64 {
        i64::try_from(self.interval)
            .unwrap_or(i64::MAX)
            .saturating_mul(self.unit.millis())
    }

    pub fn to_delta(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.to_millis())
    }

    /// Whole minutes, rounded down. A 90-second period is one minute.
    pub fn to_minutes(&self) -> u64 {
        (self.to_millis() / 60_000) as u64
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.interval, self.unit)
    }
}

/// Detector documents wrap periods as `{"period": {"interval": .., "unit": ..}}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeConfig {
    pub period: Period,
}

impl From<Period> for TimeConfig {
    fn from(period: Period) -> Self {
        Self { period }
    }
}
