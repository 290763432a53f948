//! Analytics model and related types
//!
//! Entity kinds, leaderboard periods and the payloads returned by the
//! view counter and leaderboard endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Type tag used to namespace cache keys and view counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Manga,
    Chapter,
    Page,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manga => "manga",
            Self::Chapter => "chapter",
            Self::Page => "page",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Leaderboard accumulation period
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardPeriod {
    #[default]
    All,
    Day,
    Week,
    Month,
}

impl LeaderboardPeriod {
    /// Parse a period, falling back to the all-time leaderboard for unknown values
    pub fn parse_lossy(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl fmt::Display for LeaderboardPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.pad("all"),
            Self::Day => f.pad("day"),
            Self::Week => f.pad("week"),
            Self::Month => f.pad("month"),
        }
    }
}

impl FromStr for LeaderboardPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            _ => Err(format!(
                "Invalid period: {s}. Valid values are: all, day, week, month"
            )),
        }
    }
}

/// A leaderboard window that is periodically reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardWindow {
    Day,
    Week,
    Month,
}

impl LeaderboardWindow {
    pub const ALL: [LeaderboardWindow; 3] = [Self::Day, Self::Week, Self::Month];

    /// Full lifetime of the window
    pub fn duration(&self) -> Duration {
        const HOUR: u64 = 60 * 60;
        match self {
            Self::Day => Duration::from_secs(24 * HOUR),
            Self::Week => Duration::from_secs(7 * 24 * HOUR),
            Self::Month => Duration::from_secs(30 * 24 * HOUR),
        }
    }

    pub fn period(&self) -> LeaderboardPeriod {
        match self {
            Self::Day => LeaderboardPeriod::Day,
            Self::Week => LeaderboardPeriod::Week,
            Self::Month => LeaderboardPeriod::Month,
        }
    }
}

impl fmt::Display for LeaderboardWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.period().fmt(f)
    }
}

impl FromStr for LeaderboardWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            _ => Err(format!(
                "Invalid window: {s}. Valid values are: day, week, month"
            )),
        }
    }
}

/// One leaderboard row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopMangaEntry {
    pub manga_id: i64,
    pub views: i64,
}

/// Query parameters for the popular manga endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct PopularQuery {
    /// Leaderboard period (all, day, week, month). Default: all
    #[serde(default)]
    pub period: Option<String>,
    /// Maximum number of results. Default: 10
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Reset status of a leaderboard window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowStatus {
    pub window: LeaderboardWindow,
    /// Seconds until the next reset is due, `None` when it is due now
    pub remaining_secs: Option<u64>,
    pub next_reset_at: Option<DateTime<Utc>>,
}

impl WindowStatus {
    pub fn new(window: LeaderboardWindow, remaining: Option<Duration>) -> Self {
        let next_reset_at = remaining
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .map(|d| Utc::now() + d);
        Self {
            window,
            remaining_secs: remaining.map(|d| d.as_secs()),
            next_reset_at,
        }
    }
}
