//! Crisis episodes — labeled historical stress windows used for evaluation.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// A labeled historical stress window `[start, end]` (both inclusive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrisisEpisode {
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CrisisEpisode {
    pub fn new(name: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            name: name.into(),
            start,
            end,
        }
    }

    /// First date of the pre-episode warning window of `window_days` days.
    /// Saturates at `NaiveDate::MIN` for windows longer than the calendar.
    pub fn warning_start(&self, window_days: i64) -> NaiveDate {
        Duration::try_days(window_days)
            .and_then(|w| self.start.checked_sub_signed(w))
            .unwrap_or(NaiveDate::MIN)
    }

    /// True if `date` lies in `[start - window_days, start)`.
    pub fn in_pre_episode_window(&self, date: NaiveDate, window_days: i64) -> bool {
        date >= self.warning_start(window_days) && date < self.start
    }

    /// True if `date` lies in `[start, end]`.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}
