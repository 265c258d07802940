//! Game time: an opaque monotonic minute counter.
//!
//! The simulation only ever advances this counter; the calendar breakdown is
//! derived on demand for display and never stored. One tick = one minute.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const MINUTES_PER_HOUR: u64 = 60;
pub const HOURS_PER_DAY: u64 = 24;
pub const DAYS_PER_MONTH: u64 = 30;
pub const MONTHS_PER_YEAR: u64 = 12;

const MINUTES_PER_DAY: u64 = MINUTES_PER_HOUR * HOURS_PER_DAY;
const MINUTES_PER_MONTH: u64 = MINUTES_PER_DAY * DAYS_PER_MONTH;
const MINUTES_PER_YEAR: u64 = MINUTES_PER_MONTH * MONTHS_PER_YEAR;

/// Whole minutes since the epoch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameTime {
    pub total_minutes: u64,
}

/// Calendar decomposition of a [`GameTime`]. Year and month/day are
/// 1-based, hour and minute 0-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CalendarTime {
    pub year: u64,
    pub month: u64,
    pub day: u64,
    pub hour: u64,
    pub minute: u64,
}

impl GameTime {
    pub fn from_minutes(total_minutes: u64) -> Self {
        Self { total_minutes }
    }

    /// The epoch: year 1, month 1, day 1, 00:00.
    pub fn origin() -> Self {
        Self { total_minutes: 0 }
    }

    pub fn advance_minutes(&mut self, minutes: u64) {
        self.total_minutes += minutes;
    }

    pub fn calendar(&self) -> CalendarTime {
        let mut rest = self.total_minutes;
        let year = rest / MINUTES_PER_YEAR;
        rest %= MINUTES_PER_YEAR;
        let month = rest / MINUTES_PER_MONTH;
        rest %= MINUTES_PER_MONTH;
        let day = rest / MINUTES_PER_DAY;
        rest %= MINUTES_PER_DAY;
        let hour = rest / MINUTES_PER_HOUR;
        let minute = rest % MINUTES_PER_HOUR;
        CalendarTime {
            year: year + 1,
            month: month + 1,
            day: day + 1,
            hour,
            minute,
        }
    }
}

impl fmt::Display for GameTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.calendar();
        write!(
            f,
            "Y{} M{:02} D{:02} {:02}:{:02}",
            c.year, c.month, c.day, c.hour, c.minute
        )
    }
}
