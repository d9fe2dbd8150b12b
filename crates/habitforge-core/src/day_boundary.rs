//! Custom day boundaries.
//!
//! A habit day runs from `H:00` to the next `H:00` in the configured timezone,
//! so a 1 a.m. check-in with `H = 4` still counts for the previous evening.
//! Advancing from one habit day to the next goes through calendar dates, never
//! through fixed 86 400 second steps, so DST transitions shift the boundary
//! instant instead of drifting the label.

use chrono::{
    DateTime, Duration, FixedOffset, Local, LocalResult, NaiveDate, TimeZone, Utc,
};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Timezone used to resolve habit days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeZoneSetting {
    /// Coordinated universal time
    #[default]
    Utc,
    /// The host system's local zone, including its DST rules
    Local,
    /// A fixed offset from UTC
    Offset { offset_minutes: i32 },
}

/// One habit day: its calendar label and the instant it begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HabitDay {
    /// Calendar date the habit day is attributed to
    pub date: NaiveDate,
    /// Instant at which the habit day starts
    pub start: DateTime<Utc>,
}

/// Maps instants to habit days for a timezone and day-start hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayBoundary {
    timezone: TimeZoneSetting,
    day_start_hour: u32,
}

impl DayBoundary {
    /// Create a resolver. `day_start_hour` must be within `0..=23`.
    pub fn new(timezone: TimeZoneSetting, day_start_hour: u32) -> Result<Self, ValidationError> {
        if day_start_hour > 23 {
            return Err(ValidationError::invalid(
                "day_start_hour",
                format!("{day_start_hour} is outside 0..=23"),
            ));
        }
        Ok(Self {
            timezone,
            day_start_hour,
        })
    }

    pub fn timezone(&self) -> TimeZoneSetting {
        self.timezone
    }

    pub fn day_start_hour(&self) -> u32 {
        self.day_start_hour
    }

    /// Resolve the habit day containing `instant`.
    ///
    /// Shifts the instant back by the start hour, takes the calendar date of the
    /// shifted instant, then adds the start hour back onto that date's midnight.
    /// Returns `None` only when the zone has no midnight on that date.
    pub fn habit_day(&self, instant: DateTime<Utc>) -> Option<HabitDay> {
        match self.timezone {
            TimeZoneSetting::Utc => resolve(&Utc, instant, self.day_start_hour),
            TimeZoneSetting::Local => resolve(&Local, instant, self.day_start_hour),
            TimeZoneSetting::Offset { offset_minutes } => {
                let tz = FixedOffset::east_opt(offset_minutes.checked_mul(60)?)?;
                resolve(&tz, instant, self.day_start_hour)
            }
        }
    }

    /// The habit day labelled `date`.
    pub fn day_for_date(&self, date: NaiveDate) -> Option<HabitDay> {
        let start = match self.timezone {
            TimeZoneSetting::Utc => start_of(&Utc, date, self.day_start_hour),
            TimeZoneSetting::Local => start_of(&Local, date, self.day_start_hour),
            TimeZoneSetting::Offset { offset_minutes } => {
                let tz = FixedOffset::east_opt(offset_minutes.checked_mul(60)?)?;
                start_of(&tz, date, self.day_start_hour)
            }
        }?;
        Some(HabitDay { date, start })
    }

    /// The following habit day, or `None` if calendar arithmetic cannot produce one.
    pub fn next_day(&self, day: &HabitDay) -> Option<HabitDay> {
        let next = self.day_for_date(day.date.succ_opt()?)?;
        (next.start > day.start).then_some(next)
    }

    /// The preceding habit day, or `None` if calendar arithmetic cannot produce one.
    pub fn previous_day(&self, day: &HabitDay) -> Option<HabitDay> {
        let prev = self.day_for_date(day.date.pred_opt()?)?;
        (prev.start < day.start).then_some(prev)
    }

    /// The first habit day starting at or after `instant`.
    ///
    /// This is the first day a half-open range ending at `instant` leaves out.
    pub fn first_day_from(&self, instant: DateTime<Utc>) -> Option<HabitDay> {
        let day = self.habit_day(instant)?;
        if day.start < instant {
            self.next_day(&day)
        } else {
            Some(day)
        }
    }

    /// The last habit day starting strictly before `instant`.
    ///
    /// This is the last day a half-open range ending at `instant` covers.
    pub fn last_day_before(&self, instant: DateTime<Utc>) -> Option<HabitDay> {
        let day = self.habit_day(instant)?;
        if day.start < instant {
            Some(day)
        } else {
            self.previous_day(&day)
        }
    }

    /// Iterate habit days whose start lies in `[from's day, end)`.
    ///
    /// The first day is the habit day containing `from`. Iteration stops early,
    /// without error, if a calendar step fails.
    pub fn days(&self, from: DateTime<Utc>, end: DateTime<Utc>) -> HabitDays {
        HabitDays {
            boundary: *self,
            next: self.habit_day(from),
            end,
            truncated: false,
        }
    }
}

/// Iterator over consecutive habit days. See [`DayBoundary::days`].
#[derive(Debug, Clone)]
pub struct HabitDays {
    boundary: DayBoundary,
    next: Option<HabitDay>,
    end: DateTime<Utc>,
    truncated: bool,
}

impl HabitDays {
    /// Whether iteration stopped because a day could not be advanced.
    pub fn was_truncated(&self) -> bool {
        self.truncated
    }
}

impl Iterator for HabitDays {
    type Item = HabitDay;

    fn next(&mut self) -> Option<HabitDay> {
        let day = self.next.take()?;
        if day.start >= self.end {
            return None;
        }
        self.next = self.boundary.next_day(&day);
        if self.next.is_none() {
            tracing::warn!(date = %day.date, "could not advance past habit day; stopping early");
            self.truncated = true;
        }
        Some(day)
    }
}

fn resolve<Tz: TimeZone>(tz: &Tz, instant: DateTime<Utc>, hour: u32) -> Option<HabitDay> {
    let shifted = instant.checked_sub_signed(Duration::hours(i64::from(hour)))?;
    let date = shifted.with_timezone(tz).date_naive();
    let start = start_of(tz, date, hour)?;
    Some(HabitDay { date, start })
}

fn start_of<Tz: TimeZone>(tz: &Tz, date: NaiveDate, hour: u32) -> Option<DateTime<Utc>> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    let local_midnight = match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => return None,
    };
    let start = local_midnight.checked_add_signed(Duration::hours(i64::from(hour)))?;
    Some(start.with_timezone(&Utc))
}
