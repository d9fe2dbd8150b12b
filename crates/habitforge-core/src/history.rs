//! In-memory habit history: reference implementations of the host oracles.
//!
//! Hosts with their own storage implement [`ScheduleOracle`],
//! [`CompletionOracle`] and [`StreakLedger`] directly. The types here back the
//! CLI and tests, and define the JSON history document the CLI reads.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::config::AnalysisConfig;
use crate::day_boundary::{DayBoundary, HabitDay};
use crate::error::Result;
use crate::habit::{CompletionOracle, HabitOracles, HabitProfile, ScheduleOracle, StreakLedger};
use crate::insight::{compute_insight_report, InsightReport};

/// Recurrence rule deciding which habit days are scheduled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleRule {
    /// Every day
    #[default]
    Daily,
    /// Selected weekdays (0=Sun ... 6=Sat)
    Weekdays { days: Vec<u8> },
    /// Every `interval` days counting from `anchor`
    EveryNDays { interval: u32, anchor: NaiveDate },
}

impl ScheduleRule {
    pub fn is_scheduled_on(&self, date: NaiveDate) -> bool {
        match self {
            ScheduleRule::Daily => true,
            ScheduleRule::Weekdays { days } => {
                let weekday = date.weekday().num_days_from_sunday();
                days.iter().any(|&d| u32::from(d) == weekday)
            }
            ScheduleRule::EveryNDays { interval, anchor } => {
                let elapsed = (date - *anchor).num_days();
                elapsed >= 0 && elapsed % i64::from((*interval).max(1)) == 0
            }
        }
    }
}

impl ScheduleOracle for ScheduleRule {
    fn is_active(&self, _habit: &HabitProfile, day: &HabitDay) -> bool {
        self.is_scheduled_on(day.date)
    }
}

/// Completion records keyed by habit-day date.
///
/// For bad habits a recorded date is a lapse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionLog {
    #[serde(default)]
    pub completed: BTreeSet<NaiveDate>,
    /// Fractional progress on days that were not fully completed
    #[serde(default)]
    pub partial: BTreeMap<NaiveDate, f64>,
}

impl CompletionLog {
    pub fn from_dates(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            completed: dates.into_iter().collect(),
            partial: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, date: NaiveDate) {
        self.partial.remove(&date);
        self.completed.insert(date);
    }

    pub fn record_partial(&mut self, date: NaiveDate, fraction: f64) {
        self.partial.insert(date, fraction.clamp(0.0, 1.0));
    }

    pub fn is_completed_on(&self, date: NaiveDate) -> bool {
        self.completed.contains(&date)
    }
}

impl CompletionOracle for CompletionLog {
    fn is_completed(&self, _habit: &HabitProfile, day: &HabitDay) -> bool {
        self.is_completed_on(day.date)
    }

    fn completion_fraction(&self, _habit: &HabitProfile, day: &HabitDay) -> Option<f64> {
        if self.completed.contains(&day.date) {
            Some(1.0)
        } else {
            self.partial.get(&day.date).copied()
        }
    }
}

/// Calendar streaks derived from a schedule and a completion log.
///
/// Unscheduled days neither extend nor break a streak. The current streak
/// counts back from the last habit day starting before `as_of`; that day does
/// not break the streak while it is still in progress.
pub struct LedgerFromLog<'a> {
    boundary: DayBoundary,
    schedule: &'a ScheduleRule,
    log: &'a CompletionLog,
    through: DateTime<Utc>,
    best_streak_record: u32,
}

impl<'a> LedgerFromLog<'a> {
    pub fn new(
        boundary: DayBoundary,
        schedule: &'a ScheduleRule,
        log: &'a CompletionLog,
        through: DateTime<Utc>,
    ) -> Self {
        Self {
            boundary,
            schedule,
            log,
            through,
            best_streak_record: 0,
        }
    }

    /// Best streak the host remembers from before the current log.
    pub fn with_best_streak_record(mut self, record: u32) -> Self {
        self.best_streak_record = record;
        self
    }

    fn is_success(&self, habit: &HabitProfile, date: NaiveDate) -> bool {
        self.log.is_completed_on(date) != habit.is_bad_habit
    }

    fn first_date(&self, habit: &HabitProfile) -> Option<NaiveDate> {
        habit
            .start_date
            .and_then(|start| self.boundary.habit_day(start))
            .map(|day| day.date)
    }
}

impl StreakLedger for LedgerFromLog<'_> {
    fn current_streak(&self, habit: &HabitProfile, as_of: DateTime<Utc>) -> u32 {
        let (Some(first), Some(today)) =
            (self.first_date(habit), self.boundary.last_day_before(as_of))
        else {
            return 0;
        };

        let mut streak = 0;
        let days = std::iter::successors(Some(today), |d| self.boundary.previous_day(d))
            .take_while(|d| d.date >= first);
        for day in days {
            if !self.schedule.is_scheduled_on(day.date) {
                continue;
            }
            if self.is_success(habit, day.date) {
                streak += 1;
            } else if day.date != today.date {
                break;
            }
        }
        streak
    }

    fn longest_streak(&self, habit: &HabitProfile) -> u32 {
        let Some(start) = habit.start_date else {
            return 0;
        };
        if self.through < start {
            return 0;
        }

        let mut longest = 0;
        let mut run = 0;
        for day in self.boundary.days(start, self.through) {
            if !self.schedule.is_scheduled_on(day.date) {
                continue;
            }
            if self.is_success(habit, day.date) {
                run += 1;
                longest = longest.max(run);
            } else {
                run = 0;
            }
        }
        longest
    }

    fn best_streak_ever(&self, habit: &HabitProfile) -> u32 {
        self.longest_streak(habit).max(self.best_streak_record)
    }
}

/// A habit with its schedule and completion records, as read by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitHistory {
    pub habit: HabitProfile,
    #[serde(default)]
    pub schedule: ScheduleRule,
    #[serde(default)]
    pub log: CompletionLog,
    #[serde(default)]
    pub best_streak_record: u32,
}

impl HabitHistory {
    pub fn new(habit: HabitProfile, schedule: ScheduleRule, log: CompletionLog) -> Self {
        Self {
            habit,
            schedule,
            log,
            best_streak_record: 0,
        }
    }

    /// Read a history document from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Streak ledger over this history as of the analysis end.
    pub fn ledger(&self, config: &AnalysisConfig) -> Result<LedgerFromLog<'_>> {
        let boundary = config.day_boundary()?;
        Ok(
            LedgerFromLog::new(boundary, &self.schedule, &self.log, config.analysis_end)
                .with_best_streak_record(self.best_streak_record),
        )
    }

    /// Run the full insight computation over this history.
    pub fn report(&self, config: &AnalysisConfig) -> Result<InsightReport> {
        let ledger = self.ledger(config)?;
        let oracles = HabitOracles::new(&self.schedule, &self.log, &ledger);
        compute_insight_report(&self.habit, config, oracles)
    }
}
