//! Habit profile and the host-owned oracles the engine queries.
//!
//! The engine never stores completion records. Hosts answer three questions
//! through these traits: is the habit scheduled on a habit day, did the tracked
//! event happen on it, and what do the host's own streak books say.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::day_boundary::HabitDay;
use crate::intensity::IntensityLevel;

/// Read-only description of a habit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitProfile {
    /// Host identifier
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// First instant the habit was tracked; `None` for a habit never started
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub intensity: IntensityLevel,
    /// Whether the habit is one being avoided
    #[serde(default)]
    pub is_bad_habit: bool,
}

impl HabitProfile {
    pub fn new(id: impl Into<String>, start_date: DateTime<Utc>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            start_date: Some(start_date),
            intensity: IntensityLevel::default(),
            is_bad_habit: false,
        }
    }

    pub fn with_intensity(mut self, level: u8) -> Self {
        self.intensity = IntensityLevel::new(level);
        self
    }

    pub fn bad_habit(mut self) -> Self {
        self.is_bad_habit = true;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Whether a habit is scheduled on a given habit day.
pub trait ScheduleOracle {
    fn is_active(&self, habit: &HabitProfile, day: &HabitDay) -> bool;
}

/// Whether the tracked event occurred on a habit day.
///
/// For bad habits `true` means the undesired act happened.
pub trait CompletionOracle {
    fn is_completed(&self, habit: &HabitProfile, day: &HabitDay) -> bool;

    /// Fraction of the day's target reached, when the host records one.
    fn completion_fraction(&self, _habit: &HabitProfile, _day: &HabitDay) -> Option<f64> {
        None
    }
}

/// The host's authoritative calendar-streak facts.
pub trait StreakLedger {
    fn current_streak(&self, habit: &HabitProfile, as_of: DateTime<Utc>) -> u32;
    fn longest_streak(&self, habit: &HabitProfile) -> u32;
    fn best_streak_ever(&self, habit: &HabitProfile) -> u32;
}

/// The three oracles a full insight computation needs.
#[derive(Clone, Copy)]
pub struct HabitOracles<'a> {
    pub schedule: &'a dyn ScheduleOracle,
    pub completions: &'a dyn CompletionOracle,
    pub streaks: &'a dyn StreakLedger,
}

impl<'a> HabitOracles<'a> {
    pub fn new(
        schedule: &'a dyn ScheduleOracle,
        completions: &'a dyn CompletionOracle,
        streaks: &'a dyn StreakLedger,
    ) -> Self {
        Self {
            schedule,
            completions,
            streaks,
        }
    }
}

impl std::fmt::Debug for HabitOracles<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HabitOracles").finish_non_exhaustive()
    }
}
