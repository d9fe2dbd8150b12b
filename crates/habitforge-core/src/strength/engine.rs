//! Day-by-day strength simulation over a habit's history.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::model::{DayState, Observation, StrengthModel, StrengthState};
use crate::config::AnalysisConfig;
use crate::day_boundary::{DayBoundary, HabitDay};
use crate::error::{Result, ValidationError};
use crate::habit::{CompletionOracle, HabitProfile, ScheduleOracle};

/// Strength on one scheduled day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrengthPoint {
    pub date: NaiveDate,
    /// Instant the habit day began
    pub day_start: DateTime<Utc>,
    pub strength: f64,
    pub is_in_streak: bool,
    pub streak_length: u32,
    pub state: DayState,
}

/// Outcome of one simulation pass.
#[derive(Debug, Clone)]
pub struct SimulationRun {
    pub model: StrengthModel,
    pub boundary: DayBoundary,
    /// State after the last simulated day, streaks still open
    pub final_state: StrengthState,
    /// One point per scheduled day, in order
    pub points: Vec<StrengthPoint>,
    pub first_day: Option<HabitDay>,
    pub last_day: Option<HabitDay>,
    /// Whether the pass stopped early on a failed calendar step
    pub truncated: bool,
}

/// Simulates strength from a habit's start to the analysis end.
pub struct StrengthEngine<'a> {
    schedule: &'a dyn ScheduleOracle,
    completions: &'a dyn CompletionOracle,
}

impl<'a> StrengthEngine<'a> {
    pub fn new(schedule: &'a dyn ScheduleOracle, completions: &'a dyn CompletionOracle) -> Self {
        Self {
            schedule,
            completions,
        }
    }

    /// Run the simulation over `[start_date, analysis_end)`.
    ///
    /// A habit without a start date yields an empty run at the model's
    /// initial state.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTimeRange`] when the analysis end
    /// precedes the habit's start, and a validation error for unusable config.
    pub fn simulate(&self, habit: &HabitProfile, config: &AnalysisConfig) -> Result<SimulationRun> {
        config.settings.validate()?;
        let boundary = config.day_boundary()?;
        let model = StrengthModel::new(habit.intensity, habit.is_bad_habit, &config.settings);
        let mut state = model.initial_state();

        let Some(start) = habit.start_date else {
            return Ok(SimulationRun {
                model,
                boundary,
                final_state: state,
                points: Vec::new(),
                first_day: None,
                last_day: None,
                truncated: false,
            });
        };
        if config.analysis_end < start {
            return Err(ValidationError::InvalidTimeRange {
                start,
                end: config.analysis_end,
            }
            .into());
        }

        tracing::debug!(
            habit = %habit.id,
            level = model.level().get(),
            bad_habit = model.is_bad_habit(),
            %start,
            end = %config.analysis_end,
            "simulating habit strength"
        );

        let mut points = Vec::new();
        let mut first_day = None;
        let mut last_day = None;
        let mut days = boundary.days(start, config.analysis_end);

        for day in days.by_ref() {
            first_day.get_or_insert(day);
            last_day = Some(day);

            if !self.schedule.is_active(habit, &day) {
                model.apply_unscheduled(&mut state);
                tracing::trace!(date = %day.date, strength = state.strength, "not scheduled");
                continue;
            }

            let observation = self.observe(habit, &day, &model, config);
            let day_state = model.apply_scheduled(&mut state, observation);
            tracing::trace!(date = %day.date, ?day_state, strength = state.strength, "scheduled");

            points.push(StrengthPoint {
                date: day.date,
                day_start: day.start,
                strength: state.strength,
                is_in_streak: state.in_streak,
                streak_length: state.streak_length,
                state: day_state,
            });
        }

        let truncated = days.was_truncated();
        tracing::debug!(
            habit = %habit.id,
            scheduled_days = points.len(),
            strength = state.strength,
            peak = state.peak,
            truncated,
            "simulation finished"
        );

        Ok(SimulationRun {
            model,
            boundary,
            final_state: state,
            points,
            first_day,
            last_day,
            truncated,
        })
    }

    fn observe(
        &self,
        habit: &HabitProfile,
        day: &HabitDay,
        model: &StrengthModel,
        config: &AnalysisConfig,
    ) -> Observation {
        if self.completions.is_completed(habit, day) {
            return Observation::Occurred;
        }
        if config.settings.features.partial_credit && !model.is_bad_habit() {
            if let Some(fraction) = self.completions.completion_fraction(habit, day) {
                if fraction > 0.0 && fraction < 1.0 {
                    return Observation::Partial(fraction);
                }
            }
        }
        Observation::Absent
    }
}
