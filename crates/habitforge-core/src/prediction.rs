//! Forward projections from a finished simulation.
//!
//! Projections assume every future scheduled day is a success and apply the
//! same per-day update the engine uses. None of them touch the history they
//! start from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::day_boundary::{DayBoundary, HabitDay};
use crate::habit::{CompletionOracle, HabitProfile, ScheduleOracle};
use crate::strength::{SimulationRun, StrengthModel, StrengthState};

/// Hard cap on milestone search iterations.
pub const PROJECTION_ITERATION_CAP: u32 = 254;

/// Projection horizons, in days.
pub const ONE_WEEK: u32 = 7;
pub const TWO_WEEKS: u32 = 14;
pub const ONE_MONTH: u32 = 30;

/// Length of each trend comparison window, in days.
pub const TREND_WINDOW_DAYS: usize = 7;
/// Change in completion rate, in percentage points, that counts as a trend.
pub const TREND_THRESHOLD_PP: f64 = 10.0;

/// Direction of recent completion behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    #[default]
    Stable,
    Declining,
}

/// Days and scheduled completions needed to reach a strength target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneEta {
    pub days: u32,
    pub completions: u32,
}

/// Completion rates of the trailing week against the week before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionTrend {
    pub trend: Trend,
    /// `recent_rate - previous_rate`
    pub trend_factor: f64,
    pub recent_rate: f64,
    pub previous_rate: f64,
}

/// Forecasts shown next to the automation percentage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionSet {
    pub one_week_automation: f64,
    pub two_week_automation: f64,
    pub one_month_automation: f64,
    pub days_to_95: Option<u32>,
    pub days_to_100: Option<u32>,
    pub completions_to_95: Option<u32>,
    pub completions_to_100: Option<u32>,
    pub trend: Trend,
    pub trend_factor: f64,
}

/// Projects a habit's strength forward from its current state.
pub struct Projector<'a> {
    habit: &'a HabitProfile,
    schedule: &'a dyn ScheduleOracle,
    model: &'a StrengthModel,
    state: &'a StrengthState,
    boundary: DayBoundary,
    /// First habit day the history did not cover
    first_future_day: Option<HabitDay>,
}

impl<'a> Projector<'a> {
    /// Project from the end of `run`, where `now` is the analysis end the run stopped at.
    pub fn from_run(
        habit: &'a HabitProfile,
        schedule: &'a dyn ScheduleOracle,
        run: &'a SimulationRun,
        now: DateTime<Utc>,
    ) -> Self {
        Self::new(habit, schedule, &run.model, &run.final_state, run.boundary, now)
    }

    /// Projection starts at the first habit day starting at or after `now`,
    /// the day right after the last one a history ending at `now` covers.
    pub fn new(
        habit: &'a HabitProfile,
        schedule: &'a dyn ScheduleOracle,
        model: &'a StrengthModel,
        state: &'a StrengthState,
        boundary: DayBoundary,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            habit,
            schedule,
            model,
            state,
            boundary,
            first_future_day: boundary.first_day_from(now),
        }
    }

    /// Habit days not yet covered by the history, in order.
    fn future_days(&self) -> impl Iterator<Item = HabitDay> + '_ {
        std::iter::successors(self.first_future_day, move |d| self.boundary.next_day(d))
    }

    /// Scheduled days among the next `days_ahead` habit days.
    pub fn scheduled_days_ahead(&self, days_ahead: u32) -> u32 {
        let count = self
            .future_days()
            .take(days_ahead as usize)
            .filter(|day| self.schedule.is_active(self.habit, day))
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Strength after succeeding on every scheduled day of the next `days_ahead` days.
    ///
    /// Unscheduled days in between go through the same gap handling as in the
    /// history, so replaying the projected days gives the same strength.
    pub fn project_future_strength(&self, days_ahead: u32) -> f64 {
        let days = self
            .future_days()
            .take(days_ahead as usize)
            .map(|day| self.schedule.is_active(self.habit, &day));
        self.model.project_days(self.state, days).strength
    }

    /// Days and completions until strength reaches `target`.
    ///
    /// Returns `None` when the target is already met or cannot be reached
    /// within [`PROJECTION_ITERATION_CAP`] days.
    pub fn estimate_days_and_completions_to_target(&self, target: f64) -> Option<MilestoneEta> {
        if self.state.strength >= target {
            return None;
        }

        let success = self.model.success_observation();
        let mut state = self.state.clone();
        let mut completions = 0;
        for (days, day) in (1..=PROJECTION_ITERATION_CAP).zip(self.future_days()) {
            if !self.schedule.is_active(self.habit, &day) {
                self.model.apply_unscheduled(&mut state);
                continue;
            }
            self.model.apply_scheduled(&mut state, success);
            completions += 1;
            if state.strength >= target {
                return Some(MilestoneEta { days, completions });
            }
        }

        tracing::debug!(
            habit = %self.habit.id,
            target,
            strength = state.strength,
            "target not reachable within projection cap"
        );
        None
    }

    /// Forecasts at the standard horizons and milestones.
    pub fn predictions(&self, trend: CompletionTrend) -> PredictionSet {
        let to_95 = self.estimate_days_and_completions_to_target(0.95);
        let to_100 = self.estimate_days_and_completions_to_target(1.0);
        PredictionSet {
            one_week_automation: self.project_future_strength(ONE_WEEK) * 100.0,
            two_week_automation: self.project_future_strength(TWO_WEEKS) * 100.0,
            one_month_automation: self.project_future_strength(ONE_MONTH) * 100.0,
            days_to_95: to_95.map(|eta| eta.days),
            days_to_100: to_100.map(|eta| eta.days),
            completions_to_95: to_95.map(|eta| eta.completions),
            completions_to_100: to_100.map(|eta| eta.completions),
            trend: trend.trend,
            trend_factor: trend.trend_factor,
        }
    }
}

/// Compare the success rate of the trailing week with the week before it.
///
/// The trailing week ends with the last habit day starting before `now`.
/// A success is a completion for good habits and an avoided day for bad ones.
/// Days before the habit's start are ignored; an empty window has rate 0.
pub fn analyze_completion_trend(
    habit: &HabitProfile,
    schedule: &dyn ScheduleOracle,
    completions: &dyn CompletionOracle,
    boundary: &DayBoundary,
    now: DateTime<Utc>,
) -> CompletionTrend {
    let Some(first_date) = habit
        .start_date
        .and_then(|start| boundary.habit_day(start))
        .map(|day| day.date)
    else {
        return CompletionTrend::default();
    };

    let window: Vec<HabitDay> =
        std::iter::successors(boundary.last_day_before(now), |d| boundary.previous_day(d))
            .take(TREND_WINDOW_DAYS * 2)
            .collect();

    let rate = |days: &[HabitDay]| -> f64 {
        let mut expected = 0u32;
        let mut actual = 0u32;
        for day in days.iter().filter(|d| d.date >= first_date) {
            if !schedule.is_active(habit, day) {
                continue;
            }
            expected += 1;
            if completions.is_completed(habit, day) != habit.is_bad_habit {
                actual += 1;
            }
        }
        ratio(actual, expected)
    };

    let split = TREND_WINDOW_DAYS.min(window.len());
    let recent_rate = rate(&window[..split]);
    let previous_rate = rate(&window[split..]);
    let trend_factor = recent_rate - previous_rate;
    let change_pp = trend_factor * 100.0;
    let trend = if change_pp >= TREND_THRESHOLD_PP {
        Trend::Improving
    } else if change_pp <= -TREND_THRESHOLD_PP {
        Trend::Declining
    } else {
        Trend::Stable
    };

    CompletionTrend {
        trend,
        trend_factor,
        recent_rate,
        previous_rate,
    }
}

/// `numerator / denominator`, or 0 when the denominator is 0.
pub fn ratio(numerator: u32, denominator: u32) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        f64::from(numerator) / f64::from(denominator)
    }
}
