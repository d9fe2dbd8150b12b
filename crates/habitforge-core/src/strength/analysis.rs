//! Aggregate statistics of a finished simulation pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::engine::SimulationRun;
use crate::habit::{HabitProfile, StreakLedger};

/// Summary of a habit's simulated history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryAnalysis {
    pub current_strength: f64,
    pub peak_strength: f64,
    /// Completed days of a good habit
    pub total_streak_days: u32,
    /// Avoided days of a bad habit
    pub total_avoided_days: u32,
    pub total_gap_days: u32,
    pub current_streak: u32,
    pub best_streak_ever: u32,
    pub longest_streak: u32,
    pub average_streak_length: f64,
    /// Distance back to the personal peak
    pub recovery_potential: f64,
    pub experience_floor: f64,
}

impl HistoryAnalysis {
    /// Summarise `run`. Streak facts come from the host's ledger, not the run.
    pub fn from_run(
        run: &SimulationRun,
        habit: &HabitProfile,
        streaks: &dyn StreakLedger,
        as_of: DateTime<Utc>,
    ) -> Self {
        let mut state = run.final_state.clone();
        let average_streak_length = state.finish();
        let (total_streak_days, total_avoided_days) = if run.model.is_bad_habit() {
            (0, state.success_days)
        } else {
            (state.success_days, 0)
        };

        Self {
            current_strength: state.strength,
            peak_strength: state.peak,
            total_streak_days,
            total_avoided_days,
            total_gap_days: state.gap_days,
            current_streak: streaks.current_streak(habit, as_of),
            best_streak_ever: streaks.best_streak_ever(habit),
            longest_streak: streaks.longest_streak(habit),
            average_streak_length,
            recovery_potential: (state.peak - state.strength).max(0.0),
            experience_floor: run.model.experience_floor(&state),
        }
    }
}
