//! The engine entrypoint: from a habit and its oracles to an [`Insight`].
//!
//! Flow:
//! - simulate the history with [`StrengthEngine`]
//! - summarise it into a [`HistoryAnalysis`]
//! - project forward with [`Projector`] and classify the recent trend

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::habit::{HabitOracles, HabitProfile};
use crate::intensity::IntensityLevel;
use crate::prediction::{analyze_completion_trend, ratio, PredictionSet, Projector};
use crate::strength::{HistoryAnalysis, StrengthEngine, StrengthPoint};

/// Everything a host displays about one habit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    /// Current strength on a 0-100 scale
    pub automation_percentage: f64,
    pub current_streak: u32,
    pub best_streak_ever: u32,
    /// Scheduled days in the analysed range
    pub expected_completions: u32,
    /// Successful scheduled days: completions, or avoided days for bad habits
    pub actual_completions: u32,
    pub raw_completion_rate: f64,
    /// Difficulty weight shown next to the percentage
    pub intensity_weight: f64,
    pub history_analysis: HistoryAnalysis,
    pub predictions: PredictionSet,
}

/// An [`Insight`] together with the timeline it was computed from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightReport {
    pub insight: Insight,
    pub points: Vec<StrengthPoint>,
}

/// Compute the insight for `habit` as of `config.analysis_end`.
pub fn compute_insight(
    habit: &HabitProfile,
    config: &AnalysisConfig,
    oracles: HabitOracles<'_>,
) -> Result<Insight> {
    compute_insight_report(habit, config, oracles).map(|report| report.insight)
}

/// Like [`compute_insight`], also returning one [`StrengthPoint`] per scheduled day.
///
/// A habit without a start date yields a zero insight and an empty timeline.
///
/// # Errors
///
/// Fails on an invalid configuration or when the analysis end precedes the
/// habit's start.
pub fn compute_insight_report(
    habit: &HabitProfile,
    config: &AnalysisConfig,
    oracles: HabitOracles<'_>,
) -> Result<InsightReport> {
    let intensity_weight =
        intensity_weight(habit.intensity, config.settings.intensity_penalty_per_level);
    if habit.start_date.is_none() {
        config.settings.validate()?;
        tracing::debug!(habit = %habit.id, "habit has no start date");
        return Ok(InsightReport {
            insight: Insight {
                intensity_weight,
                ..Default::default()
            },
            points: Vec::new(),
        });
    }

    let run = StrengthEngine::new(oracles.schedule, oracles.completions).simulate(habit, config)?;
    let now = config.analysis_end;
    let history_analysis = HistoryAnalysis::from_run(&run, habit, oracles.streaks, now);

    let trend = analyze_completion_trend(
        habit,
        oracles.schedule,
        oracles.completions,
        &run.boundary,
        now,
    );
    let predictions = Projector::from_run(habit, oracles.schedule, &run, now).predictions(trend);

    let expected_completions = run.final_state.scheduled_days;
    let successes = run.points.iter().filter(|p| p.state.is_success()).count();
    let actual_completions = u32::try_from(successes).unwrap_or(u32::MAX);

    let insight = Insight {
        automation_percentage: history_analysis.current_strength * 100.0,
        current_streak: history_analysis.current_streak,
        best_streak_ever: history_analysis.best_streak_ever,
        expected_completions,
        actual_completions,
        raw_completion_rate: ratio(actual_completions, expected_completions),
        intensity_weight,
        history_analysis,
        predictions,
    };
    Ok(InsightReport {
        insight,
        points: run.points,
    })
}

/// `1 + penalty * (level - 1)`
pub fn intensity_weight(level: IntensityLevel, penalty_per_level: f64) -> f64 {
    1.0 + penalty_per_level * f64::from(level.get() - 1)
}
