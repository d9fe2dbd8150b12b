//! Per-day strength update rules.
//!
//! [`StrengthModel`] holds the parameters resolved once per run (intensity
//! scaled rates, floors, feature toggles). [`StrengthState`] is the running
//! state a pass threads from day to day. The engine and the projector both
//! advance the state through [`StrengthModel::apply_scheduled`], so a projected
//! value is exactly what replaying the same days would produce.

use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, EngineFeatures};
use crate::intensity::{self, BadHabitParams, IntensityLevel};

/// Unscheduled days tolerated before soft drift starts.
pub const SOFT_DRIFT_GAP_DAYS: u32 = 3;

/// Decay multiplier from the third consecutive miss onward.
const REPEATED_MISS_FACTOR: f64 = 1.25;

const PERSONALIZATION_BASE: f64 = 0.85;
const PERSONALIZATION_SPAN: f64 = 0.30;
const RHYTHM_BONUS: f64 = 1.10;
const RESUME_PENALTY: f64 = 0.90;

/// What the oracles reported for a scheduled day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observation {
    /// The tracked event happened (a completion, or a lapse for bad habits)
    Occurred,
    /// A fractional completion; only produced when partial credit is enabled
    Partial(f64),
    /// The tracked event did not happen
    Absent,
}

/// Classification of a simulated day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayState {
    Completed,
    PartiallyCompleted,
    Missed,
    Avoided,
    Lapsed,
}

impl DayState {
    /// Whether the day counts as a success for its habit.
    pub fn is_success(self) -> bool {
        matches!(self, DayState::Completed | DayState::Avoided)
    }
}

/// Running state of one simulation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrengthState {
    /// Strength (good habits) or control (bad habits)
    pub strength: f64,
    pub peak: f64,
    /// Completed days (good) or avoided days (bad)
    pub success_days: u32,
    /// Missed days (good) or lapsed days (bad)
    pub gap_days: u32,
    pub consecutive_misses: u32,
    pub in_streak: bool,
    pub streak_length: u32,
    /// Streaks closed so far and the days they covered
    pub streaks_closed: u32,
    pub closed_streak_days: u32,
    pub non_scheduled_run: u32,
    pub scheduled_days: u32,
    /// Whether the latest scheduled day was a success
    pub last_scheduled_success: bool,
}

impl StrengthState {
    fn close_streak(&mut self) {
        if self.in_streak {
            self.in_streak = false;
            self.streaks_closed += 1;
            self.closed_streak_days += self.streak_length;
            self.streak_length = 0;
        }
    }

    fn extend_streak(&mut self) {
        if !self.in_streak {
            self.in_streak = true;
            self.streak_length = 0;
        }
        self.streak_length += 1;
    }

    /// Close any open streak and return the mean streak length.
    pub fn finish(&mut self) -> f64 {
        self.close_streak();
        if self.streaks_closed == 0 {
            0.0
        } else {
            f64::from(self.closed_streak_days) / f64::from(self.streaks_closed)
        }
    }

    /// Success ratio of scheduled days seen so far; 0.5 before any.
    pub fn success_ratio(&self) -> f64 {
        if self.scheduled_days == 0 {
            0.5
        } else {
            f64::from(self.success_days) / f64::from(self.scheduled_days)
        }
    }
}

/// Strength-model parameters resolved for one habit.
#[derive(Debug, Clone, PartialEq)]
pub struct StrengthModel {
    level: IntensityLevel,
    is_bad_habit: bool,
    growth_rate: f64,
    decay_rate: f64,
    soft_drift: f64,
    residual_fraction: f64,
    residual_memory_factor: f64,
    max_strength: f64,
    bad: BadHabitParams,
    features: EngineFeatures,
}

/// `s + (max - s)·(1 - e^-k)`: exponential approach to the asymptote.
pub fn asymptotic_grow(strength: f64, rate: f64, max_strength: f64) -> f64 {
    let grown = strength + (max_strength - strength) * (1.0 - (-rate).exp());
    grown.min(max_strength)
}

impl StrengthModel {
    pub fn new(level: IntensityLevel, is_bad_habit: bool, config: &EngineConfig) -> Self {
        let bad = BadHabitParams::for_level(level);
        let soft_drift = if is_bad_habit {
            bad.soft_drift
        } else {
            config.soft_drift_rate * intensity::soft_drift_multiplier(level)
        };
        Self {
            level,
            is_bad_habit,
            growth_rate: intensity::growth_rate(config.base_growth_rate, level),
            decay_rate: intensity::decay_rate(config.base_decay_rate, level),
            soft_drift,
            residual_fraction: intensity::residual_floor_fraction(level),
            residual_memory_factor: config.residual_memory_factor,
            max_strength: config.max_strength,
            bad,
            features: config.features,
        }
    }

    pub fn level(&self) -> IntensityLevel {
        self.level
    }

    pub fn is_bad_habit(&self) -> bool {
        self.is_bad_habit
    }

    pub fn max_strength(&self) -> f64 {
        self.max_strength
    }

    /// Intensity-scaled growth rate before any feature adjustment.
    pub fn growth_rate(&self) -> f64 {
        if self.is_bad_habit {
            self.bad.k_ext
        } else {
            self.growth_rate
        }
    }

    /// Intensity-scaled base decay rate.
    pub fn decay_rate(&self) -> f64 {
        if self.is_bad_habit {
            self.bad.lambda_reinst
        } else {
            self.decay_rate
        }
    }

    /// State at the habit's start: zero strength, or the baseline control of a bad habit.
    pub fn initial_state(&self) -> StrengthState {
        let strength = if self.is_bad_habit {
            self.bad.floor_min.min(self.max_strength)
        } else {
            0.0
        };
        StrengthState {
            strength,
            peak: strength,
            success_days: 0,
            gap_days: 0,
            consecutive_misses: 0,
            in_streak: false,
            streak_length: 0,
            streaks_closed: 0,
            closed_streak_days: 0,
            non_scheduled_run: 0,
            scheduled_days: 0,
            last_scheduled_success: false,
        }
    }

    /// The observation that counts as a success for this habit.
    pub fn success_observation(&self) -> Observation {
        if self.is_bad_habit {
            Observation::Absent
        } else {
            Observation::Occurred
        }
    }

    /// Floor earned by accumulated practice.
    ///
    /// A bad habit earns none until its first avoided day.
    pub fn experience_floor(&self, state: &StrengthState) -> f64 {
        if self.is_bad_habit && state.success_days == 0 {
            0.0
        } else {
            intensity::experience_floor(self.level, state.success_days)
        }
    }

    /// Lowest value strength may decay to in `state`.
    pub fn floor(&self, state: &StrengthState) -> f64 {
        let floor = if self.is_bad_habit {
            self.bad
                .floor_min
                .max(self.experience_floor(state))
                .max(state.peak * self.residual_memory_factor)
        } else {
            (self.residual_fraction * state.peak).max(self.experience_floor(state))
        };
        floor.min(self.max_strength)
    }

    /// Decay rate for the given count of consecutive misses.
    pub fn miss_decay_rate(&self, consecutive_misses: u32) -> f64 {
        match consecutive_misses {
            0 | 1 => intensity::clamp_decay_rate(
                self.decay_rate * intensity::first_miss_leniency(self.level),
            ),
            2 => self.decay_rate,
            _ => intensity::clamp_decay_rate(self.decay_rate * REPEATED_MISS_FACTOR),
        }
    }

    /// Advance `state` through an unscheduled day.
    pub fn apply_unscheduled(&self, state: &mut StrengthState) {
        state.non_scheduled_run += 1;
        if self.is_bad_habit && state.non_scheduled_run > SOFT_DRIFT_GAP_DAYS {
            self.apply_soft_drift(state);
        }
    }

    /// Advance `state` through a scheduled day.
    pub fn apply_scheduled(&self, state: &mut StrengthState, observation: Observation) -> DayState {
        let resumed_after_gap = state.non_scheduled_run > SOFT_DRIFT_GAP_DAYS;
        let unbroken_rhythm = state.non_scheduled_run == 0 && state.last_scheduled_success;
        if resumed_after_gap {
            self.apply_soft_drift(state);
        }
        state.non_scheduled_run = 0;

        let rate = self.adjusted_growth_rate(state, resumed_after_gap, unbroken_rhythm);
        let day_state = if self.is_bad_habit {
            self.apply_bad(state, observation, rate)
        } else {
            self.apply_good(state, observation, rate)
        };

        state.scheduled_days += 1;
        state.last_scheduled_success = day_state.is_success();
        day_state
    }

    /// Apply `count` consecutive successful scheduled days to a copy of `state`.
    pub fn project(&self, state: &StrengthState, count: u32) -> StrengthState {
        self.project_days(state, std::iter::repeat(true).take(count as usize))
    }

    /// Walk a copy of `state` through future days, succeeding on every
    /// scheduled one. Each item says whether that day is scheduled.
    pub fn project_days(
        &self,
        state: &StrengthState,
        days: impl IntoIterator<Item = bool>,
    ) -> StrengthState {
        let mut projected = state.clone();
        let success = self.success_observation();
        for scheduled in days {
            if scheduled {
                self.apply_scheduled(&mut projected, success);
            } else {
                self.apply_unscheduled(&mut projected);
            }
        }
        projected
    }

    fn apply_good(&self, state: &mut StrengthState, observation: Observation, rate: f64) -> DayState {
        let day_state = match observation {
            Observation::Occurred => {
                state.extend_streak();
                state.success_days += 1;
                state.consecutive_misses = 0;
                state.strength = asymptotic_grow(state.strength, rate, self.max_strength);
                DayState::Completed
            }
            Observation::Partial(fraction) => {
                state.close_streak();
                state.consecutive_misses = 0;
                let fraction = fraction.clamp(0.0, 1.0);
                state.strength =
                    asymptotic_grow(state.strength, rate * fraction, self.max_strength);
                DayState::PartiallyCompleted
            }
            Observation::Absent => {
                state.close_streak();
                state.consecutive_misses += 1;
                state.gap_days += 1;
                let decay = self.miss_decay_rate(state.consecutive_misses);
                let floor = self.floor(state);
                state.strength = floor.max(state.strength * (-decay).exp());
                DayState::Missed
            }
        };
        state.strength = state.strength.clamp(0.0, self.max_strength);
        state.peak = state.peak.max(state.strength);
        day_state
    }

    fn apply_bad(&self, state: &mut StrengthState, observation: Observation, rate: f64) -> DayState {
        let floor = self.floor(state);
        let day_state = match observation {
            Observation::Occurred => {
                state.close_streak();
                state.consecutive_misses += 1;
                state.gap_days += 1;
                state.strength = floor.max(state.strength * (-self.bad.lambda_reinst).exp());
                DayState::Lapsed
            }
            // Partial credit does not apply to avoidance; anything short of a lapse is avoided
            Observation::Partial(_) | Observation::Absent => {
                state.extend_streak();
                state.success_days += 1;
                state.consecutive_misses = 0;
                state.strength = 1.0 - (1.0 - state.strength) * (-rate).exp();
                DayState::Avoided
            }
        };
        state.strength = state.strength.clamp(floor, self.max_strength);
        state.peak = state.peak.max(state.strength);
        day_state
    }

    fn apply_soft_drift(&self, state: &mut StrengthState) {
        let floor = self.floor(state);
        let drifted = state.strength * (-self.soft_drift * f64::from(state.non_scheduled_run)).exp();
        // Drift only ever lowers strength
        state.strength = floor.max(drifted).min(state.strength);
    }

    fn adjusted_growth_rate(
        &self,
        state: &StrengthState,
        resumed_after_gap: bool,
        unbroken_rhythm: bool,
    ) -> f64 {
        let mut rate = self.growth_rate();
        let features = self.features;
        if !(features.personalization || features.context_consistency) {
            return rate;
        }
        if features.personalization {
            rate *= PERSONALIZATION_BASE + PERSONALIZATION_SPAN * state.success_ratio();
        }
        if features.context_consistency {
            if resumed_after_gap {
                rate *= RESUME_PENALTY;
            } else if unbroken_rhythm {
                rate *= RHYTHM_BONUS;
            }
        }
        intensity::clamp_growth_rate(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(level: u8, bad: bool) -> StrengthModel {
        StrengthModel::new(IntensityLevel::new(level), bad, &EngineConfig::default())
    }

    #[test]
    fn growth_approaches_asymptote() {
        let mut s = 0.0;
        for _ in 0..500 {
            let next = asymptotic_grow(s, 0.077, 1.0);
            assert!(next >= s);
            assert!(next <= 1.0);
            s = next;
        }
        assert!(s > 0.999);
    }

    #[test]
    fn thirty_completions_reach_ninety_percent() {
        let m = model(1, false);
        let state = m.project(&m.initial_state(), 30);
        assert!((state.strength - 0.90).abs() < 0.01, "got {}", state.strength);
        assert_eq!(state.success_days, 30);
        assert_eq!(state.streak_length, 30);
    }

    #[test]
    fn first_miss_is_lenient() {
        let m = model(1, false);
        assert!(m.miss_decay_rate(1) < m.miss_decay_rate(2));
        assert!(m.miss_decay_rate(2) < m.miss_decay_rate(3));
        assert_eq!(m.miss_decay_rate(3), m.miss_decay_rate(10));
        assert!((m.miss_decay_rate(1) - 0.04).abs() < 1e-12);
    }

    #[test]
    fn miss_decays_but_respects_floor() {
        let m = model(1, false);
        let mut state = m.project(&m.initial_state(), 30);
        let before = state.strength;
        let day = m.apply_scheduled(&mut state, Observation::Absent);
        assert_eq!(day, DayState::Missed);
        assert!(state.strength < before);
        assert!(!state.in_streak);
        assert_eq!(state.streaks_closed, 1);
        for _ in 0..500 {
            m.apply_scheduled(&mut state, Observation::Absent);
        }
        let floor = (0.20 * state.peak).max(intensity::experience_floor(m.level(), 30));
        assert!((state.strength - floor).abs() < 1e-9);
    }

    #[test]
    fn fresh_miss_lands_on_base_experience_floor() {
        let m = model(2, false);
        let mut state = m.initial_state();
        assert_eq!(m.experience_floor(&state), 0.05);
        for _ in 0..3 {
            m.apply_scheduled(&mut state, Observation::Absent);
            assert_eq!(state.strength, 0.05);
        }
        assert_eq!(state.gap_days, 3);
    }

    #[test]
    fn bad_habit_earns_no_experience_before_avoiding() {
        let m = model(2, true);
        let mut state = m.initial_state();
        assert_eq!(m.experience_floor(&state), 0.0);
        m.apply_scheduled(&mut state, Observation::Absent);
        assert!(m.experience_floor(&state) > 0.05);
    }

    #[test]
    fn drift_never_raises_untrained_strength() {
        let m = model(1, false);
        let mut state = m.initial_state();
        for _ in 0..10 {
            m.apply_unscheduled(&mut state);
        }
        m.apply_scheduled(&mut state, Observation::Occurred);
        let direct = m.project(&m.initial_state(), 1);
        // Strength was 0 during the gap, so drift had nothing to lower
        assert_eq!(state.strength, direct.strength);
    }

    #[test]
    fn projected_gaps_apply_drift() {
        let m = model(1, false);
        let trained = m.project(&m.initial_state(), 20);
        let weekly = std::iter::repeat([true, false, false, false, false, false, false])
            .take(4)
            .flatten();
        let with_gaps = m.project_days(&trained, weekly);
        let back_to_back = m.project(&trained, 4);
        assert_eq!(with_gaps.scheduled_days, back_to_back.scheduled_days);
        assert!(with_gaps.strength < back_to_back.strength);
    }

    #[test]
    fn partial_credit_grows_without_streak() {
        let m = model(1, false);
        let mut full = m.initial_state();
        let mut half = m.initial_state();
        m.apply_scheduled(&mut full, Observation::Occurred);
        let day = m.apply_scheduled(&mut half, Observation::Partial(0.5));
        assert_eq!(day, DayState::PartiallyCompleted);
        assert!(half.strength > 0.0 && half.strength < full.strength);
        assert!(!half.in_streak);
        assert_eq!(half.gap_days, 0);
    }

    #[test]
    fn bad_habit_starts_at_floor() {
        let m = model(4, true);
        let state = m.initial_state();
        assert_eq!(state.strength, 0.10);
        assert_eq!(state.peak, 0.10);
    }

    #[test]
    fn bad_habit_lapse_never_breaks_floor() {
        let m = model(4, true);
        let mut state = m.initial_state();
        for _ in 0..50 {
            assert_eq!(m.apply_scheduled(&mut state, Observation::Occurred), DayState::Lapsed);
            assert!(state.strength >= 0.10);
        }
        assert_eq!(state.gap_days, 50);
    }

    #[test]
    fn bad_habit_floor_tracks_peak() {
        let m = model(1, true);
        let mut state = m.project(&m.initial_state(), 60);
        let peak = state.peak;
        for _ in 0..200 {
            m.apply_scheduled(&mut state, Observation::Occurred);
        }
        let expected = 0.25_f64
            .max(intensity::experience_floor(m.level(), 60))
            .max(peak * 0.30);
        assert!((state.strength - expected).abs() < 1e-9);
    }

    #[test]
    fn soft_drift_only_after_long_gap() {
        let m = model(1, true);
        let mut state = m.project(&m.initial_state(), 20);
        let before = state.strength;
        for _ in 0..SOFT_DRIFT_GAP_DAYS {
            m.apply_unscheduled(&mut state);
        }
        assert_eq!(state.strength, before);
        m.apply_unscheduled(&mut state);
        assert!(state.strength < before);
    }

    #[test]
    fn good_habit_drifts_on_resume() {
        let m = model(1, false);
        let mut drifted = m.project(&m.initial_state(), 20);
        let mut steady = drifted.clone();
        for _ in 0..10 {
            m.apply_unscheduled(&mut drifted);
        }
        // Good habits hold during the gap and drift when the schedule resumes
        assert_eq!(drifted.strength, steady.strength);
        m.apply_scheduled(&mut drifted, Observation::Occurred);
        m.apply_scheduled(&mut steady, Observation::Occurred);
        assert!(drifted.strength < steady.strength);
        assert_eq!(drifted.non_scheduled_run, 0);
    }

    #[test]
    fn context_consistency_rewards_rhythm() {
        let config = EngineConfig {
            features: EngineFeatures {
                context_consistency: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let with = StrengthModel::new(IntensityLevel::new(1), false, &config);
        let without = model(1, false);
        let a = with.project(&with.initial_state(), 10);
        let b = without.project(&without.initial_state(), 10);
        assert!(a.strength > b.strength);
    }

    #[test]
    fn personalization_follows_success_ratio() {
        let config = EngineConfig {
            features: EngineFeatures {
                personalization: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let m = StrengthModel::new(IntensityLevel::new(1), false, &config);
        let consistent = m.project(&m.initial_state(), 10);
        let baseline = model(1, false).project(&model(1, false).initial_state(), 10);
        // A perfect record scales growth by up to 1.15
        assert!(consistent.strength > baseline.strength);
    }

    #[test]
    fn average_streak_length_counts_open_streak() {
        let m = model(1, false);
        let mut state = m.initial_state();
        for obs in [
            Observation::Occurred,
            Observation::Occurred,
            Observation::Absent,
            Observation::Occurred,
            Observation::Occurred,
            Observation::Occurred,
            Observation::Occurred,
        ] {
            m.apply_scheduled(&mut state, obs);
        }
        assert_eq!(state.finish(), 3.0);
        assert!(!state.in_streak);
    }
}
