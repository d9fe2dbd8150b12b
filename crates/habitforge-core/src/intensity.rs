//! Intensity level lookup tables.
//!
//! Every habit carries an intensity from 1 (light) to 4 (demanding). Higher
//! intensity grows slower, decays faster, keeps less residual memory and is
//! less forgiving on the first miss. Bad habits use their own parameter table.

use serde::{Deserialize, Serialize};

/// Safe range for per-day growth rates.
pub const GROWTH_RATE_RANGE: (f64, f64) = (0.005, 0.20);
/// Safe range for per-day decay rates.
pub const DECAY_RATE_RANGE: (f64, f64) = (0.001, 0.25);

/// Experience floor before any practice has accumulated.
pub const EXPERIENCE_FLOOR_BASE: f64 = 0.05;
/// Experience floor never exceeds this.
pub const EXPERIENCE_FLOOR_CAP: f64 = 0.50;

const RESIDUAL_FLOOR_FRACTION: [f64; 4] = [0.20, 0.17, 0.15, 0.12];
const EXPERIENCE_FLOOR_SLOPE: [f64; 4] = [0.0025, 0.0020, 0.0015, 0.0010];
const FIRST_MISS_LENIENCY: [f64; 4] = [0.40, 0.50, 0.60, 0.70];

const BAD_HABIT_PARAMS: [BadHabitParams; 4] = [
    BadHabitParams {
        k_ext: 0.09,
        lambda_reinst: 0.06,
        floor_min: 0.25,
        soft_drift: 0.002,
    },
    BadHabitParams {
        k_ext: 0.07,
        lambda_reinst: 0.08,
        floor_min: 0.20,
        soft_drift: 0.002,
    },
    BadHabitParams {
        k_ext: 0.05,
        lambda_reinst: 0.10,
        floor_min: 0.15,
        soft_drift: 0.003,
    },
    BadHabitParams {
        k_ext: 0.035,
        lambda_reinst: 0.12,
        floor_min: 0.10,
        soft_drift: 0.003,
    },
];

/// Habit intensity, always within `1..=4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct IntensityLevel(u8);

impl IntensityLevel {
    pub const MIN: IntensityLevel = IntensityLevel(1);
    pub const MAX: IntensityLevel = IntensityLevel(4);

    /// Create a level, clamping out-of-range input into `1..=4`.
    pub fn new(level: u8) -> Self {
        Self(level.clamp(Self::MIN.0, Self::MAX.0))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// All levels, lightest first.
    pub fn all() -> [IntensityLevel; 4] {
        [Self(1), Self(2), Self(3), Self(4)]
    }

    /// Levels above the lightest, i.e. `L - 1`.
    fn steps(self) -> i32 {
        i32::from(self.0) - 1
    }

    fn index(self) -> usize {
        usize::from(self.0 - 1)
    }
}

impl Default for IntensityLevel {
    fn default() -> Self {
        Self::MIN
    }
}

impl From<u8> for IntensityLevel {
    fn from(level: u8) -> Self {
        Self::new(level)
    }
}

impl From<IntensityLevel> for u8 {
    fn from(level: IntensityLevel) -> Self {
        level.0
    }
}

/// Extinction model parameters for habits being avoided.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BadHabitParams {
    /// Control gained per avoided day
    pub k_ext: f64,
    /// Control lost per lapse
    pub lambda_reinst: f64,
    /// Control never drops below this
    pub floor_min: f64,
    /// Decay rate during long unscheduled gaps
    pub soft_drift: f64,
}

impl BadHabitParams {
    pub fn for_level(level: IntensityLevel) -> Self {
        BAD_HABIT_PARAMS[level.index()]
    }
}

/// `0.88^(L-1)`: higher intensity grows slower.
pub fn growth_multiplier(level: IntensityLevel) -> f64 {
    0.88_f64.powi(level.steps())
}

/// `1 + 0.12·(L-1)`: higher intensity decays faster.
pub fn decay_multiplier(level: IntensityLevel) -> f64 {
    1.0 + 0.12 * f64::from(level.steps())
}

/// `1 + 0.10·(L-1)`.
pub fn soft_drift_multiplier(level: IntensityLevel) -> f64 {
    1.0 + 0.10 * f64::from(level.steps())
}

/// Fraction of peak strength kept as muscle memory.
pub fn residual_floor_fraction(level: IntensityLevel) -> f64 {
    RESIDUAL_FLOOR_FRACTION[level.index()]
}

pub fn experience_floor_slope(level: IntensityLevel) -> f64 {
    EXPERIENCE_FLOOR_SLOPE[level.index()]
}

/// Decay scaling applied only on the first miss after a streak.
pub fn first_miss_leniency(level: IntensityLevel) -> f64 {
    FIRST_MISS_LENIENCY[level.index()]
}

/// `clamp(0.05 + slope(L)·practice_days, 0.05, 0.50)`.
pub fn experience_floor(level: IntensityLevel, practice_days: u32) -> f64 {
    (EXPERIENCE_FLOOR_BASE + experience_floor_slope(level) * f64::from(practice_days))
        .clamp(EXPERIENCE_FLOOR_BASE, EXPERIENCE_FLOOR_CAP)
}

pub fn clamp_growth_rate(rate: f64) -> f64 {
    clamp_rate(rate, GROWTH_RATE_RANGE)
}

pub fn clamp_decay_rate(rate: f64) -> f64 {
    clamp_rate(rate, DECAY_RATE_RANGE)
}

/// Intensity-scaled growth rate, clamped into the safe range.
pub fn growth_rate(base: f64, level: IntensityLevel) -> f64 {
    clamp_growth_rate(base * growth_multiplier(level))
}

/// Intensity-scaled decay rate, clamped into the safe range.
pub fn decay_rate(base: f64, level: IntensityLevel) -> f64 {
    clamp_decay_rate(base * decay_multiplier(level))
}

// NaN collapses to the lower bound so it can never reach an exponent.
fn clamp_rate(rate: f64, (lo, hi): (f64, f64)) -> f64 {
    if rate.is_nan() {
        lo
    } else {
        rate.clamp(lo, hi)
    }
}
