//! Habit strength simulation.
//!
//! - [`model`]: the per-day update rules shared with the projector
//! - [`engine`]: the day-by-day pass over a habit's history
//! - [`analysis`]: aggregate statistics derived from a finished pass

mod analysis;
mod engine;
mod model;

pub use analysis::HistoryAnalysis;
pub use engine::{SimulationRun, StrengthEngine, StrengthPoint};
pub use model::{
    asymptotic_grow, DayState, Observation, StrengthModel, StrengthState, SOFT_DRIFT_GAP_DAYS,
};
