//! # Habitforge Core Library
//!
//! This library turns a habit's completion history into an automation
//! percentage: a deterministic strength value that grows with practice,
//! decays with misses, and never falls below what accumulated experience has
//! earned. The `habitforge-cli` binary is a thin layer over the same library.
//!
//! ## Architecture
//!
//! - **Day boundaries**: habit days start at a configurable hour in a
//!   configurable timezone
//! - **Strength engine**: a day-by-day state machine with separate growth and
//!   control models for good and bad habits
//! - **Projector**: forward projections, milestone estimates and trends
//! - **Oracles**: hosts supply schedules, completions and streak facts through
//!   traits; the engine stores nothing
//!
//! ## Key Components
//!
//! - [`compute_insight`]: The engine entrypoint
//! - [`StrengthEngine`]: History simulation
//! - [`Projector`]: Forward projection
//! - [`EngineConfig`]: Engine configuration management
//! - [`HabitHistory`]: In-memory history used by the CLI

pub mod config;
pub mod day_boundary;
pub mod error;
pub mod habit;
pub mod history;
pub mod insight;
pub mod intensity;
pub mod prediction;
pub mod strength;

pub use config::{AnalysisConfig, EngineConfig, EngineFeatures};
pub use day_boundary::{DayBoundary, HabitDay, HabitDays, TimeZoneSetting};
pub use error::{ConfigError, CoreError, ValidationError};
pub use habit::{CompletionOracle, HabitOracles, HabitProfile, ScheduleOracle, StreakLedger};
pub use history::{CompletionLog, HabitHistory, LedgerFromLog, ScheduleRule};
pub use insight::{compute_insight, compute_insight_report, Insight, InsightReport};
pub use intensity::{BadHabitParams, IntensityLevel};
pub use prediction::{
    analyze_completion_trend, CompletionTrend, MilestoneEta, PredictionSet, Projector, Trend,
};
pub use strength::{
    DayState, HistoryAnalysis, Observation, SimulationRun, StrengthEngine, StrengthModel,
    StrengthPoint, StrengthState,
};
