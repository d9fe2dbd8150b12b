pub mod config;
pub mod insight;
pub mod predict;
pub mod timeline;

use std::path::Path;

use chrono::{DateTime, Utc};
use habitforge_core::{AnalysisConfig, EngineConfig, HabitHistory};

/// Load a history file and the engine config, ending the analysis at `as_of` or now.
pub fn load_inputs(
    file: &Path,
    as_of: Option<DateTime<Utc>>,
) -> Result<(HabitHistory, AnalysisConfig), Box<dyn std::error::Error>> {
    let history = HabitHistory::load(file)?;
    let config = EngineConfig::load_or_default().at(as_of.unwrap_or_else(Utc::now));
    tracing::debug!(
        file = %file.display(),
        habit = %history.habit.id,
        analysis_end = %config.analysis_end,
        "loaded habit history"
    );
    Ok((history, config))
}
