use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::Args;
use habitforge_core::{MilestoneEta, Projector, StrengthEngine};
use serde::Serialize;

#[derive(Args)]
pub struct PredictArgs {
    /// Habit history file (JSON)
    pub file: PathBuf,
    /// Days to project ahead
    #[arg(long, default_value_t = 30)]
    pub days: u32,
    /// End of the analysis (RFC 3339), defaults to now
    #[arg(long)]
    pub as_of: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct Prediction {
    days_ahead: u32,
    scheduled_days: u32,
    current_automation: f64,
    projected_automation: f64,
    to_95: Option<MilestoneEta>,
    to_100: Option<MilestoneEta>,
}

pub fn run(args: PredictArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (history, config) = super::load_inputs(&args.file, args.as_of)?;
    let run = StrengthEngine::new(&history.schedule, &history.log).simulate(&history.habit, &config)?;
    let projector = Projector::from_run(&history.habit, &history.schedule, &run, config.analysis_end);

    let prediction = Prediction {
        days_ahead: args.days,
        scheduled_days: projector.scheduled_days_ahead(args.days),
        current_automation: run.final_state.strength * 100.0,
        projected_automation: projector.project_future_strength(args.days) * 100.0,
        to_95: projector.estimate_days_and_completions_to_target(0.95),
        to_100: projector.estimate_days_and_completions_to_target(1.0),
    };
    println!("{}", serde_json::to_string_pretty(&prediction)?);
    Ok(())
}
