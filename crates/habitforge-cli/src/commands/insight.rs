use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::Args;

#[derive(Args)]
pub struct InsightArgs {
    /// Habit history file (JSON)
    pub file: PathBuf,
    /// End of the analysis (RFC 3339), defaults to now
    #[arg(long)]
    pub as_of: Option<DateTime<Utc>>,
}

pub fn run(args: InsightArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (history, config) = super::load_inputs(&args.file, args.as_of)?;
    let report = history.report(&config)?;
    println!("{}", serde_json::to_string_pretty(&report.insight)?);
    Ok(())
}
