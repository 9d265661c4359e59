use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Args;
use runplan::{plan_from_response, RepairOptions, TrainingDay};

use super::emit;

#[derive(Args)]
pub struct RepairCommand {
  /// Raw model response (any text)
  #[arg(long)]
  plan: PathBuf,

  /// Training days in order, e.g. "sobota,środa,poniedziałek"
  #[arg(long, value_delimiter = ',')]
  days: Vec<TrainingDay>,

  /// Pad or truncate to this many weeks
  #[arg(long)]
  weeks: Option<u32>,

  /// First day of week 1 (YYYY-MM-DD), defaults to today
  #[arg(long)]
  start: Option<NaiveDate>,

  /// Write the plan here instead of stdout
  #[arg(short, long)]
  output: Option<PathBuf>,
}

impl RepairCommand {
  pub fn execute(self) -> Result<()> {
    let raw = fs::read_to_string(&self.plan)
      .with_context(|| format!("Failed to read {}", self.plan.display()))?;

    let now = Utc::now();
    let mut opts = RepairOptions::new(self.start.unwrap_or_else(|| now.date_naive()), now);
    if let Some(weeks) = self.weeks {
      opts = opts.with_expected_weeks(weeks);
    }

    let plan = plan_from_response(&raw, Some(self.days.as_slice()), &opts)?;
    emit(&plan.to_json(), self.output.as_deref())
  }
}
