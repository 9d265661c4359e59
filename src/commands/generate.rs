use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use runplan::{PlanGenerator, PlannerConfig, UserProfile};

use super::emit;

#[derive(Args)]
pub struct GenerateCommand {
  /// Runner profile as JSON
  #[arg(long)]
  profile: PathBuf,

  /// Write the plan here instead of stdout
  #[arg(short, long)]
  output: Option<PathBuf>,
}

impl GenerateCommand {
  pub async fn execute(self) -> Result<()> {
    let raw = fs::read_to_string(&self.profile)
      .with_context(|| format!("Failed to read profile {}", self.profile.display()))?;
    let profile: UserProfile = serde_json::from_str(&raw).context("Invalid profile JSON")?;

    let config = PlannerConfig::from_env()?;
    let generator = PlanGenerator::from_config(&config)?;
    let plan = generator.generate_plan(&profile).await?;

    emit(&plan.to_json(), self.output.as_deref())
  }
}
