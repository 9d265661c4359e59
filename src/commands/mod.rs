mod generate;
mod repair;
mod zones;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

pub use generate::GenerateCommand;
pub use repair::RepairCommand;
pub use zones::ZonesCommand;

#[derive(Parser)]
#[command(name = "runplan")]
#[command(about = "AI running-plan generator", long_about = None)]
#[command(version)]
pub struct Cli {
  #[command(subcommand)]
  command: Commands,

  /// Enable debug logging (RUST_LOG takes precedence)
  #[arg(short, long, global = true)]
  pub verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
  /// Generate a training plan for a runner profile
  Generate(GenerateCommand),

  /// Parse, repair and reconcile an existing model response
  Repair(RepairCommand),

  /// Show heart-rate zones and training paces
  Zones(ZonesCommand),
}

impl Cli {
  pub async fn execute(self) -> Result<()> {
    match self.command {
      Commands::Generate(cmd) => cmd.execute().await,
      Commands::Repair(cmd) => cmd.execute(),
      Commands::Zones(cmd) => cmd.execute(),
    }
  }
}

/// Print to stdout, or write to `output` when given
fn emit(json: &str, output: Option<&Path>) -> Result<()> {
  match output {
    Some(path) => {
      fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
      tracing::info!(path = %path.display(), "Plan written");
    }
    None => println!("{}", json),
  }
  Ok(())
}
