use anyhow::Result;
use clap::Args;
use runplan::defaults::DEFAULT_RESTING_HR;
use runplan::physiology::{estimated_vo2max, heart_rate_zones, max_heart_rate, training_paces};

#[derive(Args)]
pub struct ZonesCommand {
  /// Age in years (10-100)
  #[arg(long)]
  age: u32,

  /// Resting heart rate in bpm
  #[arg(long, default_value_t = DEFAULT_RESTING_HR)]
  resting_hr: u32,

  /// Measured max heart rate, overrides the age estimate
  #[arg(long)]
  max_hr: Option<u32>,

  /// 12-minute Cooper test distance in meters
  #[arg(long)]
  cooper: Option<f64>,
}

impl ZonesCommand {
  pub fn execute(self) -> Result<()> {
    let max_hr = match self.max_hr {
      Some(hr) => hr,
      None => max_heart_rate(self.age)?,
    };
    let zones = heart_rate_zones(max_hr, self.resting_hr)?;

    println!("Heart-rate zones (max {} bpm, resting {} bpm)", max_hr, self.resting_hr);
    println!("{}", zones.to_table());

    if let Some(distance) = self.cooper {
      let vo2max = estimated_vo2max(distance)?;
      let paces = training_paces(vo2max)?;
      println!();
      println!("Training paces (VO2max {:.1})", vo2max);
      println!("{}", paces.to_table());
    }

    Ok(())
  }
}
