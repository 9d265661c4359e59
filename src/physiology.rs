//! Physiological calculator
//!
//! Pure functions for heart-rate zones and training paces. These numbers are
//! computed in Rust and handed to the model, it never does the math itself.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::defaults::{
  COOPER_DIVISOR, COOPER_OFFSET_M, HRR_FRACTIONS, INTERVAL_EFFORT, MARATHON_EFFORT, MAX_AGE,
  MIN_AGE, RECOVERY_EFFORT, THRESHOLD_EFFORT, ZONE_NAMES,
};

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum PhysiologyError {
  #[error("Invalid input: {0}")]
  InvalidInput(String),
}

/// ---------------------------------------------------------------------------
/// Heart Rate
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartRateZone {
  pub name: String,
  pub min: u32,
  pub max: u32,
}

/// Five contiguous zones, zone 1 first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartRateZones {
  pub zones: Vec<HeartRateZone>,
}

impl HeartRateZones {
  /// 1-based lookup
  pub fn zone(&self, number: usize) -> Option<&HeartRateZone> {
    number.checked_sub(1).and_then(|i| self.zones.get(i))
  }

  pub fn to_table(&self) -> String {
    self
      .zones
      .iter()
      .map(|z| format!("- {}: {}-{} bpm", z.name, z.min, z.max))
      .collect::<Vec<_>>()
      .join("\n")
  }
}

/// Tanaka formula: 208 - 0.7 * age
pub fn max_heart_rate(age: u32) -> Result<u32, PhysiologyError> {
  if !(MIN_AGE..=MAX_AGE).contains(&age) {
    return Err(PhysiologyError::InvalidInput(format!(
      "age {} outside {}-{}",
      age, MIN_AGE, MAX_AGE
    )));
  }
  Ok((208.0 - 0.7 * age as f64).round() as u32)
}

/// Karvonen zones from heart-rate reserve
pub fn heart_rate_zones(max_hr: u32, resting_hr: u32) -> Result<HeartRateZones, PhysiologyError> {
  if max_hr <= resting_hr {
    return Err(PhysiologyError::InvalidInput(format!(
      "max HR {} must be above resting HR {}",
      max_hr, resting_hr
    )));
  }

  let reserve = (max_hr - resting_hr) as f64;
  let bound = |fraction: f64| resting_hr + (fraction * reserve).round() as u32;

  let zones = ZONE_NAMES
    .iter()
    .enumerate()
    .map(|(i, name)| HeartRateZone {
      name: name.to_string(),
      min: bound(HRR_FRACTIONS[i]),
      max: bound(HRR_FRACTIONS[i + 1]),
    })
    .collect();

  Ok(HeartRateZones { zones })
}

/// ---------------------------------------------------------------------------
/// VO2max and Paces
/// ---------------------------------------------------------------------------

/// VO2max estimate from a 12-minute Cooper test
pub fn estimated_vo2max(cooper_distance_m: f64) -> Result<f64, PhysiologyError> {
  if !cooper_distance_m.is_finite() || cooper_distance_m <= COOPER_OFFSET_M {
    return Err(PhysiologyError::InvalidInput(format!(
      "Cooper distance {} m is too short",
      cooper_distance_m
    )));
  }
  Ok((cooper_distance_m - COOPER_OFFSET_M) / COOPER_DIVISOR)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pace {
  pub minutes: u32,
  pub seconds: u32,
}

impl Pace {
  pub fn from_seconds_per_km(total: u32) -> Self {
    Self {
      minutes: total / 60,
      seconds: total % 60,
    }
  }

  pub fn total_seconds(&self) -> u32 {
    self.minutes * 60 + self.seconds
  }
}

impl std::fmt::Display for Pace {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}:{:02} min/km", self.minutes, self.seconds)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingPaces {
  pub threshold: Pace,
  pub marathon: Pace,
  pub interval: Pace,
  pub recovery: Pace,
}

impl TrainingPaces {
  pub fn to_table(&self) -> String {
    format!(
      "- threshold: {}\n- marathon: {}\n- interval: {}\n- recovery: {}",
      self.threshold, self.marathon, self.interval, self.recovery
    )
  }
}

/// Paces at fixed fractions of VO2max, solved through the Daniels-Gilbert
/// oxygen cost curve: VO2 = -4.60 + 0.182258 v + 0.000104 v^2 (v in m/min)
pub fn training_paces(vo2max: f64) -> Result<TrainingPaces, PhysiologyError> {
  if !vo2max.is_finite() || vo2max <= 0.0 {
    return Err(PhysiologyError::InvalidInput(format!("VO2max {} must be positive", vo2max)));
  }

  let pace_at = |effort: f64| -> Pace {
    let vo2 = effort * vo2max;
    let (a, b, c) = (0.000104, 0.182258, -4.60 - vo2);
    let velocity = (-b + (b * b - 4.0 * a * c).sqrt()) / (2.0 * a);
    Pace::from_seconds_per_km((60_000.0 / velocity).round() as u32)
  };

  Ok(TrainingPaces {
    threshold: pace_at(THRESHOLD_EFFORT),
    marathon: pace_at(MARATHON_EFFORT),
    interval: pace_at(INTERVAL_EFFORT),
    recovery: pace_at(RECOVERY_EFFORT),
  })
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;

  #[test]
  fn test_max_heart_rate_tanaka() {
    assert_eq!(max_heart_rate(40).unwrap(), 180); // 208 - 28
    assert_eq!(max_heart_rate(30).unwrap(), 187);
  }

  #[test]
  fn test_max_heart_rate_rejects_out_of_range_age() {
    assert!(matches!(max_heart_rate(9), Err(PhysiologyError::InvalidInput(_))));
    assert!(matches!(max_heart_rate(101), Err(PhysiologyError::InvalidInput(_))));
    assert!(max_heart_rate(10).is_ok());
    assert!(max_heart_rate(100).is_ok());
  }

  #[test]
  fn test_zones_known_values() {
    // Reserve 120: boundaries at 60 + {60, 72, 84, 96, 108, 120}
    let zones = heart_rate_zones(180, 60).unwrap();
    assert_eq!(zones.zones.len(), 5);
    assert_eq!(zones.zone(1).unwrap().min, 120);
    assert_eq!(zones.zone(2).unwrap().min, 132);
    assert_eq!(zones.zone(2).unwrap().max, 144);
    assert_eq!(zones.zone(5).unwrap().max, 180);
    assert!(zones.zone(0).is_none());
  }

  #[test]
  fn test_zones_reject_inverted_heart_rates() {
    assert!(heart_rate_zones(60, 60).is_err());
    assert!(heart_rate_zones(50, 70).is_err());
  }

  #[test]
  fn test_vo2max_from_cooper() {
    let vo2 = estimated_vo2max(2800.0).unwrap();
    assert!((vo2 - 51.31).abs() < 0.01);
    assert!(estimated_vo2max(400.0).is_err());
  }

  #[test]
  fn test_paces_ordering() {
    let paces = training_paces(50.0).unwrap();
    // Higher effort means a faster (smaller) pace
    assert!(paces.interval.total_seconds() < paces.threshold.total_seconds());
    assert!(paces.threshold.total_seconds() < paces.marathon.total_seconds());
    assert!(paces.marathon.total_seconds() < paces.recovery.total_seconds());
    assert!(paces.threshold.seconds < 60);
  }

  #[test]
  fn test_paces_plausible_for_vo2max_50() {
    // Threshold for VO2max 50 sits around 4:30 min/km
    let paces = training_paces(50.0).unwrap();
    let threshold = paces.threshold.total_seconds();
    assert!((250..=300).contains(&threshold), "threshold was {}", threshold);
  }

  #[test]
  fn test_paces_reject_non_positive() {
    assert!(training_paces(0.0).is_err());
    assert!(training_paces(f64::NAN).is_err());
  }

  proptest! {
    #[test]
    fn prop_zones_contiguous_and_capped(resting in 30u32..100, gap in 1u32..150) {
      let max_hr = resting + gap;
      let zones = heart_rate_zones(max_hr, resting).unwrap();
      prop_assert_eq!(zones.zones.len(), 5);
      for pair in zones.zones.windows(2) {
        prop_assert_eq!(pair[0].max, pair[1].min);
      }
      for zone in &zones.zones {
        prop_assert!(zone.min <= zone.max);
      }
      prop_assert_eq!(zones.zones[4].max, max_hr);
    }
  }
}
