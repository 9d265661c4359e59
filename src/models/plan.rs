use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::profile::TrainingDay;
use crate::defaults::{
  DEFAULT_AUTHOR, DEFAULT_DAYS_PER_WEEK, DEFAULT_DESCRIPTION, DEFAULT_DISCIPLINE,
  DEFAULT_DURATION_WEEKS, DEFAULT_LEVEL_HINT, DEFAULT_TARGET_GOAL, DEFAULT_TARGET_GROUP,
};

/// ---------------------------------------------------------------------------
/// Training Plan (wire schema, field names fixed)
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingPlan {
  pub id: String,
  pub metadata: PlanMetadata,
  pub plan_weeks: Vec<Week>,
  pub corrective_exercises: CorrectiveExercises,
  pub pain_monitoring: PainMonitoring,
  pub notes: Vec<String>,
}

impl TrainingPlan {
  pub fn total_days(&self) -> usize {
    self.plan_weeks.iter().map(|w| w.days.len()).sum()
  }

  pub fn to_json(&self) -> String {
    serde_json::to_string_pretty(self).unwrap_or_default()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanMetadata {
  pub discipline: String,
  pub target_group: String,
  pub target_goal: String,
  pub level_hint: String,
  pub days_per_week: u32,
  pub duration_weeks: u32,
  pub description: String,
  pub author: String,
}

impl Default for PlanMetadata {
  fn default() -> Self {
    Self {
      discipline: DEFAULT_DISCIPLINE.to_string(),
      target_group: DEFAULT_TARGET_GROUP.to_string(),
      target_goal: DEFAULT_TARGET_GOAL.to_string(),
      level_hint: DEFAULT_LEVEL_HINT.to_string(),
      days_per_week: DEFAULT_DAYS_PER_WEEK,
      duration_weeks: DEFAULT_DURATION_WEEKS,
      description: DEFAULT_DESCRIPTION.to_string(),
      author: DEFAULT_AUTHOR.to_string(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Week {
  pub week_num: u32,
  pub focus: String,
  pub days: Vec<Day>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Day {
  pub day_name: TrainingDay,
  pub date: NaiveDate,
  pub workout: Workout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
  #[serde(rename = "type")]
  pub workout_type: String,
  pub description: String,
  /// Kilometers; null for sessions without a distance target
  pub distance: Option<f64>,
  /// Minutes
  pub duration: u32,
  pub target_pace: Option<String>,
  pub target_heart_rate: HeartRateTarget,
  pub support_exercises: Vec<SupportExercise>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRateTarget {
  pub min: u32,
  pub max: u32,
  pub zone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportExercise {
  pub name: String,
  pub sets: Option<u32>,
  pub reps: Option<u32>,
  pub duration: Option<String>,
}

/// ---------------------------------------------------------------------------
/// Plan Extras
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectiveExercises {
  pub frequency: String,
  pub list: Vec<CorrectiveExercise>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectiveExercise {
  pub name: String,
  pub sets: Option<u32>,
  pub reps: Option<u32>,
  pub duration: Option<String>,
  pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PainMonitoring {
  pub scale: String,
  pub rules: Vec<String>,
}
