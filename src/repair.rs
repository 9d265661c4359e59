//! Validator/repairer for parsed plans
//!
//! Takes whatever object the parser recovered and returns a plan that
//! satisfies every structural invariant. Data-quality problems are never
//! errors: missing or malformed fields are synthesized from defaults,
//! deterministically by position. Repairing a repaired plan changes nothing.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::context::parse_date;
use crate::defaults::{
  DEFAULT_CORRECTIVE_FREQUENCY, DEFAULT_DURATION_WEEKS, DEFAULT_HR_ZONE_LABEL,
  DEFAULT_PAIN_RULES, DEFAULT_PAIN_SCALE, DEFAULT_PLAN_DESCRIPTION, DEFAULT_PLAN_ID_PREFIX,
  DEFAULT_WEEK_WORKOUTS, DEFAULT_WORKOUT_DESCRIPTION, DEFAULT_WORKOUT_DISTANCE_KM,
  DEFAULT_WORKOUT_DURATION_MIN, DEFAULT_WORKOUT_TYPE, DEFAULT_ZONE2_MAX_BPM,
  DEFAULT_ZONE2_MIN_BPM, GENERATED_ID_PREFIX, MAX_DURATION_WEEKS, PHASE_LABELS,
};
use crate::models::{
  CorrectiveExercise, CorrectiveExercises, Day, HeartRateTarget, PainMonitoring, PlanMetadata,
  SupportExercise, TrainingDay, TrainingPlan, Week, Workout,
};
use crate::physiology::HeartRateZones;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RepairError {
  /// Only a non-object input is rejected; it means the caller skipped the parser
  #[error("Plan must be a JSON object, got {0}")]
  InvalidPlanShape(String),
}

#[derive(Debug, Clone)]
pub struct RepairOptions {
  /// Pad or truncate `plan_weeks` to exactly this many weeks
  pub expected_weeks: Option<u32>,
  /// First day of week 1; synthesized dates are laid out from here
  pub reference_date: NaiveDate,
  /// Timestamp used for generated plan ids
  pub generated_at: DateTime<Utc>,
  /// The runner's zones, used for synthesized heart-rate targets
  pub zones: Option<HeartRateZones>,
}

impl RepairOptions {
  pub fn new(reference_date: NaiveDate, generated_at: DateTime<Utc>) -> Self {
    Self {
      expected_weeks: None,
      reference_date,
      generated_at,
      zones: None,
    }
  }

  pub fn with_expected_weeks(mut self, weeks: u32) -> Self {
    self.expected_weeks = Some(weeks);
    self
  }

  pub fn with_zones(mut self, zones: Option<HeartRateZones>) -> Self {
    self.zones = zones;
    self
  }

  fn zone2(&self) -> (u32, u32) {
    self
      .zones
      .as_ref()
      .and_then(|z| z.zone(2))
      .map(|z| (z.min, z.max))
      .unwrap_or((DEFAULT_ZONE2_MIN_BPM, DEFAULT_ZONE2_MAX_BPM))
  }
}

/// ---------------------------------------------------------------------------
/// Entry Points
/// ---------------------------------------------------------------------------

pub fn repair_plan(value: Value, opts: &RepairOptions) -> Result<TrainingPlan, RepairError> {
  match value {
    Value::Object(map) => Ok(build_plan(&map, opts)),
    other => Err(RepairError::InvalidPlanShape(json_type_name(&other).to_string())),
  }
}

/// The plan used when nothing usable came back from the model
pub fn default_plan(opts: &RepairOptions) -> TrainingPlan {
  let mut map = Map::new();
  map.insert(
    "id".to_string(),
    Value::String(format!(
      "{}{}",
      DEFAULT_PLAN_ID_PREFIX,
      opts.generated_at.timestamp_millis()
    )),
  );
  map.insert(
    "metadata".to_string(),
    json!({ "description": DEFAULT_PLAN_DESCRIPTION }),
  );
  build_plan(&map, opts)
}

fn json_type_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

fn build_plan(map: &Map<String, Value>, opts: &RepairOptions) -> TrainingPlan {
  let id = match str_field(map, "id") {
    Some(id) => id.to_string(),
    None => {
      let id = format!("{}{}", GENERATED_ID_PREFIX, opts.generated_at.timestamp_millis());
      debug!(%id, "Plan id missing, generated one");
      id
    }
  };

  let raw_metadata = map.get("metadata").and_then(Value::as_object);
  let mut metadata = repair_metadata(raw_metadata);

  let raw_weeks: &[Value] = match map.get("plan_weeks") {
    Some(Value::Array(weeks)) => weeks,
    _ => {
      debug!("plan_weeks missing, synthesizing");
      &[]
    }
  };

  // The caller's expectation is exact. The model's own duration is trusted up
  // to the usual maximum, or further when it actually sent that many weeks.
  let metadata_cap = MAX_DURATION_WEEKS.max(u32::try_from(raw_weeks.len()).unwrap_or(u32::MAX));
  let target = opts
    .expected_weeks
    .filter(|w| *w >= 1)
    .or_else(|| {
      raw_metadata
        .and_then(|m| u32_field(m, "duration_weeks"))
        .filter(|w| (1..=metadata_cap).contains(w))
    })
    .unwrap_or(DEFAULT_DURATION_WEEKS) as usize;

  if raw_weeks.len() > target {
    warn!(
      received = raw_weeks.len(),
      expected = target,
      "Truncating plan to the earliest weeks"
    );
  } else if !raw_weeks.is_empty() && raw_weeks.len() < target {
    debug!(
      received = raw_weeks.len(),
      expected = target,
      "Padding plan with synthesized weeks"
    );
  }

  let plan_weeks: Vec<Week> = (0..target)
    .map(|idx| match raw_weeks.get(idx) {
      Some(raw) => repair_week(raw, idx, target, opts),
      None => synthesize_week(idx, target, opts),
    })
    .collect();

  metadata.duration_weeks = plan_weeks.len() as u32;

  TrainingPlan {
    id,
    metadata,
    plan_weeks,
    corrective_exercises: repair_corrective(map.get("corrective_exercises")),
    pain_monitoring: repair_pain_monitoring(map.get("pain_monitoring")),
    notes: repair_notes(map.get("notes")),
  }
}

/// ---------------------------------------------------------------------------
/// Field Helpers
/// ---------------------------------------------------------------------------

fn str_field<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
  map
    .get(key)
    .and_then(Value::as_str)
    .map(str::trim)
    .filter(|s| !s.is_empty())
}

/// Non-negative integer; accepts floats (rounded) and numeric strings
fn u32_field(map: &Map<String, Value>, key: &str) -> Option<u32> {
  as_u32(map.get(key)?)
}

fn as_u32(value: &Value) -> Option<u32> {
  match value {
    Value::Number(n) => n
      .as_u64()
      .and_then(|v| u32::try_from(v).ok())
      .or_else(|| {
        n.as_f64()
          .filter(|f| f.is_finite() && *f >= 0.0 && *f <= u32::MAX as f64)
          .map(|f| f.round() as u32)
      }),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}

fn optional_string(value: Option<&Value>) -> Option<String> {
  match value? {
    Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

/// ---------------------------------------------------------------------------
/// Metadata and Extras
/// ---------------------------------------------------------------------------

fn repair_metadata(raw: Option<&Map<String, Value>>) -> PlanMetadata {
  let defaults = PlanMetadata::default();
  let Some(m) = raw else {
    debug!("metadata missing, using defaults");
    return defaults;
  };

  let text = |key: &str, fallback: String| str_field(m, key).map(str::to_string).unwrap_or(fallback);

  PlanMetadata {
    discipline: text("discipline", defaults.discipline),
    target_group: text("target_group", defaults.target_group),
    target_goal: text("target_goal", defaults.target_goal),
    level_hint: text("level_hint", defaults.level_hint),
    days_per_week: u32_field(m, "days_per_week")
      .filter(|d| (1..=7).contains(d))
      .unwrap_or(defaults.days_per_week),
    // Overwritten once the week list is final
    duration_weeks: defaults.duration_weeks,
    description: text("description", defaults.description),
    author: text("author", defaults.author),
  }
}

fn repair_corrective(raw: Option<&Value>) -> CorrectiveExercises {
  let Some(m) = raw.and_then(Value::as_object) else {
    return CorrectiveExercises {
      frequency: DEFAULT_CORRECTIVE_FREQUENCY.to_string(),
      list: Vec::new(),
    };
  };

  let list = m
    .get("list")
    .and_then(Value::as_array)
    .map(|items| {
      items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|e| {
          Some(CorrectiveExercise {
            name: str_field(e, "name")?.to_string(),
            sets: u32_field(e, "sets"),
            reps: u32_field(e, "reps"),
            duration: optional_string(e.get("duration")),
            description: optional_string(e.get("description")),
          })
        })
        .collect()
    })
    .unwrap_or_default();

  CorrectiveExercises {
    frequency: str_field(m, "frequency")
      .unwrap_or(DEFAULT_CORRECTIVE_FREQUENCY)
      .to_string(),
    list,
  }
}

fn repair_pain_monitoring(raw: Option<&Value>) -> PainMonitoring {
  let m = raw.and_then(Value::as_object);

  let rules: Vec<String> = m
    .and_then(|m| m.get("rules"))
    .and_then(Value::as_array)
    .map(|rules| {
      rules
        .iter()
        .filter_map(Value::as_str)
        .filter(|r| !r.trim().is_empty())
        .map(str::to_string)
        .collect()
    })
    .unwrap_or_default();

  PainMonitoring {
    scale: m
      .and_then(|m| str_field(m, "scale"))
      .unwrap_or(DEFAULT_PAIN_SCALE)
      .to_string(),
    rules: if rules.is_empty() {
      DEFAULT_PAIN_RULES.iter().map(|r| r.to_string()).collect()
    } else {
      rules
    },
  }
}

fn repair_notes(raw: Option<&Value>) -> Vec<String> {
  raw
    .and_then(Value::as_array)
    .map(|notes| {
      notes
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
    })
    .unwrap_or_default()
}

/// ---------------------------------------------------------------------------
/// Weeks and Days
/// ---------------------------------------------------------------------------

/// Focus for week `idx` of `total`: first third base, middle third
/// endurance, final third intensification
pub fn phase_label(idx: usize, total: usize) -> &'static str {
  let phase = (idx * PHASE_LABELS.len()) / total.max(1);
  PHASE_LABELS[phase.min(PHASE_LABELS.len() - 1)]
}

/// First date on or after the start of week `week_idx` that falls on `day`
pub fn aligned_date(reference: NaiveDate, week_idx: usize, day: TrainingDay) -> NaiveDate {
  let window_start = reference + Duration::days(7 * week_idx as i64);
  let start_offset = TrainingDay::from_chrono(window_start.weekday()).offset();
  let shift = (day.offset() + 7 - start_offset) % 7;
  window_start + Duration::days(shift as i64)
}

fn repair_week(raw: &Value, idx: usize, total: usize, opts: &RepairOptions) -> Week {
  let Some(m) = raw.as_object() else {
    debug!(week = idx + 1, "Week is not an object, synthesizing");
    return synthesize_week(idx, total, opts);
  };

  let focus = str_field(m, "focus")
    .map(str::to_string)
    .unwrap_or_else(|| phase_label(idx, total).to_string());

  let days = match m.get("days").and_then(Value::as_array) {
    Some(days) if !days.is_empty() => days
      .iter()
      .enumerate()
      .map(|(day_idx, day)| repair_day(day, day_idx, idx, opts))
      .collect(),
    _ => {
      debug!(week = idx + 1, "Week has no days, synthesizing");
      synthesize_days(idx, opts)
    }
  };

  Week {
    week_num: idx as u32 + 1,
    focus,
    days,
  }
}

fn synthesize_week(idx: usize, total: usize, opts: &RepairOptions) -> Week {
  Week {
    week_num: idx as u32 + 1,
    focus: phase_label(idx, total).to_string(),
    days: synthesize_days(idx, opts),
  }
}

/// Monday / Wednesday / Friday: easy, tempo, long
fn synthesize_days(week_idx: usize, opts: &RepairOptions) -> Vec<Day> {
  let (min, max) = opts.zone2();
  let weekdays = [TrainingDay::Monday, TrainingDay::Wednesday, TrainingDay::Friday];

  weekdays
    .iter()
    .zip(DEFAULT_WEEK_WORKOUTS.iter())
    .map(|(&day, &(workout_type, description, distance, duration))| Day {
      day_name: day,
      date: aligned_date(opts.reference_date, week_idx, day),
      workout: Workout {
        workout_type: workout_type.to_string(),
        description: description.to_string(),
        distance: Some(distance),
        duration,
        target_pace: None,
        target_heart_rate: HeartRateTarget {
          min,
          max,
          zone: DEFAULT_HR_ZONE_LABEL.to_string(),
        },
        support_exercises: Vec::new(),
      },
    })
    .collect()
}

fn repair_day(raw: &Value, day_idx: usize, week_idx: usize, opts: &RepairOptions) -> Day {
  let m = raw.as_object();

  let day_name = m
    .and_then(|m| str_field(m, "day_name"))
    .and_then(TrainingDay::parse_lenient)
    .unwrap_or_else(|| TrainingDay::from_position(day_idx));

  let date = m
    .and_then(|m| str_field(m, "date"))
    .and_then(parse_date)
    .unwrap_or_else(|| aligned_date(opts.reference_date, week_idx, day_name));

  let workout = match m.and_then(|m| m.get("workout")).and_then(Value::as_object) {
    Some(w) => repair_workout(w, opts),
    None => {
      debug!(week = week_idx + 1, day = day_idx + 1, "Workout missing, using easy run");
      default_workout(opts)
    }
  };

  Day {
    day_name,
    date,
    workout,
  }
}

/// ---------------------------------------------------------------------------
/// Workouts
/// ---------------------------------------------------------------------------

fn default_workout(opts: &RepairOptions) -> Workout {
  repair_workout(&Map::new(), opts)
}

fn repair_workout(m: &Map<String, Value>, opts: &RepairOptions) -> Workout {
  // An explicit null distance is meaningful (strength or mobility sessions)
  let distance = match m.get("distance") {
    Some(Value::Null) => None,
    Some(Value::Number(n)) => Some(
      n.as_f64()
        .filter(|d| d.is_finite() && *d >= 0.0)
        .unwrap_or(DEFAULT_WORKOUT_DISTANCE_KM),
    ),
    Some(Value::String(s)) => Some(
      s.trim()
        .trim_end_matches("km")
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
        .unwrap_or(DEFAULT_WORKOUT_DISTANCE_KM),
    ),
    _ => Some(DEFAULT_WORKOUT_DISTANCE_KM),
  };

  let support_exercises = m
    .get("support_exercises")
    .and_then(Value::as_array)
    .map(|items| {
      items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|e| {
          Some(SupportExercise {
            name: str_field(e, "name")?.to_string(),
            sets: u32_field(e, "sets"),
            reps: u32_field(e, "reps"),
            duration: optional_string(e.get("duration")),
          })
        })
        .collect()
    })
    .unwrap_or_default();

  Workout {
    workout_type: str_field(m, "type")
      .unwrap_or(DEFAULT_WORKOUT_TYPE)
      .to_string(),
    description: str_field(m, "description")
      .unwrap_or(DEFAULT_WORKOUT_DESCRIPTION)
      .to_string(),
    distance,
    duration: u32_field(m, "duration").unwrap_or(DEFAULT_WORKOUT_DURATION_MIN),
    target_pace: m
      .get("target_pace")
      .and_then(Value::as_str)
      .filter(|p| !p.trim().is_empty())
      .map(str::to_string),
    target_heart_rate: repair_heart_rate(m.get("target_heart_rate"), opts),
    support_exercises,
  }
}

fn repair_heart_rate(raw: Option<&Value>, opts: &RepairOptions) -> HeartRateTarget {
  let (default_min, default_max) = opts.zone2();
  let m = raw.and_then(Value::as_object);

  let mut min = m.and_then(|m| u32_field(m, "min")).unwrap_or(default_min);
  let mut max = m.and_then(|m| u32_field(m, "max")).unwrap_or(default_max);
  if min > max {
    std::mem::swap(&mut min, &mut max);
  }

  HeartRateTarget {
    min,
    max,
    zone: m
      .and_then(|m| str_field(m, "zone"))
      .unwrap_or(DEFAULT_HR_ZONE_LABEL)
      .to_string(),
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
