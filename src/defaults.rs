//! Named defaults shared by the calculator, the prompt builder and the repairer
//!
//! Everything the pipeline synthesizes on its own comes from here, so tests can
//! assert against the same numbers the implementation uses.

/// ---------------------------------------------------------------------------
/// Plan Shape
/// ---------------------------------------------------------------------------

pub const DEFAULT_DURATION_WEEKS: u32 = 8;
pub const STARTER_DURATION_WEEKS: u32 = 6;
pub const DEFAULT_DAYS_PER_WEEK: u32 = 3;
pub const MAX_DURATION_WEEKS: u32 = 52;

pub const DEFAULT_DISCIPLINE: &str = "running";
pub const DEFAULT_TARGET_GROUP: &str = "recreational runners";
pub const DEFAULT_TARGET_GOAL: &str = "general fitness";
pub const DEFAULT_LEVEL_HINT: &str = "beginner";
pub const DEFAULT_DESCRIPTION: &str = "Structured running plan";
pub const DEFAULT_AUTHOR: &str = "AI running coach";

pub const GENERATED_ID_PREFIX: &str = "generated-plan-";
pub const DEFAULT_PLAN_ID_PREFIX: &str = "default-plan-";
pub const DEFAULT_PLAN_DESCRIPTION: &str =
  "Default plan: a conservative base plan used because the AI response could not be used";

/// Phase labels for three-phase periodization, in order
pub const PHASE_LABELS: [&str; 3] = [
  "base-building",
  "endurance development",
  "intensification",
];

/// ---------------------------------------------------------------------------
/// Synthesized Workout
/// ---------------------------------------------------------------------------

pub const DEFAULT_WORKOUT_TYPE: &str = "easy_run";
pub const DEFAULT_WORKOUT_DESCRIPTION: &str = "Easy run at a conversational pace";
pub const DEFAULT_WORKOUT_DISTANCE_KM: f64 = 5.0;
pub const DEFAULT_WORKOUT_DURATION_MIN: u32 = 30;
pub const DEFAULT_HR_ZONE_LABEL: &str = "Z2";

/// Zone 2 fallback when no personal zones were computed
pub const DEFAULT_ZONE2_MIN_BPM: u32 = 120;
pub const DEFAULT_ZONE2_MAX_BPM: u32 = 140;

/// (type, description, distance km, duration min) for the synthesized
/// Monday / Wednesday / Friday week
pub const DEFAULT_WEEK_WORKOUTS: [(&str, &str, f64, u32); 3] = [
  ("easy_run", "Easy run at a conversational pace", 5.0, 30),
  ("tempo_run", "Steady tempo run, comfortably hard", 6.0, 35),
  ("long_run", "Long easy run, keep the effort relaxed", 8.0, 50),
];

/// ---------------------------------------------------------------------------
/// Plan Extras
/// ---------------------------------------------------------------------------

pub const DEFAULT_CORRECTIVE_FREQUENCY: &str = "daily";
pub const DEFAULT_PAIN_SCALE: &str = "0-10";
pub const DEFAULT_PAIN_RULES: [&str; 2] = [
  "Pain 0-3: continue training as planned",
  "Pain above 3 or getting worse during the run: stop the session and rest until pain-free",
];

/// ---------------------------------------------------------------------------
/// Physiology
/// ---------------------------------------------------------------------------

pub const MIN_AGE: u32 = 10;
pub const MAX_AGE: u32 = 100;
pub const DEFAULT_RESTING_HR: u32 = 60;

/// Heart-rate-reserve boundaries for zones 1..=5
pub const HRR_FRACTIONS: [f64; 6] = [0.5, 0.6, 0.7, 0.8, 0.9, 1.0];

pub const ZONE_NAMES: [&str; 5] = [
  "Z1 Recovery",
  "Z2 Aerobic",
  "Z3 Tempo",
  "Z4 Threshold",
  "Z5 VO2max",
];

pub const THRESHOLD_EFFORT: f64 = 0.85;
pub const MARATHON_EFFORT: f64 = 0.75;
pub const INTERVAL_EFFORT: f64 = 0.95;
pub const RECOVERY_EFFORT: f64 = 0.65;

/// Cooper test: VO2max = (distance - 504.9) / 44.73
pub const COOPER_OFFSET_M: f64 = 504.9;
pub const COOPER_DIVISOR: f64 = 44.73;

/// ---------------------------------------------------------------------------
/// Generation Client
/// ---------------------------------------------------------------------------

pub const MAX_ATTEMPTS: u32 = 3;
pub const BASE_DELAY_MS: u64 = 1000;
pub const ATTEMPT_TIMEOUT_SECS: u64 = 30;
/// Reported when the last failure carried no HTTP status
pub const DEFAULT_FAILURE_STATUS: u16 = 500;
pub const DEFAULT_MAX_TOKENS: u32 = 8000;
