//! Read-only coaching knowledge and example plan templates
//!
//! Both are consumed as opaque lookups by the context builder. A missing
//! knowledge entry degrades to a placeholder string and a missing template is
//! simply omitted from the prompt.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde_json::{json, Value};
use thiserror::Error;

use crate::models::{ExperienceLevel, MainGoal, TargetDistance, UserProfile};

#[derive(Error, Debug)]
pub enum KnowledgeError {
  #[error("Failed to read knowledge file: {0}")]
  Io(#[from] std::io::Error),

  #[error("Knowledge file is not a JSON object of strings: {0}")]
  Format(String),
}

/// ---------------------------------------------------------------------------
/// Knowledge Base
/// ---------------------------------------------------------------------------

pub mod keys {
  pub const PRINCIPLES: &str = "principles";
  pub const PHASES: &str = "phases";
  pub const INJURY_PREVENTION: &str = "injury_prevention";
  pub const NUTRITION: &str = "nutrition";
  pub const HYDRATION: &str = "hydration";
  pub const STRENGTH_EXERCISES: &str = "exercises.strength";
  pub const CORRECTIVE_EXERCISES: &str = "exercises.corrective";
  pub const GENERAL_FOCUS: &str = "focus.general";

  pub fn distance_focus(distance: &str) -> String {
    format!("distance.{}.focus", distance)
  }
}

pub trait KnowledgeBase: Send + Sync {
  fn lookup(&self, key: &str) -> Option<&str>;

  /// Lookup that never fails
  fn get_or_placeholder(&self, key: &str) -> String {
    self
      .lookup(key)
      .map(str::to_string)
      .unwrap_or_else(|| format!("[no knowledge available for '{}']", key))
  }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryKnowledgeBase {
  entries: HashMap<String, String>,
}

impl InMemoryKnowledgeBase {
  pub fn new(entries: HashMap<String, String>) -> Self {
    Self { entries }
  }

  /// Built-in coaching notes shipped with the crate
  pub fn builtin() -> Self {
    let entries = [
      (keys::PRINCIPLES, "Increase weekly volume by no more than about 10%. Keep roughly 80% of running easy (zones 1-2). Place a lighter recovery week every 3-4 weeks. Never schedule two hard sessions on consecutive days."),
      (keys::PHASES, "Base-building: easy aerobic volume and running technique. Endurance development: longer long runs and steady tempo work. Intensification: race-specific intervals and threshold sessions, followed by a short taper before a race."),
      (keys::INJURY_PREVENTION, "Warm up for 10 minutes before quality sessions. Strengthen hips, glutes, calves and core twice a week. Stop on sharp pain and reduce load for pain that persists over 24 hours."),
      (keys::NUTRITION, "Eat a carbohydrate-based meal 2-3 hours before long or hard sessions. Refuel with carbohydrates and protein within an hour after training."),
      (keys::HYDRATION, "Drink regularly through the day. For runs longer than 60 minutes take 400-800 ml of fluid per hour, with electrolytes in the heat."),
      (keys::STRENGTH_EXERCISES, "Squats, lunges, glute bridges, calf raises, side planks, single-leg deadlifts."),
      (keys::CORRECTIVE_EXERCISES, "Clamshells, hip flexor stretch, ankle mobility drills, dead bugs, foam rolling of calves and quadriceps."),
      (keys::GENERAL_FOCUS, "Build a consistent aerobic base and a sustainable running habit."),
      ("distance.5k.focus", "5 km: develop aerobic base, add short intervals and strides for speed."),
      ("distance.10k.focus", "10 km: threshold runs and 1 km repeats on top of steady aerobic volume."),
      ("distance.half_marathon.focus", "Half marathon: progressive long runs up to 18-20 km and tempo runs at threshold."),
      ("distance.marathon.focus", "Marathon: long runs up to 30-32 km, marathon-pace segments, fueling practice and a 2-3 week taper."),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    Self { entries }
  }

  /// Built-in entries overridden by a JSON object file (`{"key": "text"}`)
  pub fn from_json_file(path: &Path) -> Result<Self, KnowledgeError> {
    let raw = fs::read_to_string(path)?;
    let overrides: HashMap<String, String> =
      serde_json::from_str(&raw).map_err(|e| KnowledgeError::Format(e.to_string()))?;

    let mut kb = Self::builtin();
    kb.entries.extend(overrides);
    Ok(kb)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl KnowledgeBase for InMemoryKnowledgeBase {
  fn lookup(&self, key: &str) -> Option<&str> {
    self.entries.get(key).map(String::as_str)
  }
}

/// ---------------------------------------------------------------------------
/// Example Plan Templates
/// ---------------------------------------------------------------------------

pub trait PlanTemplateSelector: Send + Sync {
  /// A structure-only example plan, or None when nothing fits
  fn select(&self, profile: &UserProfile) -> Option<Value>;
}

/// Match criteria; None matches anything
#[derive(Debug, Clone, Default)]
pub struct TemplateCriteria {
  pub level: Option<ExperienceLevel>,
  pub goal: Option<MainGoal>,
  pub days_per_week: Option<usize>,
  pub injuries: Option<bool>,
}

impl TemplateCriteria {
  fn matches(&self, profile: &UserProfile) -> bool {
    self.level.map_or(true, |l| l == profile.experience_level)
      && self.goal.map_or(true, |g| g == profile.main_goal)
      && self.days_per_week.map_or(true, |d| d == profile.days_per_week())
      && self.injuries.map_or(true, |i| i == profile.health.has_injuries)
  }

  fn specificity(&self) -> usize {
    [
      self.level.is_some(),
      self.goal.is_some(),
      self.days_per_week.is_some(),
      self.injuries.is_some(),
    ]
    .iter()
    .filter(|set| **set)
    .count()
  }

  fn is_generic(&self) -> bool {
    self.specificity() == 0
  }
}

#[derive(Debug, Clone)]
pub struct TemplateEntry {
  pub criteria: TemplateCriteria,
  pub template: Value,
}

/// Picks the most specific matching template, then the generic one
#[derive(Debug, Clone, Default)]
pub struct BuiltinTemplates {
  entries: Vec<TemplateEntry>,
}

impl BuiltinTemplates {
  pub fn new(entries: Vec<TemplateEntry>) -> Self {
    Self { entries }
  }

  pub fn builtin() -> Self {
    Self::new(vec![
      TemplateEntry {
        criteria: TemplateCriteria {
          level: Some(ExperienceLevel::Beginner),
          goal: Some(MainGoal::StartRunning),
          ..Default::default()
        },
        template: skeleton_template(&["<walk-run session>", "<walk-run session>", "<longer walk-run>"]),
      },
      TemplateEntry {
        criteria: TemplateCriteria {
          injuries: Some(true),
          ..Default::default()
        },
        template: skeleton_template(&["<easy run + corrective work>", "<cross-training>", "<easy run>"]),
      },
      TemplateEntry {
        criteria: TemplateCriteria::default(),
        template: skeleton_template(&["<easy run>", "<quality session>", "<long run>"]),
      },
    ])
  }
}

impl PlanTemplateSelector for BuiltinTemplates {
  fn select(&self, profile: &UserProfile) -> Option<Value> {
    self
      .entries
      .iter()
      .filter(|e| !e.criteria.is_generic() && e.criteria.matches(profile))
      .max_by_key(|e| e.criteria.specificity())
      .or_else(|| self.entries.iter().find(|e| e.criteria.is_generic()))
      .map(|e| e.template.clone())
  }
}

/// One-week skeleton with placeholder content
fn skeleton_template(sessions: &[&str]) -> Value {
  let days: Vec<Value> = sessions
    .iter()
    .map(|session| {
      json!({
        "day_name": "<canonical weekday>",
        "date": "<YYYY-MM-DD>",
        "workout": {
          "type": session,
          "description": "<what to do>",
          "distance": "<km or null>",
          "duration": "<minutes>",
          "target_pace": "<min:sec/km or null>",
          "target_heart_rate": { "min": "<bpm>", "max": "<bpm>", "zone": "<Z1-Z5>" },
          "support_exercises": [{ "name": "<exercise>", "sets": "<n>", "reps": "<n>", "duration": null }]
        }
      })
    })
    .collect();

  json!({
    "id": "<plan id>",
    "metadata": {
      "discipline": "running",
      "target_group": "<who>",
      "target_goal": "<goal>",
      "level_hint": "<level>",
      "days_per_week": "<n>",
      "duration_weeks": "<n>",
      "description": "<summary>",
      "author": "<author>"
    },
    "plan_weeks": [{ "week_num": 1, "focus": "<phase focus>", "days": days }],
    "corrective_exercises": { "frequency": "<how often>", "list": [] },
    "pain_monitoring": { "scale": "0-10", "rules": ["<rule>"] },
    "notes": ["<note>"]
  })
}

/// Key of the distance-specific focus entry for a profile
pub fn focus_key(target: Option<TargetDistance>) -> String {
  match target {
    Some(distance) => keys::distance_focus(distance.as_str()),
    None => keys::GENERAL_FOCUS.to_string(),
  }
}
