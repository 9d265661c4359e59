//! Prompt assembly for plan generation
//!
//! Everything the model needs is computed here first (duration, zones, paces)
//! and rendered into one prompt. The constraints listed in the prompt are
//! requests only; the repairer and the reconciler enforce them afterwards.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use serde::Serialize;
use tracing::debug;

use crate::defaults::{
  DEFAULT_DURATION_WEEKS, DEFAULT_RESTING_HR, MAX_DURATION_WEEKS, STARTER_DURATION_WEEKS,
};
use crate::knowledge::{focus_key, keys, KnowledgeBase, PlanTemplateSelector};
use crate::models::{MainGoal, TargetDistance, TrainingDay, UserProfile};
use crate::physiology::{
  estimated_vo2max, heart_rate_zones, max_heart_rate, training_paces, HeartRateZones,
  TrainingPaces,
};

/// System prompt sent with every plan request
pub const SYSTEM_PROMPT: &str = include_str!("prompts/plan_system.txt");

/// ---------------------------------------------------------------------------
/// Duration Resolution
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationSource {
  RaceDate,
  Hint,
  GoalTable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedDuration {
  pub weeks: u32,
  pub start_date: NaiveDate,
  pub race_date: Option<NaiveDate>,
  pub source: DurationSource,
  /// Informational notes about ignored or malformed optional dates
  pub annotations: Vec<String>,
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
  let raw = raw.trim();
  NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    .ok()
    .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// Plan length in weeks from the goal/distance table
pub fn weeks_for_goal(goal: MainGoal, distance: Option<TargetDistance>) -> u32 {
  use TargetDistance::*;

  match (goal, distance) {
    (MainGoal::StartRunning, _) => STARTER_DURATION_WEEKS,
    (MainGoal::RunDistance, Some(FiveK)) => 8,
    (MainGoal::RunDistance, Some(TenK)) => 10,
    (MainGoal::RunDistance, Some(HalfMarathon)) => 12,
    (MainGoal::RunDistance, Some(Marathon)) => 16,
    (MainGoal::ImprovePace, Some(FiveK)) => 8,
    (MainGoal::ImprovePace, Some(TenK)) => 10,
    (MainGoal::ImprovePace, Some(HalfMarathon)) => 12,
    (MainGoal::ImprovePace, Some(Marathon)) => 14,
    _ => DEFAULT_DURATION_WEEKS,
  }
}

/// Resolve start date and plan length. Never fails: bad optional dates are
/// reported in `annotations` and otherwise ignored.
pub fn resolve_duration(profile: &UserProfile, today: NaiveDate) -> ResolvedDuration {
  let mut annotations = Vec::new();

  let start_date = match profile.start_date.as_deref() {
    None => today,
    Some(raw) => match parse_date(raw) {
      Some(date) if date >= today => date,
      Some(date) => {
        annotations.push(format!(
          "Requested start date {} is in the past; the plan starts today ({}).",
          date, today
        ));
        today
      }
      None => {
        annotations.push(format!(
          "Start date '{}' could not be read; the plan starts today ({}).",
          raw, today
        ));
        today
      }
    },
  };

  let race_date = match profile.race_date.as_deref() {
    None => None,
    Some(raw) => match parse_date(raw) {
      Some(date) if date > start_date => Some(date),
      Some(date) => {
        annotations.push(format!(
          "Race date {} is not after the start date {}; it was not used to size the plan.",
          date, start_date
        ));
        None
      }
      None => {
        annotations.push(format!("Race date '{}' could not be read and was ignored.", raw));
        None
      }
    },
  };

  if let Some(race) = race_date {
    // Inclusive of race day
    let days = (race - start_date).num_days() + 1;
    let weeks = ((days + 6) / 7).max(1) as u32;
    return ResolvedDuration {
      weeks,
      start_date,
      race_date,
      source: DurationSource::RaceDate,
      annotations,
    };
  }

  if let Some(hint) = profile.duration_weeks_hint {
    if (1..=MAX_DURATION_WEEKS).contains(&hint) {
      return ResolvedDuration {
        weeks: hint,
        start_date,
        race_date,
        source: DurationSource::Hint,
        annotations,
      };
    }
    annotations.push(format!(
      "Requested plan length of {} weeks is outside 1-{}; using the standard length.",
      hint, MAX_DURATION_WEEKS
    ));
  }

  ResolvedDuration {
    weeks: weeks_for_goal(profile.main_goal, profile.target_distance),
    start_date,
    race_date,
    source: DurationSource::GoalTable,
    annotations,
  }
}

/// ---------------------------------------------------------------------------
/// Plan Prompt
/// ---------------------------------------------------------------------------

/// The rendered prompt plus the values downstream stages need
#[derive(Debug, Clone)]
pub struct PlanPrompt {
  pub text: String,
  pub duration: ResolvedDuration,
  pub zones: Option<HeartRateZones>,
  pub paces: Option<TrainingPaces>,
}

pub struct ContextBuilder {
  knowledge: Arc<dyn KnowledgeBase>,
  templates: Arc<dyn PlanTemplateSelector>,
}

impl ContextBuilder {
  pub fn new(knowledge: Arc<dyn KnowledgeBase>, templates: Arc<dyn PlanTemplateSelector>) -> Self {
    Self {
      knowledge,
      templates,
    }
  }

  pub fn build(&self, profile: &UserProfile, today: NaiveDate) -> PlanPrompt {
    let duration = resolve_duration(profile, today);
    let mut notes = duration.annotations.clone();

    let zones = match Self::zones_for(profile) {
      Ok(zones) => Some(zones),
      Err(reason) => {
        notes.push(format!("Heart-rate zones unavailable: {}.", reason));
        None
      }
    };

    let paces = profile.cooper_distance_m.and_then(|distance| {
      match estimated_vo2max(distance).and_then(training_paces) {
        Ok(paces) => Some(paces),
        Err(e) => {
          notes.push(format!("Training paces unavailable: {}.", e));
          None
        }
      }
    });

    let text = self.render(profile, &duration, zones.as_ref(), paces.as_ref(), &notes);

    debug!(
      weeks = duration.weeks,
      source = ?duration.source,
      prompt_len = text.len(),
      "Built plan prompt"
    );

    PlanPrompt {
      text,
      duration,
      zones,
      paces,
    }
  }

  fn zones_for(profile: &UserProfile) -> Result<HeartRateZones, String> {
    let max_hr = match profile.max_hr {
      Some(hr) => hr,
      None => max_heart_rate(profile.age).map_err(|e| e.to_string())?,
    };
    let resting = profile.resting_hr.unwrap_or(DEFAULT_RESTING_HR);
    heart_rate_zones(max_hr, resting).map_err(|e| e.to_string())
  }

  fn render(
    &self,
    profile: &UserProfile,
    duration: &ResolvedDuration,
    zones: Option<&HeartRateZones>,
    paces: Option<&TrainingPaces>,
    notes: &[String],
  ) -> String {
    let days = profile.unique_training_days();
    let day_list = days
      .iter()
      .map(TrainingDay::as_str)
      .collect::<Vec<_>>()
      .join(", ");

    let mut sections = vec![
      format!("RUNNER PROFILE:\n{}", Self::profile_summary(profile, &day_list)),
      format!("HEALTH:\n{}", Self::health_narrative(profile)),
      Self::duration_section(duration),
    ];

    match zones {
      Some(zones) => sections.push(format!("HEART-RATE ZONES:\n{}", zones.to_table())),
      None => sections.push("HEART-RATE ZONES:\nnot available, describe effort by perceived exertion".to_string()),
    }

    if let Some(paces) = paces {
      sections.push(format!("TRAINING PACES:\n{}", paces.to_table()));
    }

    if !notes.is_empty() {
      sections.push(format!(
        "NOTES ON INPUT (informational):\n{}",
        notes.iter().map(|n| format!("- {}", n)).collect::<Vec<_>>().join("\n")
      ));
    }

    if let Some(template) = self.templates.select(profile) {
      let skeleton = serde_json::to_string_pretty(&template).unwrap_or_default();
      sections.push(format!(
        "EXAMPLE JSON SKELETON (structure only - do not copy content):\n{}",
        skeleton
      ));
    }

    sections.push(format!("COACHING KNOWLEDGE:\n{}", self.knowledge_excerpt(profile)));
    sections.push(Self::output_contract(duration, &days, &day_list));

    sections.join("\n\n")
  }

  fn profile_summary(profile: &UserProfile, day_list: &str) -> String {
    let mut lines = vec![
      format!("- age: {}", profile.age),
      format!("- experience: {}", profile.experience_level.as_str()),
      format!("- main goal: {}", profile.main_goal.as_str()),
    ];
    if let Some(distance) = profile.target_distance {
      lines.push(format!("- target distance: {} ({} km)", distance.as_str(), distance.km()));
    }
    lines.push(format!("- current weekly volume: {:.1} km", profile.weekly_mileage_km));
    lines.push(format!(
      "- training days per week: {} ({})",
      profile.unique_training_days().len(),
      if day_list.is_empty() { "not specified" } else { day_list }
    ));
    lines.join("\n")
  }

  fn health_narrative(profile: &UserProfile) -> String {
    let health = &profile.health;
    if health.is_clear() {
      return "No injuries or health conditions reported.".to_string();
    }

    let mut parts = Vec::new();
    if health.has_injuries {
      match health.injury_description.as_deref() {
        Some(desc) if !desc.trim().is_empty() => {
          parts.push(format!("Current or recent injury: {}.", desc.trim()))
        }
        _ => parts.push("Reports an injury (no details given).".to_string()),
      }
      parts.push("Include corrective exercises and keep intensity conservative.".to_string());
    }
    if !health.conditions.is_empty() {
      parts.push(format!("Health conditions: {}.", health.conditions.join(", ")));
    }
    if !health.medications.is_empty() {
      parts.push(format!("Medications: {}.", health.medications.join(", ")));
    }
    parts.join(" ")
  }

  fn duration_section(duration: &ResolvedDuration) -> String {
    let basis = match (duration.source, duration.race_date) {
      (DurationSource::RaceDate, Some(race)) => format!("sized to the race on {}", race),
      (DurationSource::Hint, _) => "requested by the runner".to_string(),
      _ => "standard length for this goal".to_string(),
    };
    format!(
      "PLAN DURATION:\n{} weeks, starting {} ({})",
      duration.weeks, duration.start_date, basis
    )
  }

  fn knowledge_excerpt(&self, profile: &UserProfile) -> String {
    let kb = &self.knowledge;
    let mut lines = vec![
      format!("Focus: {}", kb.get_or_placeholder(&focus_key(profile.target_distance))),
      format!("Principles: {}", kb.get_or_placeholder(keys::PRINCIPLES)),
      format!("Phases: {}", kb.get_or_placeholder(keys::PHASES)),
      format!("Injury prevention: {}", kb.get_or_placeholder(keys::INJURY_PREVENTION)),
      format!("Nutrition: {}", kb.get_or_placeholder(keys::NUTRITION)),
      format!("Hydration: {}", kb.get_or_placeholder(keys::HYDRATION)),
      format!("Strength exercises: {}", kb.get_or_placeholder(keys::STRENGTH_EXERCISES)),
    ];
    if profile.health.has_injuries {
      lines.push(format!(
        "Corrective exercises: {}",
        kb.get_or_placeholder(keys::CORRECTIVE_EXERCISES)
      ));
    }
    lines.join("\n")
  }

  fn output_contract(duration: &ResolvedDuration, days: &[TrainingDay], day_list: &str) -> String {
    let canonical = TrainingDay::ALL
      .iter()
      .map(TrainingDay::as_str)
      .collect::<Vec<_>>()
      .join(", ");

    let day_rule = if days.is_empty() {
      "- Choose the training days yourself, spread evenly through the week.".to_string()
    } else {
      format!(
        "- Every week has exactly {} days, on these days and in this order: {}.",
        days.len(),
        day_list
      )
    };

    format!(
      r#"OUTPUT FORMAT:
Respond with a single JSON object and nothing else, using exactly these fields:
{{
  "id": string,
  "metadata": {{"discipline", "target_group", "target_goal", "level_hint", "days_per_week", "duration_weeks", "description", "author"}},
  "plan_weeks": [{{"week_num", "focus", "days": [{{"day_name", "date", "workout": {{"type", "description", "distance", "duration", "target_pace", "target_heart_rate": {{"min", "max", "zone"}}, "support_exercises": [{{"name", "sets", "reps", "duration"}}]}}}}]}}],
  "corrective_exercises": {{"frequency", "list": [{{"name", "sets", "reps", "duration", "description"}}]}},
  "pain_monitoring": {{"scale", "rules": []}},
  "notes": []
}}

HARD CONSTRAINTS:
- "plan_weeks" contains exactly {weeks} weeks numbered 1 to {weeks}; "metadata.duration_weeks" is {weeks}.
{day_rule}
- "day_name" is one of: {canonical}. No abbreviations.
- "date" uses YYYY-MM-DD and the first week starts on or after {start}.
- "distance" is in kilometers (null when not applicable), "duration" in minutes.
- Do not wrap the JSON in markdown and do not add commentary."#,
      weeks = duration.weeks,
      day_rule = day_rule,
      canonical = canonical,
      start = duration.start_date,
    )
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
