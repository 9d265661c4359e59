//! Test utilities shared by the unit tests
//!
//! This module provides:
//! - Mock data factories (profiles, plans, provider envelopes)
//! - A scripted HTTP client and a recording sleeper
//! - Date helpers

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::{json, Value};

use crate::http::{HttpClient, HttpResponse, RequestOptions, TransportError};
use crate::llm::CLAUDE_MODEL;
use crate::models::{
  ExperienceLevel, HealthInfo, MainGoal, TrainingDay, TrainingPlan, UserProfile,
};
use crate::repair::{aligned_date, repair_plan, RepairOptions};
use crate::retry::Sleeper;

/// ---------------------------------------------------------------------------
/// Dates
/// ---------------------------------------------------------------------------

pub fn date(raw: &str) -> NaiveDate {
  NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
}

/// Monday 2025-01-06, 08:00 UTC
pub fn fixed_now() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2025, 1, 6, 8, 0, 0).unwrap()
}

pub fn repair_options() -> RepairOptions {
  RepairOptions::new(date("2025-01-06"), fixed_now())
}

/// ---------------------------------------------------------------------------
/// Profiles
/// ---------------------------------------------------------------------------

/// Intermediate runner training Saturday, Wednesday and Monday, no dates,
/// no measured max heart rate
pub fn sample_profile() -> UserProfile {
  UserProfile {
    name: Some("Test Runner".to_string()),
    age: 35,
    experience_level: ExperienceLevel::Intermediate,
    main_goal: MainGoal::ImproveFitness,
    target_distance: None,
    weekly_mileage_km: 20.0,
    training_days: vec![TrainingDay::Saturday, TrainingDay::Wednesday, TrainingDay::Monday],
    health: HealthInfo::default(),
    resting_hr: Some(55),
    max_hr: None,
    cooper_distance_m: None,
    duration_weeks_hint: None,
    start_date: None,
    race_date: None,
  }
}

/// ---------------------------------------------------------------------------
/// Plans
/// ---------------------------------------------------------------------------

/// A well-formed plan with `weeks` weeks of Monday / Wednesday / Friday
/// sessions: easy_run 30min, intervals 25min, long_run 40min
pub fn sample_plan_value(weeks: u32) -> Value {
  let reference = date("2025-01-06");
  let sessions = [
    (TrainingDay::Monday, "easy_run", 30, 5.0),
    (TrainingDay::Wednesday, "intervals", 25, 4.0),
    (TrainingDay::Friday, "long_run", 40, 8.0),
  ];

  let plan_weeks: Vec<Value> = (1..=weeks)
    .map(|n| {
      let days: Vec<Value> = sessions
        .iter()
        .map(|(day, kind, duration, distance)| {
          json!({
            "day_name": day.as_str(),
            "date": aligned_date(reference, n as usize - 1, *day).to_string(),
            "workout": {
              "type": kind,
              "description": format!("{} session", kind),
              "distance": distance,
              "duration": duration,
              "target_pace": null,
              "target_heart_rate": {"min": 125, "max": 145, "zone": "Z2"},
              "support_exercises": [{"name": "lunges", "sets": 2, "reps": 10, "duration": null}]
            }
          })
        })
        .collect();
      json!({"week_num": n, "focus": format!("Week {} focus", n), "days": days})
    })
    .collect();

  json!({
    "id": "sample-plan",
    "metadata": {
      "discipline": "running",
      "target_group": "intermediate runners",
      "target_goal": "general fitness",
      "level_hint": "intermediate",
      "days_per_week": 3,
      "duration_weeks": weeks,
      "description": "Sample plan",
      "author": "Coach"
    },
    "plan_weeks": plan_weeks,
    "corrective_exercises": {
      "frequency": "daily",
      "list": [{"name": "clamshells", "sets": 2, "reps": 15, "duration": null, "description": null}]
    },
    "pain_monitoring": {"scale": "0-10", "rules": ["Stop if pain exceeds 3"]},
    "notes": ["Stay hydrated"]
  })
}

/// Four-week sample plan as raw model text
pub fn sample_plan_json() -> String {
  serde_json::to_string_pretty(&sample_plan_value(4)).unwrap()
}

/// Model output cut off in the middle of week 3
pub fn truncated_plan_text() -> String {
  let mut value = sample_plan_value(4);
  value["id"] = json!("plan-cut");
  let full = value.to_string();
  let cut = full.find("\"focus\":\"Week 3 focus\"").unwrap();
  full[..cut].to_string()
}

pub fn repaired_sample_plan(weeks: u32) -> TrainingPlan {
  repair_plan(sample_plan_value(weeks), &repair_options()).unwrap()
}

/// One-week plan with the given (day, type, minutes) sessions
pub fn scenario_plan(sessions: &[(TrainingDay, &str, u32)]) -> TrainingPlan {
  let days: Vec<Value> = sessions
    .iter()
    .map(|(day, kind, duration)| {
      json!({"day_name": day.as_str(), "workout": {"type": kind, "duration": duration}})
    })
    .collect();
  let value = json!({"id": "scenario", "plan_weeks": [{"week_num": 1, "focus": "base", "days": days}]});
  repair_plan(value, &repair_options().with_expected_weeks(1)).unwrap()
}

/// ---------------------------------------------------------------------------
/// Provider Envelopes
/// ---------------------------------------------------------------------------

pub fn claude_envelope(text: &str) -> String {
  json!({
    "id": "msg_test",
    "type": "message",
    "role": "assistant",
    "model": CLAUDE_MODEL,
    "content": [{"type": "text", "text": text}],
    "stop_reason": "end_turn",
    "usage": {"input_tokens": 100, "output_tokens": 20}
  })
  .to_string()
}

pub fn openai_envelope(text: &str) -> String {
  json!({
    "id": "chatcmpl-test",
    "object": "chat.completion",
    "choices": [{
      "index": 0,
      "message": {"role": "assistant", "content": text},
      "finish_reason": "stop"
    }],
    "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
  })
  .to_string()
}

/// ---------------------------------------------------------------------------
/// Test Doubles
/// ---------------------------------------------------------------------------

/// Records requested delays instead of sleeping
#[derive(Default)]
pub struct RecordingSleeper {
  delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
  pub fn delays(&self) -> Vec<Duration> {
    self.delays.lock().unwrap().clone()
  }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
  async fn sleep(&self, duration: Duration) {
    self.delays.lock().unwrap().push(duration);
  }
}

/// Replays a fixed script of (status, body) responses or transport errors
pub struct ScriptedHttpClient {
  script: Mutex<VecDeque<Result<(u16, String), TransportError>>>,
  urls: Mutex<Vec<String>>,
  calls: AtomicUsize,
  latency: Option<Duration>,
}

impl ScriptedHttpClient {
  pub fn new(script: Vec<Result<(u16, String), TransportError>>) -> Self {
    Self {
      script: Mutex::new(script.into()),
      urls: Mutex::new(Vec::new()),
      calls: AtomicUsize::new(0),
      latency: None,
    }
  }

  pub fn with_latency(mut self, latency: Duration) -> Self {
    self.latency = Some(latency);
    self
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  pub fn urls(&self) -> Vec<String> {
    self.urls.lock().unwrap().clone()
  }
}

#[async_trait]
impl HttpClient for ScriptedHttpClient {
  async fn post(
    &self,
    url: &str,
    _body: &Value,
    _options: &RequestOptions,
  ) -> Result<HttpResponse, TransportError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.urls.lock().unwrap().push(url.to_string());

    if let Some(latency) = self.latency {
      tokio::time::sleep(latency).await;
    }

    let next = self.script.lock().unwrap().pop_front();
    match next {
      Some(Ok((status, body))) => Ok(HttpResponse { status, body }),
      Some(Err(e)) => Err(e),
      None => Err(TransportError::Other("script exhausted".to_string())),
    }
  }
}
