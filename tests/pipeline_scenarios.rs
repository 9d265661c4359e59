//! End-to-end scenarios through the public API

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Days, NaiveDate, TimeZone, Utc};
use runplan::{
  parse_plan_response, plan_from_response, reconcile_training_days, repair_plan, BuiltinTemplates,
  ContextBuilder, GenerationClient, HttpClient, HttpResponse, InMemoryKnowledgeBase, ParseError,
  PlanGenerator, ProviderConfig, RepairOptions, RequestOptions, Sleeper, TrainingDay,
  TrainingPlan, TransportError, UserProfile,
};
use serde_json::{json, Value};
use TrainingDay::*;

/// ---------------------------------------------------------------------------
/// Fixtures
/// ---------------------------------------------------------------------------

struct CannedHttp {
  bodies: Mutex<VecDeque<(u16, String)>>,
}

impl CannedHttp {
  fn new(bodies: Vec<(u16, String)>) -> Self {
    Self {
      bodies: Mutex::new(bodies.into()),
    }
  }
}

#[async_trait]
impl HttpClient for CannedHttp {
  async fn post(
    &self,
    _url: &str,
    _body: &Value,
    _options: &RequestOptions,
  ) -> Result<HttpResponse, TransportError> {
    match self.bodies.lock().unwrap().pop_front() {
      Some((status, body)) => Ok(HttpResponse { status, body }),
      None => Err(TransportError::Other("no more responses".to_string())),
    }
  }
}

struct NoSleep;

#[async_trait]
impl Sleeper for NoSleep {
  async fn sleep(&self, _duration: Duration) {}
}

fn claude_text(text: &str) -> (u16, String) {
  let body = json!({
    "content": [{"type": "text", "text": text}],
    "model": "claude-sonnet-4-20250514",
    "stop_reason": "end_turn",
    "usage": {"input_tokens": 1200, "output_tokens": 900}
  });
  (200, body.to_string())
}

fn generator(responses: Vec<(u16, String)>) -> PlanGenerator {
  let client = GenerationClient::new(
    Arc::new(CannedHttp::new(responses)),
    ProviderConfig::anthropic("test-key"),
  )
  .with_sleeper(Arc::new(NoSleep));
  let context = ContextBuilder::new(
    Arc::new(InMemoryKnowledgeBase::builtin()),
    Arc::new(BuiltinTemplates::builtin()),
  );
  PlanGenerator::new(client, context)
}

fn profile(days: &[TrainingDay]) -> UserProfile {
  serde_json::from_value(json!({
    "age": 34,
    "experience_level": "intermediate",
    "main_goal": "improve_fitness",
    "weekly_mileage_km": 25.0,
    "training_days": days,
    "resting_hr": 58
  }))
  .unwrap()
}

fn options() -> RepairOptions {
  RepairOptions::new(
    NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
    Utc.with_ymd_and_hms(2025, 3, 3, 7, 30, 0).unwrap(),
  )
}

fn workout(kind: &str, minutes: u32) -> Value {
  json!({
    "type": kind,
    "description": format!("{} session", kind),
    "distance": 5.0,
    "duration": minutes,
    "target_pace": null,
    "target_heart_rate": {"min": 128, "max": 146, "zone": "Z2"},
    "support_exercises": [{"name": "calf raises", "sets": 3, "reps": 12, "duration": null}]
  })
}

/// One fully specified week; `sessions` are (day name, date, type, minutes)
fn week(num: u32, sessions: &[(&str, &str, &str, u32)]) -> Value {
  let days: Vec<Value> = sessions
    .iter()
    .map(|(name, date, kind, minutes)| {
      json!({"day_name": name, "date": date, "workout": workout(kind, *minutes)})
    })
    .collect();
  json!({"week_num": num, "focus": format!("block {}", num), "days": days})
}

fn plan_text(weeks: Vec<Value>) -> String {
  json!({
    "id": "ai-plan-1",
    "metadata": {
      "discipline": "running",
      "target_group": "recreational runners",
      "target_goal": "general fitness",
      "level_hint": "intermediate",
      "days_per_week": 3,
      "duration_weeks": weeks.len(),
      "description": "AI plan",
      "author": "AI running coach"
    },
    "plan_weeks": weeks,
    "corrective_exercises": {"frequency": "daily", "list": []},
    "pain_monitoring": {"scale": "0-10", "rules": ["Stop above 3/10"]},
    "notes": []
  })
  .to_string()
}

fn mon_wed_fri_week(num: u32) -> Value {
  let monday = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap() + Days::new(7 * (num as u64 - 1));
  let [mon, wed, fri] = [0, 2, 4].map(|offset| (monday + Days::new(offset)).to_string());
  week(
    num,
    &[
      ("poniedziałek", mon.as_str(), "easy_run", 30),
      ("środa", wed.as_str(), "intervals", 25),
      ("piątek", fri.as_str(), "long_run", 40),
    ],
  )
}

fn parsed(text: &str) -> TrainingPlan {
  repair_plan(parse_plan_response(text).unwrap(), &options()).unwrap()
}

fn day_names(plan: &TrainingPlan, week: usize) -> Vec<TrainingDay> {
  plan.plan_weeks[week].days.iter().map(|d| d.day_name).collect()
}

/// ---------------------------------------------------------------------------
/// Scenarios
/// ---------------------------------------------------------------------------

#[test]
fn test_scenario_a_days_renamed_workouts_kept() {
  let plan = parsed(&plan_text(vec![mon_wed_fri_week(1)]));

  let fixed = reconcile_training_days(plan, Some(&[Saturday, Wednesday, Monday][..]));

  let json = serde_json::to_value(&fixed).unwrap();
  let days = json["plan_weeks"][0]["days"].as_array().unwrap();
  let names: Vec<_> = days.iter().map(|d| d["day_name"].as_str().unwrap()).collect();
  assert_eq!(names, vec!["sobota", "środa", "poniedziałek"]);
  let workouts: Vec<_> = days
    .iter()
    .map(|d| (d["workout"]["type"].as_str().unwrap(), d["workout"]["duration"].as_u64().unwrap()))
    .collect();
  assert_eq!(workouts, vec![("easy_run", 30), ("intervals", 25), ("long_run", 40)]);
}

#[test]
fn test_scenario_b_fewer_days_keep_length() {
  let text = plan_text(vec![week(
    1,
    &[
      ("wtorek", "2025-03-04", "easy_run", 30),
      ("czwartek", "2025-03-06", "long_run", 45),
    ],
  )]);

  let fixed = reconcile_training_days(parsed(&text), Some(&[Saturday, Wednesday, Monday][..]));

  assert_eq!(day_names(&fixed, 0), vec![Saturday, Wednesday]);
}

#[test]
fn test_scenario_c_extra_days_truncated() {
  let text = plan_text(vec![week(
    1,
    &[
      ("poniedziałek", "2025-03-03", "easy_run", 30),
      ("wtorek", "2025-03-04", "intervals", 25),
      ("środa", "2025-03-05", "tempo_run", 35),
      ("czwartek", "2025-03-06", "recovery", 20),
      ("piątek", "2025-03-07", "long_run", 50),
    ],
  )]);

  let fixed = reconcile_training_days(parsed(&text), Some(&[Saturday, Wednesday, Monday][..]));

  assert_eq!(day_names(&fixed, 0), vec![Saturday, Wednesday, Monday]);
  let kinds: Vec<_> = fixed.plan_weeks[0]
    .days
    .iter()
    .map(|d| d.workout.workout_type.clone())
    .collect();
  assert_eq!(kinds, vec!["easy_run", "intervals", "tempo_run"]);
}

#[test]
fn test_scenario_d_no_training_days_is_identity() {
  let plan = parsed(&plan_text(vec![mon_wed_fri_week(1), mon_wed_fri_week(2)]));

  assert_eq!(reconcile_training_days(plan.clone(), None), plan);
}

#[test]
fn test_scenario_e_null_response_gets_default_plan() {
  assert_eq!(parse_plan_response("null"), Err(ParseError::EmptyOrNullResponse));

  let plan = plan_from_response("null", Some(&[Saturday, Wednesday, Monday][..]), &options()).unwrap();

  assert!(plan.id.contains("default-plan"));
  assert!(plan.metadata.description.to_lowercase().contains("default plan"));
  assert_eq!(day_names(&plan, 0), vec![Saturday, Wednesday, Monday]);
}

#[tokio::test]
async fn test_scenario_e_through_generator() {
  let now = Utc.with_ymd_and_hms(2025, 3, 3, 7, 30, 0).unwrap();

  let plan = generator(vec![claude_text("null")])
    .generate_plan_at(&profile(&[Saturday, Wednesday, Monday]), now)
    .await
    .unwrap();

  assert!(plan.id.starts_with("default-plan-"));
  assert_eq!(plan.plan_weeks.len(), 8);
  assert!(plan.plan_weeks.iter().all(|w| w.days.len() == 3));
}

#[test]
fn test_week_count_padded_from_four_to_eight() {
  let weeks: Vec<Value> = (1..=4).map(mon_wed_fri_week).collect();
  let text = plan_text(weeks.clone());

  let plan = repair_plan(
    parse_plan_response(&text).unwrap(),
    &options().with_expected_weeks(8),
  )
  .unwrap();

  assert_eq!(plan.plan_weeks.len(), 8);
  assert_eq!(plan.metadata.duration_weeks, 8);
  for (idx, original) in weeks.iter().enumerate() {
    assert_eq!(&serde_json::to_value(&plan.plan_weeks[idx]).unwrap(), original);
  }
  let numbers: Vec<_> = plan.plan_weeks.iter().map(|w| w.week_num).collect();
  assert_eq!(numbers, (1..=8).collect::<Vec<_>>());
  assert!(plan.plan_weeks[4..].iter().all(|w| !w.days.is_empty()));
}

#[tokio::test]
async fn test_generator_repairs_messy_output() {
  // Prose, single quotes, trailing commas, a missing workout and 2 weeks
  // where 8 were asked for
  let messy = "Sure! Here's the plan:\n{'id': 'messy', plan_weeks: [{week_num: 1, days: [{day_name: 'Mon', workout: {type: 'easy_run', duration: 30,},}, {day_name: 'Thu'},]}, {days: []},],}";
  let now = Utc.with_ymd_and_hms(2025, 3, 3, 7, 30, 0).unwrap();

  let plan = generator(vec![(529, "overloaded".to_string()), claude_text(messy)])
    .generate_plan_at(&profile(&[Tuesday, Saturday]), now)
    .await
    .unwrap();

  assert_eq!(plan.id, "messy");
  assert_eq!(plan.plan_weeks.len(), 8);
  for (idx, week) in plan.plan_weeks.iter().enumerate() {
    assert_eq!(week.week_num, idx as u32 + 1);
    assert!(week.days.len() <= 2);
    assert_eq!(week.days[0].day_name, Tuesday);
  }
  assert_eq!(plan.plan_weeks[0].days[1].workout.workout_type, "easy_run");
  assert_eq!(plan.plan_weeks[0].days[1].day_name, Saturday);
}

#[tokio::test]
async fn test_generator_fails_only_on_exhaustion() {
  let now = Utc.with_ymd_and_hms(2025, 3, 3, 7, 30, 0).unwrap();

  let error = generator(vec![(400, r#"{"error": {"message": "bad request"}}"#.to_string())])
    .generate_plan_at(&profile(&[Monday]), now)
    .await
    .unwrap_err();

  let json = serde_json::to_value(&error).unwrap();
  assert!(json.to_string().contains("400"));
}
