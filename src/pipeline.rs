//! Plan generation pipeline
//!
//! profile -> prompt -> model text -> parsed object -> repaired plan ->
//! reconciled plan. Only an exhausted generation client fails the request;
//! every later stage recovers locally.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{ConfigError, PlannerConfig};
use crate::context::{ContextBuilder, SYSTEM_PROMPT};
use crate::http::{HttpClient, ReqwestHttpClient};
use crate::knowledge::{BuiltinTemplates, InMemoryKnowledgeBase};
use crate::llm::{GenerationClient, LlmError};
use crate::models::{TrainingDay, TrainingPlan, UserProfile};
use crate::parser::parse_plan_response;
use crate::reconcile::reconcile_training_days;
use crate::repair::{default_plan, repair_plan, RepairError, RepairOptions};

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum PlanError {
  #[error(transparent)]
  Generation(#[from] LlmError),

  #[error(transparent)]
  InvalidPlanShape(#[from] RepairError),
}

pub struct PlanGenerator {
  client: GenerationClient,
  context: ContextBuilder,
}

impl PlanGenerator {
  pub fn new(client: GenerationClient, context: ContextBuilder) -> Self {
    Self { client, context }
  }

  /// Production wiring: reqwest transport, built-in templates, built-in
  /// knowledge with the optional file overrides
  pub fn from_config(config: &PlannerConfig) -> Result<Self, ConfigError> {
    Self::from_config_with_http(config, Arc::new(ReqwestHttpClient::new()))
  }

  pub fn from_config_with_http(
    config: &PlannerConfig,
    http: Arc<dyn HttpClient>,
  ) -> Result<Self, ConfigError> {
    let knowledge = match &config.knowledge_path {
      Some(path) => InMemoryKnowledgeBase::from_json_file(path)?,
      None => InMemoryKnowledgeBase::builtin(),
    };

    let client = GenerationClient::new(http, config.primary.clone())
      .with_fallback(config.fallback.clone())
      .with_retry(config.retry.clone())
      .with_attempt_timeout(config.attempt_timeout);
    let context = ContextBuilder::new(Arc::new(knowledge), Arc::new(BuiltinTemplates::builtin()));

    Ok(Self::new(client, context))
  }

  /// Generate a plan for `profile`. Fails only when the model could not be
  /// reached; an unusable answer yields the default plan instead.
  pub async fn generate_plan(&self, profile: &UserProfile) -> Result<TrainingPlan, PlanError> {
    self.generate_plan_at(profile, Utc::now()).await
  }

  #[instrument(skip_all, fields(age = profile.age, days = profile.training_days.len()))]
  pub async fn generate_plan_at(
    &self,
    profile: &UserProfile,
    now: DateTime<Utc>,
  ) -> Result<TrainingPlan, PlanError> {
    let prompt = self.context.build(profile, now.date_naive());
    info!(
      weeks = prompt.duration.weeks,
      start = %prompt.duration.start_date,
      "Requesting plan"
    );

    let raw = self
      .client
      .generate(SYSTEM_PROMPT, &prompt.text)
      .await
      .inspect_err(|e| error!(error = %e, "Plan generation failed"))?;

    let opts = RepairOptions::new(prompt.duration.start_date, now)
      .with_expected_weeks(prompt.duration.weeks)
      .with_zones(prompt.zones);
    let days = profile.unique_training_days();

    let plan = plan_from_response(&raw, Some(days.as_slice()), &opts)?;
    info!(
      id = %plan.id,
      weeks = plan.plan_weeks.len(),
      days = plan.total_days(),
      "Plan ready"
    );
    Ok(plan)
  }
}

/// Parse, repair and reconcile raw model text. Unparsable text becomes the
/// default plan, which is still fitted to the runner's days.
/// `metadata.days_per_week` follows the training days when they are given.
pub fn plan_from_response(
  raw: &str,
  training_days: Option<&[TrainingDay]>,
  opts: &RepairOptions,
) -> Result<TrainingPlan, PlanError> {
  let plan = match parse_plan_response(raw) {
    Ok(value) => repair_plan(value, opts)?,
    Err(e) => {
      warn!(error = %e, "Substituting default plan");
      default_plan(opts)
    }
  };

  let mut plan = reconcile_training_days(plan, training_days);
  if let Some(days) = training_days.filter(|d| !d.is_empty()) {
    let per_week = u32::try_from(days.len()).unwrap_or(u32::MAX);
    if plan.metadata.days_per_week != per_week {
      debug!(
        from = plan.metadata.days_per_week,
        to = per_week,
        "Aligning days_per_week with training days"
      );
      plan.metadata.days_per_week = per_week;
    }
  }
  Ok(plan)
}
