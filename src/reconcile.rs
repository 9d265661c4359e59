use tracing::debug;

use crate::models::{TrainingDay, TrainingPlan};

/// Force every week onto the runner's chosen weekdays.
///
/// Day names are rewritten positionally from `training_days`; weeks with
/// more days than that are cut to the first `training_days.len()` workouts,
/// shorter weeks keep their length. Workouts and dates are left as they
/// are. With no training days the plan comes back unchanged.
pub fn reconcile_training_days(
  mut plan: TrainingPlan,
  training_days: Option<&[TrainingDay]>,
) -> TrainingPlan {
  let days = match training_days {
    Some(days) if !days.is_empty() => days,
    _ => return plan,
  };

  let mut renamed = 0usize;
  let mut dropped = 0usize;

  for week in &mut plan.plan_weeks {
    if week.days.len() > days.len() {
      dropped += week.days.len() - days.len();
      week.days.truncate(days.len());
    }

    for (day, &name) in week.days.iter_mut().zip(days) {
      if day.day_name != name {
        day.day_name = name;
        renamed += 1;
      }
    }
  }

  debug!(renamed, dropped, days = days.len(), "Reconciled training days");
  plan
}
