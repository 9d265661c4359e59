pub mod plan;
pub mod profile;

pub use plan::{
  CorrectiveExercise, CorrectiveExercises, Day, HeartRateTarget, PainMonitoring, PlanMetadata,
  SupportExercise, TrainingPlan, Week, Workout,
};
pub use profile::{ExperienceLevel, HealthInfo, MainGoal, TargetDistance, TrainingDay, UserProfile};
