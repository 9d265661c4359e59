pub mod config;
pub mod context;
pub mod defaults;
pub mod http;
pub mod knowledge;
pub mod llm;
pub mod models;
pub mod parser;
pub mod physiology;
pub mod pipeline;
pub mod reconcile;
pub mod repair;
pub mod retry;

#[cfg(test)]
mod test_utils;

pub use config::{ConfigError, PlannerConfig};
pub use context::{ContextBuilder, PlanPrompt};
pub use http::{HttpClient, HttpResponse, ReqwestHttpClient, RequestOptions, TransportError};
pub use knowledge::{BuiltinTemplates, InMemoryKnowledgeBase, KnowledgeBase, PlanTemplateSelector};
pub use llm::{GenerationClient, LlmError, ProviderConfig, ProviderKind};
pub use models::{TrainingDay, TrainingPlan, UserProfile};
pub use parser::{parse_plan_response, ParseError};
pub use pipeline::{plan_from_response, PlanError, PlanGenerator};
pub use reconcile::reconcile_training_days;
pub use repair::{default_plan, repair_plan, RepairError, RepairOptions};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
