//! Agent runtime - tool dispatch and orchestration for the settlement line
//!
//! This crate sits between the voice boundary and the business core:
//! - Resolves tool names (including the low-latency aliases) to handlers
//! - Executes tool calls against the claim, settlement, escalation, and
//!   intervention services
//! - Detects forced intents when the dialogue model narrates instead of
//!   calling the tool the caller asked for
//! - Hands long-form reasoning to the planning collaborator, always off the
//!   conversational path
//!
//! # Safety Principle
//!
//! The dialogue model is strictly a translator. It NEVER decides amounts,
//! approvals, or escalation outcomes. Those are deterministic decisions made
//! by the business core.

pub mod dispatch;
pub mod intent;
pub mod planner;
pub mod tools;

pub use dispatch::{DispatchContext, DispatchStats, ToolDispatcher, ToolResult};
pub use intent::{DetectedIntent, IntentClassifier, PhraseIntentClassifier};
pub use planner::{
    spawn_background_analysis, HttpPlannerClient, NoopPlannerClient, PlanRunState, PlanRunSummary,
    PlannerClient, PlannerError, PlannerReviewClient,
};
pub use tools::{tool_specs, ToolName, ToolSpec, UnknownTool};
