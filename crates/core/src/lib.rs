pub mod approval;
pub mod audit;
pub mod claims;
pub mod config;
pub mod domain;
pub mod errors;
pub mod escalation;
pub mod intervention;
pub mod settlement;

pub use approval::{
    ApprovalContext, ApprovalGate, ApprovalPolicy, InMemoryReviewClient, ReviewClient,
    ReviewClientError,
};
pub use audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use claims::ClaimStore;
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::approval::{ApprovalDecision, ReviewRequest, ReviewTicket, RiskSummary};
pub use domain::claim::{
    ClaimId, ClaimRecord, ClaimStatus, ClaimType, PriorityTier, SettlementRange,
};
pub use domain::decimal_from_f64;
pub use domain::escalation::{
    EscalationPath, EscalationRecord, EscalationStatus, EscalationTrigger, EscalationUrgency,
};
pub use domain::intervention::{
    EmotionalState, InterventionRequest, InterventionTrigger, InterventionUrgency,
};
pub use domain::settlement::{
    PaymentAlternative, PaymentPlan, PaymentPlanOption, PlanType, SettlementOffer,
};
pub use errors::DomainError;
pub use escalation::{EscalationRouter, EscalationStats};
pub use intervention::{InterventionInput, InterventionOutcome, InterventionPolicy};
pub use settlement::{SettlementCalculator, SettlementInput};
