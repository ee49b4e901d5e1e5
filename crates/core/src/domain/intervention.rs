use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::claim::ClaimId;

/// Emotion label to intensity in `0.0..=1.0`, as scored by the voice engine.
pub type EmotionalState = BTreeMap<String, f64>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionTrigger {
    ExtremeAnger,
    UncontrollableBehavior,
    LegalThreat,
    AbusiveLanguage,
    SelfHarmLanguage,
    RepeatedEscalationFailure,
    AgentFailure,
    ComplexDispute,
    CustomerRequest,
    #[default]
    Other,
}

impl InterventionTrigger {
    /// Lenient parse for trigger names supplied by the conversational model.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "extreme_anger" | "anger" => Self::ExtremeAnger,
            "uncontrollable_behavior" => Self::UncontrollableBehavior,
            "legal_threat" | "legal" => Self::LegalThreat,
            "abusive_language" | "abuse" => Self::AbusiveLanguage,
            "self_harm_language" | "self_harm" => Self::SelfHarmLanguage,
            "repeated_escalation_failure" => Self::RepeatedEscalationFailure,
            "agent_failure" => Self::AgentFailure,
            "complex_dispute" => Self::ComplexDispute,
            "customer_request" => Self::CustomerRequest,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExtremeAnger => "extreme_anger",
            Self::UncontrollableBehavior => "uncontrollable_behavior",
            Self::LegalThreat => "legal_threat",
            Self::AbusiveLanguage => "abusive_language",
            Self::SelfHarmLanguage => "self_harm_language",
            Self::RepeatedEscalationFailure => "repeated_escalation_failure",
            Self::AgentFailure => "agent_failure",
            Self::ComplexDispute => "complex_dispute",
            Self::CustomerRequest => "customer_request",
            Self::Other => "other",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionUrgency {
    // Ordered most urgent first so `Ord` can pick the stronger of two values.
    Immediate,
    High,
    Medium,
    Standard,
}

impl InterventionUrgency {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "immediate" => Some(Self::Immediate),
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "standard" | "low" => Some(Self::Standard),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Standard => "standard",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InterventionRequest {
    pub trigger: InterventionTrigger,
    pub urgency: InterventionUrgency,
    pub conversation_summary: String,
    pub emotional_state: EmotionalState,
    pub claim_id: Option<ClaimId>,
    pub failure_reason: String,
    pub customer_threats: Option<String>,
    pub created_at: DateTime<Utc>,
}
