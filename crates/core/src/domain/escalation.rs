use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::claim::ClaimId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationTrigger {
    Legal,
    Distress,
    Complex,
    Complaint,
    General,
}

impl EscalationTrigger {
    /// Unknown trigger strings route to general support instead of failing.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "legal" => Self::Legal,
            "distress" => Self::Distress,
            "complex" => Self::Complex,
            "complaint" => Self::Complaint,
            _ => Self::General,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Legal => "legal",
            Self::Distress => "distress",
            Self::Complex => "complex",
            Self::Complaint => "complaint",
            Self::General => "general",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationUrgency {
    High,
    Medium,
}

impl EscalationUrgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationPath {
    pub urgency: EscalationUrgency,
    pub department: &'static str,
    pub sla: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationStatus {
    Created,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EscalationRecord {
    pub id: String,
    pub claim_id: Option<ClaimId>,
    pub trigger: EscalationTrigger,
    pub urgency: EscalationUrgency,
    pub department: String,
    pub sla: String,
    pub customer_message: String,
    pub created_at: DateTime<Utc>,
    pub status: EscalationStatus,
}

#[cfg(test)]
mod tests {
    use super::EscalationTrigger;

    #[test]
    fn unknown_triggers_parse_to_general() {
        assert_eq!(EscalationTrigger::parse("legal"), EscalationTrigger::Legal);
        assert_eq!(EscalationTrigger::parse(" LEGAL "), EscalationTrigger::Legal);
        assert_eq!(EscalationTrigger::parse("gibberish"), EscalationTrigger::General);
    }
}
