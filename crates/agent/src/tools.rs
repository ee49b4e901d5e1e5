use std::fmt;
use std::str::FromStr;

use serde_json::{json, Value};
use thiserror::Error;

/// Identity of every tool the dialogue engine may invoke. Adding a tool means
/// adding a variant; the dispatcher matches exhaustively so a missing handler
/// is a compile error rather than a silent miss.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ToolName {
    LookupClaim,
    CalculateSettlementOffer,
    EscalateToSpecialist,
    CreatePaymentPlan,
    RequestHumanIntervention,
}

pub const ALL_TOOLS: [ToolName; 5] = [
    ToolName::LookupClaim,
    ToolName::CalculateSettlementOffer,
    ToolName::EscalateToSpecialist,
    ToolName::CreatePaymentPlan,
    ToolName::RequestHumanIntervention,
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown tool `{0}`")]
pub struct UnknownTool(pub String);

impl ToolName {
    pub fn canonical(&self) -> &'static str {
        match self {
            Self::LookupClaim => "lookup_claim",
            Self::CalculateSettlementOffer => "calculate_settlement_offer",
            Self::EscalateToSpecialist => "escalate_to_specialist",
            Self::CreatePaymentPlan => "create_payment_plan",
            Self::RequestHumanIntervention => "request_human_intervention",
        }
    }

    /// Low-latency aliases registered with the voice engine resolve to the
    /// same handlers as the canonical names.
    pub fn parse(value: &str) -> Result<Self, UnknownTool> {
        match value.trim().to_ascii_lowercase().as_str() {
            "lookup_claim" | "fast_claim_lookup" => Ok(Self::LookupClaim),
            "calculate_settlement_offer" | "quick_settlement" => Ok(Self::CalculateSettlementOffer),
            "escalate_to_specialist" | "instant_escalation" => Ok(Self::EscalateToSpecialist),
            "create_payment_plan" | "quick_analytics" => Ok(Self::CreatePaymentPlan),
            "request_human_intervention" => Ok(Self::RequestHumanIntervention),
            other => Err(UnknownTool(other.to_owned())),
        }
    }
}

impl FromStr for ToolName {
    type Err = UnknownTool;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical())
    }
}

/// Tool description in the shape the voice engine expects when tools are
/// registered for a session.
#[derive(Clone, Debug)]
pub struct ToolSpec {
    pub name: ToolName,
    pub description: &'static str,
}

impl ToolSpec {
    pub fn schema(&self) -> Value {
        let parameters = match self.name {
            ToolName::LookupClaim => json!({
                "type": "object",
                "properties": {
                    "claim_id": { "type": "string", "description": "Claim reference, e.g. CLM201" }
                },
                "required": ["claim_id"]
            }),
            ToolName::CalculateSettlementOffer => json!({
                "type": "object",
                "properties": {
                    "claim_id": { "type": "string" },
                    "claim_type": { "type": "string" },
                    "damage_description": { "type": "string" },
                    "estimated_damage_amount": { "type": "number" },
                    "emotional_adjustment": { "type": "number", "description": "0.0 to 0.2" }
                }
            }),
            ToolName::EscalateToSpecialist => json!({
                "type": "object",
                "properties": {
                    "claim_id": { "type": "string" },
                    "reason": { "type": "string" },
                    "conversation_summary": { "type": "string" }
                },
                "required": ["reason"]
            }),
            ToolName::CreatePaymentPlan => json!({
                "type": "object",
                "properties": {
                    "settlement_amount": { "type": "number" },
                    "plan_type": { "type": "string", "enum": ["monthly", "quarterly", "expedited", "standard"] }
                },
                "required": ["settlement_amount"]
            }),
            ToolName::RequestHumanIntervention => json!({
                "type": "object",
                "properties": {
                    "trigger": { "type": "string" },
                    "urgency_level": { "type": "string" },
                    "conversation_summary": { "type": "string" },
                    "failure_reason": { "type": "string" },
                    "customer_threats": { "type": "string" },
                    "claim_id": { "type": "string" }
                }
            }),
        };

        json!({
            "name": self.name.canonical(),
            "description": self.description,
            "parameters": parameters,
        })
    }
}

pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: ToolName::LookupClaim,
            description: "Look up a claim record and its settlement range by claim id.",
        },
        ToolSpec {
            name: ToolName::CalculateSettlementOffer,
            description: "Calculate a settlement offer with payment alternatives for a claim.",
        },
        ToolSpec {
            name: ToolName::EscalateToSpecialist,
            description: "Escalate the case to a specialist department with an SLA.",
        },
        ToolSpec {
            name: ToolName::CreatePaymentPlan,
            description: "Break a settlement amount into payout options.",
        },
        ToolSpec {
            name: ToolName::RequestHumanIntervention,
            description: "Hand the conversation to a human specialist immediately.",
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::{tool_specs, ToolName, ALL_TOOLS};

    #[test]
    fn synonyms_resolve_to_canonical_tools() {
        assert_eq!(ToolName::parse("fast_claim_lookup"), Ok(ToolName::LookupClaim));
        assert_eq!(ToolName::parse("quick_settlement"), Ok(ToolName::CalculateSettlementOffer));
        assert_eq!(ToolName::parse("instant_escalation"), Ok(ToolName::EscalateToSpecialist));
        assert_eq!(ToolName::parse("quick_analytics"), Ok(ToolName::CreatePaymentPlan));
        assert_eq!(
            ToolName::parse(" Lookup_Claim "),
            Ok(ToolName::LookupClaim),
            "parsing is case and whitespace insensitive"
        );
    }

    #[test]
    fn unknown_names_are_reported_not_defaulted() {
        let error = ToolName::parse("transfer_funds").unwrap_err();
        assert_eq!(error.0, "transfer_funds");
    }

    #[test]
    fn every_tool_has_a_registration_spec() {
        let specs = tool_specs();
        assert_eq!(specs.len(), ALL_TOOLS.len());
        for spec in specs {
            let schema = spec.schema();
            assert_eq!(schema["name"], spec.name.canonical());
            assert!(schema["parameters"]["type"] == "object");
        }
    }
}
