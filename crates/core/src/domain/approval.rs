use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::claim::ClaimId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub litigation_risk: String,
    pub customer_satisfaction_impact: String,
    pub urgency: String,
}

/// Context forwarded to the external review collaborator when an amount
/// exceeds the approval threshold.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub claim_id: Option<ClaimId>,
    pub claimant_name: Option<String>,
    pub amount: Decimal,
    pub threshold: Decimal,
    pub risk: RiskSummary,
    pub summary: String,
}

/// Whatever the review collaborator hands back: an opaque reference token
/// plus its own status wording. Never inspected beyond display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewTicket {
    pub reference: String,
    pub status: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApprovalDecision {
    pub amount: Decimal,
    pub threshold: Decimal,
    pub approved: bool,
    pub review_reference: Option<String>,
    pub status_message: String,
    pub bypass_applied: bool,
}
