use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::claim::{ClaimId, ClaimType, SettlementRange};

/// A named payment structure derived from a settlement offer. `amount` is the
/// total payout under that structure; `installments` is 1 for lump sums.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentAlternative {
    pub name: String,
    pub amount: Decimal,
    pub installments: u32,
    pub terms: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SettlementOffer {
    pub claim_id: Option<ClaimId>,
    pub claim_type: ClaimType,
    pub base_amount: Decimal,
    pub emotional_adjustment: Decimal,
    pub final_amount: Decimal,
    pub range: SettlementRange,
    pub range_synthesized: bool,
    pub damage_assessed: Decimal,
    pub alternatives: Vec<PaymentAlternative>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    Monthly,
    Quarterly,
    Expedited,
}

impl PlanType {
    /// Lenient parse; anything unrecognized is treated as the default
    /// monthly schedule rather than failing the tool call.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "quarterly" => Self::Quarterly,
            "expedited" | "express" | "fast" => Self::Expedited,
            _ => Self::Monthly,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentPlanOption {
    pub label: String,
    pub installments: u32,
    pub amount_per_installment: Decimal,
    pub total: Decimal,
    pub terms: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentPlan {
    pub settlement_amount: Decimal,
    pub plan_type: PlanType,
    pub options: Vec<PaymentPlanOption>,
    pub requires_approval: bool,
}
