use rust_decimal::Decimal;

use crate::claims::ClaimStore;
use crate::domain::claim::{ClaimId, ClaimType, SettlementRange};
use crate::domain::settlement::{
    PaymentAlternative, PaymentPlan, PaymentPlanOption, PlanType, SettlementOffer,
};

#[derive(Clone, Debug, Default)]
pub struct SettlementInput {
    pub claim_id: Option<ClaimId>,
    pub claim_type: ClaimType,
    pub damage_description: String,
    pub emotional_adjustment: Decimal,
    pub estimated_damage: Option<Decimal>,
}

/// Pure settlement math. Same input always produces the same offer; no
/// state is read outside the claim store snapshot passed in.
#[derive(Clone, Copy, Debug, Default)]
pub struct SettlementCalculator;

impl SettlementCalculator {
    pub fn calculate(&self, store: &ClaimStore, input: SettlementInput) -> SettlementOffer {
        let record = input.claim_id.as_ref().and_then(|id| store.lookup(id));

        let (claim_type, damage, range, range_synthesized) = match record {
            Some(record) => {
                (record.claim_type, record.estimated_damage, record.settlement_range, false)
            }
            None => {
                let damage = input.estimated_damage.unwrap_or(Decimal::ZERO).max(Decimal::ZERO);
                (input.claim_type, damage, synthesize_range(damage), true)
            }
        };

        let adjustment = clamp_adjustment(input.emotional_adjustment);
        let base = range.recommended;
        let raw = base * (Decimal::ONE + adjustment);
        let final_amount = raw.min(range.max).normalize();

        SettlementOffer {
            claim_id: record.map(|record| record.id.clone()).or(input.claim_id),
            claim_type,
            base_amount: base,
            emotional_adjustment: adjustment,
            final_amount,
            range,
            range_synthesized,
            alternatives: alternatives_for(final_amount),
            damage_assessed: damage,
        }
    }

    /// Builds the payment-plan options for an agreed settlement amount.
    /// A standard lump-sum option is always present regardless of the
    /// requested plan type.
    pub fn payment_plan(&self, settlement_amount: Decimal, plan_type: PlanType) -> PaymentPlan {
        let amount = settlement_amount.max(Decimal::ZERO);
        let mut options = Vec::new();

        match plan_type {
            PlanType::Monthly => options.push(installments("monthly", amount, 3, "one payment per month")),
            PlanType::Quarterly => {
                options.push(installments("quarterly", amount, 2, "one payment per quarter"))
            }
            PlanType::Expedited => options.push(PaymentPlanOption {
                label: "expedited".to_owned(),
                installments: 1,
                amount_per_installment: (amount * expedited_factor()).round_dp(2).normalize(),
                total: (amount * expedited_factor()).round_dp(2).normalize(),
                terms: "funds released within 48 hours".to_owned(),
            }),
        }

        options.push(PaymentPlanOption {
            label: "standard".to_owned(),
            installments: 1,
            amount_per_installment: amount,
            total: amount,
            terms: "single payment within 5 business days".to_owned(),
        });

        PaymentPlan {
            settlement_amount: amount,
            plan_type,
            options,
            requires_approval: amount > plan_approval_ceiling(),
        }
    }
}

pub fn clamp_adjustment(adjustment: Decimal) -> Decimal {
    adjustment.clamp(Decimal::ZERO, max_adjustment())
}

pub fn max_adjustment() -> Decimal {
    // 0.2
    Decimal::new(2, 1)
}

fn expedited_factor() -> Decimal {
    // 0.98
    Decimal::new(98, 2)
}

fn plan_approval_ceiling() -> Decimal {
    Decimal::new(25_000, 0)
}

/// Range used when the claim id does not resolve: [0.6d, 0.9d] with a
/// recommended point at 0.75d.
fn synthesize_range(damage: Decimal) -> SettlementRange {
    SettlementRange {
        min: (damage * Decimal::new(6, 1)).normalize(),
        max: (damage * Decimal::new(9, 1)).normalize(),
        recommended: (damage * Decimal::new(75, 2)).normalize(),
    }
}

fn alternatives_for(final_amount: Decimal) -> Vec<PaymentAlternative> {
    vec![
        PaymentAlternative {
            name: "structured".to_owned(),
            amount: (final_amount * Decimal::new(95, 2)).round_dp(2).normalize(),
            installments: 3,
            terms: "3 monthly payments".to_owned(),
        },
        PaymentAlternative {
            name: "expedited".to_owned(),
            amount: (final_amount * expedited_factor()).round_dp(2).normalize(),
            installments: 1,
            terms: "48-hour processing".to_owned(),
        },
        PaymentAlternative {
            name: "standard".to_owned(),
            amount: final_amount,
            installments: 1,
            terms: "5 business days".to_owned(),
        },
    ]
}

fn installments(label: &str, amount: Decimal, count: u32, terms: &str) -> PaymentPlanOption {
    let per = (amount / Decimal::from(count)).round_dp(2).normalize();
    PaymentPlanOption {
        label: label.to_owned(),
        installments: count,
        amount_per_installment: per,
        total: amount,
        terms: terms.to_owned(),
    }
}
