use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::approval::{ApprovalDecision, ReviewRequest, ReviewTicket, RiskSummary};
use crate::domain::claim::ClaimId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReviewClientError {
    #[error("review collaborator unreachable: {0}")]
    Unavailable(String),
    #[error("review submission rejected: {0}")]
    Rejected(String),
}

/// External human-approval collaborator. Implementations submit the review
/// request and return whatever opaque token the collaborator assigns.
#[async_trait]
pub trait ReviewClient: Send + Sync {
    async fn submit(&self, request: &ReviewRequest) -> Result<ReviewTicket, ReviewClientError>;
}

/// Test double that records submissions and answers with sequential
/// references, or with a scripted error.
#[derive(Clone, Default)]
pub struct InMemoryReviewClient {
    submissions: Arc<Mutex<Vec<ReviewRequest>>>,
    fail_with: Option<ReviewClientError>,
}

impl InMemoryReviewClient {
    pub fn failing(error: ReviewClientError) -> Self {
        Self { submissions: Arc::default(), fail_with: Some(error) }
    }

    pub fn submissions(&self) -> Vec<ReviewRequest> {
        match self.submissions.lock() {
            Ok(submissions) => submissions.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl ReviewClient for InMemoryReviewClient {
    async fn submit(&self, request: &ReviewRequest) -> Result<ReviewTicket, ReviewClientError> {
        if let Some(error) = &self.fail_with {
            return Err(error.clone());
        }
        let reference = {
            let mut submissions = match self.submissions.lock() {
                Ok(submissions) => submissions,
                Err(poisoned) => poisoned.into_inner(),
            };
            submissions.push(request.clone());
            format!("review-{:04}", submissions.len())
        };
        Ok(ReviewTicket { reference, status: "pending_review".to_owned() })
    }
}

#[derive(Clone, Debug)]
pub struct ApprovalPolicy {
    pub threshold: Decimal,
    pub demo_mode: bool,
    pub bypass_amounts: Vec<Decimal>,
}

impl Default for ApprovalPolicy {
    fn default() -> Self {
        Self {
            threshold: Decimal::new(15_000, 0),
            demo_mode: false,
            bypass_amounts: vec![Decimal::new(25_000, 0)],
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ApprovalContext {
    pub claim_id: Option<ClaimId>,
    pub claimant_name: Option<String>,
    pub summary: String,
    pub correlation_id: String,
}

/// Threshold gate over settlement amounts. Amounts at or under the
/// threshold auto-approve; anything above is handed to the external review
/// collaborator, with a degraded local fallback when that collaborator is
/// unreachable.
pub struct ApprovalGate {
    policy: ApprovalPolicy,
    client: Arc<dyn ReviewClient>,
    sink: Arc<dyn AuditSink>,
}

impl ApprovalGate {
    pub fn new(
        policy: ApprovalPolicy,
        client: Arc<dyn ReviewClient>,
        sink: Arc<dyn AuditSink>,
    ) -> Self {
        Self { policy, client, sink }
    }

    pub fn threshold(&self) -> Decimal {
        self.policy.threshold
    }

    pub async fn decide(&self, amount: Decimal, context: &ApprovalContext) -> ApprovalDecision {
        if amount <= self.policy.threshold {
            self.emit(amount, context, AuditOutcome::Success, "auto_approved");
            return ApprovalDecision {
                amount,
                threshold: self.policy.threshold,
                approved: true,
                review_reference: None,
                status_message: "Settlement approved automatically.".to_owned(),
                bypass_applied: false,
            };
        }

        // Demo-only escape hatch, unreachable unless explicitly configured.
        if self.policy.demo_mode && self.policy.bypass_amounts.contains(&amount.normalize()) {
            self.emit(amount, context, AuditOutcome::Success, "demo_bypass_approved");
            return ApprovalDecision {
                amount,
                threshold: self.policy.threshold,
                approved: true,
                review_reference: None,
                status_message: "Settlement approved under demo bypass.".to_owned(),
                bypass_applied: true,
            };
        }

        let request = ReviewRequest {
            claim_id: context.claim_id.clone(),
            claimant_name: context.claimant_name.clone(),
            amount,
            threshold: self.policy.threshold,
            risk: self.risk_summary(amount),
            summary: context.summary.clone(),
        };

        match self.client.submit(&request).await {
            Ok(ticket) => {
                self.emit(amount, context, AuditOutcome::Rejected, "review_submitted");
                ApprovalDecision {
                    amount,
                    threshold: self.policy.threshold,
                    approved: false,
                    review_reference: Some(ticket.reference),
                    status_message: format!(
                        "Settlement exceeds the auto-approval threshold; review status: {}.",
                        ticket.status
                    ),
                    bypass_applied: false,
                }
            }
            Err(error) => {
                self.emit(amount, context, AuditOutcome::Failed, "review_submission_failed");
                ApprovalDecision {
                    amount,
                    threshold: self.policy.threshold,
                    approved: false,
                    review_reference: None,
                    status_message: format!(
                        "Review submission failed ({error}); settlement requires manual review."
                    ),
                    bypass_applied: false,
                }
            }
        }
    }

    fn risk_summary(&self, amount: Decimal) -> RiskSummary {
        let litigation_risk = if amount > self.policy.threshold * Decimal::new(2, 0) {
            "elevated"
        } else {
            "low"
        };
        RiskSummary {
            litigation_risk: litigation_risk.to_owned(),
            customer_satisfaction_impact: "settlement delay risks customer satisfaction"
                .to_owned(),
            urgency: "high".to_owned(),
        }
    }

    fn emit(
        &self,
        amount: Decimal,
        context: &ApprovalContext,
        outcome: AuditOutcome,
        event: &str,
    ) {
        self.sink.emit(
            AuditEvent::new(
                context.claim_id.clone(),
                None,
                context.correlation_id.clone(),
                format!("approval.{event}"),
                AuditCategory::Approval,
                "approval-gate",
                outcome,
            )
            .with_metadata("amount", amount.to_string())
            .with_metadata("threshold", self.policy.threshold.to_string()),
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use crate::audit::InMemoryAuditSink;
    use crate::domain::claim::ClaimId;

    use super::{
        ApprovalContext, ApprovalGate, ApprovalPolicy, InMemoryReviewClient, ReviewClientError,
    };

    fn gate_with(client: InMemoryReviewClient, policy: ApprovalPolicy) -> ApprovalGate {
        ApprovalGate::new(policy, Arc::new(client), Arc::new(InMemoryAuditSink::default()))
    }

    fn context() -> ApprovalContext {
        ApprovalContext {
            claim_id: Some(ClaimId("CLM201".to_owned())),
            claimant_name: Some("Nachiket Kulkarni".to_owned()),
            summary: "negotiated settlement".to_owned(),
            correlation_id: "req-9".to_owned(),
        }
    }

    #[tokio::test]
    async fn amounts_straddling_the_threshold_split_on_approval() {
        let gate = gate_with(InMemoryReviewClient::default(), ApprovalPolicy::default());

        for (amount, expected) in
            [(14_999_i64, true), (15_000, true), (15_001, false), (17_500, false)]
        {
            let decision = gate.decide(Decimal::new(amount, 0), &context()).await;
            assert_eq!(decision.approved, expected, "amount {amount}");
            assert_eq!(decision.approved, decision.amount <= decision.threshold);
            assert!(!decision.bypass_applied);
        }
    }

    #[tokio::test]
    async fn over_threshold_amounts_carry_a_review_reference() {
        let client = InMemoryReviewClient::default();
        let gate = gate_with(client.clone(), ApprovalPolicy::default());

        let decision = gate.decide(Decimal::new(18_000, 0), &context()).await;

        assert!(!decision.approved);
        assert_eq!(decision.review_reference.as_deref(), Some("review-0001"));

        let submissions = client.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].amount, Decimal::new(18_000, 0));
        assert_eq!(submissions[0].risk.litigation_risk, "low");
    }

    #[tokio::test]
    async fn unreachable_collaborator_falls_back_to_manual_review() {
        let client = InMemoryReviewClient::failing(ReviewClientError::Unavailable(
            "connection refused".to_owned(),
        ));
        let gate = gate_with(client, ApprovalPolicy::default());

        let decision = gate.decide(Decimal::new(20_000, 0), &context()).await;

        assert!(!decision.approved);
        assert!(decision.review_reference.is_none());
        assert!(decision.status_message.contains("manual review"));
    }

    #[tokio::test]
    async fn demo_bypass_fires_only_when_enabled() {
        let default_gate = gate_with(InMemoryReviewClient::default(), ApprovalPolicy::default());
        let decision = default_gate.decide(Decimal::new(25_000, 0), &context()).await;
        assert!(!decision.approved);

        let demo_gate = gate_with(
            InMemoryReviewClient::default(),
            ApprovalPolicy { demo_mode: true, ..ApprovalPolicy::default() },
        );
        let decision = demo_gate.decide(Decimal::new(25_000, 0), &context()).await;
        assert!(decision.approved);
        assert!(decision.bypass_applied);

        let other = demo_gate.decide(Decimal::new(26_000, 0), &context()).await;
        assert!(!other.approved);
    }
}
