use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::claim::ClaimId;
use crate::domain::escalation::{
    EscalationPath, EscalationRecord, EscalationStatus, EscalationTrigger, EscalationUrgency,
};

/// Deterministic trigger routing. The audit sink stands in for the real
/// escalation queue; records are emitted there and counted locally.
pub struct EscalationRouter {
    sink: Arc<dyn AuditSink>,
    stats: Mutex<EscalationStats>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EscalationStats {
    pub total: u64,
    pub by_trigger: BTreeMap<&'static str, u64>,
}

impl EscalationRouter {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink, stats: Mutex::new(EscalationStats::default()) }
    }

    pub fn route(trigger: EscalationTrigger) -> EscalationPath {
        match trigger {
            EscalationTrigger::Legal => EscalationPath {
                urgency: EscalationUrgency::High,
                department: "Legal Affairs",
                sla: "1 hour",
            },
            EscalationTrigger::Distress => EscalationPath {
                urgency: EscalationUrgency::High,
                department: "Senior Support",
                sla: "30 minutes",
            },
            EscalationTrigger::Complex => EscalationPath {
                urgency: EscalationUrgency::Medium,
                department: "Specialist Team",
                sla: "2 hours",
            },
            EscalationTrigger::Complaint => EscalationPath {
                urgency: EscalationUrgency::Medium,
                department: "Customer Relations",
                sla: "4 hours",
            },
            EscalationTrigger::General => EscalationPath {
                urgency: EscalationUrgency::Medium,
                department: "General Support",
                sla: "4 hours",
            },
        }
    }

    pub fn customer_message(trigger: EscalationTrigger) -> &'static str {
        match trigger {
            EscalationTrigger::Legal => {
                "I understand your concerns. I'm immediately connecting you with our legal \
                 affairs team who can address these matters properly."
            }
            EscalationTrigger::Distress => {
                "I can hear this is really difficult for you. Let me connect you with one of \
                 our senior support specialists right away."
            }
            EscalationTrigger::Complex => {
                "This situation needs specialized attention. I'm routing you to our expert \
                 team that handles complex cases."
            }
            EscalationTrigger::Complaint => {
                "Your feedback is important to us. I'm connecting you with our customer \
                 relations team to address your concerns properly."
            }
            EscalationTrigger::General => {
                "Let me connect you with the right specialist for your situation."
            }
        }
    }

    pub fn escalate(
        &self,
        claim_id: Option<ClaimId>,
        trigger: EscalationTrigger,
        conversation_summary: &str,
        correlation_id: &str,
    ) -> EscalationRecord {
        let path = Self::route(trigger);
        let created_at = Utc::now();
        let record = EscalationRecord {
            id: format!("ESC{}", created_at.format("%Y%m%d%H%M%S")),
            claim_id: claim_id.clone(),
            trigger,
            urgency: path.urgency,
            department: path.department.to_owned(),
            sla: path.sla.to_owned(),
            customer_message: Self::customer_message(trigger).to_owned(),
            created_at,
            status: EscalationStatus::Created,
        };

        match self.stats.lock() {
            Ok(mut stats) => {
                stats.total += 1;
                *stats.by_trigger.entry(trigger.as_str()).or_insert(0) += 1;
            }
            Err(poisoned) => {
                let mut stats = poisoned.into_inner();
                stats.total += 1;
                *stats.by_trigger.entry(trigger.as_str()).or_insert(0) += 1;
            }
        }

        self.sink.emit(
            AuditEvent::new(
                claim_id,
                None,
                correlation_id,
                "escalation.created",
                AuditCategory::Escalation,
                "escalation-router",
                AuditOutcome::Success,
            )
            .with_metadata("escalation_id", record.id.clone())
            .with_metadata("trigger", trigger.as_str())
            .with_metadata("department", record.department.clone())
            .with_metadata("summary", conversation_summary),
        );

        record
    }

    pub fn stats(&self) -> EscalationStats {
        match self.stats.lock() {
            Ok(stats) => stats.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
