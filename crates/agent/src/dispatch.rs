use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use parley_core::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use parley_core::claims::ClaimStore;
use parley_core::domain::claim::{ClaimId, ClaimType};
use parley_core::domain::decimal_from_f64;
use parley_core::domain::escalation::{EscalationTrigger, EscalationUrgency};
use parley_core::domain::intervention::{
    EmotionalState, InterventionTrigger, InterventionUrgency,
};
use parley_core::domain::settlement::PlanType;
use parley_core::approval::{ApprovalContext, ApprovalGate};
use parley_core::errors::DomainError;
use parley_core::escalation::EscalationRouter;
use parley_core::intervention::{InterventionInput, InterventionPolicy};
use parley_core::settlement::{SettlementCalculator, SettlementInput};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::tools::ToolName;

/// Result handed back to the voice boundary. Failures are data, not errors:
/// the dialogue engine needs something it can speak either way.
#[derive(Clone, Debug)]
pub struct ToolResult {
    pub tool: String,
    pub success: bool,
    pub data: Value,
    pub error: Option<String>,
    pub latency: Duration,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DispatchStats {
    pub total_calls: u64,
    pub successful_calls: u64,
    pub total_latency: Duration,
}

impl DispatchStats {
    pub fn average_latency(&self) -> Duration {
        if self.total_calls == 0 {
            Duration::ZERO
        } else {
            self.total_latency / self.total_calls as u32
        }
    }

    pub fn success_rate_percent(&self) -> f64 {
        if self.total_calls == 0 {
            0.0
        } else {
            self.successful_calls as f64 / self.total_calls as f64 * 100.0
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct DispatchContext {
    pub session_id: Option<String>,
    pub correlation_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct LookupArgs {
    claim_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CalculateArgs {
    claim_id: Option<String>,
    #[serde(default)]
    claim_type: String,
    #[serde(default)]
    damage_description: String,
    estimated_damage_amount: Option<f64>,
    #[serde(default)]
    emotional_adjustment: f64,
    #[serde(default)]
    conversation_summary: String,
}

#[derive(Debug, Default, Deserialize)]
struct EscalateArgs {
    claim_id: Option<String>,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    urgency_level: String,
    #[serde(default)]
    conversation_summary: String,
}

#[derive(Debug, Default, Deserialize)]
struct PaymentPlanArgs {
    settlement_amount: Option<f64>,
    #[serde(default)]
    plan_type: String,
}

#[derive(Debug, Default, Deserialize)]
struct InterventionArgs {
    #[serde(default)]
    trigger: String,
    #[serde(default)]
    urgency_level: String,
    #[serde(default)]
    conversation_summary: String,
    #[serde(default)]
    emotional_state: EmotionalState,
    #[serde(default)]
    failure_reason: String,
    customer_threats: Option<String>,
    claim_id: Option<String>,
}

/// Routes tool calls from the dialogue engine to the business services.
/// Every call is timed, counted, and audited regardless of outcome.
pub struct ToolDispatcher {
    store: Arc<ClaimStore>,
    calculator: SettlementCalculator,
    router: Arc<EscalationRouter>,
    gate: Arc<ApprovalGate>,
    intervention: Arc<InterventionPolicy>,
    sink: Arc<dyn AuditSink>,
    stats: Mutex<DispatchStats>,
}

impl ToolDispatcher {
    pub fn new(
        store: Arc<ClaimStore>,
        router: Arc<EscalationRouter>,
        gate: Arc<ApprovalGate>,
        intervention: Arc<InterventionPolicy>,
        sink: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store,
            calculator: SettlementCalculator,
            router,
            gate,
            intervention,
            sink,
            stats: Mutex::new(DispatchStats::default()),
        }
    }

    pub async fn dispatch(
        &self,
        name: &str,
        arguments: Value,
        context: &DispatchContext,
    ) -> ToolResult {
        let started = Instant::now();

        let tool = match ToolName::parse(name) {
            Ok(tool) => tool,
            Err(error) => {
                warn!(event_name = "dispatch.unknown_tool", tool = name, "tool call rejected");
                return self.finish(name.to_owned(), Err(error.to_string()), started, context);
            }
        };

        let outcome = match tool {
            ToolName::LookupClaim => self.lookup_claim(arguments),
            ToolName::CalculateSettlementOffer => {
                self.calculate_settlement(arguments, context).await
            }
            ToolName::EscalateToSpecialist => self.escalate(arguments, context),
            ToolName::CreatePaymentPlan => self.create_payment_plan(arguments),
            ToolName::RequestHumanIntervention => self.request_intervention(arguments, context),
        };

        self.finish(tool.canonical().to_owned(), outcome, started, context)
    }

    pub fn stats(&self) -> DispatchStats {
        match self.stats.lock() {
            Ok(stats) => stats.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn lookup_claim(&self, arguments: Value) -> Result<Value, String> {
        let args: LookupArgs = parse_args(arguments)?;
        let claim_id = args.claim_id.filter(|id| !id.trim().is_empty()).ok_or_else(|| {
            "claim_id is required; ask the caller for their claim reference".to_owned()
        })?;

        let record = self
            .store
            .lookup_str(&claim_id)
            .ok_or_else(|| DomainError::ClaimNotFound(ClaimId(claim_id.clone())).to_string())?;

        let summary = format!(
            "Found claim {} for {}. {} with estimated damage of ${}.",
            record.id.0,
            record.claimant_name,
            record.claim_type.label(),
            record.estimated_damage
        );

        Ok(json!({
            "claim": record,
            "summary": summary,
            "next_actions": ["calculate_settlement_offer"],
        }))
    }

    async fn calculate_settlement(
        &self,
        arguments: Value,
        context: &DispatchContext,
    ) -> Result<Value, String> {
        let args: CalculateArgs = parse_args(arguments)?;
        let claim_id = args.claim_id.map(ClaimId);
        let claimant_name = claim_id
            .as_ref()
            .and_then(|id| self.store.lookup(id))
            .map(|record| record.claimant_name.clone());

        let offer = self.calculator.calculate(
            &self.store,
            SettlementInput {
                claim_id: claim_id.clone(),
                claim_type: ClaimType::parse(&args.claim_type),
                damage_description: args.damage_description,
                emotional_adjustment: decimal_from_f64(args.emotional_adjustment),
                estimated_damage: args.estimated_damage_amount.map(decimal_from_f64),
            },
        );

        let approval = self
            .gate
            .decide(
                offer.final_amount,
                &ApprovalContext {
                    claim_id,
                    claimant_name,
                    summary: args.conversation_summary,
                    correlation_id: context.correlation_id.clone(),
                },
            )
            .await;

        let summary = format!(
            "Calculated settlement offer of ${} for a {} claim.",
            offer.final_amount,
            offer.claim_type.label()
        );

        Ok(json!({
            "offer": offer,
            "approval": approval,
            "summary": summary,
        }))
    }

    fn escalate(&self, arguments: Value, context: &DispatchContext) -> Result<Value, String> {
        let args: EscalateArgs = parse_args(arguments)?;

        let mut trigger = EscalationTrigger::parse(&args.reason);
        if trigger == EscalationTrigger::General {
            // Callers that only supply an urgency level still land on a
            // sensible queue.
            trigger = match args.urgency_level.trim().to_ascii_lowercase().as_str() {
                "critical" => EscalationTrigger::Legal,
                "high" => EscalationTrigger::Distress,
                "medium" => EscalationTrigger::Complex,
                _ => EscalationTrigger::General,
            };
        }

        let record = self.router.escalate(
            args.claim_id.map(ClaimId),
            trigger,
            &args.conversation_summary,
            &context.correlation_id,
        );

        let sla = record.sla.clone();
        let department = record.department.clone();
        Ok(json!({
            "escalation": record,
            "immediate_action": "transfer_to_specialist",
            "estimated_wait_time": sla,
            "specialist_type": department,
            "conversation_should_end": true,
        }))
    }

    fn create_payment_plan(&self, arguments: Value) -> Result<Value, String> {
        let args: PaymentPlanArgs = parse_args(arguments)?;
        let amount = decimal_from_f64(args.settlement_amount.unwrap_or(15_000.0));
        let plan = self.calculator.payment_plan(amount, PlanType::parse(&args.plan_type));

        let summary = format!(
            "Created {} payment options for a ${} settlement.",
            plan.options.len(),
            plan.settlement_amount
        );

        Ok(json!({
            "payment_plan": plan,
            "recommended_plan": "standard",
            "summary": summary,
        }))
    }

    fn request_intervention(
        &self,
        arguments: Value,
        context: &DispatchContext,
    ) -> Result<Value, String> {
        let args: InterventionArgs = parse_args(arguments)?;

        let outcome = self.intervention.request_intervention(InterventionInput {
            trigger: InterventionTrigger::parse(&args.trigger),
            urgency_override: InterventionUrgency::parse(&args.urgency_level),
            conversation_summary: args.conversation_summary,
            emotional_state: args.emotional_state,
            claim_id: args.claim_id.map(ClaimId),
            failure_reason: args.failure_reason,
            customer_threats: args.customer_threats,
            correlation_id: context.correlation_id.clone(),
        });

        info!(
            event_name = "dispatch.human_takeover",
            trigger = outcome.request.trigger.as_str(),
            urgency = outcome.request.urgency.as_str(),
            "human intervention requested"
        );

        Ok(json!({
            "intervention": outcome.request,
            "customer_message": outcome.customer_message,
            "briefing": outcome.briefing,
            "expected_response_time": outcome.expected_response_time,
            "immediate_action": "transfer_to_human",
            "stop_ai_conversation": outcome.suspend_automation,
        }))
    }

    fn finish(
        &self,
        tool: String,
        outcome: Result<Value, String>,
        started: Instant,
        context: &DispatchContext,
    ) -> ToolResult {
        let latency = started.elapsed();
        let success = outcome.is_ok();

        match self.stats.lock() {
            Ok(mut stats) => record_stats(&mut stats, success, latency),
            Err(poisoned) => record_stats(&mut poisoned.into_inner(), success, latency),
        }

        self.sink.emit(
            AuditEvent::new(
                None,
                context.session_id.clone(),
                context.correlation_id.clone(),
                "dispatch.tool_invoked",
                AuditCategory::Dispatch,
                "tool-dispatcher",
                if success { AuditOutcome::Success } else { AuditOutcome::Failed },
            )
            .with_metadata("tool", tool.clone())
            .with_metadata("latency_ms", latency.as_millis().to_string()),
        );

        match outcome {
            Ok(data) => ToolResult { tool, success: true, data, error: None, latency },
            Err(message) => ToolResult {
                tool,
                success: false,
                data: json!({ "error": message }),
                error: Some(message),
                latency,
            },
        }
    }
}

fn parse_args<T>(arguments: Value) -> Result<T, String>
where
    T: serde::de::DeserializeOwned + Default,
{
    if arguments.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(arguments).map_err(|error| format!("invalid tool arguments: {error}"))
}

fn record_stats(stats: &mut DispatchStats, success: bool, latency: Duration) {
    stats.total_calls += 1;
    if success {
        stats.successful_calls += 1;
    }
    stats.total_latency += latency;
}

// Escalation urgency is part of the spoken response, keep the mapping visible
// to callers that only have a record.
pub fn wait_estimate(urgency: EscalationUrgency) -> &'static str {
    match urgency {
        EscalationUrgency::High => "a specialist will join within the hour",
        EscalationUrgency::Medium => "a specialist will follow up today",
    }
}
