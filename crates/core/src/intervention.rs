use std::fmt::Write as _;
use std::sync::Arc;

use chrono::Utc;

use crate::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::claim::ClaimId;
use crate::domain::intervention::{
    EmotionalState, InterventionRequest, InterventionTrigger, InterventionUrgency,
};

const LEGAL_KEYWORDS: [&str; 6] = ["lawyer", "attorney", "sue", "lawsuit", "legal action", "court"];
const ABUSIVE_KEYWORDS: [&str; 5] = ["stupid", "idiot", "useless", "hate", "terrible"];

const EXTREME_EMOTION_THRESHOLD: f64 = 0.9;
const COMPOUND_EMOTION_THRESHOLD: f64 = 0.8;
const MAX_FAILED_ATTEMPTS: u32 = 3;

#[derive(Clone, Debug, Default)]
pub struct InterventionInput {
    pub trigger: InterventionTrigger,
    pub urgency_override: Option<InterventionUrgency>,
    pub conversation_summary: String,
    pub emotional_state: EmotionalState,
    pub claim_id: Option<ClaimId>,
    pub failure_reason: String,
    pub customer_threats: Option<String>,
    pub correlation_id: String,
}

/// The handoff package produced when automation gives up: the request for
/// the human queue, what the voice agent says to the customer, and the
/// internal briefing the human reads before picking up.
#[derive(Clone, Debug, PartialEq)]
pub struct InterventionOutcome {
    pub request: InterventionRequest,
    pub customer_message: String,
    pub briefing: String,
    pub expected_response_time: String,
    /// Always true: once an intervention fires, no further automated tool
    /// dispatch may happen until a human explicitly resumes it.
    pub suspend_automation: bool,
}

pub struct InterventionPolicy {
    sink: Arc<dyn AuditSink>,
}

impl InterventionPolicy {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Urgency is trigger-driven. A caller-supplied urgency only applies to
    /// triggers the policy itself rates as standard.
    pub fn urgency_for(
        trigger: InterventionTrigger,
        urgency_override: Option<InterventionUrgency>,
    ) -> InterventionUrgency {
        let derived = match trigger {
            InterventionTrigger::SelfHarmLanguage | InterventionTrigger::ExtremeAnger => {
                InterventionUrgency::Immediate
            }
            InterventionTrigger::LegalThreat
            | InterventionTrigger::AbusiveLanguage
            | InterventionTrigger::UncontrollableBehavior => InterventionUrgency::High,
            _ => InterventionUrgency::Standard,
        };
        if derived == InterventionUrgency::Standard {
            urgency_override.unwrap_or(derived)
        } else {
            derived
        }
    }

    pub fn request_intervention(&self, input: InterventionInput) -> InterventionOutcome {
        let urgency = Self::urgency_for(input.trigger, input.urgency_override);
        let request = InterventionRequest {
            trigger: input.trigger,
            urgency,
            conversation_summary: input.conversation_summary,
            emotional_state: input.emotional_state,
            claim_id: input.claim_id,
            failure_reason: input.failure_reason,
            customer_threats: input.customer_threats,
            created_at: Utc::now(),
        };

        self.sink.emit(
            AuditEvent::new(
                request.claim_id.clone(),
                None,
                input.correlation_id,
                "intervention.requested",
                AuditCategory::Intervention,
                "intervention-policy",
                AuditOutcome::Success,
            )
            .with_metadata("trigger", request.trigger.as_str())
            .with_metadata("urgency", request.urgency.as_str()),
        );

        InterventionOutcome {
            customer_message: customer_message(request.trigger).to_owned(),
            briefing: briefing_for(&request),
            expected_response_time: expected_response_time(urgency).to_owned(),
            suspend_automation: true,
            request,
        }
    }

    /// Advisory per-turn check: does the latest conversational signal call
    /// for a human? Returns the strongest matching trigger, or `None`.
    pub fn should_auto_trigger(
        emotional_state: &EmotionalState,
        recent_text: &str,
        failed_attempts: u32,
    ) -> Option<InterventionTrigger> {
        let intensity = |label: &str| emotional_state.get(label).copied().unwrap_or(0.0);

        if intensity("anger") > EXTREME_EMOTION_THRESHOLD
            || intensity("distress") > EXTREME_EMOTION_THRESHOLD
        {
            return Some(InterventionTrigger::ExtremeAnger);
        }
        if intensity("anger") > COMPOUND_EMOTION_THRESHOLD
            && intensity("frustration") > COMPOUND_EMOTION_THRESHOLD
        {
            return Some(InterventionTrigger::UncontrollableBehavior);
        }

        let text = recent_text.to_ascii_lowercase();
        if LEGAL_KEYWORDS.iter().any(|keyword| text.contains(keyword)) {
            return Some(InterventionTrigger::LegalThreat);
        }
        if ABUSIVE_KEYWORDS.iter().any(|keyword| text.contains(keyword)) {
            return Some(InterventionTrigger::AbusiveLanguage);
        }

        if failed_attempts > MAX_FAILED_ATTEMPTS {
            return Some(InterventionTrigger::RepeatedEscalationFailure);
        }

        None
    }
}

fn customer_message(trigger: InterventionTrigger) -> &'static str {
    match trigger {
        InterventionTrigger::SelfHarmLanguage => {
            "I'm connecting you with someone who can help you right now. Please stay on the \
             line with me."
        }
        InterventionTrigger::ExtremeAnger => {
            "I completely understand your frustration. I'm transferring you right now to a \
             senior specialist who can resolve this personally."
        }
        InterventionTrigger::LegalThreat => {
            "I understand you're considering legal options. Let me connect you with our \
             legal liaison team who can discuss this properly."
        }
        InterventionTrigger::AbusiveLanguage | InterventionTrigger::UncontrollableBehavior => {
            "I'm transferring you to a supervisor who can better assist you with this."
        }
        InterventionTrigger::RepeatedEscalationFailure | InterventionTrigger::AgentFailure => {
            "I apologize that this hasn't been resolved yet. A human agent is taking over \
             your case right now."
        }
        InterventionTrigger::ComplexDispute
        | InterventionTrigger::CustomerRequest
        | InterventionTrigger::Other => {
            "Let me get a human agent to help you with this right away."
        }
    }
}

fn handoff_note(trigger: InterventionTrigger) -> &'static str {
    match trigger {
        InterventionTrigger::SelfHarmLanguage => {
            "Customer used self-harm language. Follow the crisis protocol before discussing \
             the claim."
        }
        InterventionTrigger::ExtremeAnger => {
            "Customer is extremely angry. Open with an apology and a concrete resolution \
             path."
        }
        InterventionTrigger::LegalThreat => {
            "Customer raised legal action. Do not discuss fault; involve legal liaison."
        }
        InterventionTrigger::AbusiveLanguage => {
            "Customer language was abusive. Set conversational boundaries early."
        }
        InterventionTrigger::UncontrollableBehavior => {
            "Conversation was no longer steerable by the automated agent."
        }
        InterventionTrigger::RepeatedEscalationFailure => {
            "Multiple automated escalation attempts failed. Customer patience is exhausted."
        }
        InterventionTrigger::AgentFailure => {
            "Automated agent hit an unrecoverable failure mid-conversation."
        }
        InterventionTrigger::ComplexDispute => {
            "Dispute complexity exceeds automated handling. Review the full summary first."
        }
        InterventionTrigger::CustomerRequest => "Customer explicitly asked for a human.",
        InterventionTrigger::Other => "Unclassified handoff. Read the summary before engaging.",
    }
}

fn expected_response_time(urgency: InterventionUrgency) -> &'static str {
    match urgency {
        InterventionUrgency::Immediate => "under 60 seconds",
        InterventionUrgency::High => "under 2 minutes",
        InterventionUrgency::Medium => "under 5 minutes",
        InterventionUrgency::Standard => "under 10 minutes",
    }
}

fn briefing_for(request: &InterventionRequest) -> String {
    let mut briefing = format!(
        "HUMAN HANDOFF\ntrigger: {}\nurgency: {}\n",
        request.trigger.as_str(),
        request.urgency.as_str()
    );
    if let Some(claim_id) = &request.claim_id {
        let _ = writeln!(briefing, "claim: {claim_id}");
    }
    let _ = writeln!(briefing, "summary: {}", request.conversation_summary);
    if !request.failure_reason.is_empty() {
        let _ = writeln!(briefing, "failure: {}", request.failure_reason);
    }
    if let Some(threats) = &request.customer_threats {
        let _ = writeln!(briefing, "verbatim threats: {threats}");
    }
    if !request.emotional_state.is_empty() {
        let emotions = request
            .emotional_state
            .iter()
            .map(|(label, intensity)| format!("{label}={intensity:.2}"))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(briefing, "emotions: {emotions}");
    }
    let _ = writeln!(briefing, "note: {}", handoff_note(request.trigger));
    briefing
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::audit::InMemoryAuditSink;
    use crate::domain::claim::ClaimId;
    use crate::domain::intervention::{
        EmotionalState, InterventionTrigger, InterventionUrgency,
    };

    use super::{InterventionInput, InterventionPolicy};

    fn emotions(pairs: &[(&str, f64)]) -> EmotionalState {
        pairs.iter().map(|(label, value)| (label.to_string(), *value)).collect()
    }

    fn policy() -> InterventionPolicy {
        InterventionPolicy::new(Arc::new(InMemoryAuditSink::default()))
    }

    #[test]
    fn urgency_is_trigger_driven_with_standard_fallback() {
        assert_eq!(
            InterventionPolicy::urgency_for(InterventionTrigger::SelfHarmLanguage, None),
            InterventionUrgency::Immediate
        );
        assert_eq!(
            InterventionPolicy::urgency_for(InterventionTrigger::ExtremeAnger, None),
            InterventionUrgency::Immediate
        );
        assert_eq!(
            InterventionPolicy::urgency_for(InterventionTrigger::LegalThreat, None),
            InterventionUrgency::High
        );
        assert_eq!(
            InterventionPolicy::urgency_for(InterventionTrigger::CustomerRequest, None),
            InterventionUrgency::Standard
        );
        // Caller overrides apply only where the policy itself says standard.
        assert_eq!(
            InterventionPolicy::urgency_for(
                InterventionTrigger::CustomerRequest,
                Some(InterventionUrgency::High)
            ),
            InterventionUrgency::High
        );
        assert_eq!(
            InterventionPolicy::urgency_for(
                InterventionTrigger::SelfHarmLanguage,
                Some(InterventionUrgency::Standard)
            ),
            InterventionUrgency::Immediate
        );
    }

    #[test]
    fn request_produces_handoff_script_and_briefing() {
        let outcome = policy().request_intervention(InterventionInput {
            trigger: InterventionTrigger::LegalThreat,
            conversation_summary: "customer threatened to call their attorney".to_owned(),
            emotional_state: emotions(&[("anger", 0.85)]),
            claim_id: Some(ClaimId("CLM201".to_owned())),
            failure_reason: "negotiation stalled".to_owned(),
            customer_threats: Some("I'll see you in court".to_owned()),
            correlation_id: "req-5".to_owned(),
            ..InterventionInput::default()
        });

        assert!(outcome.suspend_automation);
        assert_eq!(outcome.request.urgency, InterventionUrgency::High);
        assert!(outcome.customer_message.contains("legal"));
        assert!(outcome.briefing.contains("claim: CLM201"));
        assert!(outcome.briefing.contains("verbatim threats"));
        assert_eq!(outcome.expected_response_time, "under 2 minutes");
    }

    #[test]
    fn extreme_emotions_auto_trigger_intervention() {
        let trigger = InterventionPolicy::should_auto_trigger(
            &emotions(&[("anger", 0.95)]),
            "this is taking forever",
            0,
        );
        assert_eq!(trigger, Some(InterventionTrigger::ExtremeAnger));

        let trigger = InterventionPolicy::should_auto_trigger(
            &emotions(&[("distress", 0.92)]),
            "",
            0,
        );
        assert_eq!(trigger, Some(InterventionTrigger::ExtremeAnger));

        let trigger = InterventionPolicy::should_auto_trigger(
            &emotions(&[("anger", 0.85), ("frustration", 0.85)]),
            "",
            0,
        );
        assert_eq!(trigger, Some(InterventionTrigger::UncontrollableBehavior));
    }

    #[test]
    fn keyword_scan_flags_legal_and_abusive_language() {
        let trigger = InterventionPolicy::should_auto_trigger(
            &EmotionalState::new(),
            "I'm going to call my Lawyer about this",
            0,
        );
        assert_eq!(trigger, Some(InterventionTrigger::LegalThreat));

        let trigger = InterventionPolicy::should_auto_trigger(
            &EmotionalState::new(),
            "this process is useless",
            0,
        );
        assert_eq!(trigger, Some(InterventionTrigger::AbusiveLanguage));
    }

    #[test]
    fn repeated_failures_trigger_after_three_attempts() {
        let calm = EmotionalState::new();
        assert_eq!(InterventionPolicy::should_auto_trigger(&calm, "status please", 3), None);
        assert_eq!(
            InterventionPolicy::should_auto_trigger(&calm, "status please", 4),
            Some(InterventionTrigger::RepeatedEscalationFailure)
        );
    }

    #[test]
    fn calm_turns_do_not_trigger() {
        let trigger = InterventionPolicy::should_auto_trigger(
            &emotions(&[("anger", 0.2), ("calmness", 0.8)]),
            "thanks, that works for me",
            1,
        );
        assert_eq!(trigger, None);
    }
}
