use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parley_agent::dispatch::{DispatchContext, ToolDispatcher, ToolResult};
use parley_agent::intent::IntentClassifier;
use parley_agent::planner::{spawn_background_analysis, PlannerClient};
use parley_agent::tools::ToolName;
use parley_core::domain::intervention::EmotionalState;
use parley_core::intervention::InterventionPolicy;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::events::{VoiceEvent, VoiceResponse};
use crate::metrics::SessionMetrics;

const EMOTION_CONTEXT_THRESHOLD: f64 = 0.6;
const SUSPENDED_NOTICE: &str =
    "Automated handling is suspended; a human specialist now has this conversation.";

/// Drives one voice conversation: answers tool calls from the dialogue
/// engine, forces tool calls the engine should have made, and pulls the
/// plug on automation when a human needs to take over.
pub struct SessionAdapter {
    dispatcher: Arc<ToolDispatcher>,
    classifier: Arc<dyn IntentClassifier>,
    planner: Arc<dyn PlannerClient>,
    analysis_timeout: Duration,
    session_id: String,
    variables: BTreeMap<String, String>,
    metrics: SessionMetrics,
    automation_suspended: bool,
    failed_attempts: u32,
}

impl SessionAdapter {
    pub fn new(
        dispatcher: Arc<ToolDispatcher>,
        classifier: Arc<dyn IntentClassifier>,
        planner: Arc<dyn PlannerClient>,
        analysis_timeout: Duration,
    ) -> Self {
        Self {
            dispatcher,
            classifier,
            planner,
            analysis_timeout,
            session_id: format!("chat-{}", Uuid::new_v4()),
            variables: BTreeMap::new(),
            metrics: SessionMetrics::default(),
            automation_suspended: false,
            failed_attempts: 0,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    pub fn variables(&self) -> &BTreeMap<String, String> {
        &self.variables
    }

    pub fn is_suspended(&self) -> bool {
        self.automation_suspended
    }

    pub async fn handle_event(&mut self, event: VoiceEvent) -> Vec<VoiceResponse> {
        match event {
            VoiceEvent::ChatStarted { chat_id } => {
                if let Some(chat_id) = chat_id {
                    self.session_id = chat_id;
                }
                info!(event_name = "session.started", session_id = %self.session_id, "session opened");
                Vec::new()
            }
            VoiceEvent::ToolCallRequest { call_id, name, arguments } => {
                self.handle_tool_call(call_id, name, arguments).await
            }
            VoiceEvent::UserUtterance { text, emotions } => {
                self.handle_utterance(text, emotions).await
            }
            VoiceEvent::EngineError { message } => {
                self.failed_attempts += 1;
                warn!(
                    event_name = "session.engine_error",
                    session_id = %self.session_id,
                    failed_attempts = self.failed_attempts,
                    error = %message,
                    "engine reported an error"
                );
                Vec::new()
            }
            VoiceEvent::AssistantUtterance { .. }
            | VoiceEvent::AudioFrame { .. }
            | VoiceEvent::Unsupported => Vec::new(),
        }
    }

    async fn handle_tool_call(
        &mut self,
        call_id: String,
        name: String,
        arguments: String,
    ) -> Vec<VoiceResponse> {
        if self.automation_suspended {
            return vec![VoiceResponse::ToolCallError {
                tool_call_id: call_id,
                message: SUSPENDED_NOTICE.to_owned(),
            }];
        }

        let arguments: Value = match serde_json::from_str(&arguments) {
            Ok(value) => value,
            Err(error) => {
                self.metrics.record_tool_call(false, false, Duration::ZERO);
                return vec![VoiceResponse::ToolCallError {
                    tool_call_id: call_id,
                    message: format!("tool arguments were not valid JSON: {error}"),
                }];
            }
        };

        let result = self.dispatch(&name, arguments, false).await;
        let mut responses = Vec::new();

        if self.apply_result(&result) {
            responses.push(VoiceResponse::SessionVariables { variables: self.variables.clone() });
        }

        responses.push(match (&result.success, &result.error) {
            (true, _) => VoiceResponse::ToolCallResponse {
                tool_call_id: call_id,
                content: result.data.to_string(),
            },
            (false, error) => VoiceResponse::ToolCallError {
                tool_call_id: call_id,
                message: error.clone().unwrap_or_else(|| "tool call failed".to_owned()),
            },
        });

        responses
    }

    async fn handle_utterance(
        &mut self,
        text: String,
        emotions: EmotionalState,
    ) -> Vec<VoiceResponse> {
        self.metrics.utterances += 1;

        if self.automation_suspended {
            return Vec::new();
        }

        let mut responses = Vec::new();

        if let Some(trigger) =
            InterventionPolicy::should_auto_trigger(&emotions, &text, self.failed_attempts)
        {
            let result = self
                .dispatch(
                    ToolName::RequestHumanIntervention.canonical(),
                    json!({
                        "trigger": trigger.as_str(),
                        "conversation_summary": text,
                        "emotional_state": emotions,
                        "failure_reason": "conversation signals exceeded automated limits",
                    }),
                    true,
                )
                .await;

            if let Some(message) = result.data["customer_message"].as_str() {
                responses.push(VoiceResponse::AssistantInput { text: message.to_owned() });
            }
            return responses;
        }

        if let Some(intent) = self.classifier.classify(&text) {
            info!(
                event_name = "session.intent_forced",
                session_id = %self.session_id,
                tool = intent.tool.canonical(),
                matched_phrase = %intent.matched_phrase,
                "utterance matched a forced intent"
            );
            let result = self.dispatch(intent.tool.canonical(), intent.arguments, true).await;

            if self.apply_result(&result) {
                responses
                    .push(VoiceResponse::SessionVariables { variables: self.variables.clone() });
            }
            if let Some(summary) = result.data["summary"].as_str() {
                responses.push(VoiceResponse::AssistantInput { text: summary.to_owned() });
            }
        }

        if let Some((label, intensity)) = dominant_emotion(&emotions) {
            if intensity > EMOTION_CONTEXT_THRESHOLD {
                self.variables.insert(
                    "emotional_context".to_owned(),
                    format!("caller {label} is elevated ({intensity:.2})"),
                );
                responses
                    .push(VoiceResponse::SessionVariables { variables: self.variables.clone() });
            }
        }

        responses
    }

    async fn dispatch(&mut self, name: &str, arguments: Value, forced: bool) -> ToolResult {
        let context = DispatchContext {
            session_id: Some(self.session_id.clone()),
            correlation_id: Uuid::new_v4().to_string(),
        };
        let result = self.dispatcher.dispatch(name, arguments, &context).await;
        self.metrics.record_tool_call(result.success, forced, result.latency);

        if !result.success {
            self.failed_attempts += 1;
        }

        match ToolName::parse(&result.tool) {
            Ok(ToolName::RequestHumanIntervention) if result.success => {
                self.metrics.interventions += 1;
                self.automation_suspended = true;
            }
            Ok(ToolName::EscalateToSpecialist) if result.success => {
                self.metrics.escalations += 1;
            }
            Ok(ToolName::CalculateSettlementOffer) if result.success => {
                // Deep analysis never blocks the conversational turn.
                spawn_background_analysis(
                    self.planner.clone(),
                    format!(
                        "Analyze the settlement negotiation in session {}: {}",
                        self.session_id, result.data["summary"]
                    ),
                    self.analysis_timeout,
                );
            }
            _ => {}
        }

        result
    }

    /// Folds interesting fields of a tool result into the session variables
    /// the dialogue model can reference on later turns. Returns true when
    /// anything changed.
    fn apply_result(&mut self, result: &ToolResult) -> bool {
        if !result.success {
            return false;
        }

        let mut changed = false;
        let mut set = |variables: &mut BTreeMap<String, String>, key: &str, value: Option<&str>| {
            if let Some(value) = value {
                let previous = variables.insert(key.to_owned(), value.to_owned());
                if previous.as_deref() != Some(value) {
                    changed = true;
                }
            }
        };

        set(&mut self.variables, "claim_id", result.data["claim"]["id"].as_str());
        set(&mut self.variables, "claimant_name", result.data["claim"]["claimant_name"].as_str());
        set(
            &mut self.variables,
            "last_settlement_amount",
            result.data["offer"]["final_amount"].as_str(),
        );

        changed
    }
}

fn dominant_emotion(emotions: &EmotionalState) -> Option<(&str, f64)> {
    emotions
        .iter()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(label, intensity)| (label.as_str(), *intensity))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use parley_agent::dispatch::ToolDispatcher;
    use parley_agent::intent::PhraseIntentClassifier;
    use parley_agent::planner::NoopPlannerClient;
    use parley_core::approval::{ApprovalGate, ApprovalPolicy, InMemoryReviewClient};
    use parley_core::audit::InMemoryAuditSink;
    use parley_core::claims::ClaimStore;
    use parley_core::escalation::EscalationRouter;
    use parley_core::intervention::InterventionPolicy;

    use crate::events::{VoiceEvent, VoiceResponse};

    use super::SessionAdapter;

    fn adapter() -> SessionAdapter {
        let sink = Arc::new(InMemoryAuditSink::default());
        let dispatcher = Arc::new(ToolDispatcher::new(
            Arc::new(ClaimStore::demo()),
            Arc::new(EscalationRouter::new(sink.clone())),
            Arc::new(ApprovalGate::new(
                ApprovalPolicy::default(),
                Arc::new(InMemoryReviewClient::default()),
                sink.clone(),
            )),
            Arc::new(InterventionPolicy::new(sink.clone())),
            sink,
        ));
        SessionAdapter::new(
            dispatcher,
            Arc::new(PhraseIntentClassifier),
            Arc::new(NoopPlannerClient),
            Duration::from_secs(5),
        )
    }

    fn utterance(text: &str) -> VoiceEvent {
        VoiceEvent::UserUtterance { text: text.to_owned(), emotions: Default::default() }
    }

    #[tokio::test]
    async fn tool_call_round_trips_with_the_call_id() {
        let mut adapter = adapter();
        let responses = adapter
            .handle_event(VoiceEvent::ToolCallRequest {
                call_id: "call-1".to_owned(),
                name: "lookup_claim".to_owned(),
                arguments: r#"{"claim_id":"CLM201"}"#.to_owned(),
            })
            .await;

        let response = responses.last().expect("a tool response");
        match response {
            VoiceResponse::ToolCallResponse { tool_call_id, content } => {
                assert_eq!(tool_call_id, "call-1");
                assert!(content.contains("Nachiket Kulkarni"));
            }
            other => panic!("unexpected response {other:?}"),
        }

        assert_eq!(adapter.variables().get("claim_id").map(String::as_str), Some("CLM201"));
        assert_eq!(adapter.metrics().tool_calls, 1);
    }

    #[tokio::test]
    async fn spoken_claim_reference_forces_a_lookup() {
        let mut adapter = adapter();
        let responses = adapter.handle_event(utterance("my claim is clm two zero one")).await;

        assert!(responses.iter().any(|response| matches!(
            response,
            VoiceResponse::AssistantInput { text } if text.contains("CLM201")
        )));
        assert_eq!(adapter.metrics().forced_tool_calls, 1);
        assert_eq!(adapter.variables().get("claimant_name").map(String::as_str), Some("Nachiket Kulkarni"));
    }

    #[tokio::test]
    async fn forced_and_model_invoked_lookups_are_idempotent() {
        let mut adapter = adapter();
        adapter.handle_event(utterance("it's claim 201")).await;
        adapter
            .handle_event(VoiceEvent::ToolCallRequest {
                call_id: "call-2".to_owned(),
                name: "fast_claim_lookup".to_owned(),
                arguments: r#"{"claim_id":"CLM201"}"#.to_owned(),
            })
            .await;

        assert_eq!(adapter.variables().get("claim_id").map(String::as_str), Some("CLM201"));
        assert_eq!(adapter.metrics().tool_calls, 2);
    }

    #[tokio::test]
    async fn extreme_anger_suspends_automation() {
        let mut adapter = adapter();
        let mut emotions = parley_core::domain::intervention::EmotionalState::new();
        emotions.insert("anger".to_owned(), 0.95);

        let responses = adapter
            .handle_event(VoiceEvent::UserUtterance {
                text: "this is outrageous".to_owned(),
                emotions,
            })
            .await;

        assert!(adapter.is_suspended());
        assert_eq!(adapter.metrics().interventions, 1);
        assert!(matches!(responses.first(), Some(VoiceResponse::AssistantInput { .. })));

        // Further tool calls are refused with a notice.
        let refused = adapter
            .handle_event(VoiceEvent::ToolCallRequest {
                call_id: "call-3".to_owned(),
                name: "lookup_claim".to_owned(),
                arguments: "{}".to_owned(),
            })
            .await;
        assert!(matches!(refused.first(), Some(VoiceResponse::ToolCallError { message, .. })
            if message.contains("suspended")));
    }

    #[tokio::test]
    async fn elevated_emotion_updates_session_context() {
        let mut adapter = adapter();
        let mut emotions = parley_core::domain::intervention::EmotionalState::new();
        emotions.insert("frustration".to_owned(), 0.7);

        adapter
            .handle_event(VoiceEvent::UserUtterance {
                text: "this has taken way too long".to_owned(),
                emotions,
            })
            .await;

        let context = adapter.variables().get("emotional_context").cloned().unwrap_or_default();
        assert!(context.contains("frustration"), "context was {context:?}");
    }

    #[tokio::test]
    async fn malformed_tool_arguments_return_a_structured_error() {
        let mut adapter = adapter();
        let responses = adapter
            .handle_event(VoiceEvent::ToolCallRequest {
                call_id: "call-4".to_owned(),
                name: "lookup_claim".to_owned(),
                arguments: "not json".to_owned(),
            })
            .await;

        assert!(matches!(responses.first(), Some(VoiceResponse::ToolCallError { .. })));
        assert_eq!(adapter.metrics().failed_tool_calls, 1);
    }

    #[tokio::test]
    async fn settlement_phrase_dispatches_calculation_with_approval() {
        let mut adapter = adapter();
        let responses =
            adapter.handle_event(utterance("I want twenty five thousand dollars")).await;

        assert_eq!(adapter.metrics().forced_tool_calls, 1);
        assert!(responses.iter().any(|response| matches!(
            response,
            VoiceResponse::SessionVariables { variables }
                if variables.contains_key("last_settlement_amount")
        )));
    }
}
