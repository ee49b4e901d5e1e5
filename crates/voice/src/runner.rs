use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use parley_agent::dispatch::ToolDispatcher;
use parley_agent::intent::PhraseIntentClassifier;
use parley_agent::planner::NoopPlannerClient;
use parley_core::approval::{ApprovalGate, ApprovalPolicy, InMemoryReviewClient};
use parley_core::audit::InMemoryAuditSink;
use parley_core::claims::ClaimStore;
use parley_core::escalation::EscalationRouter;
use parley_core::intervention::InterventionPolicy;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::events::{VoiceEvent, VoiceResponse};
use crate::session::SessionAdapter;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport send failed: {0}")]
    Send(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

/// Conversation-loop retry: a fixed pause between attempts, no backoff.
/// Voice callers hang up quickly, so a long reconnect dance buys nothing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, delay: Duration::from_secs(3) }
    }
}

#[async_trait]
pub trait VoiceTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_event(&self) -> Result<Option<VoiceEvent>, TransportError>;
    async fn send(&self, response: VoiceResponse) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

#[derive(Default)]
pub struct NoopVoiceTransport;

#[async_trait]
impl VoiceTransport for NoopVoiceTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_event(&self) -> Result<Option<VoiceEvent>, TransportError> {
        Ok(None)
    }

    async fn send(&self, _response: VoiceResponse) -> Result<(), TransportError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Bridges a transport to the session adapter: pumps events in, pushes
/// responses out, retries the whole conversation loop on transport failure.
pub struct SessionRunner {
    transport: Arc<dyn VoiceTransport>,
    adapter: Mutex<SessionAdapter>,
    retry_policy: RetryPolicy,
}

impl Default for SessionRunner {
    fn default() -> Self {
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
        let adapter = SessionAdapter::new(
            dispatcher,
            Arc::new(PhraseIntentClassifier),
            Arc::new(NoopPlannerClient),
            Duration::from_secs(30),
        );
        Self::new(Arc::new(NoopVoiceTransport), adapter, RetryPolicy::default())
    }
}

impl SessionRunner {
    pub fn new(
        transport: Arc<dyn VoiceTransport>,
        adapter: SessionAdapter,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self { transport, adapter: Mutex::new(adapter), retry_policy }
    }

    pub async fn start(&self) -> Result<()> {
        for attempt in 1..=self.retry_policy.max_attempts {
            match self.connect_and_pump(attempt).await {
                Ok(()) => return Ok(()),
                Err(transport_error) => {
                    warn!(
                        attempt,
                        max_attempts = self.retry_policy.max_attempts,
                        error = %transport_error,
                        "voice transport failed"
                    );

                    if attempt >= self.retry_policy.max_attempts {
                        warn!(
                            max_attempts = self.retry_policy.max_attempts,
                            "voice retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    if !self.retry_policy.delay.is_zero() {
                        tokio::time::sleep(self.retry_policy.delay).await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn connect_and_pump(&self, attempt: u32) -> Result<(), TransportError> {
        info!(attempt, "opening voice transport connection");
        self.transport.connect().await?;
        info!(attempt, "voice transport connected");

        loop {
            let Some(event) = self.transport.next_event().await? else {
                info!(attempt, "voice transport stream closed");
                self.transport.disconnect().await?;
                self.log_session_end().await;
                return Ok(());
            };

            let responses = {
                let mut adapter = self.adapter.lock().await;
                adapter.handle_event(event).await
            };

            for response in responses {
                self.transport.send(response).await?;
            }
        }
    }

    async fn log_session_end(&self) {
        let adapter = self.adapter.lock().await;
        let metrics = adapter.metrics();
        info!(
            event_name = "session.ended",
            session_id = %adapter.session_id(),
            utterances = metrics.utterances,
            tool_calls = metrics.tool_calls,
            forced_tool_calls = metrics.forced_tool_calls,
            failed_tool_calls = metrics.failed_tool_calls,
            interventions = metrics.interventions,
            escalations = metrics.escalations,
            average_tool_latency_ms = metrics.average_tool_latency().as_millis() as u64,
            "session closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use crate::events::{VoiceEvent, VoiceResponse};

    use super::{RetryPolicy, SessionRunner, TransportError, VoiceTransport};

    #[derive(Default)]
    struct ScriptedTransport {
        state: Mutex<ScriptedState>,
    }

    #[derive(Default)]
    struct ScriptedState {
        connect_results: VecDeque<Result<(), TransportError>>,
        events: VecDeque<Result<Option<VoiceEvent>, TransportError>>,
        connect_attempts: usize,
        sent: Vec<VoiceResponse>,
        disconnect_calls: usize,
    }

    impl ScriptedTransport {
        fn with_script(
            connect_results: Vec<Result<(), TransportError>>,
            events: Vec<Result<Option<VoiceEvent>, TransportError>>,
        ) -> Self {
            Self {
                state: Mutex::new(ScriptedState {
                    connect_results: connect_results.into(),
                    events: events.into(),
                    ..ScriptedState::default()
                }),
            }
        }

        async fn connect_attempts(&self) -> usize {
            self.state.lock().await.connect_attempts
        }

        async fn sent(&self) -> Vec<VoiceResponse> {
            self.state.lock().await.sent.clone()
        }

        async fn disconnect_calls(&self) -> usize {
            self.state.lock().await.disconnect_calls
        }
    }

    #[async_trait]
    impl VoiceTransport for ScriptedTransport {
        async fn connect(&self) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.connect_attempts += 1;
            state.connect_results.pop_front().unwrap_or(Ok(()))
        }

        async fn next_event(&self) -> Result<Option<VoiceEvent>, TransportError> {
            let mut state = self.state.lock().await;
            state.events.pop_front().unwrap_or(Ok(None))
        }

        async fn send(&self, response: VoiceResponse) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.sent.push(response);
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.disconnect_calls += 1;
            Ok(())
        }
    }

    fn runner_with(transport: Arc<ScriptedTransport>) -> SessionRunner {
        let default_runner = SessionRunner::default();
        SessionRunner {
            transport,
            adapter: default_runner.adapter,
            retry_policy: RetryPolicy { max_attempts: 3, delay: Duration::ZERO },
        }
    }

    #[tokio::test]
    async fn reconnects_after_initial_connect_failure() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Err(TransportError::Connect("network down".to_owned())), Ok(())],
            vec![
                Ok(Some(VoiceEvent::ToolCallRequest {
                    call_id: "call-1".to_owned(),
                    name: "lookup_claim".to_owned(),
                    arguments: r#"{"claim_id":"CLM201"}"#.to_owned(),
                })),
                Ok(None),
            ],
        ));

        let runner = runner_with(transport.clone());
        runner.start().await.expect("runner should not fail");

        assert_eq!(transport.connect_attempts().await, 2);
        let sent = transport.sent().await;
        assert!(sent.iter().any(|response| matches!(
            response,
            VoiceResponse::ToolCallResponse { tool_call_id, .. } if tool_call_id == "call-1"
        )));
        assert_eq!(transport.disconnect_calls().await, 1);
    }

    #[tokio::test]
    async fn exhausts_retries_without_crashing() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![
                Err(TransportError::Connect("fail-1".to_owned())),
                Err(TransportError::Connect("fail-2".to_owned())),
                Err(TransportError::Connect("fail-3".to_owned())),
            ],
            vec![],
        ));

        let runner = runner_with(transport.clone());
        runner.start().await.expect("runner should degrade gracefully");
        assert_eq!(transport.connect_attempts().await, 3);
    }

    #[tokio::test]
    async fn mid_stream_failure_triggers_one_retry() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Ok(()), Ok(())],
            vec![Err(TransportError::Receive("socket reset".to_owned())), Ok(None)],
        ));

        let runner = runner_with(transport.clone());
        runner.start().await.expect("runner should not fail");
        assert_eq!(transport.connect_attempts().await, 2);
    }

    #[tokio::test]
    async fn default_runner_drains_the_noop_transport() {
        let runner = SessionRunner::default();
        runner.start().await.expect("noop transport closes immediately");
    }
}
