use std::sync::Arc;
use std::time::Duration;

use parley_agent::dispatch::ToolDispatcher;
use parley_agent::intent::PhraseIntentClassifier;
use parley_agent::planner::{
    HttpPlannerClient, NoopPlannerClient, PlannerClient, PlannerError, PlannerReviewClient,
};
use parley_core::approval::{ApprovalGate, ApprovalPolicy, InMemoryReviewClient, ReviewClient};
use parley_core::audit::InMemoryAuditSink;
use parley_core::claims::ClaimStore;
use parley_core::config::{AppConfig, ConfigError, LoadOptions};
use parley_core::escalation::EscalationRouter;
use parley_core::intervention::InterventionPolicy;
use parley_voice::runner::{NoopVoiceTransport, RetryPolicy, SessionRunner};
use parley_voice::session::SessionAdapter;
use thiserror::Error;
use tracing::info;

use crate::webhook::WebhookState;

pub struct Application {
    pub config: AppConfig,
    pub claims: Arc<ClaimStore>,
    pub audit: Arc<InMemoryAuditSink>,
    pub dispatcher: Arc<ToolDispatcher>,
    pub session_runner: SessionRunner,
    pub webhook_state: WebhookState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("planner client initialization failed: {0}")]
    Planner(#[source] PlannerError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let config = AppConfig::load(options)?;

    let claims = Arc::new(if config.claims.seed_demo_data {
        ClaimStore::demo()
    } else {
        ClaimStore::new(Vec::new())
    });
    info!(
        event_name = "system.bootstrap.claims_loaded",
        correlation_id = "bootstrap",
        records = claims.len(),
        "claim store initialized"
    );

    let audit = Arc::new(InMemoryAuditSink::default());

    let (planner, review_client): (Arc<dyn PlannerClient>, Arc<dyn ReviewClient>) =
        if config.planner.enabled {
            let planner = Arc::new(
                HttpPlannerClient::from_config(&config.planner).map_err(BootstrapError::Planner)?,
            );
            (planner.clone(), Arc::new(PlannerReviewClient::new(planner)))
        } else {
            (Arc::new(NoopPlannerClient), Arc::new(InMemoryReviewClient::default()))
        };
    info!(
        event_name = "system.bootstrap.planner_mode",
        correlation_id = "bootstrap",
        enabled = config.planner.enabled,
        "planner collaborator initialized"
    );

    let gate = Arc::new(ApprovalGate::new(
        ApprovalPolicy {
            threshold: config.approval.threshold,
            demo_mode: config.approval.demo_mode,
            bypass_amounts: config.approval.bypass_amounts.clone(),
        },
        review_client,
        audit.clone(),
    ));
    let router = Arc::new(EscalationRouter::new(audit.clone()));
    let intervention = Arc::new(InterventionPolicy::new(audit.clone()));

    let dispatcher = Arc::new(ToolDispatcher::new(
        claims.clone(),
        router,
        gate,
        intervention,
        audit.clone(),
    ));

    let adapter = SessionAdapter::new(
        dispatcher.clone(),
        Arc::new(PhraseIntentClassifier),
        planner,
        Duration::from_secs(config.planner.timeout_secs),
    );
    let session_runner = SessionRunner::new(
        Arc::new(NoopVoiceTransport),
        adapter,
        RetryPolicy {
            max_attempts: config.voice.connect_retries,
            delay: Duration::from_secs(config.voice.retry_delay_secs),
        },
    );

    let webhook_state = WebhookState::new(config.webhook.secret.clone());

    Ok(Application { config, claims, audit, dispatcher, session_runner, webhook_state })
}

#[cfg(test)]
mod tests {
    use parley_agent::dispatch::DispatchContext;
    use parley_core::config::{ConfigOverrides, LoadOptions};
    use serde_json::json;

    use crate::bootstrap::bootstrap;

    fn valid_options() -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                voice_api_key: Some("vk-test".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_a_voice_api_key() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                voice_api_key: Some("   ".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().expect("bootstrap should fail").to_string();
        assert!(message.contains("voice.api_key"));
    }

    #[tokio::test]
    async fn integration_smoke_covers_startup_and_the_tool_path() {
        let app = bootstrap(valid_options()).await.expect("bootstrap should succeed");

        assert_eq!(app.claims.len(), 3, "demo claims should be seeded by default");

        let result = app
            .dispatcher
            .dispatch(
                "lookup_claim",
                json!({ "claim_id": "CLM201" }),
                &DispatchContext {
                    session_id: None,
                    correlation_id: "bootstrap-smoke".to_string(),
                },
            )
            .await;
        assert!(result.success, "seeded lookup should succeed: {:?}", result.error);

        let audited = app.audit.events();
        assert!(audited.iter().any(|event| event.event_type == "dispatch.tool_invoked"));
    }

    #[tokio::test]
    async fn disabling_demo_seed_leaves_the_store_empty() {
        let app = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                voice_api_key: Some("vk-test".to_string()),
                seed_demo_data: Some(false),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await
        .expect("bootstrap should succeed");

        assert!(app.claims.is_empty());
    }
}
