use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parley_core::approval::{ReviewClient, ReviewClientError};
use parley_core::config::PlannerConfig;
use parley_core::domain::approval::{ReviewRequest, ReviewTicket};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanRunState {
    NeedsClarification,
    Success,
    Failed,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PlanRunSummary {
    pub run_id: String,
    pub state: PlanRunState,
    pub clarification: Option<String>,
}

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("planner request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("planner answered with status {0}")]
    Status(u16),
    #[error("planner is not configured")]
    Disabled,
}

/// Long-form reasoning collaborator. Runs are slow by voice standards, so
/// callers either run them in the background or treat the run id as an
/// opaque review token.
#[async_trait]
pub trait PlannerClient: Send + Sync {
    async fn run_task(&self, description: &str) -> Result<PlanRunSummary, PlannerError>;
}

/// Stand-in used when the planner is disabled in config.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopPlannerClient;

#[async_trait]
impl PlannerClient for NoopPlannerClient {
    async fn run_task(&self, _description: &str) -> Result<PlanRunSummary, PlannerError> {
        Err(PlannerError::Disabled)
    }
}

pub struct HttpPlannerClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl HttpPlannerClient {
    pub fn from_config(config: &PlannerConfig) -> Result<Self, PlannerError> {
        let api_key = config.api_key.clone().ok_or(PlannerError::Disabled)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http, base_url: config.base_url.trim_end_matches('/').to_owned(), api_key })
    }
}

#[async_trait]
impl PlannerClient for HttpPlannerClient {
    async fn run_task(&self, description: &str) -> Result<PlanRunSummary, PlannerError> {
        let response = self
            .http
            .post(format!("{}/api/v0/plan-runs", self.base_url))
            .header("Authorization", format!("Api-Key {}", self.api_key.expose_secret()))
            .json(&json!({ "task": description }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PlannerError::Status(response.status().as_u16()));
        }

        Ok(response.json::<PlanRunSummary>().await?)
    }
}

/// Adapts the planner into the review seam: an over-threshold settlement is
/// submitted as a planner task and the resulting run id becomes the review
/// reference quoted to the caller.
pub struct PlannerReviewClient {
    planner: Arc<dyn PlannerClient>,
}

impl PlannerReviewClient {
    pub fn new(planner: Arc<dyn PlannerClient>) -> Self {
        Self { planner }
    }

    fn describe(request: &ReviewRequest) -> String {
        let claim = request
            .claim_id
            .as_ref()
            .map(|id| id.0.as_str())
            .unwrap_or("unknown claim");
        format!(
            "Review a proposed insurance settlement of ${} for {claim} \
             (auto-approval threshold ${}). Litigation risk: {}. Context: {}",
            request.amount, request.threshold, request.risk.litigation_risk, request.summary
        )
    }
}

#[async_trait]
impl ReviewClient for PlannerReviewClient {
    async fn submit(&self, request: &ReviewRequest) -> Result<ReviewTicket, ReviewClientError> {
        let summary = self
            .planner
            .run_task(&Self::describe(request))
            .await
            .map_err(|error| ReviewClientError::Unavailable(error.to_string()))?;

        let status = match summary.state {
            PlanRunState::NeedsClarification => "pending_review",
            PlanRunState::Success => "approved_by_review",
            PlanRunState::Failed => {
                return Err(ReviewClientError::Rejected(
                    summary.clarification.unwrap_or_else(|| "review run failed".to_owned()),
                ))
            }
        };

        Ok(ReviewTicket { reference: summary.run_id, status: status.to_owned() })
    }
}

/// Kicks off a deep-analysis run without tying it to the conversational
/// turn. The handle is returned for tests and shutdown; the dialogue never
/// awaits it.
pub fn spawn_background_analysis(
    planner: Arc<dyn PlannerClient>,
    task: String,
    timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::time::timeout(timeout, planner.run_task(&task)).await {
            Ok(Ok(summary)) => {
                info!(
                    event_name = "planner.analysis_completed",
                    run_id = %summary.run_id,
                    "background analysis finished"
                );
            }
            Ok(Err(PlannerError::Disabled)) => {
                debug!(event_name = "planner.analysis_skipped", "planner disabled");
            }
            Ok(Err(error)) => {
                warn!(
                    event_name = "planner.analysis_failed",
                    error = %error,
                    "background analysis failed"
                );
            }
            Err(_) => {
                warn!(event_name = "planner.analysis_timeout", "background analysis timed out");
            }
        }
    })
}
