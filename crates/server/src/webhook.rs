use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::Sha256;
use tracing::{info, warn};

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// One voice session as seen from engine webhooks. Kept entirely off the
/// live conversation path; the engine reports, we aggregate.
#[derive(Clone, Debug, Serialize)]
pub struct SessionRecord {
    pub chat_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_secs: Option<f64>,
    pub tool_calls: u64,
    pub escalated: bool,
    pub settlement_amount: Option<f64>,
    pub outcome: Option<&'static str>,
}

#[derive(Debug, Default)]
struct AnalyticsInner {
    active_sessions: HashMap<String, SessionRecord>,
    session_history: Vec<SessionRecord>,
    tool_usage: BTreeMap<String, u64>,
    total_tool_calls: u64,
    successful_tool_calls: u64,
    total_tool_latency_ms: f64,
}

#[derive(Clone)]
pub struct WebhookState {
    secret: Option<SecretString>,
    analytics: Arc<Mutex<AnalyticsInner>>,
}

impl WebhookState {
    pub fn new(secret: Option<SecretString>) -> Self {
        Self { secret, analytics: Arc::new(Mutex::new(AnalyticsInner::default())) }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
enum WebhookEvent {
    ChatStarted {
        chat_id: String,
    },
    ChatEnded {
        chat_id: String,
    },
    ToolCalled {
        chat_id: String,
        tool_name: String,
        #[serde(default)]
        success: bool,
        #[serde(default)]
        execution_time_ms: f64,
        #[serde(default)]
        result: Value,
    },
}

pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/webhook", post(handle_webhook))
        .route("/analytics", get(analytics))
        .with_state(state)
}

async fn handle_webhook(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    if let Some(secret) = &state.secret {
        let signature = headers.get(SIGNATURE_HEADER).and_then(|value| value.to_str().ok());
        if !signature_matches(secret, signature, &body) {
            warn!(event_name = "webhook.signature_rejected", "webhook signature mismatch");
            return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "invalid signature" })));
        }
    }

    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(error) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("malformed webhook payload: {error}") })),
            );
        }
    };

    let mut inner = match state.analytics.lock() {
        Ok(inner) => inner,
        Err(poisoned) => poisoned.into_inner(),
    };

    match event {
        WebhookEvent::ChatStarted { chat_id } => {
            info!(event_name = "webhook.chat_started", chat_id = %chat_id, "session opened");
            inner.active_sessions.insert(
                chat_id.clone(),
                SessionRecord {
                    chat_id: chat_id.clone(),
                    started_at: Utc::now(),
                    ended_at: None,
                    duration_secs: None,
                    tool_calls: 0,
                    escalated: false,
                    settlement_amount: None,
                    outcome: None,
                },
            );
            (StatusCode::OK, Json(json!({ "success": true, "chat_id": chat_id })))
        }
        WebhookEvent::ToolCalled { chat_id, tool_name, success, execution_time_ms, result } => {
            inner.total_tool_calls += 1;
            if success {
                inner.successful_tool_calls += 1;
            }
            inner.total_tool_latency_ms += execution_time_ms;
            *inner.tool_usage.entry(tool_name.clone()).or_insert(0) += 1;

            let session_updated = if let Some(session) = inner.active_sessions.get_mut(&chat_id) {
                session.tool_calls += 1;
                if success {
                    match tool_name.as_str() {
                        "escalate_to_specialist" | "instant_escalation"
                        | "request_human_intervention" => session.escalated = true,
                        "calculate_settlement_offer" | "quick_settlement" => {
                            if let Some(amount) = settlement_amount(&result) {
                                session.settlement_amount = Some(amount);
                            }
                        }
                        _ => {}
                    }
                }
                true
            } else {
                false
            };

            (
                StatusCode::OK,
                Json(json!({ "success": true, "session_updated": session_updated })),
            )
        }
        WebhookEvent::ChatEnded { chat_id } => {
            let Some(mut session) = inner.active_sessions.remove(&chat_id) else {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "unknown chat session" })),
                );
            };

            let ended_at = Utc::now();
            session.duration_secs =
                Some((ended_at - session.started_at).num_milliseconds() as f64 / 1_000.0);
            session.ended_at = Some(ended_at);
            session.outcome = Some(if session.escalated {
                "escalated"
            } else if session.settlement_amount.is_some() {
                "settled"
            } else {
                "incomplete"
            });

            info!(
                event_name = "webhook.chat_ended",
                chat_id = %chat_id,
                outcome = session.outcome.unwrap_or("unknown"),
                tool_calls = session.tool_calls,
                "session closed"
            );

            let summary = json!({
                "chat_id": session.chat_id,
                "outcome": session.outcome,
                "duration_secs": session.duration_secs,
                "tool_calls": session.tool_calls,
            });
            inner.session_history.push(session);

            (StatusCode::OK, Json(json!({ "success": true, "session_summary": summary })))
        }
    }
}

async fn analytics(State(state): State<WebhookState>) -> Json<Value> {
    let inner = match state.analytics.lock() {
        Ok(inner) => inner,
        Err(poisoned) => poisoned.into_inner(),
    };

    let completed = inner.session_history.len() as u64;
    let count_outcome = |outcome: &str| {
        inner.session_history.iter().filter(|session| session.outcome == Some(outcome)).count()
            as u64
    };
    let average_duration = if completed == 0 {
        0.0
    } else {
        inner
            .session_history
            .iter()
            .filter_map(|session| session.duration_secs)
            .sum::<f64>()
            / completed as f64
    };
    let average_tool_latency_ms = if inner.total_tool_calls == 0 {
        0.0
    } else {
        inner.total_tool_latency_ms / inner.total_tool_calls as f64
    };

    Json(json!({
        "session_metrics": {
            "total_sessions": completed + inner.active_sessions.len() as u64,
            "active_sessions": inner.active_sessions.len(),
            "completed_sessions": completed,
            "settled": count_outcome("settled"),
            "escalated": count_outcome("escalated"),
            "incomplete": count_outcome("incomplete"),
            "average_session_duration_secs": average_duration,
        },
        "tool_metrics": {
            "total_tool_calls": inner.total_tool_calls,
            "successful_tool_calls": inner.successful_tool_calls,
            "average_tool_latency_ms": average_tool_latency_ms,
            "tool_usage": &inner.tool_usage,
        },
    }))
}

fn signature_matches(secret: &SecretString, signature: Option<&str>, body: &[u8]) -> bool {
    let Some(signature) = signature else { return false };
    let Some(hex_digest) = signature.strip_prefix("sha256=") else { return false };
    let Some(expected) = decode_hex(hex_digest) else { return false };

    let mut mac = match HmacSha256::new_from_slice(secret.expose_secret().as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

fn decode_hex(input: &str) -> Option<Vec<u8>> {
    if input.len() % 2 != 0 {
        return None;
    }
    (0..input.len())
        .step_by(2)
        .map(|index| u8::from_str_radix(&input[index..index + 2], 16).ok())
        .collect()
}

fn settlement_amount(result: &Value) -> Option<f64> {
    let candidate = &result["offer"]["final_amount"];
    if let Some(text) = candidate.as_str() {
        return text.parse().ok();
    }
    if let Some(number) = candidate.as_f64() {
        return Some(number);
    }
    result["recommended_offer"].as_f64()
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use hmac::{Hmac, Mac};
    use secrecy::SecretString;
    use serde_json::{json, Value};
    use sha2::Sha256;
    use tower::ServiceExt;

    use super::{decode_hex, router, WebhookState};

    fn signed_request(secret: &str, payload: &Value) -> Request<Body> {
        let body = payload.to_string();
        let mut mac =
            Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac accepts any key size");
        mac.update(body.as_bytes());
        let digest = mac.finalize().into_bytes();
        let hex: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();

        Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json")
            .header("x-webhook-signature", format!("sha256={hex}"))
            .body(Body::from(body))
            .expect("request builds")
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        serde_json::from_slice(&bytes).expect("body is json")
    }

    #[tokio::test]
    async fn rejects_a_bad_signature() {
        let app = router(WebhookState::new(Some(SecretString::from("whsec-test"))));
        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json")
            .header("x-webhook-signature", "sha256=deadbeef")
            .body(Body::from(r#"{"event_type":"chat_started","chat_id":"chat-1"}"#))
            .expect("request builds");

        let response = app.oneshot(request).await.expect("handler responds");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rejects_malformed_payloads() {
        let app = router(WebhookState::new(None));
        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"event_type":"brand_new_event"}"#))
            .expect("request builds");

        let response = app.oneshot(request).await.expect("handler responds");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn session_lifecycle_classifies_a_settled_outcome() {
        let state = WebhookState::new(Some(SecretString::from("whsec-test")));
        let app = router(state.clone());

        let events = [
            json!({ "event_type": "chat_started", "chat_id": "chat-9" }),
            json!({
                "event_type": "tool_called",
                "chat_id": "chat-9",
                "tool_name": "calculate_settlement_offer",
                "success": true,
                "execution_time_ms": 12.0,
                "result": { "offer": { "final_amount": "15950" } },
            }),
            json!({ "event_type": "chat_ended", "chat_id": "chat-9" }),
        ];
        for event in &events {
            let response = app
                .clone()
                .oneshot(signed_request("whsec-test", event))
                .await
                .expect("handler responds");
            assert_eq!(response.status(), StatusCode::OK);
        }

        let analytics_request = Request::builder()
            .uri("/analytics")
            .body(Body::empty())
            .expect("request builds");
        let response = app.oneshot(analytics_request).await.expect("handler responds");
        let payload = body_json(response).await;

        assert_eq!(payload["session_metrics"]["completed_sessions"], 1);
        assert_eq!(payload["session_metrics"]["settled"], 1);
        assert_eq!(payload["session_metrics"]["escalated"], 0);
        assert_eq!(payload["tool_metrics"]["total_tool_calls"], 1);
        assert_eq!(
            payload["tool_metrics"]["tool_usage"]["calculate_settlement_offer"],
            1
        );
    }

    #[tokio::test]
    async fn escalation_overrides_a_settlement_outcome() {
        let app = router(WebhookState::new(None));

        let events = [
            json!({ "event_type": "chat_started", "chat_id": "chat-2" }),
            json!({
                "event_type": "tool_called",
                "chat_id": "chat-2",
                "tool_name": "calculate_settlement_offer",
                "success": true,
                "result": { "offer": { "final_amount": "9000" } },
            }),
            json!({
                "event_type": "tool_called",
                "chat_id": "chat-2",
                "tool_name": "request_human_intervention",
                "success": true,
            }),
            json!({ "event_type": "chat_ended", "chat_id": "chat-2" }),
        ];
        for event in &events {
            let request = Request::builder()
                .method("POST")
                .uri("/webhook")
                .header("content-type", "application/json")
                .body(Body::from(event.to_string()))
                .expect("request builds");
            let response = app.clone().oneshot(request).await.expect("handler responds");
            assert_eq!(response.status(), StatusCode::OK);
        }

        let analytics_request = Request::builder()
            .uri("/analytics")
            .body(Body::empty())
            .expect("request builds");
        let payload =
            body_json(app.oneshot(analytics_request).await.expect("handler responds")).await;
        assert_eq!(payload["session_metrics"]["escalated"], 1);
        assert_eq!(payload["session_metrics"]["settled"], 0);
    }

    #[tokio::test]
    async fn ending_an_unknown_session_is_a_bad_request() {
        let app = router(WebhookState::new(None));
        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"event_type":"chat_ended","chat_id":"ghost"}"#))
            .expect("request builds");

        let response = app.oneshot(request).await.expect("handler responds");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn hex_decoding_is_strict() {
        assert_eq!(decode_hex("00ff"), Some(vec![0, 255]));
        assert_eq!(decode_hex("0f0"), None);
        assert_eq!(decode_hex("zz"), None);
    }
}
