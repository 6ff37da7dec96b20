//! HTTP surface: event ingestion, manual send, health check.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::{debug, info};

use crate::auth::authorize_bearer;
use crate::config::Config;
use crate::debounce::AckScheduler;
use crate::error::{ApiError, ApiResult};
use crate::quote::{self, QuoteResponder};
use crate::sender::RetryingSender;
use crate::signing::{verify_event_request, Disposition};
use crate::types::{InboundEnvelope, SendRequest, KIND_URL_VERIFICATION};
use crate::validate::{validate_envelope, validate_send_request, FieldViolation};

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub scheduler: AckScheduler,
    pub sender: Arc<RetryingSender>,
    pub quotes: QuoteResponder,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/slack/events", post(events_handler))
        .route("/send-message", post(send_message_handler))
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "Slack relay is alive 🚀"
}

/// Event ingestion. The signature covers the exact raw body bytes, so the
/// body is taken as `Bytes` and only parsed after the gate accepts it.
/// Responds before any acknowledgment delivery happens; delivery failures
/// never surface here.
async fn events_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let header_pairs = headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)));

    let disposition = verify_event_request(
        header_pairs,
        &body,
        state.config.signing_secret.as_bytes(),
        now_secs(),
    )?;

    if disposition == Disposition::DuplicateDelivery {
        // Already processed; acknowledge so the platform stops retrying,
        // run no side effects.
        debug!("duplicate delivery acknowledged without processing");
        return Ok(().into_response());
    }

    let envelope: InboundEnvelope = serde_json::from_slice(&body).map_err(|e| {
        ApiError::Validation(vec![FieldViolation {
            field: "body".to_string(),
            message: format!("invalid event payload: {e}"),
        }])
    })?;
    validate_envelope(&envelope).map_err(ApiError::Validation)?;

    if envelope.kind == KIND_URL_VERIFICATION {
        // Handshake; answered synchronously, never reaches the scheduler.
        let challenge = envelope.challenge.unwrap_or_default();
        return Ok(Json(json!({ "challenge": challenge })).into_response());
    }

    if let Some(channel) = envelope.qualifying_channel() {
        info!(channel = %channel, "qualifying message event");

        // The quote reply runs detached: the platform expects its 200
        // before the fetch would finish.
        if let Some(event) = &envelope.event {
            if event.text.as_deref().is_some_and(quote::wants_quote) {
                let responder = state.quotes.clone();
                let quote_channel = channel.clone();
                let user = event.user.clone();
                tokio::spawn(async move { responder.respond(quote_channel, user).await });
            }
        }

        state.scheduler.on_message_event(channel).await;
    }

    Ok(().into_response())
}

/// Manual send. Synchronous: the response reflects delivery outcome.
async fn send_message_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SendRequest>,
) -> ApiResult<impl IntoResponse> {
    let authorization = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let claims = authorize_bearer(authorization, state.config.jwt_secret.as_bytes())?;

    validate_send_request(&request).map_err(ApiError::Validation)?;

    info!(subject = %claims.sub, "manual send requested");
    let result = state
        .sender
        .send(&state.config.default_channel, &request.text)
        .await?;

    Ok(Json(json!({ "success": true, "result": result })))
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
