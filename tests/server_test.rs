use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use tower::util::ServiceExt;

use slack_relay::{
    compute_signature, mint_token, AckScheduler, AppState, ChannelId, Config, DebounceConfig,
    DeliveryClient, DeliveryError, DeliveryResult, Quote, QuoteError, QuoteFetcher,
    QuoteResponder, RetryPolicy, RetryingSender, RETRY_NUM_HEADER, SIGNATURE_HEADER,
    TIMESTAMP_HEADER,
};

const SIGNING_SECRET: &str = "test-signing-secret";
const JWT_SECRET: &str = "test-jwt-secret";

#[derive(Default)]
struct RecordingClient {
    deliveries: std::sync::Mutex<Vec<(ChannelId, String)>>,
}

#[async_trait]
impl DeliveryClient for RecordingClient {
    async fn post_message(
        &self,
        channel: &ChannelId,
        text: &str,
    ) -> Result<DeliveryResult, DeliveryError> {
        self.deliveries
            .lock()
            .unwrap()
            .push((channel.clone(), text.to_string()));
        Ok(DeliveryResult {
            channel: channel.as_str().to_string(),
            ts: Some("1700000000.000200".to_string()),
        })
    }
}

#[derive(Default)]
struct FailingClient;

#[async_trait]
impl DeliveryClient for FailingClient {
    async fn post_message(
        &self,
        _channel: &ChannelId,
        _text: &str,
    ) -> Result<DeliveryResult, DeliveryError> {
        Err(DeliveryError::Api("channel_not_found".to_string()))
    }
}

struct StubFetcher;

#[async_trait]
impl QuoteFetcher for StubFetcher {
    async fn fetch_random(&self) -> Result<Quote, QuoteError> {
        Ok(Quote {
            text: "Stay hungry.".to_string(),
            author: "S. Jobs".to_string(),
        })
    }
}

fn test_state(client: Arc<dyn DeliveryClient>) -> AppState {
    let config = Arc::new(Config {
        signing_secret: SIGNING_SECRET.to_string(),
        bot_token: "xoxb-test".to_string(),
        default_channel: ChannelId::new("C-default"),
        jwt_secret: JWT_SECRET.to_string(),
        port: 0,
    });
    let sender = Arc::new(RetryingSender::new(
        client,
        RetryPolicy {
            max_retries: 0,
            delay: Duration::from_millis(1),
        },
    ));
    let scheduler = AckScheduler::new(
        sender.clone(),
        DebounceConfig {
            delay: Duration::from_millis(20),
            ack_text: "Acknowledged ✅".to_string(),
        },
    );
    let quotes = QuoteResponder::new(Arc::new(StubFetcher), sender.clone());
    AppState {
        config,
        scheduler,
        sender,
        quotes,
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

fn signed_event_request(body: &str, timestamp: u64) -> Request<Body> {
    let ts = timestamp.to_string();
    let signature = compute_signature(SIGNING_SECRET.as_bytes(), &ts, body.as_bytes());
    Request::builder()
        .method("POST")
        .uri("/slack/events")
        .header(header::CONTENT_TYPE, "application/json")
        .header(SIGNATURE_HEADER, signature)
        .header(TIMESTAMP_HEADER, ts)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_check_is_alive() {
    let app = slack_relay::router(test_state(Arc::new(RecordingClient::default())));
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn url_verification_echoes_challenge() {
    let state = test_state(Arc::new(RecordingClient::default()));
    let app = slack_relay::router(state.clone());

    let body = r#"{"type":"url_verification","challenge":"ch4ll3nge"}"#;
    let response = app
        .oneshot(signed_event_request(body, now_secs()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["challenge"], "ch4ll3nge");
    assert_eq!(state.scheduler.pending_count().await, 0);
}

#[tokio::test]
async fn missing_signature_headers_reject() {
    let app = slack_relay::router(test_state(Arc::new(RecordingClient::default())));
    let request = Request::builder()
        .method("POST")
        .uri("/slack/events")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"type":"event_callback"}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn forged_signature_rejects() {
    let app = slack_relay::router(test_state(Arc::new(RecordingClient::default())));
    let ts = now_secs().to_string();
    let request = Request::builder()
        .method("POST")
        .uri("/slack/events")
        .header(SIGNATURE_HEADER, "v0=deadbeef")
        .header(TIMESTAMP_HEADER, ts)
        .body(Body::from(r#"{"type":"event_callback"}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_signature");
}

#[tokio::test]
async fn stale_request_rejects_despite_valid_signature() {
    let app = slack_relay::router(test_state(Arc::new(RecordingClient::default())));
    let body = r#"{"type":"event_callback"}"#;
    let response = app
        .oneshot(signed_event_request(body, now_secs() - 301))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "stale_request");
}

#[tokio::test]
async fn malformed_body_rejects_with_validation_details() {
    let app = slack_relay::router(test_state(Arc::new(RecordingClient::default())));
    let response = app
        .oneshot(signed_event_request("not json", now_secs()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "validation_error");
}

#[tokio::test]
async fn qualifying_event_schedules_ack_and_responds_immediately() {
    let client = Arc::new(RecordingClient::default());
    let state = test_state(client.clone());
    let app = slack_relay::router(state.clone());

    let body = r#"{"type":"event_callback","event":{"type":"message","channel":"C42","user":"U1","text":"hi"}}"#;
    let response = app
        .oneshot(signed_event_request(body, now_secs()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    // Response came back before the debounce fired.
    assert_eq!(state.scheduler.pending_count().await, 1);
    assert!(client.deliveries.lock().unwrap().is_empty());

    tokio::time::sleep(Duration::from_millis(100)).await;
    let deliveries = client.deliveries.lock().unwrap().clone();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].0, ChannelId::new("C42"));
    assert_eq!(deliveries[0].1, "Acknowledged ✅");
}

#[tokio::test]
async fn quote_message_gets_a_quote_reply_alongside_the_ack() {
    let client = Arc::new(RecordingClient::default());
    let state = test_state(client.clone());
    let app = slack_relay::router(state.clone());

    let body = r#"{"type":"event_callback","event":{"type":"message","channel":"C42","user":"U7","text":"give me a quote"}}"#;
    let response = app
        .oneshot(signed_event_request(body, now_secs()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let deliveries = client.deliveries.lock().unwrap().clone();
    assert_eq!(deliveries.len(), 2);
    let texts: Vec<&str> = deliveries.iter().map(|(_, text)| text.as_str()).collect();
    assert!(texts.contains(&"Hello, <@U7>, Stay hungry. — S. Jobs"));
    assert!(texts.contains(&"Acknowledged ✅"));
    assert!(deliveries.iter().all(|(c, _)| c == &ChannelId::new("C42")));
}

#[tokio::test]
async fn bot_event_never_schedules() {
    let client = Arc::new(RecordingClient::default());
    let state = test_state(client.clone());
    let app = slack_relay::router(state.clone());

    let body = r#"{"type":"event_callback","event":{"type":"message","channel":"C42","bot_id":"B1","text":"hi"}}"#;
    let response = app
        .oneshot(signed_event_request(body, now_secs()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(state.scheduler.pending_count().await, 0);
}

#[tokio::test]
async fn retry_delivery_acks_without_side_effects() {
    let client = Arc::new(RecordingClient::default());
    let state = test_state(client.clone());
    let app = slack_relay::router(state.clone());

    let body = r#"{"type":"event_callback","event":{"type":"message","channel":"C42","user":"U1"}}"#;
    let mut request = signed_event_request(body, now_secs());
    request
        .headers_mut()
        .insert(RETRY_NUM_HEADER, "1".parse().unwrap());

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(state.scheduler.pending_count().await, 0);
}

fn send_request(token: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/send-message")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn send_message_with_valid_token_delivers_to_default_channel() {
    let client = Arc::new(RecordingClient::default());
    let app = slack_relay::router(test_state(client.clone()));

    let token = mint_token(JWT_SECRET.as_bytes(), "backend-dev").unwrap();
    let response = app
        .oneshot(send_request(Some(&token), r#"{"text":"manual hello"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["result"]["channel"], "C-default");

    let deliveries = client.deliveries.lock().unwrap().clone();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].1, "manual hello");
}

#[tokio::test]
async fn send_message_without_token_is_unauthorized() {
    let app = slack_relay::router(test_state(Arc::new(RecordingClient::default())));
    let response = app
        .oneshot(send_request(None, r#"{"text":"hi"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn send_message_with_expired_token_is_unauthorized() {
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

    let now = chrono::Utc::now().timestamp();
    let claims = slack_relay::AuthClaims {
        sub: "backend-dev".to_string(),
        scope: "send-message".to_string(),
        iat: now - 7200,
        exp: now - 3600,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap();

    let app = slack_relay::router(test_state(Arc::new(RecordingClient::default())));
    let response = app
        .oneshot(send_request(Some(&token), r#"{"text":"hi"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn send_message_with_empty_text_is_rejected_with_details() {
    let app = slack_relay::router(test_state(Arc::new(RecordingClient::default())));
    let token = mint_token(JWT_SECRET.as_bytes(), "backend-dev").unwrap();

    let response = app
        .oneshot(send_request(Some(&token), r#"{"text":""}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "validation_error");
    assert_eq!(json["details"][0]["field"], "text");
}

#[tokio::test]
async fn send_message_delivery_failure_is_a_server_error() {
    let app = slack_relay::router(test_state(Arc::new(FailingClient)));
    let token = mint_token(JWT_SECRET.as_bytes(), "backend-dev").unwrap();

    let response = app
        .oneshot(send_request(Some(&token), r#"{"text":"hi"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "delivery_failed");
}
