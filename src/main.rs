use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use slack_relay::{
    router, AckScheduler, AppState, Config, DebounceConfig, QuoteResponder, RetryPolicy,
    RetryingSender, SlackApiClient, ZenQuotesClient,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Arc::new(Config::from_env()?);

    let http = reqwest::Client::new();
    let client = SlackApiClient::new(http.clone(), config.bot_token.clone());
    let sender = Arc::new(RetryingSender::new(
        Arc::new(client),
        RetryPolicy::default(),
    ));
    let scheduler = AckScheduler::new(sender.clone(), DebounceConfig::default());
    let quotes = QuoteResponder::new(Arc::new(ZenQuotesClient::new(http)), sender.clone());

    let state = AppState {
        config: config.clone(),
        scheduler,
        sender,
        quotes,
    };

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "slack-relay listening");

    axum::serve(listener, router(state)).await?;
    Ok(())
}
