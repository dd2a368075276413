//! services/bot/src/web/webhook.rs
//!
//! The HTTP side of webhook mode: Telegram POSTs each update to us.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::BotError;
use crate::web::{protocol::Update, state::AppState};

/// Header Telegram uses to echo the `secret_token` given to `setWebhook`.
pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// POST /telegram/webhook
pub async fn webhook_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(update): Json<Update>,
) -> StatusCode {
    let supplied = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
    if !secret_matches(app_state.config.webhook_secret.as_ref(), supplied) {
        warn!("Rejected webhook call with a missing or wrong secret token.");
        return StatusCode::UNAUTHORIZED;
    }

    app_state.dispatcher.dispatch(update).await;
    StatusCode::OK
}

/// GET /health
pub async fn health_handler() -> &'static str {
    "ok"
}

pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/telegram/webhook", post(webhook_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Registers the webhook (when a public URL is configured) and serves until shutdown.
pub async fn serve(app_state: Arc<AppState>, shutdown: CancellationToken) -> Result<(), BotError> {
    let config = app_state.config.clone();
    match &config.webhook_url {
        Some(url) => {
            app_state
                .telegram
                .set_webhook(url, config.webhook_secret.as_ref())
                .await?;
            info!("Webhook registered with Telegram.");
        }
        None => warn!("WEBHOOK_URL is not set; expecting the webhook to be registered already."),
    }

    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    info!("Listening for Telegram updates on {}", config.bind_address);
    axum::serve(listener, router(app_state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    Ok(())
}

/// Without a configured secret no call is accepted.
fn secret_matches(expected: Option<&SecretString>, supplied: Option<&str>) -> bool {
    match (expected, supplied) {
        (Some(expected), Some(supplied)) => supplied
            .as_bytes()
            .ct_eq(expected.expose_secret().as_bytes())
            .into(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_configured_secret_rejects_everything() {
        assert!(!secret_matches(None, None));
        assert!(!secret_matches(None, Some("anything")));
        assert!(!secret_matches(None, Some("")));
    }

    #[test]
    fn configured_secret_must_match() {
        let secret = SecretString::new("s3cret".to_string());
        assert!(secret_matches(Some(&secret), Some("s3cret")));
        assert!(!secret_matches(Some(&secret), Some("s3cre")));
        assert!(!secret_matches(Some(&secret), None));
    }
}
