//! services/bot/src/bin/bot.rs

use bot_lib::{
    adapters::{KeitaroAdapter, TelegramAdapter},
    config::{Config, UpdateMode},
    error::BotError,
    polling,
    web::{self, AppState, Dispatcher},
};
use campaign_bot_core::{
    postback_url, AccessGate, ConversationEngine, Provisioner, ProvisioningSettings,
    ReplySettings, SessionStore,
};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), BotError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting bot...");

    if config.using_default_password {
        warn!("ACCESS_PASSWORD is not set; the built-in default password is in use. Set ACCESS_PASSWORD before giving anyone the bot's handle.");
    }

    // --- 2. Initialize Service Adapters ---
    let http_client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()?;

    let telegram = Arc::new(TelegramAdapter::new(
        http_client.clone(),
        config.telegram_api_url.clone(),
        config.bot_token.clone(),
    ));
    let tracking = Arc::new(KeitaroAdapter::new(
        http_client,
        config.keitaro_api_url.clone(),
        config.keitaro_api_key.clone(),
    ));

    // --- 3. Build the Conversation Core ---
    let settings = ProvisioningSettings {
        group_id: config.group_id,
        traffic_source_id: config.traffic_source_id,
        postback_url: postback_url(
            &config.telegram_api_url,
            config.bot_token.expose_secret(),
            &config.notify_chat_id,
        ),
    };
    let engine = Arc::new(ConversationEngine::new(
        AccessGate::new(config.access_password.clone()),
        SessionStore::new(),
        Provisioner::new(tracking, settings),
        telegram.clone(),
        ReplySettings {
            tracker_admin_url: config.tracker_admin_url.clone(),
            results_group: config.results_group.clone(),
        },
    ));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        dispatcher: Arc::new(Dispatcher::new(engine, telegram.clone())),
        telegram,
        config: config.clone(),
    });

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Shutdown signal received.");
                    shutdown.cancel();
                }
                Err(e) => error!("Failed to listen for the shutdown signal: {}", e),
            }
        }
    });

    // --- 5. Receive Updates ---
    match config.update_mode {
        UpdateMode::Polling => polling::run(app_state, shutdown).await?,
        UpdateMode::Webhook => web::serve(app_state, shutdown).await?,
    }

    info!("Bot stopped.");
    Ok(())
}
