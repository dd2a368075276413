//! services/bot/src/polling.rs
//!
//! Long-polling mode: repeatedly asks Telegram for new updates and hands each
//! one to the dispatcher.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::BotError;
use crate::web::AppState;

/// How long Telegram holds a `getUpdates` call open when there is nothing new.
const POLL_TIMEOUT: Duration = Duration::from_secs(25);
/// Pause after a failed poll before asking again.
const RETRY_DELAY: Duration = Duration::from_secs(5);

pub async fn run(app_state: Arc<AppState>, shutdown: CancellationToken) -> Result<(), BotError> {
    app_state.telegram.delete_webhook().await?;
    info!("Bot deployed and polling for updates.");

    let mut offset: Option<i64> = None;
    loop {
        let polled = tokio::select! {
            _ = shutdown.cancelled() => break,
            polled = app_state.telegram.get_updates(offset, POLL_TIMEOUT) => polled,
        };

        match polled {
            Ok(updates) => {
                for update in updates {
                    offset = Some(next_offset(offset, update.update_id));
                    app_state.dispatcher.dispatch(update).await;
                }
            }
            Err(e) => {
                error!("Polling for updates failed: {}", e);
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(RETRY_DELAY) => {}
                }
            }
        }
    }

    info!("Polling stopped.");
    Ok(())
}

/// Telegram confirms every update below the offset on the next call.
fn next_offset(current: Option<i64>, update_id: i64) -> i64 {
    current.map_or(update_id + 1, |offset| offset.max(update_id + 1))
}
