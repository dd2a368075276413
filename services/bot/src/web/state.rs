//! services/bot/src/web/state.rs
//!
//! Defines the application state shared by the webhook handlers and the
//! polling loop.

use crate::adapters::TelegramAdapter;
use crate::config::Config;
use crate::web::dispatch::Dispatcher;
use std::sync::Arc;

/// The shared application state, created once at startup.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub telegram: Arc<TelegramAdapter>,
    pub config: Arc<Config>,
}
