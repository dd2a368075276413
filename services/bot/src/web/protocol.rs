//! services/bot/src/web/protocol.rs
//!
//! Defines the subset of the Telegram Bot API message protocol the bot reads
//! and writes, and the mapping from a Telegram update to a core event.

use campaign_bot_core::domain::{ChatId, EventKind, InboundEvent, KeyboardButton, UserId};
use serde::{Deserialize, Serialize};

//=========================================================================================
// Updates Sent FROM Telegram TO the Bot
//=========================================================================================

#[derive(Deserialize, Debug, Clone)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct User {
    pub id: i64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Chat {
    pub id: i64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

impl Update {
    /// Maps the update onto a core event. Updates the bot does not act on
    /// (stickers, edits, service messages) yield `None`.
    pub fn to_event(&self) -> Option<InboundEvent> {
        if let Some(message) = &self.message {
            let user = message.from.as_ref()?;
            let text = message.text.as_deref()?;
            let kind = if is_start_command(text) {
                EventKind::Start
            } else {
                EventKind::Text(text.trim().to_string())
            };
            return Some(InboundEvent {
                user: UserId(user.id),
                chat: ChatId(message.chat.id),
                kind,
            });
        }

        if let Some(query) = &self.callback_query {
            let data = query.data.clone()?;
            // Callbacks from inline messages carry no chat; reply privately.
            let chat = query
                .message
                .as_ref()
                .map(|message| message.chat.id)
                .unwrap_or(query.from.id);
            return Some(InboundEvent {
                user: UserId(query.from.id),
                chat: ChatId(chat),
                kind: EventKind::Action(data),
            });
        }

        None
    }
}

/// `/start`, optionally with a bot mention or a deep-link payload.
fn is_start_command(text: &str) -> bool {
    let command = text.trim().split_whitespace().next().unwrap_or_default();
    command == "/start" || command.starts_with("/start@")
}

//=========================================================================================
// Payloads Sent FROM the Bot TO Telegram
//=========================================================================================

#[derive(Serialize, Debug, Clone)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

impl InlineKeyboardMarkup {
    /// One button per row.
    pub fn single_column(buttons: &[KeyboardButton]) -> Self {
        Self {
            inline_keyboard: buttons
                .iter()
                .map(|button| {
                    vec![InlineKeyboardButton {
                        text: button.label.clone(),
                        callback_data: button.selector.clone(),
                    }]
                })
                .collect(),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct SendMessageRequest {
    pub chat_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

/// Envelope every Bot API method answers with.
#[derive(Deserialize, Debug)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
}
