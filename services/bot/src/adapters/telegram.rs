//! services/bot/src/adapters/telegram.rs
//!
//! This module contains the adapter for the Telegram Bot API.
//! It implements the `Messenger` port from the `core` crate and exposes the
//! update-receiving methods the transport layer needs.

use std::time::Duration;

use async_trait::async_trait;
use campaign_bot_core::domain::{ChatId, MessageFormat, OutboundMessage};
use campaign_bot_core::ports::{Messenger, PortError, PortResult};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use crate::web::protocol::{ApiResponse, InlineKeyboardMarkup, SendMessageRequest, Update};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that talks to the Telegram Bot API over HTTPS.
#[derive(Clone)]
pub struct TelegramAdapter {
    client: Client,
    api_url: String,
    token: SecretString,
}

impl TelegramAdapter {
    /// Creates a new `TelegramAdapter`. `api_url` is normally `https://api.telegram.org`.
    pub fn new(client: Client, api_url: String, token: SecretString) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token.expose_secret(), method)
    }

    /// Calls a Bot API method and unwraps its `{ok, result}` envelope.
    async fn call<B, T>(&self, method: &str, body: &B, timeout: Option<Duration>) -> PortResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.client.post(self.method_url(method)).json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        // The URL embeds the token, so reqwest errors are reported without it.
        let response = request
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("{} request failed: {}", method, e.without_url())))?;
        let status = response.status();
        let envelope = response
            .json::<ApiResponse<T>>()
            .await
            .map_err(|e| PortError::Unexpected(format!("{} returned malformed JSON: {}", method, e.without_url())))?;

        if !envelope.ok {
            let description = envelope.description.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => PortError::Unauthorized,
                404 => PortError::NotFound(method.to_string()),
                _ => PortError::Unexpected(format!("{} failed ({}): {}", method, status, description)),
            });
        }
        envelope
            .result
            .ok_or_else(|| PortError::Unexpected(format!("{} returned no result", method)))
    }

    /// Long-polls for updates after `offset`, waiting up to `poll_timeout`.
    pub async fn get_updates(&self, offset: Option<i64>, poll_timeout: Duration) -> PortResult<Vec<Update>> {
        let body = json!({
            "offset": offset,
            "timeout": poll_timeout.as_secs(),
            "allowed_updates": ["message", "callback_query"],
        });
        // Leave headroom over the server-side wait so the request is not cut short.
        self.call("getUpdates", &body, Some(poll_timeout + Duration::from_secs(10)))
            .await
    }

    /// Stops the loading indicator on the pressed inline button.
    pub async fn answer_callback_query(&self, callback_query_id: &str) -> PortResult<()> {
        let body = json!({ "callback_query_id": callback_query_id });
        self.call::<_, bool>("answerCallbackQuery", &body, None).await?;
        Ok(())
    }

    pub async fn set_webhook(&self, url: &str, secret_token: Option<&SecretString>) -> PortResult<()> {
        let body = json!({
            "url": url,
            "secret_token": secret_token.map(|secret| secret.expose_secret().as_str()),
            "allowed_updates": ["message", "callback_query"],
        });
        self.call::<_, bool>("setWebhook", &body, None).await?;
        Ok(())
    }

    /// Telegram refuses `getUpdates` while a webhook is registered.
    pub async fn delete_webhook(&self) -> PortResult<()> {
        self.call::<_, bool>("deleteWebhook", &json!({}), None).await?;
        Ok(())
    }
}

//=========================================================================================
// `Messenger` Trait Implementation
//=========================================================================================

#[async_trait]
impl Messenger for TelegramAdapter {
    async fn send(&self, chat: ChatId, message: OutboundMessage) -> PortResult<()> {
        let request = send_message_request(chat, message);
        self.call::<_, serde_json::Value>("sendMessage", &request, None)
            .await?;
        Ok(())
    }
}

fn send_message_request(chat: ChatId, message: OutboundMessage) -> SendMessageRequest {
    SendMessageRequest {
        chat_id: chat.0,
        text: message.text,
        parse_mode: match message.format {
            MessageFormat::Plain => None,
            MessageFormat::Html => Some("HTML".to_string()),
        },
        reply_markup: message
            .keyboard
            .as_deref()
            .map(InlineKeyboardMarkup::single_column),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_bot_core::domain::KeyboardButton;

    #[test]
    fn method_url_embeds_token() {
        let adapter = TelegramAdapter::new(
            Client::new(),
            "https://api.telegram.org/".to_string(),
            SecretString::new("123:abc".to_string()),
        );

        assert_eq!(
            adapter.method_url("sendMessage"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn html_messages_set_parse_mode() {
        let request = send_message_request(ChatId(5), OutboundMessage::html("<b>hi</b>"));
        let body = serde_json::to_value(request).unwrap();

        assert_eq!(body, json!({"chat_id": 5, "text": "<b>hi</b>", "parse_mode": "HTML"}));
    }

    #[test]
    fn plain_messages_with_keyboard_omit_parse_mode() {
        let message = OutboundMessage::plain("pick").with_keyboard(vec![KeyboardButton {
            label: "NDA".to_string(),
            selector: "nda".to_string(),
        }]);
        let body = serde_json::to_value(send_message_request(ChatId(5), message)).unwrap();

        assert!(body.get("parse_mode").is_none());
        assert_eq!(
            body["reply_markup"],
            json!({"inline_keyboard": [[{"text": "NDA", "callback_data": "nda"}]]})
        );
    }
}
