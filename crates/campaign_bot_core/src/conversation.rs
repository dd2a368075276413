//! crates/campaign_bot_core/src/conversation.rs
//!
//! The per-user conversation state machine. Each inbound event is matched
//! against the user's derived `ConversationState` and produces replies, session
//! changes or a provisioning run.
//!
//! The engine does not order events itself: callers must hand it one event at a
//! time per user, in arrival order.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::access::AccessGate;
use crate::domain::{
    CampaignRequest, CampaignType, ChatId, ConversationState, EventKind, InboundEvent,
    KeyboardButton, OfferId, OutboundMessage, ProvisioningResult, Session, UserId,
};
use crate::ports::{Messenger, PortResult};
use crate::provisioning::Provisioner;
use crate::session_store::SessionStore;

pub const PASSWORD_PROMPT: &str = "🔑 Please enter the access password:";
pub const MENU_PROMPT: &str = "🔹 Select a campaign type:";
pub const ACCESS_GRANTED: &str = "✅ Access granted! You can now create campaigns.";
pub const WRONG_PASSWORD: &str = "❌ Incorrect password. Please try again.";
pub const PASSWORD_FIRST: &str = "❌ Please enter the access password first.";
pub const OFFER_ID_PROMPT: &str = "✍ Enter the Offer ID:";
pub const CAMPAIGN_TYPE_FIRST: &str = "❌ Please select a campaign type first.";
pub const INVALID_OFFER_ID: &str = "❌ Invalid Offer ID. Please enter a numeric value.";
pub const PROVISIONING_FAILED: &str = "❌ Error creating campaign or stream.";
pub const PROVISIONING_DONE: &str = "✅ Campaign and stream created!";

/// Presentation details used in the success replies.
#[derive(Debug, Clone)]
pub struct ReplySettings {
    /// Base URL of the tracker's admin UI, used to link the new campaign.
    pub tracker_admin_url: String,
    /// Name of the group where postback notifications arrive.
    pub results_group: String,
}

/// Drives conversations for all users.
pub struct ConversationEngine {
    gate: AccessGate,
    sessions: SessionStore,
    provisioner: Provisioner,
    messenger: Arc<dyn Messenger>,
    replies: ReplySettings,
}

impl ConversationEngine {
    pub fn new(
        gate: AccessGate,
        sessions: SessionStore,
        provisioner: Provisioner,
        messenger: Arc<dyn Messenger>,
        replies: ReplySettings,
    ) -> Self {
        Self {
            gate,
            sessions,
            provisioner,
            messenger,
            replies,
        }
    }

    /// Current state of `user`, derived from the gate and the session store.
    pub fn state_of(&self, user: UserId) -> ConversationState {
        if !self.gate.is_authorized(user) {
            return ConversationState::Locked;
        }
        match self.sessions.get(user) {
            Some(session) => ConversationState::AwaitingOfferId(session.campaign_type),
            None => ConversationState::Idle,
        }
    }

    /// Handles one event. Only delivery failures surface as errors; everything
    /// else is answered in the chat.
    pub async fn handle(&self, event: InboundEvent) -> PortResult<()> {
        let state = self.state_of(event.user);
        let InboundEvent { user, chat, kind } = event;

        match (state, kind) {
            (ConversationState::Locked, EventKind::Start) => {
                self.reply(chat, OutboundMessage::plain(PASSWORD_PROMPT)).await
            }
            (ConversationState::Locked, EventKind::Text(text)) => {
                if self.gate.try_authorize(user, &text) {
                    self.reply(chat, OutboundMessage::plain(ACCESS_GRANTED)).await?;
                    self.reply(chat, menu()).await
                } else {
                    warn!("Rejected password attempt from user {}.", user);
                    self.reply(chat, OutboundMessage::plain(WRONG_PASSWORD)).await
                }
            }
            (ConversationState::Locked, EventKind::Action(_)) => {
                warn!("User {} pressed a button before authorizing.", user);
                self.reply(chat, OutboundMessage::plain(PASSWORD_FIRST)).await
            }
            (_, EventKind::Start) => self.reply(chat, menu()).await,
            (_, EventKind::Action(selector)) => {
                self.select_campaign_type(user, chat, &selector).await
            }
            (ConversationState::Idle, EventKind::Text(_)) => {
                self.reply(chat, OutboundMessage::plain(CAMPAIGN_TYPE_FIRST)).await?;
                self.reply(chat, menu()).await
            }
            (ConversationState::AwaitingOfferId(campaign_type), EventKind::Text(text)) => {
                self.receive_offer_id(user, chat, campaign_type, &text).await
            }
        }
    }

    async fn select_campaign_type(
        &self,
        user: UserId,
        chat: ChatId,
        selector: &str,
    ) -> PortResult<()> {
        let campaign_type = match CampaignType::from_selector(selector) {
            Ok(campaign_type) => campaign_type,
            Err(e) => {
                warn!("Ignoring action from user {}: {}", user, e);
                return Ok(());
            }
        };
        info!("User {} selected campaign type {}.", user, campaign_type.label());
        self.sessions.put(user, Session { campaign_type });
        self.reply(chat, OutboundMessage::plain(OFFER_ID_PROMPT)).await
    }

    async fn receive_offer_id(
        &self,
        user: UserId,
        chat: ChatId,
        campaign_type: CampaignType,
        text: &str,
    ) -> PortResult<()> {
        let offer_id = match OfferId::parse(text) {
            Ok(offer_id) => offer_id,
            Err(e) => {
                warn!("User {} sent an invalid offer id: {}", user, e);
                return self.reply(chat, OutboundMessage::plain(INVALID_OFFER_ID)).await;
            }
        };

        let request = CampaignRequest::new(campaign_type, offer_id);
        info!("Provisioning {} for user {}.", request.name, user);

        match self.provisioner.provision(&request).await {
            Ok(result) => {
                info!(
                    "Provisioned campaign {} ({}) for user {}.",
                    result.campaign_id, result.campaign_name, user
                );
                self.sessions.remove(user);
                for message in self.success_messages(&result) {
                    self.reply(chat, message).await?;
                }
                Ok(())
            }
            Err(e) => {
                // The session stays so the user can retry with another offer id.
                error!("Provisioning {} failed: {}", request.name, e);
                self.reply(chat, OutboundMessage::plain(PROVISIONING_FAILED)).await
            }
        }
    }

    fn success_messages(&self, result: &ProvisioningResult) -> Vec<OutboundMessage> {
        let admin_url = self.replies.tracker_admin_url.trim_end_matches('/');
        vec![
            OutboundMessage::plain(PROVISIONING_DONE),
            OutboundMessage::html(format!(
                "📌 <b>Campaign:</b> <a href=\"{}/admin/#!/campaigns/{}\">{}</a>\n📌 <b>Offer:</b> <code>{}</code>",
                escape_html(admin_url),
                result.campaign_id,
                escape_html(&result.campaign_name),
                escape_html(&result.offer_name)
            )),
            OutboundMessage::html(format!(
                "🔗 <b>Link for test</b>: {}",
                escape_html(&result.test_link)
            )),
            OutboundMessage::html(format!(
                "⏳📩 Waiting for test results in the group: <code>{}</code>",
                escape_html(&self.replies.results_group)
            )),
        ]
    }

    async fn reply(&self, chat: ChatId, message: OutboundMessage) -> PortResult<()> {
        self.messenger.send(chat, message).await
    }
}

/// The campaign-type keyboard.
pub fn menu() -> OutboundMessage {
    OutboundMessage::plain(MENU_PROMPT).with_keyboard(
        CampaignType::ALL
            .iter()
            .map(|campaign_type| KeyboardButton {
                label: campaign_type.label().to_string(),
                selector: campaign_type.selector().to_string(),
            })
            .collect(),
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
