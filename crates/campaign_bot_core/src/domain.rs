//! crates/campaign_bot_core/src/domain.rs
//!
//! Defines the pure, core data structures for the bot.
//! Nothing here knows about Telegram or the tracker's HTTP API.

use std::fmt;

/// Placeholder shown when the tracker returns an offer without a name.
pub const UNKNOWN_OFFER_NAME: &str = "Unknown Offer";

//=========================================================================================
// Identities
//=========================================================================================

/// Stable identifier of a chat-platform user. Key for all per-user state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// The chat a reply should be delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//=========================================================================================
// Domain Errors
//=========================================================================================

/// Input that cannot be turned into a domain value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("Unknown campaign type selector: {0}")]
    UnknownCampaignType(String),
    #[error("Offer id must be a non-negative integer, got '{0}'")]
    InvalidOfferId(String),
}

//=========================================================================================
// Campaign Type
//=========================================================================================

/// The two kinds of campaign an operator can provision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CampaignType {
    Nda,
    FirstCpa,
}

impl CampaignType {
    pub const ALL: [CampaignType; 2] = [CampaignType::Nda, CampaignType::FirstCpa];

    /// The callback payload carried by the inline keyboard button.
    pub fn selector(self) -> &'static str {
        match self {
            CampaignType::Nda => "nda",
            CampaignType::FirstCpa => "firstcpa",
        }
    }

    /// Human-facing button label.
    pub fn label(self) -> &'static str {
        match self {
            CampaignType::Nda => "NDA",
            CampaignType::FirstCpa => "FirstCPA",
        }
    }

    /// Tracker domain the campaign is attached to.
    pub fn domain_id(self) -> i64 {
        match self {
            CampaignType::Nda => 23,
            CampaignType::FirstCpa => 21,
        }
    }

    pub fn from_selector(selector: &str) -> Result<Self, DomainError> {
        match selector {
            "nda" => Ok(CampaignType::Nda),
            "firstcpa" => Ok(CampaignType::FirstCpa),
            other => Err(DomainError::UnknownCampaignType(other.to_string())),
        }
    }
}

//=========================================================================================
// Offer Id
//=========================================================================================

/// A validated offer id. Keeps the digits as typed for names and aliases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferId {
    text: String,
    value: u64,
}

impl OfferId {
    /// Accepts only a non-empty run of ASCII digits (surrounding whitespace ignored).
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let text = input.trim();
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::InvalidOfferId(input.to_string()));
        }
        let value = text
            .parse::<u64>()
            .map_err(|_| DomainError::InvalidOfferId(input.to_string()))?;
        Ok(Self {
            text: text.to_string(),
            value,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn value(&self) -> u64 {
        self.value
    }
}

impl fmt::Display for OfferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

//=========================================================================================
// Session and Conversation State
//=========================================================================================

/// The in-progress conversation record for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub campaign_type: CampaignType,
}

/// Where a user stands in the conversation. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    Locked,
    Idle,
    AwaitingOfferId(CampaignType),
}

//=========================================================================================
// Campaign Request and Provisioning Result
//=========================================================================================

/// Everything derived from the user's choices that the tracker calls need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignRequest {
    pub campaign_type: CampaignType,
    pub offer_id: OfferId,
    pub name: String,
    pub alias: String,
    pub domain_id: i64,
}

impl CampaignRequest {
    pub fn new(campaign_type: CampaignType, offer_id: OfferId) -> Self {
        let name = format!(
            "{}-{}",
            campaign_type.selector().to_uppercase(),
            offer_id.as_str()
        );
        let alias = format!("test_link_{}", offer_id.as_str());
        Self {
            campaign_type,
            domain_id: campaign_type.domain_id(),
            offer_id,
            name,
            alias,
        }
    }
}

/// Outcome of one successful provisioning run. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningResult {
    pub campaign_id: i64,
    pub campaign_name: String,
    pub campaign_domain: String,
    pub test_link: String,
    pub offer_name: String,
}

//=========================================================================================
// Inbound Events and Outbound Messages
//=========================================================================================

/// What the user did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Start,
    Text(String),
    Action(String),
}

/// One event received from the messaging platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub user: UserId,
    pub chat: ChatId,
    pub kind: EventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFormat {
    Plain,
    Html,
}

/// An inline keyboard button; `selector` comes back as an `EventKind::Action`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardButton {
    pub label: String,
    pub selector: String,
}

/// A reply to deliver to a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    pub format: MessageFormat,
    /// One button per row when present.
    pub keyboard: Option<Vec<KeyboardButton>>,
}

impl OutboundMessage {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: MessageFormat::Plain,
            keyboard: None,
        }
    }

    pub fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: MessageFormat::Html,
            keyboard: None,
        }
    }

    pub fn with_keyboard(mut self, buttons: Vec<KeyboardButton>) -> Self {
        self.keyboard = Some(buttons);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nda_request_uses_domain_23() {
        let request = CampaignRequest::new(CampaignType::Nda, OfferId::parse("500").unwrap());
        assert_eq!(request.domain_id, 23);
        assert_eq!(request.name, "NDA-500");
        assert_eq!(request.alias, "test_link_500");
    }

    #[test]
    fn first_cpa_request_uses_domain_21() {
        let request = CampaignRequest::new(CampaignType::FirstCpa, OfferId::parse("7").unwrap());
        assert_eq!(request.domain_id, 21);
        assert_eq!(request.name, "FIRSTCPA-7");
        assert_eq!(request.alias, "test_link_7");
    }

    #[test]
    fn offer_id_rejects_non_digits() {
        for input in ["", "   ", "abc", "12a", "-5", "1.5", "+3", "1 2"] {
            assert!(OfferId::parse(input).is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn offer_id_trims_and_keeps_leading_zeros() {
        let id = OfferId::parse("  007 ").unwrap();
        assert_eq!(id.as_str(), "007");
        assert_eq!(id.value(), 7);
    }

    #[test]
    fn offer_id_rejects_overflow() {
        assert!(OfferId::parse("99999999999999999999999").is_err());
    }

    #[test]
    fn selectors_map_both_ways() {
        for campaign_type in CampaignType::ALL {
            assert_eq!(
                CampaignType::from_selector(campaign_type.selector()),
                Ok(campaign_type)
            );
        }
        assert!(CampaignType::from_selector("other").is_err());
    }
}
