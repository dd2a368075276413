//! crates/campaign_bot_core/src/ports.rs
//!
//! Defines the service contracts (traits) the conversation core depends on.
//! The tracker's HTTP API and the chat platform sit behind these traits, so the
//! core never sees a transport.

use async_trait::async_trait;

use crate::domain::{ChatId, OutboundMessage};
use crate::tracking::{CampaignRecord, NewCampaign, NewStream, Offer};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g. HTTP, JSON).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The calls the provisioning flow makes against the tracking platform.
#[async_trait]
pub trait TrackingApi: Send + Sync {
    /// `GET /offers/{offer_id}`
    async fn get_offer(&self, offer_id: u64) -> PortResult<Offer>;

    /// `POST /campaigns`
    async fn create_campaign(&self, campaign: &NewCampaign) -> PortResult<CampaignRecord>;

    /// `POST /streams`. Only the success status matters.
    async fn create_stream(&self, stream: &NewStream) -> PortResult<()>;
}

#[async_trait]
pub trait Messenger: Send + Sync {
    /// Delivers one reply to a chat.
    async fn send(&self, chat: ChatId, message: OutboundMessage) -> PortResult<()>;
}
