pub mod access;
pub mod conversation;
pub mod domain;
pub mod ports;
pub mod provisioning;
pub mod session_store;
pub mod tracking;

pub use access::AccessGate;
pub use conversation::{ConversationEngine, ReplySettings};
pub use domain::{
    CampaignRequest, CampaignType, ChatId, ConversationState, EventKind, InboundEvent,
    KeyboardButton, MessageFormat, OfferId, OutboundMessage, ProvisioningResult, Session, UserId,
};
pub use ports::{Messenger, PortError, PortResult, TrackingApi};
pub use provisioning::{postback_url, Provisioner, ProvisioningError, ProvisioningSettings};
pub use session_store::SessionStore;
