//! crates/campaign_bot_core/src/provisioning.rs
//!
//! The provisioning run: offer lookup, campaign creation, stream creation and
//! test link assembly, in that order. Any failing step aborts the rest. Nothing
//! already created on the tracker is rolled back.

use std::sync::Arc;

use tracing::{error, info};

use crate::domain::{CampaignRequest, ProvisioningResult, UNKNOWN_OFFER_NAME};
use crate::ports::{PortError, TrackingApi};
use crate::tracking::{NewCampaign, NewStream};

/// Fixed inputs of every campaign, taken from configuration.
#[derive(Debug, Clone)]
pub struct ProvisioningSettings {
    pub group_id: i64,
    pub traffic_source_id: i64,
    /// Template the tracker calls on lead and sale events.
    pub postback_url: String,
}

/// Which step of a run failed.
#[derive(Debug, thiserror::Error)]
pub enum ProvisioningError {
    #[error("Offer lookup failed: {0}")]
    OfferLookup(#[source] PortError),
    #[error("Campaign creation failed: {0}")]
    CampaignCreation(#[source] PortError),
    #[error("Campaign response is missing '{0}'")]
    MissingCampaignField(&'static str),
    #[error("Stream creation failed: {0}")]
    StreamCreation(#[source] PortError),
}

/// Builds the notification URL the tracker fires on postbacks.
///
/// The braced placeholders are left for the tracker to substitute; `%0A` is a
/// pre-encoded newline in the message text.
pub fn postback_url(api_base: &str, bot_token: &str, chat_id: &str) -> String {
    format!(
        "{}/bot{}/sendMessage?chat_id={}&text=📌 New Postback!%0AStatus: {{status}}%0ACampaign: {{campaign_id}} - {{campaign_name}}%0AOffer: {{offer_id}} - {{offer_name}}",
        api_base.trim_end_matches('/'),
        bot_token,
        chat_id
    )
}

/// Sequences the tracker calls for one campaign. Holds no state between runs.
pub struct Provisioner {
    tracking: Arc<dyn TrackingApi>,
    settings: ProvisioningSettings,
}

impl Provisioner {
    pub fn new(tracking: Arc<dyn TrackingApi>, settings: ProvisioningSettings) -> Self {
        Self { tracking, settings }
    }

    pub async fn provision(
        &self,
        request: &CampaignRequest,
    ) -> Result<ProvisioningResult, ProvisioningError> {
        // 1. Offer lookup
        let offer = self
            .tracking
            .get_offer(request.offer_id.value())
            .await
            .map_err(ProvisioningError::OfferLookup)?;
        let offer_name = offer
            .name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| UNKNOWN_OFFER_NAME.to_string());

        // 2. Campaign creation
        let campaign = NewCampaign::from_request(
            request,
            self.settings.group_id,
            self.settings.traffic_source_id,
            &self.settings.postback_url,
        );
        let record = self
            .tracking
            .create_campaign(&campaign)
            .await
            .map_err(ProvisioningError::CampaignCreation)?;
        let campaign_id = record
            .id
            .ok_or(ProvisioningError::MissingCampaignField("id"))?;
        let campaign_domain = record
            .domain
            .filter(|domain| !domain.is_empty())
            .ok_or(ProvisioningError::MissingCampaignField("domain"))?;
        info!("Campaign {} created with id {}.", request.name, campaign_id);

        // 3. Stream creation
        let stream = NewStream::for_campaign(campaign_id, request);
        if let Err(e) = self.tracking.create_stream(&stream).await {
            error!(
                "Stream creation failed; campaign {} is left without a stream.",
                campaign_id
            );
            return Err(ProvisioningError::StreamCreation(e));
        }

        // 4. Link assembly
        let test_link = format!("{}{}", campaign_domain, request.alias);

        Ok(ProvisioningResult {
            campaign_id,
            campaign_name: request.name.clone(),
            campaign_domain,
            test_link,
            offer_name,
        })
    }
}
