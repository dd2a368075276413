//! services/bot/src/adapters/keitaro.rs
//!
//! This module contains the adapter for the Keitaro tracker admin API.
//! It implements the `TrackingApi` port from the `core` crate.

use async_trait::async_trait;
use campaign_bot_core::ports::{PortError, PortResult, TrackingApi};
use campaign_bot_core::tracking::{CampaignRecord, NewCampaign, NewStream, Offer};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::debug;

const API_KEY_HEADER: &str = "Api-Key";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `TrackingApi` over HTTP with an API-key header.
#[derive(Clone)]
pub struct KeitaroAdapter {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

impl KeitaroAdapter {
    /// Creates a new `KeitaroAdapter`. `base_url` is the admin API root,
    /// e.g. `https://tracker.example/admin_api/v1`.
    pub fn new(client: Client, base_url: String, api_key: SecretString) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(API_KEY_HEADER, self.api_key.expose_secret().as_str())
    }

    async fn send(&self, request: RequestBuilder) -> PortResult<Response> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        check_status(response).await
    }
}

/// Maps non-success statuses onto `PortError`.
async fn check_status(response: Response) -> PortResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::NOT_FOUND => Err(PortError::NotFound(url)),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(PortError::Unauthorized),
        _ => Err(PortError::Unexpected(format!(
            "{} returned {}: {}",
            url, status, body
        ))),
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> PortResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| PortError::Unexpected(format!("Malformed tracker response: {}", e)))
}

//=========================================================================================
// `TrackingApi` Trait Implementation
//=========================================================================================

#[async_trait]
impl TrackingApi for KeitaroAdapter {
    async fn get_offer(&self, offer_id: u64) -> PortResult<Offer> {
        debug!("Fetching offer {}.", offer_id);
        let response = self
            .send(self.client.get(self.url(&format!("offers/{}", offer_id))))
            .await?;
        read_json(response).await
    }

    async fn create_campaign(&self, campaign: &NewCampaign) -> PortResult<CampaignRecord> {
        debug!("Creating campaign {}.", campaign.name);
        let response = self
            .send(self.client.post(self.url("campaigns")).json(campaign))
            .await?;
        read_json(response).await
    }

    async fn create_stream(&self, stream: &NewStream) -> PortResult<()> {
        debug!("Creating stream for campaign {}.", stream.campaign_id);
        self.send(self.client.post(self.url("streams")).json(stream))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_ignored() {
        let adapter = KeitaroAdapter::new(
            Client::new(),
            "https://tracker.example/admin_api/v1/".to_string(),
            SecretString::new("key".to_string()),
        );

        assert_eq!(
            adapter.url("offers/5"),
            "https://tracker.example/admin_api/v1/offers/5"
        );
    }

    #[test]
    fn requests_carry_the_api_key_header() {
        let adapter = KeitaroAdapter::new(
            Client::new(),
            "https://tracker.example".to_string(),
            SecretString::new("key-123".to_string()),
        );

        let request = adapter
            .authorized(adapter.client.get(adapter.url("campaigns")))
            .build()
            .unwrap();

        assert_eq!(request.headers()[API_KEY_HEADER], "key-123");
    }
}
