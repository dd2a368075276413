//! crates/campaign_bot_core/src/tracking.rs
//!
//! Typed payloads exchanged with the tracking platform. Field names follow the
//! tracker's JSON API; fixed values live in the constructors.

use serde::{Deserialize, Serialize};

use crate::domain::CampaignRequest;

//=========================================================================================
// Responses
//=========================================================================================

/// Offer metadata returned by `GET /offers/{id}`. Only the name is used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Offer {
    #[serde(default)]
    pub name: Option<String>,
}

/// The part of `POST /campaigns` response the bot needs. Both fields are
/// optional here and checked by the orchestrator.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CampaignRecord {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub domain: Option<String>,
}

//=========================================================================================
// Campaign Creation
//=========================================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CampaignParameter {
    pub name: String,
    pub placeholder: String,
    pub alias: String,
}

impl CampaignParameter {
    fn web(name: &str, alias: &str) -> Self {
        Self {
            name: name.to_string(),
            placeholder: "web".to_string(),
            alias: alias.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignParameters {
    pub sub_id_2: CampaignParameter,
    pub sub_id_30: CampaignParameter,
}

/// A status subscription the tracker fires as a GET to `url`.
#[derive(Debug, Clone, Serialize)]
pub struct Postback {
    pub method: String,
    pub statuses: Vec<String>,
    pub url: String,
}

impl Postback {
    fn get(status: &str, url: &str) -> Self {
        Self {
            method: "GET".to_string(),
            statuses: vec![status.to_string()],
            url: url.to_string(),
        }
    }
}

/// Body of `POST /campaigns`.
#[derive(Debug, Clone, Serialize)]
pub struct NewCampaign {
    pub alias: String,
    #[serde(rename = "type")]
    pub campaign_type: String,
    pub name: String,
    pub cookies_ttl: u32,
    pub state: String,
    pub cost_type: String,
    pub cost_value: u32,
    pub cost_currency: String,
    pub cost_auto: bool,
    pub group_id: i64,
    pub bind_visitors: String,
    pub traffic_source_id: i64,
    pub parameters: CampaignParameters,
    pub domain_id: i64,
    pub postbacks: Vec<Postback>,
    pub notes: String,
}

impl NewCampaign {
    pub fn from_request(
        request: &CampaignRequest,
        group_id: i64,
        traffic_source_id: i64,
        postback_url: &str,
    ) -> Self {
        Self {
            alias: request.alias.clone(),
            campaign_type: "position".to_string(),
            name: request.name.clone(),
            cookies_ttl: 24,
            state: "active".to_string(),
            cost_type: "CPC".to_string(),
            cost_value: 0,
            cost_currency: "USD".to_string(),
            cost_auto: false,
            group_id,
            bind_visitors: "none".to_string(),
            traffic_source_id,
            parameters: CampaignParameters {
                sub_id_2: CampaignParameter::web("sub2", "sub_id_2"),
                sub_id_30: CampaignParameter::web("sub30", "sub_id_30"),
            },
            domain_id: request.domain_id,
            postbacks: vec![
                Postback::get("lead", postback_url),
                Postback::get("sale", postback_url),
            ],
            notes: "Campaign created via Telegram bot".to_string(),
        }
    }
}

//=========================================================================================
// Stream Creation
//=========================================================================================

#[derive(Debug, Clone, Serialize)]
pub struct StreamOffer {
    pub offer_id: u64,
    pub share: u32,
    pub state: String,
}

/// Element type of the stream lists the bot always sends empty.
#[derive(Debug, Clone, Serialize)]
pub struct EmptyEntry {}

/// Body of `POST /streams`. Filters, triggers and landings are always empty.
#[derive(Debug, Clone, Serialize)]
pub struct NewStream {
    pub campaign_id: i64,
    #[serde(rename = "type")]
    pub stream_type: String,
    pub name: String,
    pub position: u32,
    pub weight: u32,
    pub state: String,
    pub action_type: String,
    pub schema: String,
    pub collect_clicks: bool,
    pub filter_or: bool,
    pub filters: Vec<EmptyEntry>,
    pub triggers: Vec<EmptyEntry>,
    pub landings: Vec<EmptyEntry>,
    pub offers: Vec<StreamOffer>,
}

impl NewStream {
    pub fn for_campaign(campaign_id: i64, request: &CampaignRequest) -> Self {
        Self {
            campaign_id,
            stream_type: "regular".to_string(),
            name: format!("Stream-{}", request.offer_id),
            position: 0,
            weight: 0,
            state: "active".to_string(),
            action_type: "http".to_string(),
            schema: "landings".to_string(),
            collect_clicks: true,
            filter_or: false,
            filters: Vec::new(),
            triggers: Vec::new(),
            landings: Vec::new(),
            offers: vec![StreamOffer {
                offer_id: request.offer_id.value(),
                share: 100,
                state: "active".to_string(),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CampaignType, OfferId};
    use serde_json::json;

    fn request() -> CampaignRequest {
        CampaignRequest::new(CampaignType::Nda, OfferId::parse("500").unwrap())
    }

    #[test]
    fn campaign_body_carries_fixed_tracking_fields() {
        let body = serde_json::to_value(NewCampaign::from_request(
            &request(),
            4,
            9,
            "https://notify.example/hook",
        ))
        .unwrap();

        assert_eq!(body["type"], "position");
        assert_eq!(body["name"], "NDA-500");
        assert_eq!(body["alias"], "test_link_500");
        assert_eq!(body["domain_id"], 23);
        assert_eq!(body["group_id"], 4);
        assert_eq!(body["traffic_source_id"], 9);
        assert_eq!(body["cookies_ttl"], 24);
        assert_eq!(body["cost_type"], "CPC");
        assert_eq!(body["cost_value"], 0);
        assert_eq!(body["cost_currency"], "USD");
        assert_eq!(body["bind_visitors"], "none");
        assert_eq!(
            body["parameters"]["sub_id_30"],
            json!({"name": "sub30", "placeholder": "web", "alias": "sub_id_30"})
        );
        assert_eq!(
            body["postbacks"],
            json!([
                {"method": "GET", "statuses": ["lead"], "url": "https://notify.example/hook"},
                {"method": "GET", "statuses": ["sale"], "url": "https://notify.example/hook"}
            ])
        );
    }

    #[test]
    fn stream_body_routes_all_traffic_to_the_offer() {
        let body = serde_json::to_value(NewStream::for_campaign(77, &request())).unwrap();

        assert_eq!(body["campaign_id"], 77);
        assert_eq!(body["type"], "regular");
        assert_eq!(body["name"], "Stream-500");
        assert_eq!(body["action_type"], "http");
        assert_eq!(body["schema"], "landings");
        assert_eq!(body["collect_clicks"], true);
        assert_eq!(body["filter_or"], false);
        assert_eq!(body["filters"], json!([]));
        assert_eq!(body["triggers"], json!([]));
        assert_eq!(body["landings"], json!([]));
        assert_eq!(
            body["offers"],
            json!([{"offer_id": 500, "share": 100, "state": "active"}])
        );
    }

    #[test]
    fn campaign_record_tolerates_missing_fields() {
        let record: CampaignRecord = serde_json::from_value(json!({"name": "x"})).unwrap();
        assert!(record.id.is_none());
        assert!(record.domain.is_none());
    }
}
