use serde::{Deserialize, Serialize};

use crate::models::{
    ids::{AdSetId, CampaignId, ReservationId},
    targeting::TargetSpec,
};

/// Request body for `POST /{account}/adsets` on a reservation-backed campaign.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdSetSpec {
    pub name: String,
    pub campaign_id: CampaignId,
    pub billing_event: String,
    pub optimization_goal: String,
    /// The *reservation* id, not the prediction id.
    pub rf_prediction_id: ReservationId,
    pub targeting: TargetSpec,
    pub status: String,
}

impl AdSetSpec {
    pub fn reach(
        name: &str,
        campaign_id: CampaignId,
        reservation: ReservationId,
        targeting: TargetSpec,
    ) -> Self {
        Self {
            name: name.to_string(),
            campaign_id,
            billing_event: "IMPRESSIONS".to_string(),
            optimization_goal: "REACH".to_string(),
            rf_prediction_id: reservation,
            targeting,
            status: "PAUSED".to_string(),
        }
    }
}

/// An ad set as read back from the platform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdSetRecord {
    pub id: AdSetId,
    #[serde(default)]
    pub name: Option<String>,
    pub targeting: TargetSpec,
}
