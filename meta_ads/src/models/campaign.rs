use serde::{Deserialize, Serialize};

/// Payload for creating a campaign on an ad account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignSpec {
    pub name: String,
    /// e.g. `OUTCOME_AWARENESS`.
    pub objective: String,
    /// `PAUSED` or `ACTIVE`.
    pub status: String,
    /// `RESERVED` for reach & frequency buying, `AUCTION` otherwise.
    pub buying_type: String,
    pub special_ad_categories: Vec<String>,
}

impl CampaignSpec {
    /// Campaign with no special ad category, the platform's `["NONE"]` marker.
    pub fn new(name: &str, objective: &str, buying_type: &str, status: &str) -> Self {
        Self {
            name: name.to_string(),
            objective: objective.to_string(),
            status: status.to_uppercase(),
            buying_type: buying_type.to_string(),
            special_ad_categories: vec!["NONE".to_string()],
        }
    }
}
