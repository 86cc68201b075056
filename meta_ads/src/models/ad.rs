use serde::{Deserialize, Serialize};

use crate::models::ids::{AdSetId, CreativeId};

/// Request body for `POST /{account}/ads`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdSpec {
    pub name: String,
    pub adset_id: AdSetId,
    pub creative: AdCreativeRef,
    pub status: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdCreativeRef {
    pub creative_id: CreativeId,
}

impl AdSpec {
    pub fn new(name: &str, adset_id: AdSetId, creative_id: CreativeId, status: &str) -> Self {
        Self {
            name: name.to_string(),
            adset_id,
            creative: AdCreativeRef { creative_id },
            status: status.trim().to_uppercase(),
        }
    }
}
