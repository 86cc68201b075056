//! Reach & frequency prediction payloads and status codes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{
    ids::{CampaignId, PageId, PredictionId},
    targeting::TargetSpec,
};

/// Request body for `POST /{account}/reachfrequencypredictions`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionSpec {
    pub campaign_id: CampaignId,
    pub objective: String,
    /// Always `REACH` for reservation-backed ad sets.
    pub optimization_goal: String,
    /// Unix seconds.
    pub start_time: i64,
    /// Unix seconds.
    pub end_time: i64,
    /// Budget in the account's currency minor units.
    pub budget: u64,
    pub buying_type: String,
    pub frequency_cap: u32,
    /// Hours after which the frequency cap resets.
    pub interval_frequency_cap_reset_period: u32,
    pub prediction_mode: u32,
    pub destination_id: PageId,
    pub story_event_type: u32,
    pub creative_spec: PredictionCreativeSpec,
    pub target_spec: TargetSpec,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionCreativeSpec {
    pub page_id: PageId,
}

/// Body of the reserve action on the predictions edge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReserveRequest<'a> {
    pub action: &'static str,
    pub rf_prediction_id: &'a PredictionId,
}

impl<'a> ReserveRequest<'a> {
    pub fn new(prediction_id: &'a PredictionId) -> Self {
        Self {
            action: "reserve",
            rf_prediction_id: prediction_id,
        }
    }
}

/// Lifecycle state of a prediction as reported by the platform.
///
/// The platform reports an integer: `1` is success, `2` is still pending,
/// anything else is a terminal failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PredictionStatus {
    Success,
    Pending,
    Failed(i64),
}

impl PredictionStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Success,
            2 => Self::Pending,
            other => Self::Failed(other),
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for PredictionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Pending => write!(f, "PENDING"),
            Self::Failed(3) => write!(
                f,
                "FAILED (3: audience cannot be reached, reduce budget or broaden targeting)"
            ),
            Self::Failed(4) => write!(f, "FAILED (4: invalid parameters)"),
            Self::Failed(17) => write!(f, "FAILED (17: generic failure)"),
            Self::Failed(code) => write!(f, "FAILED ({code})"),
        }
    }
}

/// A prediction together with the last status observed for it.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    pub id: PredictionId,
    pub status: PredictionStatus,
    /// Targeting the forecast was computed for; ad set targeting starts from it.
    pub target_spec: TargetSpec,
}

impl Prediction {
    pub fn new(id: PredictionId, status: PredictionStatus, target_spec: TargetSpec) -> Self {
        Self {
            id,
            status,
            target_spec,
        }
    }

    pub fn is_reservable(&self) -> bool {
        self.status == PredictionStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_states() {
        assert_eq!(PredictionStatus::from_code(1), PredictionStatus::Success);
        assert_eq!(PredictionStatus::from_code(2), PredictionStatus::Pending);
        assert_eq!(PredictionStatus::from_code(17), PredictionStatus::Failed(17));
        assert!(!PredictionStatus::Pending.is_terminal());
        assert!(PredictionStatus::Failed(3).is_terminal());
    }

    #[test]
    fn only_successful_predictions_are_reservable() {
        let ok = Prediction::new("1".into(), PredictionStatus::Success, TargetSpec::default());
        assert!(ok.is_reservable());
        let pending = Prediction {
            status: PredictionStatus::Pending,
            ..ok.clone()
        };
        assert!(!pending.is_reservable());
    }

    #[test]
    fn reserve_request_wire_shape() {
        let id = PredictionId::new("6100");
        let body = serde_json::to_value(ReserveRequest::new(&id)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"action": "reserve", "rf_prediction_id": "6100"})
        );
    }
}
