//! Reach & frequency prediction protocol: submit, poll, reserve.
//!
//! Polling is a fixed-attempt budget, not a wait-until-done loop: after
//! [`PollPolicy::max_attempts`] status checks that all came back pending the
//! row is abandoned. A failed status or an unreadable status ends polling
//! immediately. Nothing in here retries a submission or a reservation.

use std::time::Duration;

use meta_ads::{
    models::{
        ids::{CampaignId, PageId, PredictionId, ReservationId},
        prediction::{Prediction, PredictionCreativeSpec, PredictionSpec, PredictionStatus},
        targeting::TargetSpec,
    },
    providers::AdPlatform,
};
use tracing::{debug, info, warn};

use crate::{
    config::PredictionCfg,
    error::{CascadeError, Stage},
    rows::{AdsetRow, CampaignRow},
    schedule::ScheduleInterval,
};

const OPTIMIZATION_GOAL: &str = "REACH";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    /// Status checks before giving up; at least one is always made.
    pub max_attempts: u32,
    /// Sleep after each check that observed a pending status.
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(6, Duration::from_secs(10))
    }
}

impl PollPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }
}

/// Everything a prediction needs that does not come from the platform.
pub struct PredictionInput<'a> {
    pub campaign_id: &'a CampaignId,
    pub campaign: &'a CampaignRow,
    pub adset: &'a AdsetRow,
    pub schedule: &'a ScheduleInterval,
    pub page: &'a PageId,
    pub target_spec: TargetSpec,
}

#[derive(Clone, Debug)]
pub struct InventoryPredictor {
    policy: PollPolicy,
    reset_period_hours: u32,
    story_event_type: u32,
}

impl InventoryPredictor {
    pub fn new(policy: PollPolicy, cfg: &PredictionCfg) -> Self {
        Self {
            policy,
            reset_period_hours: cfg.frequency_cap_reset_hours,
            story_event_type: cfg.story_event_type,
        }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    pub fn build_spec(&self, input: PredictionInput<'_>) -> PredictionSpec {
        PredictionSpec {
            campaign_id: input.campaign_id.clone(),
            objective: input.campaign.objective.clone(),
            optimization_goal: OPTIMIZATION_GOAL.to_string(),
            start_time: input.schedule.start_unix(),
            end_time: input.schedule.end_unix(),
            budget: input.adset.budget,
            buying_type: input.campaign.buy_type.clone(),
            frequency_cap: input.adset.frequency_cap,
            interval_frequency_cap_reset_period: self.reset_period_hours,
            prediction_mode: input.adset.prediction_mode,
            destination_id: input.page.clone(),
            story_event_type: self.story_event_type,
            creative_spec: PredictionCreativeSpec {
                page_id: input.page.clone(),
            },
            target_spec: input.target_spec,
        }
    }

    pub async fn submit<P>(
        &self,
        platform: &P,
        spec: &PredictionSpec,
    ) -> Result<PredictionId, CascadeError>
    where
        P: AdPlatform + ?Sized,
    {
        let id = platform
            .create_prediction(spec)
            .await
            .map_err(|e| CascadeError::submission(Stage::Prediction, e))?;
        info!(prediction_id = %id, "prediction submitted");
        Ok(id)
    }

    /// Poll the prediction submitted for `spec` until it succeeds.
    pub async fn poll<P>(
        &self,
        platform: &P,
        id: &PredictionId,
        spec: &PredictionSpec,
    ) -> Result<Prediction, CascadeError>
    where
        P: AdPlatform + ?Sized,
    {
        for attempt in 1..=self.policy.max_attempts {
            let status = platform.prediction_status(id).await.map_err(|e| {
                CascadeError::PredictionFailed {
                    prediction_id: id.clone(),
                    reason: format!("status check failed: {e}"),
                }
            })?;
            debug!(prediction_id = %id, attempt, %status, "prediction status");

            match status {
                PredictionStatus::Success => {
                    return Ok(Prediction::new(id.clone(), status, spec.target_spec.clone()));
                }
                PredictionStatus::Pending => {
                    if attempt < self.policy.max_attempts && !self.policy.interval.is_zero() {
                        tokio::time::sleep(self.policy.interval).await;
                    }
                }
                failed @ PredictionStatus::Failed(_) => {
                    warn!(prediction_id = %id, status = %failed, "prediction failed");
                    return Err(CascadeError::prediction_failed(id, failed));
                }
            }
        }

        warn!(prediction_id = %id, attempts = self.policy.max_attempts, "prediction still pending");
        Err(CascadeError::PredictionPendingTimeout {
            prediction_id: id.clone(),
            attempts: self.policy.max_attempts,
        })
    }

    /// Submit then poll.
    pub async fn predict<P>(
        &self,
        platform: &P,
        spec: &PredictionSpec,
    ) -> Result<Prediction, CascadeError>
    where
        P: AdPlatform + ?Sized,
    {
        let id = self.submit(platform, spec).await?;
        self.poll(platform, &id, spec).await
    }
}

/// Commits a successful prediction exactly once.
#[derive(Clone, Copy, Debug, Default)]
pub struct InventoryReserver;

impl InventoryReserver {
    pub async fn reserve<P>(
        &self,
        platform: &P,
        prediction: &Prediction,
    ) -> Result<ReservationId, CascadeError>
    where
        P: AdPlatform + ?Sized,
    {
        let id = &prediction.id;
        if !prediction.is_reservable() {
            return Err(CascadeError::Reservation {
                prediction_id: id.clone(),
                message: format!("status is {}", prediction.status),
            });
        }
        let reservation = platform
            .reserve_prediction(id)
            .await
            .map_err(|e| CascadeError::Reservation {
                prediction_id: id.clone(),
                message: e.to_string(),
            })?;
        if reservation.as_str().trim().is_empty() {
            return Err(CascadeError::Reservation {
                prediction_id: id.clone(),
                message: "platform returned no reservation id".into(),
            });
        }
        info!(prediction_id = %id, reservation_id = %reservation, "prediction reserved");
        Ok(reservation)
    }
}
