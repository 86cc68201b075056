//! Fixed-rate pacing in front of any [`AdPlatform`].
//!
//! The platform throttles bursts of create calls per ad account. Pacing is
//! advisory: it only spaces calls out, it never retries or drops one.

use std::{num::NonZeroU32, path::Path, time::Duration};

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;

use crate::{
    models::{
        ad::AdSpec,
        adset::{AdSetRecord, AdSetSpec},
        campaign::CampaignSpec,
        creative::CreativeSpec,
        ids::{
            AdId, AdSetId, CampaignId, CreativeId, ImageHash, PredictionId, ReservationId, VideoId,
        },
        prediction::{PredictionSpec, PredictionStatus},
        video::VideoStatus,
    },
    providers::{AdPlatform, ProviderError},
};

const BURST: NonZeroU32 = nonzero!(1u32);

/// Wraps a platform so that consecutive calls are at least `period` apart.
pub struct PacedPlatform<P> {
    inner: P,
    limiter: Option<DefaultDirectRateLimiter>,
}

impl<P: AdPlatform> PacedPlatform<P> {
    /// A zero `period` disables pacing entirely.
    pub fn new(inner: P, period: Duration) -> Self {
        let limiter = Quota::with_period(period)
            .map(|quota| RateLimiter::direct(quota.allow_burst(BURST)));
        Self { inner, limiter }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn is_paced(&self) -> bool {
        self.limiter.is_some()
    }

    async fn pace(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

#[async_trait]
impl<P: AdPlatform> AdPlatform for PacedPlatform<P> {
    async fn create_campaign(&self, spec: &CampaignSpec) -> Result<CampaignId, ProviderError> {
        self.pace().await;
        self.inner.create_campaign(spec).await
    }

    async fn create_prediction(
        &self,
        spec: &PredictionSpec,
    ) -> Result<PredictionId, ProviderError> {
        self.pace().await;
        self.inner.create_prediction(spec).await
    }

    async fn prediction_status(
        &self,
        id: &PredictionId,
    ) -> Result<PredictionStatus, ProviderError> {
        self.pace().await;
        self.inner.prediction_status(id).await
    }

    async fn reserve_prediction(
        &self,
        id: &PredictionId,
    ) -> Result<ReservationId, ProviderError> {
        self.pace().await;
        self.inner.reserve_prediction(id).await
    }

    async fn create_ad_set(&self, spec: &AdSetSpec) -> Result<AdSetId, ProviderError> {
        self.pace().await;
        self.inner.create_ad_set(spec).await
    }

    async fn fetch_ad_set(&self, id: &AdSetId) -> Result<AdSetRecord, ProviderError> {
        self.pace().await;
        self.inner.fetch_ad_set(id).await
    }

    async fn upload_image(&self, bytes: &[u8]) -> Result<ImageHash, ProviderError> {
        self.pace().await;
        self.inner.upload_image(bytes).await
    }

    async fn upload_video(&self, path: &Path) -> Result<VideoId, ProviderError> {
        self.pace().await;
        self.inner.upload_video(path).await
    }

    async fn video_status(&self, id: &VideoId) -> Result<VideoStatus, ProviderError> {
        self.pace().await;
        self.inner.video_status(id).await
    }

    async fn create_creative(&self, spec: &CreativeSpec) -> Result<CreativeId, ProviderError> {
        self.pace().await;
        self.inner.create_creative(spec).await
    }

    async fn create_ad(&self, spec: &AdSpec) -> Result<AdId, ProviderError> {
        self.pace().await;
        self.inner.create_ad(spec).await
    }
}
