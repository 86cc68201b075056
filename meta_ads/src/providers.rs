//! Ad platform abstraction.
//!
//! This module defines the [`AdPlatform`] trait, the capability surface the
//! campaign cascade needs from the advertising platform: create a campaign,
//! submit/poll/reserve a reach & frequency prediction, create an ad set,
//! upload media, create a creative and create an ad.
//!
//! The concrete Graph API client lives in [`graph_rest`]; [`paced`] wraps any
//! implementation with a fixed-rate pacing policy. Tests substitute an
//! in-memory implementation, which is why the trait is object-safe and
//! `Send + Sync`.
//!
//! # Example
//!
//! ```rust
//! use meta_ads::providers::{AdPlatform, graph_rest::GraphApiProvider};
//!
//! fn boxed(p: GraphApiProvider) -> Box<dyn AdPlatform> {
//!     Box::new(p)
//! }
//! ```

pub mod graph_rest;
pub mod paced;

use std::path::Path;

use async_trait::async_trait;
use shared_utils::env::MissingEnvVarError;
use snafu::{Backtrace, Snafu};

use crate::models::{
    ad::AdSpec,
    adset::{AdSetRecord, AdSetSpec},
    campaign::CampaignSpec,
    creative::CreativeSpec,
    ids::{
        AdId, AdSetId, CampaignId, CreativeId, ImageHash, PredictionId, ReservationId, VideoId,
    },
    prediction::{PredictionSpec, PredictionStatus},
    video::VideoStatus,
};

/// Capability set of the ad platform consumed by the cascade.
///
/// Every call is a single platform request (video upload excepted, see
/// [`AdPlatform::upload_video`]); implementations must not retry create calls,
/// since a retried create can duplicate entities on the platform side.
#[async_trait]
pub trait AdPlatform: Send + Sync {
    async fn create_campaign(&self, spec: &CampaignSpec) -> Result<CampaignId, ProviderError>;

    async fn create_prediction(&self, spec: &PredictionSpec)
    -> Result<PredictionId, ProviderError>;

    async fn prediction_status(&self, id: &PredictionId)
    -> Result<PredictionStatus, ProviderError>;

    /// Reserves a successful prediction. Reserving twice is rejected by the platform.
    async fn reserve_prediction(&self, id: &PredictionId)
    -> Result<ReservationId, ProviderError>;

    async fn create_ad_set(&self, spec: &AdSetSpec) -> Result<AdSetId, ProviderError>;

    /// Reads an ad set back, including the targeting the platform stored.
    async fn fetch_ad_set(&self, id: &AdSetId) -> Result<AdSetRecord, ProviderError>;

    /// Uploads raw image bytes and returns the content hash.
    async fn upload_image(&self, bytes: &[u8]) -> Result<ImageHash, ProviderError>;

    /// Uploads a video file and returns once the platform has finished encoding it.
    ///
    /// The wait is unbounded; callers that need a bound wrap the future in a timeout.
    async fn upload_video(&self, path: &Path) -> Result<VideoId, ProviderError>;

    async fn video_status(&self, id: &VideoId) -> Result<VideoStatus, ProviderError>;

    async fn create_creative(&self, spec: &CreativeSpec) -> Result<CreativeId, ProviderError>;

    async fn create_ad(&self, spec: &AdSpec) -> Result<AdId, ProviderError>;
}

/// Errors that can occur during the creation of a provider instance
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// missed environment variable.
    #[snafu(display("Missing environment variable: {source}"), context(false))]
    MissingEnvVar {
        source: MissingEnvVarError,
        backtrace: Backtrace,
    },

    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"), context(false))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// Access token contains characters that cannot go into a header.
    #[snafu(display("Invalid access token format: {source}"), context(false))]
    InvalidAccessToken {
        source: reqwest::header::InvalidHeaderValue,
        backtrace: Backtrace,
    },
}

/// Errors that can occur within an `AdPlatform` implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// An error during an API request (e.g., network failure, timeout).
    #[snafu(display("API request failed: {source}"), context(false))]
    Reqwest {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The platform rejected the request; `message` is its error text verbatim.
    #[snafu(display("{message}"))]
    Api {
        message: String,
        backtrace: Backtrace,
    },

    /// The request parameters were invalid before anything was sent.
    #[snafu(display("Invalid parameters for provider: {message}"))]
    Validation {
        message: String,
        backtrace: Backtrace,
    },

    /// The platform answered, but not in a shape we understand.
    #[snafu(display("Internal provider error: {message}"))]
    Internal {
        message: String,
        backtrace: Backtrace,
    },

    /// Reading a local media file failed.
    #[snafu(display("Failed to read {path}: {source}"))]
    Io {
        path: String,
        source: std::io::Error,
        backtrace: Backtrace,
    },

    /// An error during provider configuration or initialization.
    #[snafu(display("Provider initialization error: {source}"), context(false))]
    Init {
        #[snafu(backtrace)]
        source: ProviderInitError,
    },
}
