use std::{path::Path, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Response, header, multipart};
use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, de::DeserializeOwned};
use shared_utils::env::{get_env_var, get_optional_env_var};
use snafu::ResultExt;
use tracing::{debug, warn};

use crate::{
    models::{
        ad::AdSpec,
        adset::{AdSetRecord, AdSetSpec},
        campaign::CampaignSpec,
        creative::CreativeSpec,
        ids::{
            AccountId, AdId, AdSetId, CampaignId, CreativeId, ImageHash, PredictionId,
            ReservationId, VideoId,
        },
        prediction::{PredictionSpec, PredictionStatus, ReserveRequest},
        search::{GeoLocationHit, InterestHit, LocationType},
        video::VideoStatus,
    },
    providers::{
        AdPlatform, ApiSnafu, InternalSnafu, IoSnafu, ProviderError, ProviderInitError,
        graph_rest::{
            params::{
                ADSET_FIELDS, STATUS_FIELDS, geo_search_query, image_upload_form,
                interest_search_query,
            },
            response::{
                GraphErrorEnvelope, IdResponse, ImageUploadResponse, PredictionStatusResponse,
                SearchResponse, VideoStatusResponse,
            },
        },
    },
};

pub const DEFAULT_API_VERSION: &str = "v23.0";
const GRAPH_HOST: &str = "https://graph.facebook.com";
const DEFAULT_VIDEO_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Graph API client scoped to one ad account.
pub struct GraphApiProvider {
    client: Client,
    base_url: String,
    account: AccountId,
    _access_token: SecretString,
    video_poll_interval: Duration,
}

impl GraphApiProvider {
    /// Creates a provider that authenticates every request with `access_token`.
    pub fn new(
        access_token: SecretString,
        account: AccountId,
        api_version: &str,
    ) -> Result<Self, ProviderInitError> {
        let mut auth =
            header::HeaderValue::from_str(&format!("Bearer {}", access_token.expose_secret()))?;
        auth.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: format!("{GRAPH_HOST}/{}", api_version.trim_matches('/')),
            account,
            _access_token: access_token,
            video_poll_interval: DEFAULT_VIDEO_POLL_INTERVAL,
        })
    }

    /// Creates a provider from the environment.
    ///
    /// Reads `FB_ACCESS_TOKEN` and `FB_AD_ACCOUNT_ID` (normalized to its
    /// `act_` form), and optionally `FB_GRAPH_API_VERSION`.
    pub fn from_env() -> Result<Self, ProviderInitError> {
        let token = SecretString::new(get_env_var("FB_ACCESS_TOKEN")?.into());
        let account = AccountId::new(&get_env_var("FB_AD_ACCOUNT_ID")?);
        let version =
            get_optional_env_var("FB_GRAPH_API_VERSION").unwrap_or(DEFAULT_API_VERSION.into());
        Self::new(token, account, &version)
    }

    /// Points the client at a different host, e.g. a recording proxy.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Interval between encoding-status checks while a video upload is processing.
    pub fn with_video_poll_interval(mut self, interval: Duration) -> Self {
        self.video_poll_interval = interval;
        self
    }

    fn account_edge(&self, edge: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.account, edge)
    }

    fn node(&self, id: &str) -> String {
        format!("{}/{}", self.base_url, id)
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<IdResponse, ProviderError> {
        let response = self.client.post(url).json(body).send().await?;
        decode(response).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let response = self.client.get(url).query(query).send().await?;
        decode(response).await
    }

    /// Looks up geo-location keys by name (regions, cities, countries).
    pub async fn search_geo_locations(
        &self,
        q: &str,
        location_type: LocationType,
        country_code: Option<&str>,
    ) -> Result<Vec<GeoLocationHit>, ProviderError> {
        let url = format!("{}/search", self.base_url);
        let query = geo_search_query(q, location_type, country_code);
        let response: SearchResponse<GeoLocationHit> = self.get_json(&url, &query).await?;
        Ok(response.data)
    }

    /// Looks up interest ids matching a keyword.
    pub async fn search_interests(
        &self,
        q: &str,
        limit: u32,
    ) -> Result<Vec<InterestHit>, ProviderError> {
        let url = format!("{}/search", self.base_url);
        let response: SearchResponse<InterestHit> =
            self.get_json(&url, &interest_search_query(q, limit)).await?;
        Ok(response.data)
    }
}

/// Turns a Graph response into `T`, mapping error envelopes to [`ProviderError::Api`].
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown API error".to_string());
        let message = match serde_json::from_str::<GraphErrorEnvelope>(&body) {
            Ok(envelope) => {
                debug!(
                    fbtrace_id = ?envelope.error.fbtrace_id,
                    kind = ?envelope.error.kind,
                    "graph error"
                );
                envelope.error.describe()
            }
            Err(_) => format!("HTTP {status}: {body}"),
        };
        return ApiSnafu { message }.fail();
    }
    Ok(response.json::<T>().await?)
}

fn require_id(response: IdResponse, what: &str) -> Result<String, ProviderError> {
    match response.id {
        Some(id) if !id.is_empty() => Ok(id),
        _ => InternalSnafu {
            message: format!("{what} returned no id"),
        }
        .fail(),
    }
}

#[async_trait]
impl AdPlatform for GraphApiProvider {
    async fn create_campaign(&self, spec: &CampaignSpec) -> Result<CampaignId, ProviderError> {
        let response = self.post_json(&self.account_edge("campaigns"), spec).await?;
        Ok(require_id(response, "campaign creation")?.into())
    }

    async fn create_prediction(
        &self,
        spec: &PredictionSpec,
    ) -> Result<PredictionId, ProviderError> {
        let url = self.account_edge("reachfrequencypredictions");
        let response = self.post_json(&url, spec).await?;
        Ok(require_id(response, "prediction request")?.into())
    }

    async fn prediction_status(
        &self,
        id: &PredictionId,
    ) -> Result<PredictionStatus, ProviderError> {
        let response: PredictionStatusResponse = self
            .get_json(&self.node(id.as_str()), &[("fields", STATUS_FIELDS.into())])
            .await?;
        Ok(PredictionStatus::from_code(response.status))
    }

    async fn reserve_prediction(
        &self,
        id: &PredictionId,
    ) -> Result<ReservationId, ProviderError> {
        let url = self.account_edge("reachfrequencypredictions");
        let response = self.post_json(&url, &ReserveRequest::new(id)).await?;
        Ok(require_id(response, "reservation")?.into())
    }

    async fn create_ad_set(&self, spec: &AdSetSpec) -> Result<AdSetId, ProviderError> {
        let response = self.post_json(&self.account_edge("adsets"), spec).await?;
        Ok(require_id(response, "ad set creation")?.into())
    }

    async fn fetch_ad_set(&self, id: &AdSetId) -> Result<AdSetRecord, ProviderError> {
        self.get_json(&self.node(id.as_str()), &[("fields", ADSET_FIELDS.into())])
            .await
    }

    async fn upload_image(&self, bytes: &[u8]) -> Result<ImageHash, ProviderError> {
        let response = self
            .client
            .post(self.account_edge("adimages"))
            .form(&image_upload_form(bytes))
            .send()
            .await?;
        let uploaded: ImageUploadResponse = decode(response).await?;
        match uploaded.images.into_iter().next() {
            Some((_, image)) => Ok(ImageHash::new(image.hash)),
            None => InternalSnafu {
                message: "image upload returned no hash",
            }
            .fail(),
        }
    }

    async fn upload_video(&self, path: &Path) -> Result<VideoId, ProviderError> {
        let data = tokio::fs::read(path).await.context(IoSnafu {
            path: path.display().to_string(),
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video.mp4".to_string());
        let form = multipart::Form::new()
            .part("source", multipart::Part::bytes(data).file_name(file_name));

        let response = self
            .client
            .post(self.account_edge("advideos"))
            .multipart(form)
            .send()
            .await?;
        let id = VideoId::new(require_id(decode(response).await?, "video upload")?);
        debug!(video_id = %id, "video uploaded, waiting for encoding");

        loop {
            match self.video_status(&id).await? {
                VideoStatus::Ready => return Ok(id),
                VideoStatus::Error(message) => {
                    warn!(video_id = %id, %message, "video encoding failed");
                    return ApiSnafu { message }.fail();
                }
                VideoStatus::Processing => tokio::time::sleep(self.video_poll_interval).await,
            }
        }
    }

    async fn video_status(&self, id: &VideoId) -> Result<VideoStatus, ProviderError> {
        let response: VideoStatusResponse = self
            .get_json(&self.node(id.as_str()), &[("fields", STATUS_FIELDS.into())])
            .await?;
        debug!(
            video_id = %id,
            progress = ?response.status.processing_progress,
            state = %response.status.video_status,
            "video status"
        );
        Ok(VideoStatus::from_platform(&response.status.video_status, None))
    }

    async fn create_creative(&self, spec: &CreativeSpec) -> Result<CreativeId, ProviderError> {
        let response = self.post_json(&self.account_edge("adcreatives"), spec).await?;
        Ok(require_id(response, "creative creation")?.into())
    }

    async fn create_ad(&self, spec: &AdSpec) -> Result<AdId, ProviderError> {
        let response = self.post_json(&self.account_edge("ads"), spec).await?;
        Ok(require_id(response, "ad creation")?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> GraphApiProvider {
        GraphApiProvider::new(
            SecretString::new("token".into()),
            AccountId::new("12345"),
            DEFAULT_API_VERSION,
        )
        .unwrap()
    }

    #[test]
    fn edges_are_account_scoped() {
        let p = provider();
        assert_eq!(
            p.account_edge("campaigns"),
            "https://graph.facebook.com/v23.0/act_12345/campaigns"
        );
        assert_eq!(p.node("6100"), "https://graph.facebook.com/v23.0/6100");
    }

    #[test]
    fn base_url_override_drops_trailing_slash() {
        let p = provider().with_base_url("http://127.0.0.1:9000/v23.0/");
        assert_eq!(p.node("1"), "http://127.0.0.1:9000/v23.0/1");
    }

    #[test]
    fn empty_id_is_rejected() {
        let err = require_id(IdResponse { id: Some(String::new()) }, "reservation").unwrap_err();
        assert!(err.to_string().contains("reservation returned no id"));
    }
}
