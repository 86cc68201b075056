#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet, VecDeque},
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};

use ad_cascade::{
    config::CascadeConfig,
    ledger::ResultLedger,
    plan::BatchPlan,
    rows::RowSource,
};
use async_trait::async_trait;
use meta_ads::{
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
    providers::{AdPlatform, ApiSnafu, ProviderError},
};

/// Every call the cascade made, in order.
#[derive(Clone, Debug)]
pub enum Call {
    CreateCampaign(CampaignSpec),
    CreatePrediction(PredictionSpec),
    PredictionStatus(PredictionId),
    Reserve(PredictionId),
    CreateAdSet(AdSetSpec),
    FetchAdSet(AdSetId),
    UploadImage(usize),
    UploadVideo(PathBuf),
    VideoStatus(VideoId),
    CreateCreative(CreativeSpec),
    CreateAd(AdSpec),
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    next_id: u64,
    failing_campaigns: HashSet<String>,
    failing_ads: HashSet<String>,
    failing_adsets: HashSet<String>,
    fail_predictions: bool,
    fail_reservations: bool,
    /// Budgets whose predictions are rejected on submission.
    failing_budgets: HashSet<u64>,
    /// Predictions whose reservation is rejected.
    unreservable: HashSet<PredictionId>,
    unreservable_budgets: HashSet<u64>,
    /// Consumed across all predictions; an empty queue reports success.
    statuses: VecDeque<Result<PredictionStatus, String>>,
    adsets: HashMap<AdSetId, AdSetSpec>,
    /// Geo exclusions the fake "forgets" when storing an ad set.
    drop_exclusions: bool,
    video_delay: Option<Duration>,
}

/// Scripted in-memory platform.
#[derive(Default)]
pub struct FakePlatform {
    state: Mutex<State>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_campaign(self, name: &str) -> Self {
        self.state.lock().unwrap().failing_campaigns.insert(name.to_string());
        self
    }

    pub fn fail_ad(self, name: &str) -> Self {
        self.state.lock().unwrap().failing_ads.insert(name.to_string());
        self
    }

    pub fn fail_adset(self, name: &str) -> Self {
        self.state.lock().unwrap().failing_adsets.insert(name.to_string());
        self
    }

    /// Reject prediction submissions for ad sets with this budget.
    pub fn fail_predictions_for_budget(self, budget: u64) -> Self {
        self.state.lock().unwrap().failing_budgets.insert(budget);
        self
    }

    /// Reject reservations of predictions submitted with this budget.
    pub fn fail_reservations_for_budget(self, budget: u64) -> Self {
        self.state.lock().unwrap().unreservable_budgets.insert(budget);
        self
    }

    pub fn fail_predictions(self) -> Self {
        self.state.lock().unwrap().fail_predictions = true;
        self
    }

    pub fn fail_reservations(self) -> Self {
        self.state.lock().unwrap().fail_reservations = true;
        self
    }

    pub fn drop_exclusions(self) -> Self {
        self.state.lock().unwrap().drop_exclusions = true;
        self
    }

    pub fn slow_video(self, delay: Duration) -> Self {
        self.state.lock().unwrap().video_delay = Some(delay);
        self
    }

    pub fn script_statuses<I>(self, statuses: I) -> Self
    where
        I: IntoIterator<Item = PredictionStatus>,
    {
        self.state
            .lock()
            .unwrap()
            .statuses
            .extend(statuses.into_iter().map(Ok));
        self
    }

    pub fn script_status_error(self, message: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .statuses
            .push_back(Err(message.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn campaign_names(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::CreateCampaign(spec) => Some(spec.name),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) -> u64 {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state.next_id += 1;
        state.next_id
    }
}

fn rejected(message: &str) -> ProviderError {
    ApiSnafu {
        message: message.to_string(),
    }
    .build()
}

#[async_trait]
impl AdPlatform for FakePlatform {
    async fn create_campaign(&self, spec: &CampaignSpec) -> Result<CampaignId, ProviderError> {
        let n = self.record(Call::CreateCampaign(spec.clone()));
        if self.state.lock().unwrap().failing_campaigns.contains(&spec.name) {
            return Err(rejected("Invalid parameter (code 100, subcode 1885183)"));
        }
        Ok(CampaignId::new(format!("c{n}")))
    }

    async fn create_prediction(
        &self,
        spec: &PredictionSpec,
    ) -> Result<PredictionId, ProviderError> {
        let n = self.record(Call::CreatePrediction(spec.clone()));
        let mut state = self.state.lock().unwrap();
        if state.fail_predictions || state.failing_budgets.contains(&spec.budget) {
            return Err(rejected("Budget too low (code 2641)"));
        }
        let id = PredictionId::new(format!("p{n}"));
        if state.unreservable_budgets.contains(&spec.budget) {
            state.unreservable.insert(id.clone());
        }
        Ok(id)
    }

    async fn prediction_status(
        &self,
        id: &PredictionId,
    ) -> Result<PredictionStatus, ProviderError> {
        self.record(Call::PredictionStatus(id.clone()));
        match self.state.lock().unwrap().statuses.pop_front() {
            None => Ok(PredictionStatus::Success),
            Some(Ok(status)) => Ok(status),
            Some(Err(message)) => Err(rejected(&message)),
        }
    }

    async fn reserve_prediction(&self, id: &PredictionId) -> Result<ReservationId, ProviderError> {
        let n = self.record(Call::Reserve(id.clone()));
        let state = self.state.lock().unwrap();
        if state.fail_reservations || state.unreservable.contains(id) {
            return Err(rejected("Prediction already reserved"));
        }
        Ok(ReservationId::new(format!("r{n}")))
    }

    async fn create_ad_set(&self, spec: &AdSetSpec) -> Result<AdSetId, ProviderError> {
        let n = self.record(Call::CreateAdSet(spec.clone()));
        let mut state = self.state.lock().unwrap();
        if state.failing_adsets.contains(&spec.name) {
            return Err(rejected("Invalid parameter (code 100)"));
        }
        let id = AdSetId::new(format!("s{n}"));
        state.adsets.insert(id.clone(), spec.clone());
        Ok(id)
    }

    async fn fetch_ad_set(&self, id: &AdSetId) -> Result<AdSetRecord, ProviderError> {
        self.record(Call::FetchAdSet(id.clone()));
        let state = self.state.lock().unwrap();
        let spec = state
            .adsets
            .get(id)
            .ok_or_else(|| rejected("Unsupported get request"))?;
        let mut targeting = spec.targeting.clone();
        if state.drop_exclusions {
            targeting.geo_locations.excluded_geo_locations = None;
        }
        Ok(AdSetRecord {
            id: id.clone(),
            name: Some(spec.name.clone()),
            targeting,
        })
    }

    async fn upload_image(&self, bytes: &[u8]) -> Result<ImageHash, ProviderError> {
        let n = self.record(Call::UploadImage(bytes.len()));
        Ok(ImageHash::new(format!("h{n}")))
    }

    async fn upload_video(&self, path: &Path) -> Result<VideoId, ProviderError> {
        let n = self.record(Call::UploadVideo(path.to_path_buf()));
        let delay = self.state.lock().unwrap().video_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(VideoId::new(format!("v{n}")))
    }

    async fn video_status(&self, id: &VideoId) -> Result<VideoStatus, ProviderError> {
        self.record(Call::VideoStatus(id.clone()));
        Ok(VideoStatus::Ready)
    }

    async fn create_creative(&self, spec: &CreativeSpec) -> Result<CreativeId, ProviderError> {
        let n = self.record(Call::CreateCreative(spec.clone()));
        Ok(CreativeId::new(format!("cr{n}")))
    }

    async fn create_ad(&self, spec: &AdSpec) -> Result<AdId, ProviderError> {
        let n = self.record(Call::CreateAd(spec.clone()));
        if self.state.lock().unwrap().failing_ads.contains(&spec.name) {
            return Err(rejected("Ad creative is not approved"));
        }
        Ok(AdId::new(format!("a{n}")))
    }
}

pub const HEADER: &str = "campaign_name,objective,buy_type,campaign_status,adset_name,adset_budget_amount,frequency_cap,prediction_mode,start_date,end_date,fbpage,country,exclude_states,exclude_cities,age_min,age_max,device,ad_name,ad_status,ad_format,link,creative_link,primary_text,headline,description,call_to_action";

/// One CSV line for the common header.
pub fn row(campaign: &str, adset: &str, ad: &str, format: &str, start: &str, end: &str) -> String {
    format!(
        "{campaign},OUTCOME_AWARENESS,RESERVED,PAUSED,{adset},500000,2,1,{start},{end},pg_42,IN,\"['Kerala']\",\"['Pune', 'Nagpur']\",18,45,ALL,{ad},ACTIVE,{format},https://example.com,,Buy now,Fresh,Deals,learn_more"
    )
}

pub fn csv(lines: &[String]) -> String {
    let mut out = String::from(HEADER);
    for line in lines {
        out.push('\n');
        out.push_str(line);
    }
    out.push('\n');
    out
}

/// Media directory holding the default image, video and thumbnail.
pub fn media_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("sampleimage.png"), b"\x89PNG fake").unwrap();
    std::fs::write(dir.path().join("sampleVideo.mp4"), b"fake mp4").unwrap();
    dir
}

/// Defaults with no sleeping and media from `media`.
pub fn config(media: &Path) -> CascadeConfig {
    let mut cfg = CascadeConfig::default();
    cfg.polling.interval_secs = 0;
    cfg.creative.media_dir = media.to_path_buf();
    cfg
}

pub fn load(text: &str) -> (BatchPlan, ResultLedger) {
    let (headers, records) = RowSource::from_reader(text.as_bytes()).unwrap().into_parts();
    let ledger = ResultLedger::new(headers, records);
    let plan = BatchPlan::build(ledger.records()).unwrap();
    (plan, ledger)
}
