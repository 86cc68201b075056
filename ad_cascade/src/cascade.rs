//! The campaign -> adset -> ad cascade.
//!
//! Each level only runs when its parent produced an id. A failure is written
//! to the ledger rows of the node that failed and the loop moves on to the
//! next sibling; nothing aborts the batch and nothing is retried. All calls
//! are awaited one after another: children need their parent's id, and the
//! one outstanding reservation covers one ad set at a time.

use std::fmt;

use meta_ads::{
    models::{
        ad::AdSpec,
        adset::AdSetSpec,
        campaign::CampaignSpec,
        ids::{AdId, AdSetId, CampaignId, PageId},
        targeting::TargetSpec,
    },
    providers::AdPlatform,
};
use tracing::{Instrument, info, info_span, warn};

use crate::{
    config::CascadeConfig,
    creative::CreativeUploader,
    error::{CascadeError, ConfigError, Stage},
    ledger::ResultLedger,
    plan::{AdNode, AdsetNode, BatchPlan, CampaignNode},
    prediction::{InventoryPredictor, InventoryReserver, PredictionInput},
    rows::{AdRow, AdsetRow, CampaignRow},
    schedule::DateRangeNormalizer,
    targeting::{TargetingBuilder, same_exclusions},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LevelCounts {
    pub succeeded: usize,
    pub failed: usize,
    /// Never attempted because an ancestor failed.
    pub skipped: usize,
}

impl fmt::Display for LevelCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ok, {} failed, {} skipped",
            self.succeeded, self.failed, self.skipped
        )
    }
}

/// Per-level tallies of one run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub campaigns: LevelCounts,
    pub adsets: LevelCounts,
    pub ads: LevelCounts,
}

impl CascadeReport {
    pub fn has_failures(&self) -> bool {
        self.campaigns.failed + self.adsets.failed + self.ads.failed > 0
    }
}

impl fmt::Display for CascadeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "campaigns: {}; adsets: {}; ads: {}",
            self.campaigns, self.adsets, self.ads
        )
    }
}

pub struct BatchCascadeOrchestrator<P> {
    platform: P,
    normalizer: DateRangeNormalizer,
    targeting: TargetingBuilder,
    predictor: InventoryPredictor,
    reserver: InventoryReserver,
    creatives: CreativeUploader,
    page: PageId,
    entity_status: String,
    ad_status: String,
    verify_exclusions: bool,
}

impl<P: AdPlatform> BatchCascadeOrchestrator<P> {
    /// `page` is the destination page for creatives and the fallback for
    /// ad set rows without an `fbpage`.
    pub fn new(platform: P, config: &CascadeConfig, page: PageId) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            platform,
            normalizer: DateRangeNormalizer::new(
                config.schedule.tz()?,
                config.schedule.dst_policy,
            ),
            targeting: TargetingBuilder::new(config.prediction.clone()),
            predictor: InventoryPredictor::new(config.polling.policy(), &config.prediction),
            reserver: InventoryReserver,
            creatives: CreativeUploader::new(page.clone(), &config.creative),
            page,
            entity_status: config.campaign.default_status.trim().to_uppercase(),
            ad_status: config.creative.ad_status.clone(),
            verify_exclusions: config.prediction.verify_exclusions,
        })
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub async fn run(&self, plan: &BatchPlan, ledger: &mut ResultLedger) -> CascadeReport {
        let mut report = CascadeReport::default();

        for campaign in plan.campaigns() {
            let record = &ledger.records()[campaign.record];
            let span = info_span!("campaign", name = record.get("campaign_name"));
            self.run_campaign(plan, campaign, ledger, &mut report)
                .instrument(span)
                .await;
        }

        info!(%report, "cascade finished");
        report
    }

    async fn run_campaign(
        &self,
        plan: &BatchPlan,
        campaign: &CampaignNode,
        ledger: &mut ResultLedger,
        report: &mut CascadeReport,
    ) {
        let created = match CampaignRow::from_record(&ledger.records()[campaign.record]) {
            Ok(row) => self.create_campaign(&row).await.map(|id| (row, id)),
            Err(e) => Err(e),
        };

        let (row, campaign_id) = match created {
            Ok(ok) => ok,
            Err(e) => {
                warn!(error = %e, "campaign failed, skipping its ad sets");
                ledger.campaign_failed(&campaign.rows, &e);
                report.campaigns.failed += 1;
                for adset in plan.adsets_of(campaign.key) {
                    report.adsets.skipped += 1;
                    report.ads.skipped += adset.ads.len();
                }
                return;
            }
        };
        ledger.campaign_created(&campaign.rows, &campaign_id);
        report.campaigns.succeeded += 1;

        for adset in plan.adsets_of(campaign.key) {
            let record = &ledger.records()[adset.record];
            let span = info_span!("adset", name = record.get("adset_name"));
            self.run_adset(plan, adset, &row, &campaign_id, ledger, report)
                .instrument(span)
                .await;
        }
    }

    async fn create_campaign(&self, row: &CampaignRow) -> Result<CampaignId, CascadeError> {
        let status = row.status.as_deref().unwrap_or(&self.entity_status);
        let spec = CampaignSpec::new(&row.name, &row.objective, &row.buy_type, status);
        let id = self
            .platform
            .create_campaign(&spec)
            .await
            .map_err(|e| CascadeError::submission(Stage::Campaign, e))?;
        info!(campaign_id = %id, "campaign created");
        Ok(id)
    }

    async fn run_adset(
        &self,
        plan: &BatchPlan,
        adset: &AdsetNode,
        campaign: &CampaignRow,
        campaign_id: &CampaignId,
        ledger: &mut ResultLedger,
        report: &mut CascadeReport,
    ) {
        let adset_id = match self.create_adset(adset, campaign, campaign_id, ledger).await {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "ad set abandoned");
                ledger.adset_failed(&adset.rows, &e);
                report.adsets.failed += 1;
                report.ads.skipped += adset.ads.len();
                return;
            }
        };
        ledger.adset_created(&adset.rows, &adset_id);
        report.adsets.succeeded += 1;

        for ad in plan.ads_of(adset.key) {
            let span = info_span!("ad", name = ledger.records()[ad.record].get("ad_name"));
            self.run_ad(ad, &adset_id, ledger, report).instrument(span).await;
        }
    }

    /// Dates, prediction, poll, reservation, ad set; the first failure wins.
    async fn create_adset(
        &self,
        adset: &AdsetNode,
        campaign: &CampaignRow,
        campaign_id: &CampaignId,
        ledger: &mut ResultLedger,
    ) -> Result<AdSetId, CascadeError> {
        let row = AdsetRow::from_record(&ledger.records()[adset.record])?;
        let schedule = self.normalizer.normalize(&row.start_date, &row.end_date)?;
        let page = row.page.clone().unwrap_or_else(|| self.page.clone());

        let spec = self.predictor.build_spec(PredictionInput {
            campaign_id,
            campaign,
            adset: &row,
            schedule: &schedule,
            page: &page,
            target_spec: self.targeting.target_spec(&row),
        });
        let prediction_id = self.predictor.submit(&self.platform, &spec).await?;
        ledger.prediction_submitted(&adset.rows, &prediction_id);

        let prediction = self.predictor.poll(&self.platform, &prediction_id, &spec).await?;
        let reservation = self.reserver.reserve(&self.platform, &prediction).await?;

        let targeting = self.targeting.adset_targeting(&prediction.target_spec, &row);
        let mut adset_spec =
            AdSetSpec::reach(&row.name, campaign_id.clone(), reservation, targeting);
        adset_spec.status = self.entity_status.clone();

        let id = self
            .platform
            .create_ad_set(&adset_spec)
            .await
            .map_err(|e| CascadeError::submission(Stage::AdSet, e))?;
        info!(adset_id = %id, prediction_id = %prediction_id, "ad set created");

        if self.verify_exclusions {
            self.check_exclusions(&id, &adset_spec.targeting).await;
        }
        Ok(id)
    }

    /// Re-read the ad set and warn when the stored exclusions differ.
    async fn check_exclusions(&self, id: &AdSetId, submitted: &TargetSpec) {
        match self.platform.fetch_ad_set(id).await {
            Ok(record) if same_exclusions(submitted, &record.targeting) => {}
            Ok(_) => warn!(adset_id = %id, "stored geo exclusions differ from submitted ones"),
            Err(e) => warn!(adset_id = %id, error = %e, "could not re-read ad set"),
        }
    }

    async fn run_ad(
        &self,
        ad: &AdNode,
        adset_id: &AdSetId,
        ledger: &mut ResultLedger,
        report: &mut CascadeReport,
    ) {
        match self.create_ad(ad, adset_id, ledger).await {
            Ok(id) => {
                ledger.ad_created(&ad.rows, &id);
                report.ads.succeeded += 1;
            }
            Err(e) => {
                warn!(error = %e, "ad failed");
                ledger.ad_failed(&ad.rows, &e);
                report.ads.failed += 1;
            }
        }
    }

    async fn create_ad(
        &self,
        ad: &AdNode,
        adset_id: &AdSetId,
        ledger: &ResultLedger,
    ) -> Result<AdId, CascadeError> {
        let row = AdRow::from_record(&ledger.records()[ad.record])?;
        let creative_id = self.creatives.upload(&self.platform, &row).await?;
        let status = row.status.as_deref().unwrap_or(&self.ad_status);
        let spec = AdSpec::new(&row.name, adset_id.clone(), creative_id, status);
        let id = self
            .platform
            .create_ad(&spec)
            .await
            .map_err(|e| CascadeError::submission(Stage::Ad, e))?;
        info!(ad_id = %id, "ad created");
        Ok(id)
    }
}
