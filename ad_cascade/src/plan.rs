//! Batch plan: the campaign -> adset -> ad tree built from the input rows.
//!
//! Nodes live in three arenas and refer to each other through generated keys,
//! so two ad sets that share a name under different campaigns never collide.
//! Each node also lists the input row indices it covers; that is how the
//! ledger learns which rows an outcome applies to.
//!
//! Grouping is stable distinct extraction: at each level the first row with a
//! new defining tuple opens a node, in first-seen order. The first row whose
//! defining columns are all empty ends extraction at that level (the whole
//! batch for campaigns, the parent's children otherwise). Later rows that
//! match an already opened node still belong to it.

use indexmap::IndexMap;
use tracing::debug;

use crate::{
    error::BatchError,
    rows::{AD_COLUMNS, ADSET_COLUMNS, CAMPAIGN_COLUMNS, CAMPAIGN_KEY_COLUMNS, InputRecord, RowView},
};

macro_rules! arena_key {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(usize);

        impl $name {
            pub fn index(self) -> usize {
                self.0
            }
        }
    };
}

arena_key!(CampaignKey);
arena_key!(AdsetKey);
arena_key!(AdKey);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CampaignNode {
    pub key: CampaignKey,
    /// Row whose cells describe the campaign (first seen).
    pub record: usize,
    pub rows: Vec<usize>,
    pub adsets: Vec<AdsetKey>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdsetNode {
    pub key: AdsetKey,
    pub campaign: CampaignKey,
    pub record: usize,
    pub rows: Vec<usize>,
    pub ads: Vec<AdKey>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdNode {
    pub key: AdKey,
    pub adset: AdsetKey,
    pub record: usize,
    pub rows: Vec<usize>,
}

#[derive(Clone, Debug, Default)]
pub struct BatchPlan {
    campaigns: Vec<CampaignNode>,
    adsets: Vec<AdsetNode>,
    ads: Vec<AdNode>,
    unplanned: Vec<usize>,
}

impl BatchPlan {
    pub fn build(records: &[InputRecord]) -> Result<Self, BatchError> {
        let mut plan = Self::default();
        let all: Vec<usize> = (0..records.len()).collect();

        let campaign_groups =
            group_distinct(records, &all, &CAMPAIGN_COLUMNS, &CAMPAIGN_KEY_COLUMNS);
        if campaign_groups.is_empty() {
            return Err(BatchError::EmptyInput);
        }

        for (record, rows) in campaign_groups {
            let campaign = CampaignKey(plan.campaigns.len());
            let mut adsets = Vec::new();

            for (record, rows) in group_distinct(records, &rows, &ADSET_COLUMNS, &ADSET_COLUMNS) {
                let adset = AdsetKey(plan.adsets.len());
                let mut ads = Vec::new();

                for (record, rows) in group_distinct(records, &rows, &AD_COLUMNS, &AD_COLUMNS) {
                    let key = AdKey(plan.ads.len());
                    plan.ads.push(AdNode { key, adset, record, rows });
                    ads.push(key);
                }

                plan.adsets.push(AdsetNode {
                    key: adset,
                    campaign,
                    record,
                    rows,
                    ads,
                });
                adsets.push(adset);
            }

            plan.campaigns.push(CampaignNode {
                key: campaign,
                record,
                rows,
                adsets,
            });
        }

        let mut covered = vec![false; records.len()];
        for c in &plan.campaigns {
            for &row in &c.rows {
                covered[row] = true;
            }
        }
        plan.unplanned = (0..records.len()).filter(|&i| !covered[i]).collect();

        debug!(
            campaigns = plan.campaigns.len(),
            adsets = plan.adsets.len(),
            ads = plan.ads.len(),
            unplanned = plan.unplanned.len(),
            "batch plan built"
        );
        Ok(plan)
    }

    /// Campaigns in first-seen order.
    pub fn campaigns(&self) -> &[CampaignNode] {
        &self.campaigns
    }

    pub fn campaign(&self, key: CampaignKey) -> &CampaignNode {
        &self.campaigns[key.0]
    }

    pub fn adset(&self, key: AdsetKey) -> &AdsetNode {
        &self.adsets[key.0]
    }

    pub fn ad(&self, key: AdKey) -> &AdNode {
        &self.ads[key.0]
    }

    pub fn adsets_of(&self, key: CampaignKey) -> impl Iterator<Item = &AdsetNode> {
        self.campaign(key).adsets.iter().map(|k| self.adset(*k))
    }

    pub fn ads_of(&self, key: AdsetKey) -> impl Iterator<Item = &AdNode> {
        self.adset(key).ads.iter().map(|k| self.ad(*k))
    }

    pub fn adset_count(&self) -> usize {
        self.adsets.len()
    }

    pub fn ad_count(&self) -> usize {
        self.ads.len()
    }

    /// Rows that belong to no campaign (sentinels and rows after the batch end).
    pub fn unplanned_rows(&self) -> &[usize] {
        &self.unplanned
    }
}

/// Stable distinct extraction over `rows`.
///
/// Groups open in first-seen order until the first row whose `defining`
/// columns are all empty; membership is then decided by the `identity`
/// columns over every non-sentinel row. Returns `(first row, member rows)`.
fn group_distinct(
    records: &[InputRecord],
    rows: &[usize],
    defining: &[&str],
    identity: &[&str],
) -> Vec<(usize, Vec<usize>)> {
    let identity_of = |i: usize| -> Vec<String> {
        identity.iter().map(|c| records[i].get(c).to_string()).collect()
    };

    let mut groups: IndexMap<Vec<String>, (usize, Vec<usize>)> = IndexMap::new();
    for &i in rows {
        if records[i].defining_tuple(defining) == RowView::EndOfBatch {
            break;
        }
        groups.entry(identity_of(i)).or_insert_with(|| (i, Vec::new()));
    }

    for &i in rows {
        if records[i].defining_tuple(defining) == RowView::EndOfBatch {
            continue;
        }
        if let Some((_, members)) = groups.get_mut(&identity_of(i)) {
            members.push(i);
        }
    }

    groups.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(campaign: &str, adset: &str, ad: &str) -> InputRecord {
        InputRecord::from_pairs([
            ("campaign_name", campaign),
            ("objective", if campaign.is_empty() { "" } else { "OUTCOME_AWARENESS" }),
            ("buy_type", if campaign.is_empty() { "" } else { "RESERVED" }),
            ("adset_name", adset),
            ("ad_name", ad),
        ])
    }

    #[test]
    fn duplicates_collapse_in_first_seen_order() {
        let records = vec![
            rec("B", "b1", "x"),
            rec("A", "a1", "y"),
            rec("B", "b1", "x"),
            rec("B", "b2", "z"),
        ];
        let plan = BatchPlan::build(&records).unwrap();

        let names: Vec<usize> = plan.campaigns().iter().map(|c| c.record).collect();
        assert_eq!(names, [0, 1]);

        let b = &plan.campaigns()[0];
        assert_eq!(b.rows, [0, 2, 3]);
        let adsets: Vec<&AdsetNode> = plan.adsets_of(b.key).collect();
        assert_eq!(adsets.len(), 2);
        assert_eq!(adsets[0].rows, [0, 2]);
        assert_eq!(plan.ads_of(adsets[0].key).count(), 1);
        assert_eq!(plan.ad_count(), 3);
    }

    #[test]
    fn same_adset_name_under_two_campaigns_are_distinct_nodes() {
        let records = vec![rec("A", "shared", "x"), rec("B", "shared", "x")];
        let plan = BatchPlan::build(&records).unwrap();
        assert_eq!(plan.adset_count(), 2);
        let a = plan.adsets_of(plan.campaigns()[0].key).next().unwrap();
        let b = plan.adsets_of(plan.campaigns()[1].key).next().unwrap();
        assert_ne!(a.key, b.key);
        assert_eq!(plan.campaign(b.campaign).record, 1);
    }

    #[test]
    fn blank_campaign_row_ends_the_batch() {
        let records = vec![
            rec("A", "a1", "x"),
            rec("", "", ""),
            rec("C", "c1", "y"),
            rec("A", "a1", "z"),
        ];
        let plan = BatchPlan::build(&records).unwrap();
        assert_eq!(plan.campaigns().len(), 1);
        // A's later row still attaches.
        assert_eq!(plan.campaigns()[0].rows, [0, 3]);
        assert_eq!(plan.unplanned_rows(), [1, 2]);
    }

    #[test]
    fn blank_ad_cells_end_the_adset() {
        let records = vec![rec("A", "a1", "x"), rec("A", "a1", ""), rec("A", "a1", "y")];
        let plan = BatchPlan::build(&records).unwrap();
        let adset = plan.adsets_of(plan.campaigns()[0].key).next().unwrap();
        let ads: Vec<&AdNode> = plan.ads_of(adset.key).collect();
        assert_eq!(ads.len(), 1);
        assert_eq!(ads[0].rows, [0]);
        assert_eq!(adset.rows, [0, 1, 2]);
    }

    #[test]
    fn empty_inputs_are_reported() {
        assert!(matches!(BatchPlan::build(&[]), Err(BatchError::EmptyInput)));
        let blank = vec![rec("", "", "")];
        assert!(matches!(BatchPlan::build(&blank), Err(BatchError::EmptyInput)));
    }
}
