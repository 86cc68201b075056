//! Audience construction for predictions and ad sets.
//!
//! The prediction's `target_spec` and the ad set's `targeting` must describe
//! the same audience, otherwise the platform refuses to attach the
//! reservation. [`TargetingBuilder::adset_targeting`] therefore starts from
//! the exact spec the prediction was submitted with and only adds the geo
//! exclusions.

use meta_ads::models::targeting::{
    GeoExclusions, GeoLocations, InclusionGroup, TargetSpec, TargetingEntity,
};

use crate::{config::PredictionCfg, rows::AdsetRow};

const DEFAULT_PUBLISHER_PLATFORM: &str = "facebook";
const DEFAULT_FACEBOOK_POSITION: &str = "feed";

#[derive(Clone, Debug)]
pub struct TargetingBuilder {
    cfg: PredictionCfg,
}

impl TargetingBuilder {
    pub fn new(cfg: PredictionCfg) -> Self {
        Self { cfg }
    }

    /// Audience submitted with the reach & frequency prediction.
    pub fn target_spec(&self, row: &AdsetRow) -> TargetSpec {
        TargetSpec {
            age_min: row.age_min,
            age_max: row.age_max,
            genders: row.genders.clone(),
            flexible_spec: self.inclusion_groups(row),
            geo_locations: GeoLocations {
                countries: vec![self.country(row).to_string()],
                location_types: self.cfg.location_types.clone(),
                ..Default::default()
            },
            brand_safety_content_filter_levels: self.cfg.brand_safety.clone(),
            publisher_platforms: or_default(&row.publisher_platforms, DEFAULT_PUBLISHER_PLATFORM),
            facebook_positions: or_default(&row.facebook_positions, DEFAULT_FACEBOOK_POSITION),
            instagram_positions: row.instagram_positions.clone(),
            audience_network_positions: self.cfg.audience_network_positions.clone(),
            device_platforms: device_platforms(&row.device),
        }
    }

    /// Regions and cities the row excludes, scoped to its country.
    pub fn exclusions(&self, row: &AdsetRow) -> GeoExclusions {
        GeoExclusions::from_names(&row.exclude_states, &row.exclude_cities, self.country(row))
    }

    /// Ad set targeting: the prediction's spec plus the row's exclusions.
    pub fn adset_targeting(&self, predicted: &TargetSpec, row: &AdsetRow) -> TargetSpec {
        predicted.with_exclusions(self.exclusions(row))
    }

    fn country<'a>(&'a self, row: &'a AdsetRow) -> &'a str {
        row.country.as_deref().unwrap_or(&self.cfg.default_country)
    }

    fn inclusion_groups(&self, row: &AdsetRow) -> Vec<InclusionGroup> {
        let from_row = InclusionGroup {
            interests: row.interests.iter().map(TargetingEntity::id).collect(),
            behaviors: row.behaviors.iter().map(TargetingEntity::id).collect(),
        };
        if from_row.is_empty() {
            self.cfg
                .default_interest_groups
                .iter()
                .map(|g| g.to_group())
                .filter(|g| !g.is_empty())
                .collect()
        } else {
            vec![from_row]
        }
    }
}

fn or_default(values: &[String], default: &str) -> Vec<String> {
    if values.is_empty() {
        vec![default.to_string()]
    } else {
        values.iter().map(|v| v.to_lowercase()).collect()
    }
}

/// Order-independent comparison of region and city exclusion names.
pub fn same_exclusions(submitted: &TargetSpec, stored: &TargetSpec) -> bool {
    let names = |spec: &TargetSpec| {
        spec.exclusions()
            .map(|e| (e.region_names(), e.city_names()))
            .unwrap_or_default()
    };
    names(submitted) == names(stored)
}

/// `ALL` expands to mobile + desktop; anything else is passed through lower-cased.
pub fn device_platforms(device: &str) -> Vec<String> {
    let device = device.trim();
    if device.is_empty() || device.eq_ignore_ascii_case("all") {
        vec!["mobile".to_string(), "desktop".to_string()]
    } else {
        vec![device.to_lowercase()]
    }
}
