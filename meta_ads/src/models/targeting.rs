//! Targeting specification shared by predictions and ad sets.
//!
//! The same [`TargetSpec`] is submitted with a reach & frequency prediction and
//! then reused (plus geo exclusions) as the ad set's `targeting`. The platform
//! rejects an ad set whose targeting drifts from the reserved prediction, so
//! the struct mirrors the wire format field for field.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Audience definition in the platform's `target_spec` wire shape.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub age_min: u32,
    pub age_max: u32,

    /// 1 = male, 2 = female; empty means all.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genders: Vec<u8>,

    /// Inclusion groups. Entities inside a group are OR-ed, groups are AND-ed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flexible_spec: Vec<InclusionGroup>,

    pub geo_locations: GeoLocations,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub brand_safety_content_filter_levels: Vec<String>,

    #[serde(default)]
    pub publisher_platforms: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub facebook_positions: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instagram_positions: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub audience_network_positions: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub device_platforms: Vec<String>,
}

impl TargetSpec {
    /// Returns a copy of this spec whose geo block carries `exclusions`.
    ///
    /// An empty exclusion set is dropped rather than sent as empty arrays.
    pub fn with_exclusions(&self, exclusions: GeoExclusions) -> Self {
        let mut spec = self.clone();
        spec.geo_locations.excluded_geo_locations =
            (!exclusions.is_empty()).then_some(exclusions);
        spec
    }

    /// Exclusions currently attached to the geo block, if any.
    pub fn exclusions(&self) -> Option<&GeoExclusions> {
        self.geo_locations.excluded_geo_locations.as_ref()
    }
}

/// One AND-ed group of interest/behavior ids.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionGroup {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interests: Vec<TargetingEntity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub behaviors: Vec<TargetingEntity>,
}

impl InclusionGroup {
    pub fn is_empty(&self) -> bool {
        self.interests.is_empty() && self.behaviors.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetingEntity {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl TargetingEntity {
    pub fn id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoLocations {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub countries: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<NamedLocation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cities: Vec<NamedLocation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub location_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_geo_locations: Option<GeoExclusions>,
}

/// A region or city, addressed either by platform key or by name + country.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl NamedLocation {
    pub fn by_name(name: &str, country: &str) -> Self {
        Self {
            key: None,
            name: Some(name.trim().to_string()),
            country: Some(country.to_string()),
        }
    }
}

/// Regions and cities removed from an otherwise country-wide audience.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoExclusions {
    #[serde(default)]
    pub regions: Vec<NamedLocation>,
    #[serde(default)]
    pub cities: Vec<NamedLocation>,
}

impl GeoExclusions {
    /// Builds exclusions from plain region and city names within one country.
    pub fn from_names<R, C>(regions: R, cities: C, country: &str) -> Self
    where
        R: IntoIterator,
        R::Item: AsRef<str>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        let named = |n: &str| (!n.trim().is_empty()).then(|| NamedLocation::by_name(n, country));
        Self {
            regions: regions.into_iter().filter_map(|r| named(r.as_ref())).collect(),
            cities: cities.into_iter().filter_map(|c| named(c.as_ref())).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty() && self.cities.is_empty()
    }

    /// Order-independent set of excluded region names.
    pub fn region_names(&self) -> BTreeSet<String> {
        names(&self.regions)
    }

    /// Order-independent set of excluded city names.
    pub fn city_names(&self) -> BTreeSet<String> {
        names(&self.cities)
    }
}

fn names(locations: &[NamedLocation]) -> BTreeSet<String> {
    locations
        .iter()
        .filter_map(|l| l.name.as_ref())
        .map(|n| n.trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_exclusions_are_not_serialized() {
        let spec = TargetSpec {
            age_min: 18,
            age_max: 35,
            geo_locations: GeoLocations {
                countries: vec!["IN".into()],
                ..Default::default()
            },
            ..Default::default()
        };
        let with = spec.with_exclusions(GeoExclusions::default());
        let json = serde_json::to_value(&with).unwrap();
        assert!(json["geo_locations"].get("excluded_geo_locations").is_none());
        assert!(json.get("genders").is_none());
    }

    #[test]
    fn exclusion_names_ignore_order_and_blanks() {
        let a = GeoExclusions::from_names(["Kerala", " Goa", ""], ["Pune"], "IN");
        let b = GeoExclusions::from_names(["Goa", "Kerala"], ["Pune "], "IN");
        assert_eq!(a.region_names(), b.region_names());
        assert_eq!(a.city_names(), b.city_names());
        assert_eq!(a.regions.len(), 2);
    }

    #[test]
    fn geo_block_round_trips_through_wire_json() {
        let raw = r#"{
            "age_min": 18, "age_max": 45,
            "geo_locations": {
                "countries": ["IN"],
                "location_types": ["home", "recent"],
                "excluded_geo_locations": {
                    "regions": [{"key": "1754", "name": "Uttar Pradesh", "country": "IN"}],
                    "cities": []
                }
            },
            "publisher_platforms": ["facebook"]
        }"#;
        let spec: TargetSpec = serde_json::from_str(raw).unwrap();
        let ex = spec.exclusions().unwrap();
        assert_eq!(ex.region_names().into_iter().collect::<Vec<_>>(), ["Uttar Pradesh"]);
        assert!(ex.city_names().is_empty());
    }
}
