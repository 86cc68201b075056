//! Query-string and form builders for Graph API calls.

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::models::search::LocationType;

/// `fields` selector used to poll predictions and videos.
pub const STATUS_FIELDS: &str = "status";

/// `fields` selector used to read an ad set back.
pub const ADSET_FIELDS: &str = "id,name,targeting";

/// Form body for `POST /adimages`: the raw bytes, base64-encoded.
pub fn image_upload_form(bytes: &[u8]) -> Vec<(&'static str, String)> {
    vec![("bytes", STANDARD.encode(bytes))]
}

/// Query for `GET /search?type=adgeolocation`.
pub fn geo_search_query(
    q: &str,
    location_type: LocationType,
    country_code: Option<&str>,
) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("type", "adgeolocation".to_string()),
        ("location_types", format!("[\"{location_type}\"]")),
        ("q", q.trim().to_string()),
    ];
    if let Some(cc) = country_code {
        query.push(("country_code", cc.trim().to_uppercase()));
    }
    query
}

/// Query for `GET /search?type=adinterest`.
pub fn interest_search_query(q: &str, limit: u32) -> Vec<(&'static str, String)> {
    vec![
        ("type", "adinterest".to_string()),
        ("q", q.trim().to_string()),
        ("limit", limit.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_bytes_are_base64() {
        let form = image_upload_form(b"png!");
        assert_eq!(form, vec![("bytes", "cG5nIQ==".to_string())]);
    }

    #[test]
    fn geo_query_wraps_location_type_in_json_array() {
        let q = geo_search_query(" Maharashtra ", LocationType::Region, Some("in"));
        assert!(q.contains(&("location_types", "[\"region\"]".to_string())));
        assert!(q.contains(&("q", "Maharashtra".to_string())));
        assert!(q.contains(&("country_code", "IN".to_string())));
    }

    #[test]
    fn geo_query_without_country() {
        let q = geo_search_query("Pune", LocationType::City, None);
        assert!(!q.iter().any(|(k, _)| *k == "country_code"));
    }
}
