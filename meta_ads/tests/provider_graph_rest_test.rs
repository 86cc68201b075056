#![cfg(test)]
use meta_ads::{
    models::search::LocationType,
    providers::{AdPlatform, graph_rest::GraphApiProvider},
};
use serial_test::serial;

fn live_provider() -> Option<GraphApiProvider> {
    let _ = dotenvy::dotenv();
    // This test requires FB_ACCESS_TOKEN and FB_AD_ACCOUNT_ID to be set in the environment.
    if std::env::var("FB_ACCESS_TOKEN").is_err() || std::env::var("FB_AD_ACCOUNT_ID").is_err() {
        println!("Skipping live Graph API test: credentials not set.");
        return None;
    }
    Some(GraphApiProvider::from_env().expect("Failed to create GraphApiProvider"))
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_graph_region_search() {
    let Some(provider) = live_provider() else {
        return;
    };

    let hits = provider
        .search_geo_locations("Maharashtra", LocationType::Region, Some("IN"))
        .await
        .expect("region search failed");

    assert!(!hits.is_empty(), "Expected at least one region for Maharashtra");
    assert!(hits.iter().all(|h| h.kind == "region"));
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_graph_interest_search_respects_limit() {
    let Some(provider) = live_provider() else {
        return;
    };

    let hits = provider
        .search_interests("fitness", 2)
        .await
        .expect("interest search failed");
    assert!(hits.len() <= 2);
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_graph_unknown_prediction_is_api_error() {
    let Some(provider) = live_provider() else {
        return;
    };

    let err = provider
        .prediction_status(&"0".into())
        .await
        .expect_err("a non-existent prediction must not resolve");
    assert!(!err.to_string().is_empty());
}
