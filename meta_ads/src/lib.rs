//! Client-side model of the Meta Marketing (Graph) API surface used by the
//! campaign cascade: campaigns, reach & frequency predictions, ad sets,
//! creatives and ads.

pub mod models;
pub mod providers;
