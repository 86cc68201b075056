//! Graph API (REST) implementation of [`AdPlatform`](super::AdPlatform).

pub mod params;
pub mod provider;
pub mod response;

pub use provider::{DEFAULT_API_VERSION, GraphApiProvider};
