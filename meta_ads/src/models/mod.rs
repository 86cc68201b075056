pub mod ad;
pub mod adset;
pub mod campaign;
pub mod creative;
pub mod ids;
pub mod prediction;
pub mod search;
pub mod targeting;
pub mod video;
