//! Bulk campaign creation over the ad platform.
//!
//! Input rows are grouped into a [`plan::BatchPlan`] and then walked by the
//! [`cascade::BatchCascadeOrchestrator`]: create each campaign, predict and
//! reserve inventory for each of its ad sets, then upload creatives and create
//! ads. Outcomes land in a [`ledger::ResultLedger`] that is written once at the
//! end of the run.

pub mod cascade;
pub mod config;
pub mod creative;
pub mod error;
pub mod ledger;
pub mod plan;
pub mod prediction;
pub mod rows;
pub mod schedule;
pub mod targeting;
pub mod telemetry;
