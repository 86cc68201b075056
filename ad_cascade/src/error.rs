//! Error taxonomy of the cascade.
//!
//! [`CascadeError`] is always scoped to one row (campaign, ad set or ad): it is
//! written to that row's ledger log field and processing moves on to the next
//! sibling. Nothing here is retried. [`BatchError`] covers the few conditions
//! that stop a whole run before or after the cascade itself.

use std::fmt;

use meta_ads::models::{
    ids::PredictionId,
    prediction::PredictionStatus,
};
use thiserror::Error;

use crate::schedule::DateParseError;

/// Which create call the platform rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Campaign,
    Prediction,
    AdSet,
    Ad,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Campaign => "campaign creation",
            Self::Prediction => "prediction submission",
            Self::AdSet => "ad set creation",
            Self::Ad => "ad creation",
        })
    }
}

/// Sub-step of creative creation that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreativeStep {
    ImageUpload,
    VideoUpload,
    VideoTimeout,
    ThumbnailUpload,
    CreativeSubmission,
}

impl fmt::Display for CreativeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ImageUpload => "image upload",
            Self::VideoUpload => "video upload",
            Self::VideoTimeout => "video encoding wait",
            Self::ThumbnailUpload => "thumbnail upload",
            Self::CreativeSubmission => "creative submission",
        })
    }
}

/// Row-scoped failure, recorded in the ledger.
#[derive(Debug, Error)]
pub enum CascadeError {
    /// Bad discriminator values or missing/unparseable required fields.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("date error: {0}")]
    DateParse(#[from] DateParseError),

    /// A create call was rejected; `message` is the platform's text verbatim.
    #[error("{stage} failed: {message}")]
    Submission { stage: Stage, message: String },

    /// Poll budget exhausted while the prediction was still pending.
    #[error("prediction {prediction_id} still pending after {attempts} status checks")]
    PredictionPendingTimeout {
        prediction_id: PredictionId,
        attempts: u32,
    },

    /// Prediction reached a failed status, or its status could not be read.
    #[error("prediction {prediction_id} failed: {reason}")]
    PredictionFailed {
        prediction_id: PredictionId,
        reason: String,
    },

    #[error("reservation of prediction {prediction_id} failed: {message}")]
    Reservation {
        prediction_id: PredictionId,
        message: String,
    },

    #[error("creative creation failed during {step}: {message}")]
    CreativeCreation { step: CreativeStep, message: String },
}

impl CascadeError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn submission(stage: Stage, err: impl fmt::Display) -> Self {
        Self::Submission {
            stage,
            message: err.to_string(),
        }
    }

    pub fn creative(step: CreativeStep, err: impl fmt::Display) -> Self {
        Self::CreativeCreation {
            step,
            message: err.to_string(),
        }
    }

    pub(crate) fn prediction_failed(
        prediction_id: &PredictionId,
        status: PredictionStatus,
    ) -> Self {
        Self::PredictionFailed {
            prediction_id: prediction_id.clone(),
            reason: format!("status {status}"),
        }
    }
}

/// Conditions that end a run as a whole.
#[derive(Debug, Error)]
pub enum BatchError {
    /// Clean early exit: nothing to process.
    #[error("no campaigns detected in the input")]
    EmptyInput,

    #[error("failed to read input {path}: {source}")]
    Input { path: String, source: csv::Error },

    #[error(transparent)]
    Ledger(#[from] crate::ledger::LedgerError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid setting {field}: {message}")]
    Invalid { field: &'static str, message: String },

    #[error(transparent)]
    MissingEnvVar(#[from] shared_utils::env::MissingEnvVarError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_message_is_kept_verbatim() {
        let err = CascadeError::submission(Stage::AdSet, "Invalid parameter (code 100)");
        assert_eq!(err.to_string(), "ad set creation failed: Invalid parameter (code 100)");
    }

    #[test]
    fn failed_status_is_described() {
        let err = CascadeError::prediction_failed(&"61".into(), PredictionStatus::Failed(4));
        assert_eq!(
            err.to_string(),
            "prediction 61 failed: status FAILED (4: invalid parameters)"
        );
    }
}
