//! Run configuration: TOML settings plus environment credentials.
//!
//! Every section has defaults, so an absent file (or an empty one) yields a
//! configuration that reproduces the reference cascade: 6 status checks 10
//! seconds apart, schedules pinned in Asia/Kolkata, paused campaigns and
//! active ads.
//!
//! ```toml
//! [polling]
//! max_attempts = 15
//! interval_secs = 30
//!
//! [pacing]
//! min_interval_ms = 2000
//! ```
//!
//! Credentials are never read from the file. [`Credentials::from_env`] reads
//! `FB_ACCESS_TOKEN`, `FB_AD_ACCOUNT_ID` and `FB_PAGE_ID`.

use std::{path::{Path, PathBuf}, time::Duration};

use chrono_tz::Tz;
use meta_ads::{
    models::{
        ids::{AccountId, PageId},
        targeting::{InclusionGroup, TargetingEntity},
    },
    providers::graph_rest::DEFAULT_API_VERSION,
};
use secrecy::SecretString;
use serde::Deserialize;
use shared_utils::env::{MissingEnvVarError, get_env_var};

use crate::{error::ConfigError, prediction::PollPolicy, schedule::DstPolicy};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CascadeConfig {
    pub platform: PlatformCfg,
    pub polling: PollingCfg,
    pub pacing: PacingCfg,
    pub schedule: ScheduleCfg,
    pub campaign: CampaignCfg,
    pub prediction: PredictionCfg,
    pub creative: CreativeCfg,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlatformCfg {
    pub api_version: String,
    /// Overrides `https://graph.facebook.com/{api_version}`.
    pub base_url: Option<String>,
}

impl Default for PlatformCfg {
    fn default() -> Self {
        Self {
            api_version: DEFAULT_API_VERSION.to_string(),
            base_url: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollingCfg {
    pub max_attempts: u32,
    pub interval_secs: u64,
}

impl Default for PollingCfg {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            interval_secs: 10,
        }
    }
}

impl PollingCfg {
    pub fn policy(&self) -> PollPolicy {
        PollPolicy::new(self.max_attempts, Duration::from_secs(self.interval_secs))
    }
}

/// Minimum spacing between platform calls; `0` disables pacing.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PacingCfg {
    pub min_interval_ms: u64,
}

impl PacingCfg {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleCfg {
    /// IANA zone name.
    pub timezone: String,
    pub dst_policy: DstPolicy,
}

impl Default for ScheduleCfg {
    fn default() -> Self {
        Self {
            timezone: "Asia/Kolkata".to_string(),
            dst_policy: DstPolicy::Strict,
        }
    }
}

impl ScheduleCfg {
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone.parse().map_err(|_| ConfigError::Invalid {
            field: "schedule.timezone",
            message: format!("unknown time zone {:?}", self.timezone),
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CampaignCfg {
    /// Status new campaigns and ad sets are created with.
    pub default_status: String,
}

impl Default for CampaignCfg {
    fn default() -> Self {
        Self {
            default_status: "PAUSED".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PredictionCfg {
    pub frequency_cap_reset_hours: u32,
    pub story_event_type: u32,
    pub default_country: String,
    pub location_types: Vec<String>,
    pub brand_safety: Vec<String>,
    pub audience_network_positions: Vec<String>,
    /// Inclusion groups used when a row names no interests or behaviors.
    pub default_interest_groups: Vec<InterestGroupCfg>,
    /// Re-read each created ad set and warn when its stored exclusions differ.
    pub verify_exclusions: bool,
}

impl Default for PredictionCfg {
    fn default() -> Self {
        Self {
            frequency_cap_reset_hours: 168,
            story_event_type: 128,
            default_country: "IN".to_string(),
            location_types: vec!["home".into(), "recent".into()],
            brand_safety: vec!["FACEBOOK_RELAXED".into()],
            audience_network_positions: vec!["classic".into()],
            default_interest_groups: vec![
                InterestGroupCfg {
                    interests: [
                        "6003384248805",
                        "6003369782940",
                        "6003456388203",
                        "6003348604581",
                        "6003263791114",
                        "6003188355978",
                        "6003372784175",
                        "6003526234370",
                    ]
                    .map(String::from)
                    .to_vec(),
                    behaviors: vec!["6071631541183".into(), "6002714895372".into()],
                },
                InterestGroupCfg {
                    interests: vec!["6003242077675".into(), "6003103108917".into()],
                    behaviors: Vec::new(),
                },
            ],
            verify_exclusions: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InterestGroupCfg {
    pub interests: Vec<String>,
    pub behaviors: Vec<String>,
}

impl InterestGroupCfg {
    pub fn to_group(&self) -> InclusionGroup {
        InclusionGroup {
            interests: self.interests.iter().map(TargetingEntity::id).collect(),
            behaviors: self.behaviors.iter().map(TargetingEntity::id).collect(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CreativeCfg {
    /// Base directory for relative media paths.
    pub media_dir: PathBuf,
    /// Used when an image row has no `creative_link`.
    pub default_image_path: PathBuf,
    /// Used when a video row has no `creative_link`.
    pub default_video_path: PathBuf,
    /// Still uploaded alongside every video creative.
    pub thumbnail_path: PathBuf,
    pub video_ready_timeout_secs: u64,
    pub video_poll_interval_secs: u64,
    pub ad_status: String,
}

impl Default for CreativeCfg {
    fn default() -> Self {
        Self {
            media_dir: PathBuf::from("."),
            default_image_path: PathBuf::from("sampleimage.png"),
            default_video_path: PathBuf::from("sampleVideo.mp4"),
            thumbnail_path: PathBuf::from("sampleimage.png"),
            video_ready_timeout_secs: 1800,
            video_poll_interval_secs: 5,
            ad_status: "ACTIVE".to_string(),
        }
    }
}

impl CreativeCfg {
    pub fn video_ready_timeout(&self) -> Duration {
        Duration::from_secs(self.video_ready_timeout_secs)
    }

    pub fn video_poll_interval(&self) -> Duration {
        Duration::from_secs(self.video_poll_interval_secs)
    }
}

impl CascadeConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Loads `path` when given, otherwise the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load_path(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.polling.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "polling.max_attempts",
                message: "at least one status check is required".into(),
            });
        }
        if self.creative.video_ready_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "creative.video_ready_timeout_secs",
                message: "must be positive".into(),
            });
        }
        if self.prediction.default_country.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "prediction.default_country",
                message: "must not be blank".into(),
            });
        }
        self.schedule.tz()?;
        Ok(())
    }
}

/// Platform credentials and the destination page.
pub struct Credentials {
    pub access_token: SecretString,
    pub account_id: AccountId,
    pub page_id: PageId,
}

impl Credentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(get_env_var)
    }

    /// Builds credentials from any name -> value lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, MissingEnvVarError>,
    {
        Ok(Self {
            access_token: SecretString::new(lookup("FB_ACCESS_TOKEN")?.into()),
            account_id: AccountId::new(&lookup("FB_AD_ACCOUNT_ID")?),
            page_id: PageId::new(&lookup("FB_PAGE_ID")?),
        })
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = CascadeConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.polling.max_attempts, 6);
        assert_eq!(cfg.polling.interval_secs, 10);
        assert_eq!(cfg.prediction.frequency_cap_reset_hours, 168);
        assert_eq!(cfg.prediction.default_interest_groups.len(), 2);
        assert_eq!(cfg.schedule.tz().unwrap(), chrono_tz::Asia::Kolkata);
        assert_eq!(cfg.pacing.period(), Duration::ZERO);
        assert_eq!(cfg.campaign.default_status, "PAUSED");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = CascadeConfig::from_toml_str(
            r#"
            [polling]
            interval_secs = 30

            [schedule]
            timezone = "America/New_York"
            dst_policy = "shift_forward"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.polling.max_attempts, 6);
        assert_eq!(cfg.polling.policy().interval, Duration::from_secs(30));
        assert_eq!(cfg.schedule.dst_policy, DstPolicy::ShiftForward);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = CascadeConfig::from_toml_str("[polling]\nretries = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_attempts_and_bad_zone_are_invalid() {
        let err = CascadeConfig::from_toml_str("[polling]\nmax_attempts = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "polling.max_attempts", .. }));
        let err = CascadeConfig::from_toml_str("[schedule]\ntimezone = \"Mars/Olympus\"\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "schedule.timezone", .. }));
    }

    #[test]
    fn credentials_are_normalized() {
        let creds = Credentials::from_lookup(|name| match name {
            "FB_ACCESS_TOKEN" => Ok("token".into()),
            "FB_AD_ACCOUNT_ID" => Ok("1234".into()),
            "FB_PAGE_ID" => Ok("pg_5678".into()),
            other => Err(MissingEnvVarError(other.into())),
        })
        .unwrap();
        assert_eq!(creds.access_token.expose_secret(), "token");
        assert_eq!(creds.account_id.as_str(), "act_1234");
        assert_eq!(creds.page_id.as_str(), "5678");
    }

    #[test]
    fn missing_credential_is_named() {
        let err = Credentials::from_lookup(|name| Err(MissingEnvVarError(name.into())))
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "Missing environment variable: FB_ACCESS_TOKEN");
    }
}
