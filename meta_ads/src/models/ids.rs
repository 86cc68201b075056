//! Strongly typed identifiers handed out (or expected) by the ad platform.
//!
//! Every id is an opaque string on the wire. Two of them carry namespace
//! rules that the platform enforces:
//! - [`AccountId`] must carry the `act_` prefix on account-scoped edges.
//! - [`PageId`] must *not* carry the `pg_` prefix that some spreadsheets use.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! platform_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self::new(id)
            }
        }
    };
}

platform_id!(
    /// Id of a created campaign.
    CampaignId
);
platform_id!(
    /// Id of a reach & frequency prediction.
    PredictionId
);
platform_id!(
    /// Id returned by the reserve action; passed to ad set creation as `rf_prediction_id`.
    ReservationId
);
platform_id!(
    /// Id of a created ad set.
    AdSetId
);
platform_id!(
    /// Content hash of an uploaded image asset.
    ImageHash
);
platform_id!(VideoId);
platform_id!(CreativeId);
platform_id!(AdId);

const ACCOUNT_PREFIX: &str = "act_";
const PAGE_PREFIX: &str = "pg_";

/// Ad account id, always in its `act_<digits>` form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Normalizes `raw` so that it carries exactly one `act_` prefix.
    pub fn new(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with(ACCOUNT_PREFIX) {
            Self(raw.to_string())
        } else {
            Self(format!("{ACCOUNT_PREFIX}{raw}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Facebook page id, stripped of the spreadsheet-only `pg_` prefix.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(String);

impl PageId {
    pub fn new(raw: &str) -> Self {
        let raw = raw.trim();
        Self(raw.strip_prefix(PAGE_PREFIX).unwrap_or(raw).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_gains_prefix_once() {
        assert_eq!(AccountId::new("12345").as_str(), "act_12345");
        assert_eq!(AccountId::new(" act_12345 ").as_str(), "act_12345");
    }

    #[test]
    fn page_id_loses_prefix() {
        assert_eq!(PageId::new("pg_987").as_str(), "987");
        assert_eq!(PageId::new("987").as_str(), "987");
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = CampaignId::new("120200");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"120200\"");
        assert_eq!(
            serde_json::to_string(&AccountId::new("1")).unwrap(),
            "\"act_1\""
        );
    }
}
