//! Tabular input: one record per (campaign, adset, ad) combination.
//!
//! A record keeps every original column so the ledger can echo it back. The
//! typed views ([`CampaignRow`], [`AdsetRow`], [`AdRow`]) pick out the columns
//! one level needs and validate them.
//!
//! Cells are trimmed on load and the literal `nan` (what a dataframe export
//! writes for an empty cell) is stored as an empty string.

use std::{io::Read, path::Path};

use indexmap::IndexMap;
use meta_ads::models::ids::PageId;

use crate::error::{BatchError, CascadeError};

/// Columns that identify a campaign; rows sharing them share one campaign.
pub const CAMPAIGN_KEY_COLUMNS: [&str; 3] = ["campaign_name", "objective", "buy_type"];

/// Every campaign-level column. All empty marks the end of the batch.
pub const CAMPAIGN_COLUMNS: [&str; 4] =
    ["campaign_name", "objective", "buy_type", "campaign_status"];

pub const ADSET_COLUMNS: [&str; 19] = [
    "adset_name",
    "adset_budget_amount",
    "frequency_cap",
    "prediction_mode",
    "start_date",
    "end_date",
    "fbpage",
    "country",
    "exclude_states",
    "exclude_cities",
    "age_min",
    "age_max",
    "gender",
    "interests",
    "behaviors",
    "publisher_platforms",
    "facebook_positions",
    "instagram_positions",
    "device",
];

pub const AD_COLUMNS: [&str; 9] = [
    "ad_name",
    "ad_status",
    "ad_format",
    "link",
    "creative_link",
    "primary_text",
    "headline",
    "description",
    "call_to_action",
];

/// One input row, columns in file order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InputRecord {
    cells: IndexMap<String, String>,
}

impl InputRecord {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        Self {
            cells: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), clean_cell(v.as_ref())))
                .collect(),
        }
    }

    /// Cell value, empty when the column is absent.
    pub fn get(&self, column: &str) -> &str {
        self.cells.get(column).map(String::as_str).unwrap_or("")
    }

    /// Values of `columns`, or [`RowView::EndOfBatch`] when all of them are empty.
    pub fn defining_tuple(&self, columns: &[&str]) -> RowView<Vec<String>> {
        let values: Vec<String> = columns.iter().map(|c| self.get(c).to_string()).collect();
        if values.iter().all(String::is_empty) {
            RowView::EndOfBatch
        } else {
            RowView::Row(values)
        }
    }

    fn required(&self, column: &str) -> Result<&str, CascadeError> {
        let value = self.get(column);
        if value.is_empty() {
            Err(CascadeError::validation(format!("missing required column {column}")))
        } else {
            Ok(value)
        }
    }

    fn optional(&self, column: &str) -> Option<String> {
        let value = self.get(column);
        (!value.is_empty()).then(|| value.to_string())
    }

    fn number<T: TryFrom<u64>>(&self, column: &str) -> Result<T, CascadeError> {
        let raw = self.required(column)?;
        parse_whole_number(raw)
            .and_then(|n| T::try_from(n).ok())
            .ok_or_else(|| {
                CascadeError::validation(format!("column {column}: {raw:?} is not a valid number"))
            })
    }
}

/// A level's view of a record: either a row or the end-of-batch sentinel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RowView<T> {
    Row(T),
    EndOfBatch,
}

/// Ordered records read from a headed CSV file.
#[derive(Debug, Default)]
pub struct RowSource {
    headers: Vec<String>,
    records: Vec<InputRecord>,
}

impl RowSource {
    pub fn from_csv_path(path: &Path) -> Result<Self, BatchError> {
        let file = std::fs::File::open(path).map_err(|e| BatchError::Input {
            path: path.display().to_string(),
            source: csv::Error::from(e),
        })?;
        Self::from_reader(file).map_err(|source| BatchError::Input {
            path: path.display().to_string(),
            source,
        })
    }

    /// Short rows are padded with empty cells.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();

        let mut records = Vec::new();
        for row in rdr.records() {
            let row = row?;
            let pairs = headers
                .iter()
                .enumerate()
                .map(|(i, h)| (h.clone(), row.get(i).unwrap_or("")));
            records.push(InputRecord::from_pairs(pairs));
        }
        Ok(Self { headers, records })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[InputRecord] {
        &self.records
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<InputRecord>) {
        (self.headers, self.records)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CampaignRow {
    pub name: String,
    pub objective: String,
    pub buy_type: String,
    /// Falls back to the configured default when blank.
    pub status: Option<String>,
}

impl CampaignRow {
    pub fn from_record(record: &InputRecord) -> Result<Self, CascadeError> {
        Ok(Self {
            name: record.required("campaign_name")?.to_string(),
            objective: record.required("objective")?.to_uppercase(),
            buy_type: record.required("buy_type")?.to_uppercase(),
            status: record.optional("campaign_status"),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdsetRow {
    pub name: String,
    pub budget: u64,
    pub frequency_cap: u32,
    pub prediction_mode: u32,
    pub start_date: String,
    pub end_date: String,
    /// Destination page; the configured page is used when blank.
    pub page: Option<PageId>,
    pub country: Option<String>,
    pub exclude_states: Vec<String>,
    pub exclude_cities: Vec<String>,
    pub age_min: u32,
    pub age_max: u32,
    pub genders: Vec<u8>,
    pub interests: Vec<String>,
    pub behaviors: Vec<String>,
    pub publisher_platforms: Vec<String>,
    pub facebook_positions: Vec<String>,
    pub instagram_positions: Vec<String>,
    pub device: String,
}

impl AdsetRow {
    /// Dates are kept raw here; the schedule normalizer owns their parsing.
    pub fn from_record(record: &InputRecord) -> Result<Self, CascadeError> {
        let age_min: u32 = record.number("age_min")?;
        let age_max: u32 = record.number("age_max")?;
        if age_min > age_max {
            return Err(CascadeError::validation(format!(
                "age_min {age_min} is greater than age_max {age_max}"
            )));
        }
        Ok(Self {
            name: record.required("adset_name")?.to_string(),
            budget: record.number("adset_budget_amount")?,
            frequency_cap: record.number("frequency_cap")?,
            prediction_mode: record.number("prediction_mode")?,
            start_date: record.get("start_date").to_string(),
            end_date: record.get("end_date").to_string(),
            page: record.optional("fbpage").map(|p| PageId::new(&p)),
            country: record.optional("country").map(|c| c.to_uppercase()),
            exclude_states: parse_list_cell(record.get("exclude_states")),
            exclude_cities: parse_list_cell(record.get("exclude_cities")),
            age_min,
            age_max,
            genders: parse_genders(record.get("gender"))?,
            interests: parse_list_cell(record.get("interests")),
            behaviors: parse_list_cell(record.get("behaviors")),
            publisher_platforms: parse_list_cell(record.get("publisher_platforms")),
            facebook_positions: parse_list_cell(record.get("facebook_positions")),
            instagram_positions: parse_list_cell(record.get("instagram_positions")),
            device: record.optional("device").unwrap_or_else(|| "ALL".to_string()),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdRow {
    pub name: String,
    pub status: Option<String>,
    /// Raw `ad_format`; validated when the creative is built.
    pub format: String,
    pub link: String,
    pub creative_link: Option<String>,
    pub primary_text: String,
    pub headline: String,
    pub description: String,
    pub call_to_action: String,
}

impl AdRow {
    pub fn from_record(record: &InputRecord) -> Result<Self, CascadeError> {
        Ok(Self {
            name: record.required("ad_name")?.to_string(),
            status: record.optional("ad_status"),
            format: record.required("ad_format")?.to_string(),
            link: record.required("link")?.to_string(),
            creative_link: record.optional("creative_link"),
            primary_text: record.get("primary_text").to_string(),
            headline: record.get("headline").to_string(),
            description: record.get("description").to_string(),
            call_to_action: record.required("call_to_action")?.to_string(),
        })
    }
}

/// Parse a list-valued cell.
///
/// Accepts JSON (`["a","b"]`), Python-style (`['a', 'b']`) and bare
/// comma-separated text (`a, b`). Blank cells are empty lists.
pub fn parse_list_cell(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }
    if let Ok(items) = serde_json::from_str::<Vec<String>>(raw) {
        return items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    let inner = raw
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(raw);
    inner
        .split(',')
        .map(|s| s.trim().trim_matches(|c: char| c == '\'' || c == '"').trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn clean_cell(raw: &str) -> String {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("nan") {
        String::new()
    } else {
        raw.to_string()
    }
}

/// Whole, non-negative numbers; spreadsheet exports often write `5000.0`.
fn parse_whole_number(raw: &str) -> Option<u64> {
    let raw = raw.trim().replace(',', "");
    if let Ok(n) = raw.parse::<u64>() {
        return Some(n);
    }
    let f = raw.parse::<f64>().ok()?;
    (f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64).then_some(f as u64)
}

fn parse_genders(raw: &str) -> Result<Vec<u8>, CascadeError> {
    match raw.trim().to_lowercase().as_str() {
        "" | "all" => Ok(Vec::new()),
        "male" | "men" | "1" => Ok(vec![1]),
        "female" | "women" | "2" => Ok(vec![2]),
        other => Err(CascadeError::validation(format!("unknown gender {other:?}"))),
    }
}
