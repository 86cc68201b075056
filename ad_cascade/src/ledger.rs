//! Result ledger: the input rows echoed back with ids and per-level logs.
//!
//! Every input record gets exactly one ledger row, in input order. A level's
//! log holds [`NO_ERROR`] on success or the failure text; a level that was
//! never reached keeps empty cells. The ledger is only written out once, by a
//! [`LedgerSink`], after the cascade finished.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use meta_ads::models::ids::{AdId, AdSetId, CampaignId, PredictionId};
use thiserror::Error;
use tracing::info;

use crate::{error::CascadeError, rows::InputRecord};

pub const NO_ERROR: &str = "NO ERROR";

/// Columns appended to the input columns, in output order.
pub const LEDGER_COLUMNS: [&str; 7] = [
    "campaign_logs",
    "campaign_id",
    "adset_logs",
    "adset_id",
    "prediction_id",
    "ad_logs",
    "ad_id",
];

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("failed to write ledger {path}: {source}")]
    Csv { path: String, source: csv::Error },
    #[error("ledger writer task did not finish: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// What the cascade recorded for one input row.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RowOutcome {
    pub campaign_logs: String,
    pub campaign_id: String,
    pub adset_logs: String,
    pub adset_id: String,
    pub prediction_id: String,
    pub ad_logs: String,
    pub ad_id: String,
}

impl RowOutcome {
    fn cells(&self) -> [&str; 7] {
        [
            &self.campaign_logs,
            &self.campaign_id,
            &self.adset_logs,
            &self.adset_id,
            &self.prediction_id,
            &self.ad_logs,
            &self.ad_id,
        ]
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResultLedger {
    headers: Vec<String>,
    records: Vec<InputRecord>,
    outcomes: Vec<RowOutcome>,
}

impl ResultLedger {
    /// Input columns that collide with ledger columns are dropped; the
    /// ledger's values replace them.
    pub fn new(headers: Vec<String>, records: Vec<InputRecord>) -> Self {
        let headers = headers
            .into_iter()
            .filter(|h| !LEDGER_COLUMNS.contains(&h.as_str()))
            .collect();
        let outcomes = vec![RowOutcome::default(); records.len()];
        Self {
            headers,
            records,
            outcomes,
        }
    }

    pub fn records(&self) -> &[InputRecord] {
        &self.records
    }

    pub fn outcome(&self, row: usize) -> &RowOutcome {
        &self.outcomes[row]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn campaign_created(&mut self, rows: &[usize], id: &CampaignId) {
        self.update(rows, |o| {
            o.campaign_logs = NO_ERROR.to_string();
            o.campaign_id = id.to_string();
        });
    }

    pub fn campaign_failed(&mut self, rows: &[usize], err: &CascadeError) {
        self.update(rows, |o| {
            o.campaign_logs = err.to_string();
            o.campaign_id.clear();
        });
    }

    pub fn prediction_submitted(&mut self, rows: &[usize], id: &PredictionId) {
        self.update(rows, |o| o.prediction_id = id.to_string());
    }

    pub fn adset_created(&mut self, rows: &[usize], id: &AdSetId) {
        self.update(rows, |o| {
            o.adset_logs = NO_ERROR.to_string();
            o.adset_id = id.to_string();
        });
    }

    /// Covers every failure between date parsing and ad set creation.
    pub fn adset_failed(&mut self, rows: &[usize], err: &CascadeError) {
        self.update(rows, |o| {
            o.adset_logs = err.to_string();
            o.adset_id.clear();
        });
    }

    pub fn ad_created(&mut self, rows: &[usize], id: &AdId) {
        self.update(rows, |o| {
            o.ad_logs = NO_ERROR.to_string();
            o.ad_id = id.to_string();
        });
    }

    pub fn ad_failed(&mut self, rows: &[usize], err: &CascadeError) {
        self.update(rows, |o| {
            o.ad_logs = err.to_string();
            o.ad_id.clear();
        });
    }

    fn update(&mut self, rows: &[usize], f: impl Fn(&mut RowOutcome)) {
        for &row in rows {
            if let Some(outcome) = self.outcomes.get_mut(row) {
                f(outcome);
            }
        }
    }

    /// Output header: input columns then [`LEDGER_COLUMNS`].
    pub fn header(&self) -> Vec<&str> {
        self.headers
            .iter()
            .map(String::as_str)
            .chain(LEDGER_COLUMNS)
            .collect()
    }

    /// Output rows aligned with [`ResultLedger::header`].
    pub fn rows(&self) -> impl Iterator<Item = Vec<&str>> + '_ {
        self.records.iter().zip(&self.outcomes).map(|(record, outcome)| {
            self.headers
                .iter()
                .map(|h| record.get(h))
                .chain(outcome.cells())
                .collect()
        })
    }
}

/// Destination of a finished ledger.
#[async_trait]
pub trait LedgerSink {
    /// What a successful write returns, e.g. the path written.
    type Output;

    async fn write(&self, ledger: &ResultLedger) -> Result<Self::Output, LedgerError>;
}

pub struct CsvLedgerSink {
    path: PathBuf,
}

impl CsvLedgerSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_sync(path: &Path, header: &[String], rows: &[Vec<String>]) -> Result<(), csv::Error> {
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record(header)?;
        for row in rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[async_trait]
impl LedgerSink for CsvLedgerSink {
    type Output = PathBuf;

    async fn write(&self, ledger: &ResultLedger) -> Result<PathBuf, LedgerError> {
        let header: Vec<String> = ledger.header().into_iter().map(String::from).collect();
        let rows: Vec<Vec<String>> = ledger
            .rows()
            .map(|row| row.into_iter().map(String::from).collect())
            .collect();
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || Self::write_sync(&path, &header, &rows))
            .await?
            .map_err(|source| LedgerError::Csv {
                path: self.path.display().to_string(),
                source,
            })?;
        info!(path = %self.path.display(), rows = ledger.len(), "ledger written");
        Ok(self.path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;

    fn ledger() -> ResultLedger {
        let headers = vec!["campaign_name".to_string(), "ad_id".to_string(), "note".to_string()];
        let records = vec![
            InputRecord::from_pairs([("campaign_name", "A"), ("ad_id", "stale"), ("note", "n1")]),
            InputRecord::from_pairs([("campaign_name", "B"), ("note", "n2")]),
        ];
        ResultLedger::new(headers, records)
    }

    #[test]
    fn colliding_input_columns_are_replaced() {
        let l = ledger();
        assert_eq!(
            l.header(),
            [
                "campaign_name", "note", "campaign_logs", "campaign_id", "adset_logs",
                "adset_id", "prediction_id", "ad_logs", "ad_id"
            ]
        );
        let first = l.rows().next().unwrap();
        assert_eq!(first.last(), Some(&""));
    }

    #[test]
    fn outcomes_are_scoped_to_rows() {
        let mut l = ledger();
        l.campaign_created(&[0], &CampaignId::new("c1"));
        l.campaign_failed(&[1], &CascadeError::submission(Stage::Campaign, "boom"));

        assert_eq!(l.outcome(0).campaign_logs, NO_ERROR);
        assert_eq!(l.outcome(0).campaign_id, "c1");
        assert_eq!(l.outcome(1).campaign_logs, "campaign creation failed: boom");
        assert!(l.outcome(1).campaign_id.is_empty());
        assert!(l.outcome(1).adset_logs.is_empty());
    }

    #[tokio::test]
    async fn csv_sink_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut l = ledger();
        l.ad_created(&[1], &AdId::new("ad9"));

        let written = CsvLedgerSink::new(&path).write(&l).await.unwrap();
        assert_eq!(written, path);

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("prediction_id,ad_logs,ad_id"));
        assert_eq!(lines[2], "B,n2,,,,,,NO ERROR,ad9");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn csv_sink_reports_the_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");

        let err = CsvLedgerSink::new(&path).write(&ledger()).await.unwrap_err();
        assert!(matches!(err, LedgerError::Csv { .. }));
        assert!(err.to_string().contains("out.csv"));
    }
}
