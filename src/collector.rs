//! The write path: poll each target line, map the rows, insert the batch.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tracing::{error, info, warn};

use crate::output::append_record;
use crate::position::map_positions;
use crate::scheduler::Job;
use crate::services::{FetchError, PositionApi, PositionStore};

/// What happened to one line during one collection pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Inserted { rows: usize, skipped: usize },
    NoData,
    TransportError(String),
    DecodeError(String),
    /// Every record in the response was malformed.
    MappingError { skipped: usize },
    StoreError(String),
}

impl LineOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            LineOutcome::Inserted { .. } => "inserted",
            LineOutcome::NoData => "no_data",
            LineOutcome::TransportError(_) => "transport_error",
            LineOutcome::DecodeError(_) => "decode_error",
            LineOutcome::MappingError { .. } => "mapping_error",
            LineOutcome::StoreError(_) => "store_error",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, LineOutcome::Inserted { .. })
    }
}

impl fmt::Display for LineOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineOutcome::Inserted { rows, skipped: 0 } => write!(f, "Success ({rows} rows)"),
            LineOutcome::Inserted { rows, skipped } => {
                write!(f, "Success ({rows} rows, {skipped} skipped)")
            }
            LineOutcome::NoData => f.write_str("No data"),
            LineOutcome::TransportError(e) => write!(f, "API error: {e}"),
            LineOutcome::DecodeError(e) => write!(f, "API response unreadable: {e}"),
            LineOutcome::MappingError { skipped } => {
                write!(f, "All {skipped} records malformed")
            }
            LineOutcome::StoreError(e) => write!(f, "Failed to insert DB: {e}"),
        }
    }
}

/// Outcomes of one pass over all target lines, in polling order.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub lines: Vec<(String, LineOutcome)>,
}

impl CycleReport {
    pub fn rows_inserted(&self) -> usize {
        self.lines
            .iter()
            .map(|(_, outcome)| match outcome {
                LineOutcome::Inserted { rows, .. } => *rows,
                _ => 0,
            })
            .sum()
    }

    pub fn failed_lines(&self) -> usize {
        self.lines.iter().filter(|(_, o)| !o.is_success()).count()
    }
}

/// One CSV row of the optional per-cycle summary.
#[derive(Debug, Serialize)]
pub struct CycleRecord<'a> {
    pub timestamp: DateTime<Utc>,
    pub line_name: &'a str,
    pub outcome: &'static str,
    pub rows: usize,
    pub skipped: usize,
    pub error_message: Option<String>,
}

impl<'a> CycleRecord<'a> {
    pub fn new(timestamp: DateTime<Utc>, line_name: &'a str, outcome: &LineOutcome) -> Self {
        let (rows, skipped, error_message) = match outcome {
            LineOutcome::Inserted { rows, skipped } => (*rows, *skipped, None),
            LineOutcome::NoData => (0, 0, None),
            LineOutcome::MappingError { skipped } => (0, *skipped, None),
            LineOutcome::TransportError(e)
            | LineOutcome::DecodeError(e)
            | LineOutcome::StoreError(e) => (0, 0, Some(e.clone())),
        };
        Self {
            timestamp,
            line_name,
            outcome: outcome.kind(),
            rows,
            skipped,
            error_message,
        }
    }
}

/// Polls every target line in order and persists what it gets.
///
/// Lines are handled strictly one after another; a failure on one line never
/// stops the others.
pub struct Collector<A, S> {
    api: A,
    store: S,
    lines: Vec<String>,
    summary_path: Option<String>,
}

impl<A: PositionApi, S: PositionStore> Collector<A, S> {
    pub fn new(api: A, store: S, lines: Vec<String>) -> Self {
        Self {
            api,
            store,
            lines,
            summary_path: None,
        }
    }

    /// Append one CSV row per line outcome to `path` after every cycle.
    pub fn with_summary_csv(mut self, path: impl Into<String>) -> Self {
        self.summary_path = Some(path.into());
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    #[tracing::instrument(skip(self))]
    pub async fn collect_line(&self, line_name: &str) -> LineOutcome {
        let items = match self.api.realtime_positions(line_name).await {
            Ok(items) => items,
            Err(FetchError::NoPositionList { .. }) => return LineOutcome::NoData,
            Err(FetchError::Decode(e)) => return LineOutcome::DecodeError(e.to_string()),
            Err(e) => return LineOutcome::TransportError(e.to_string()),
        };

        if items.is_empty() {
            return LineOutcome::NoData;
        }

        let batch = map_positions(items);
        if batch.records.is_empty() {
            warn!(skipped = batch.skipped, "No usable records in response");
            return LineOutcome::MappingError {
                skipped: batch.skipped,
            };
        }

        match self.store.insert_positions(&batch.records).await {
            Ok(rows) => {
                info!(rows, skipped = batch.skipped, "Inserted positions");
                LineOutcome::Inserted {
                    rows,
                    skipped: batch.skipped,
                }
            }
            Err(e) => {
                error!(error = %e, records = batch.records.len(), "Failed to insert positions");
                LineOutcome::StoreError(e.to_string())
            }
        }
    }

    pub async fn run_cycle(&self) -> CycleReport {
        let started_at = Utc::now();
        info!(lines = self.lines.len(), "Starting data collection job");

        let mut lines = Vec::with_capacity(self.lines.len());
        for line_name in &self.lines {
            let outcome = self.collect_line(line_name).await;
            info!(line = %line_name, outcome = %outcome, "Line done");
            lines.push((line_name.clone(), outcome));
        }

        let report = CycleReport { started_at, lines };
        info!(
            rows = report.rows_inserted(),
            failed_lines = report.failed_lines(),
            "Job finished"
        );
        report
    }

    fn write_summary(&self, report: &CycleReport) {
        let Some(path) = &self.summary_path else {
            return;
        };

        for (line_name, outcome) in &report.lines {
            let record = CycleRecord::new(report.started_at, line_name, outcome);
            if let Err(e) = append_record(path, &record) {
                error!(path = %path, error = %e, "Failed to append cycle summary");
                return;
            }
        }
    }
}

#[async_trait]
impl<A: PositionApi, S: PositionStore> Job for Collector<A, S> {
    async fn run(&mut self) {
        let report = self.run_cycle().await;
        self.write_summary(&report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::store::SqlStore;
    use crate::position::{PositionEvent, PositionRecord};
    use crate::services::StoreError;
    use serde_json::{Value, json};
    use std::collections::HashMap;

    /// Serves a fixed answer per line name.
    struct FakeApi {
        answers: HashMap<String, fn() -> Result<Vec<Value>, FetchError>>,
    }

    #[async_trait]
    impl PositionApi for FakeApi {
        async fn realtime_positions(&self, line_name: &str) -> Result<Vec<Value>, FetchError> {
            match self.answers.get(line_name) {
                Some(answer) => answer(),
                None => Err(FetchError::NoPositionList { message: None }),
            }
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl PositionStore for BrokenStore {
        async fn insert_positions(&self, _: &[PositionRecord]) -> Result<usize, StoreError> {
            Err(StoreError::Status {
                status: 503,
                body: "down".to_string(),
            })
        }

        async fn fetch_recent(&self, _: &str, _: usize) -> Result<Vec<PositionEvent>, StoreError> {
            Ok(Vec::new())
        }
    }

    fn position(train: &str, direct_at: &str) -> Value {
        json!({
            "subwayId": "1009", "subwayNm": "9호선", "statnId": "1009000915",
            "statnNm": "여의도", "trainNo": train, "lastRecptnDt": "20240101",
            "recptnDt": "2024-01-01 08:00:00", "updnLine": "0", "statnTid": "1009000938",
            "statnTnm": "중앙보훈병원", "trainSttus": "1", "directAt": direct_at, "lstcarAt": "0"
        })
    }

    fn three_good() -> Result<Vec<Value>, FetchError> {
        Ok(vec![position("9001", "1"), position("9002", "0"), position("9003", "7")])
    }

    fn one_bad_of_four() -> Result<Vec<Value>, FetchError> {
        Ok(vec![
            position("9001", "1"),
            json!({"subwayId": "1009", "statnNm": "여의도"}),
            position("9002", "0"),
            position("9003", "0"),
        ])
    }

    fn all_bad() -> Result<Vec<Value>, FetchError> {
        Ok(vec![json!(1), json!({"trainNo": "1"})])
    }

    fn empty() -> Result<Vec<Value>, FetchError> {
        Ok(Vec::new())
    }

    fn undecodable() -> Result<Vec<Value>, FetchError> {
        Err(FetchError::Decode(serde_json::from_str::<Value>("{").unwrap_err()))
    }

    fn unreachable_host() -> Result<Vec<Value>, FetchError> {
        Err(FetchError::InvalidUrl("relative URL without a base".to_string()))
    }

    fn api(pairs: &[(&str, fn() -> Result<Vec<Value>, FetchError>)]) -> FakeApi {
        FakeApi {
            answers: pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    async fn memory_store() -> SqlStore {
        SqlStore::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_inserts_every_well_formed_record() {
        let collector = Collector::new(api(&[("9호선", three_good)]), memory_store().await, vec![]);

        let outcome = collector.collect_line("9호선").await;
        assert_eq!(outcome, LineOutcome::Inserted { rows: 3, skipped: 0 });

        let events = collector.store().fetch_recent("1009", 10).await.unwrap();
        assert_eq!(events.len(), 3);
        let express: Vec<bool> = {
            let mut by_train: Vec<_> = events
                .iter()
                .map(|e| (e.record.train_number.clone(), e.record.is_express))
                .collect();
            by_train.sort();
            by_train.into_iter().map(|(_, x)| x).collect()
        };
        assert_eq!(express, vec![true, false, true]);
    }

    #[tokio::test]
    async fn test_malformed_record_does_not_block_batch() {
        let collector =
            Collector::new(api(&[("9호선", one_bad_of_four)]), memory_store().await, vec![]);

        let outcome = collector.collect_line("9호선").await;
        assert_eq!(outcome, LineOutcome::Inserted { rows: 3, skipped: 1 });
        assert_eq!(collector.store().count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_failure_kinds_are_distinguishable() {
        let collector = Collector::new(
            api(&[
                ("bad", all_bad),
                ("empty", empty),
                ("garbled", undecodable),
                ("offline", unreachable_host),
            ]),
            memory_store().await,
            vec![],
        );

        assert_eq!(
            collector.collect_line("bad").await,
            LineOutcome::MappingError { skipped: 2 }
        );
        assert_eq!(collector.collect_line("empty").await, LineOutcome::NoData);
        assert_eq!(collector.collect_line("missing").await, LineOutcome::NoData);
        assert!(matches!(
            collector.collect_line("garbled").await,
            LineOutcome::DecodeError(_)
        ));
        assert!(matches!(
            collector.collect_line("offline").await,
            LineOutcome::TransportError(_)
        ));
    }

    #[tokio::test]
    async fn test_store_failure_is_reported_not_raised() {
        let collector = Collector::new(api(&[("9호선", three_good)]), BrokenStore, vec![]);
        let outcome = collector.collect_line("9호선").await;
        assert!(matches!(outcome, LineOutcome::StoreError(ref e) if e.contains("503")));
    }

    #[tokio::test]
    async fn test_cycle_continues_past_failing_lines() {
        let collector = Collector::new(
            api(&[("garbled", undecodable), ("9호선", three_good)]),
            memory_store().await,
            vec!["garbled".to_string(), "9호선".to_string(), "missing".to_string()],
        );

        let report = collector.run_cycle().await;
        let kinds: Vec<_> = report.lines.iter().map(|(_, o)| o.kind()).collect();
        assert_eq!(kinds, vec!["decode_error", "inserted", "no_data"]);
        assert_eq!(report.rows_inserted(), 3);
        assert_eq!(report.failed_lines(), 2);
    }

    #[tokio::test]
    async fn test_job_appends_summary_csv() {
        let path = format!(
            "{}/subway_monitor_cycle_summary_test.csv",
            std::env::temp_dir().display()
        );
        let _ = std::fs::remove_file(&path);

        let mut collector = Collector::new(
            api(&[("9호선", three_good)]),
            memory_store().await,
            vec!["9호선".to_string(), "missing".to_string()],
        )
        .with_summary_csv(&path);

        collector.run().await;

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("timestamp,line_name,outcome"));
        assert!(lines[1].contains("9호선,inserted,3,0"));
        assert!(lines[2].contains("missing,no_data,0,0"));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(
            LineOutcome::Inserted { rows: 5, skipped: 0 }.to_string(),
            "Success (5 rows)"
        );
        assert_eq!(LineOutcome::NoData.to_string(), "No data");
    }
}
