//! Position records: the upstream shape, the persisted row, and the mapping
//! between them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use tracing::warn;

/// `directAt` values that mark an express service.
const EXPRESS_MARKERS: &[&str] = &["1", "7"];
const LAST_TRAIN_MARKER: &str = "1";

/// One train position exactly as the realtime position API reports it.
///
/// Every field is optional on the wire; [`PositionRecord::try_from_raw`]
/// decides which ones are required.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RawPosition {
    #[serde(default, deserialize_with = "lenient_string")]
    pub subway_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub subway_nm: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub statn_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub statn_nm: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub train_no: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub last_recptn_dt: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub recptn_dt: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub updn_line: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub statn_tid: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub statn_tnm: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub train_sttus: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub direct_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub lstcar_at: Option<String>,
}

/// Accepts a string, a number, or null. Anything else is a malformed record.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Option::<Scalar>::deserialize(deserializer)? {
        None => None,
        Some(Scalar::Text(s)) => Some(s),
        Some(Scalar::Int(n)) => Some(n.to_string()),
        Some(Scalar::Float(f)) => Some(f.to_string()),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("record is not a valid position object: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("record is missing required field `{0}`")]
    MissingField(&'static str),
}

/// A row of `realtime_subway_positions` minus the store-assigned columns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PositionRecord {
    pub line_id: String,
    pub line_name: Option<String>,
    pub station_id: Option<String>,
    pub station_name: String,
    pub train_number: String,
    pub last_received_date: Option<String>,
    pub last_received_time: Option<String>,
    pub direction_type: i32,
    pub destination_station_id: Option<String>,
    pub destination_station_name: Option<String>,
    pub train_status_code: Option<i32>,
    pub is_express: bool,
    pub is_last_train: bool,
}

impl PositionRecord {
    pub fn try_from_raw(raw: RawPosition) -> Result<Self, MappingError> {
        let line_id = required(raw.subway_id, "subwayId")?;
        let train_number = required(raw.train_no, "trainNo")?;
        let station_name = required(raw.statn_nm, "statnNm")?;
        let direction = raw.updn_line.ok_or(MappingError::MissingField("updnLine"))?;

        Ok(PositionRecord {
            line_id,
            line_name: raw.subway_nm,
            station_id: raw.statn_id,
            station_name,
            train_number,
            last_received_date: raw.last_recptn_dt,
            last_received_time: raw.recptn_dt,
            direction_type: parse_code(&direction).unwrap_or(0),
            destination_station_id: raw.statn_tid,
            destination_station_name: raw.statn_tnm,
            train_status_code: raw.train_sttus.as_deref().and_then(parse_code),
            is_express: raw
                .direct_at
                .as_deref()
                .is_some_and(|v| EXPRESS_MARKERS.contains(&v.trim())),
            is_last_train: raw.lstcar_at.as_deref().map(str::trim) == Some(LAST_TRAIN_MARKER),
        })
    }

    /// Maps one untyped list item from an API response.
    pub fn try_from_value(value: serde_json::Value) -> Result<Self, MappingError> {
        let raw: RawPosition = serde_json::from_value(value)?;
        Self::try_from_raw(raw)
    }

    pub fn status(&self) -> Option<TrainStatus> {
        self.train_status_code.and_then(TrainStatus::from_code)
    }

    pub fn direction(&self) -> Direction {
        Direction::from_code(self.direction_type)
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, MappingError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(MappingError::MissingField(field))
}

/// Digits only, like the upstream codes; anything else is "not a code".
fn parse_code(value: &str) -> Option<i32> {
    let value = value.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

/// Result of mapping a whole API response.
#[derive(Debug, Default)]
pub struct MappedBatch {
    pub records: Vec<PositionRecord>,
    pub skipped: usize,
}

/// Maps every item independently; a bad item is logged and counted, never fatal.
pub fn map_positions(items: Vec<serde_json::Value>) -> MappedBatch {
    let mut batch = MappedBatch::default();

    for (index, item) in items.into_iter().enumerate() {
        match PositionRecord::try_from_value(item) {
            Ok(record) => batch.records.push(record),
            Err(e) => {
                warn!(index, error = %e, "Skipping malformed position record");
                batch.skipped += 1;
            }
        }
    }

    batch
}

/// A persisted observation, with the store-assigned insertion time that all
/// analysis treats as the event time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PositionEvent {
    #[serde(flatten)]
    pub record: PositionRecord,
    pub created_at: DateTime<Utc>,
}

impl PositionEvent {
    pub fn status(&self) -> Option<TrainStatus> {
        self.record.status()
    }

    pub fn direction(&self) -> Direction {
        self.record.direction()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrainStatus {
    Entering,
    Arrived,
    Departed,
}

impl TrainStatus {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(TrainStatus::Entering),
            1 => Some(TrainStatus::Arrived),
            2 => Some(TrainStatus::Departed),
            _ => None,
        }
    }
}

/// Line-relative direction: `0` is up/inner, anything else down/outer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
    UpInner,
    DownOuter,
}

impl Direction {
    pub fn from_code(code: i32) -> Self {
        if code == 0 {
            Direction::UpInner
        } else {
            Direction::DownOuter
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::UpInner => f.write_str("Up/Inner"),
            Direction::DownOuter => f.write_str("Down/Outer"),
        }
    }
}
