use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Whether the session currently holds a server-accepted login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticated,
}

/// Filter for the asynchronous request listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestState {
    Submitted,
    Complete,
}

impl RequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestState::Submitted => "submitted",
            RequestState::Complete => "complete",
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Graphite render output in `json-array` format.
///
/// Each row of `datapoints` is `[timestamp, value_for_target_0, value_for_target_1, ...]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RenderedSeries {
    pub targets: Vec<String>,
    pub datapoints: Vec<Vec<Option<f64>>>,
}

/// One sample of a single target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataPoint {
    pub timestamp: DateTime<Utc>,
    pub value: Option<f64>,
}

impl RenderedSeries {
    pub fn is_empty(&self) -> bool {
        self.datapoints.is_empty()
    }

    /// Samples for the target at `index`, skipping rows without a timestamp.
    pub fn series_at(&self, index: usize) -> Vec<DataPoint> {
        self.datapoints
            .iter()
            .filter_map(|row| {
                let ts = row.first().copied().flatten()?;
                let timestamp = Utc.timestamp_opt(ts as i64, 0).single()?;
                Some(DataPoint {
                    timestamp,
                    value: row.get(index + 1).copied().flatten(),
                })
            })
            .collect()
    }

    /// Samples for the named target.
    pub fn series(&self, target: &str) -> Option<Vec<DataPoint>> {
        let index = self.targets.iter().position(|t| t == target)?;
        Some(self.series_at(index))
    }

    /// Most recent non-null value of the target at `index`.
    pub fn latest(&self, index: usize) -> Option<f64> {
        self.datapoints
            .iter()
            .rev()
            .find_map(|row| row.get(index + 1).copied().flatten())
    }
}

/// Entry returned by Graphite metrics discovery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricNode {
    /// Full metric path, usable as a detail-query identifier
    pub id: String,
    /// Last path component (e.g. "cpu0", "vda1", "eth0")
    #[serde(default)]
    pub text: String,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}
