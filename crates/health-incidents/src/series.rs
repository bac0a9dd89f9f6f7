//! Range-query results and the gap-based resolution heuristic.
//!
//! This module provides the data handed over by the time-series backend:
//! - [`QueryRange`]: the query window and sampling step
//! - [`Sample`]: one (timestamp, value) pair
//! - [`Series`]: a labelled sequence of samples
//! - [`RangeVector`]: every series returned by one range query

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{IncidentError, Result};
use crate::labels::LabelSet;

/// PromQL for the incident grouping metric.
pub const GROUPING_QUERY: &str = "cluster_health_components_map";

/// PromQL for raw alert state, excluding alerts that have not fired yet.
pub const ALERTS_QUERY: &str = r#"ALERTS{alertstate!="pending"}"#;

/// PromQL for the console URL lookup.
pub const CONSOLE_URL_QUERY: &str = "console_url";

/// Label names used by the grouping metric and the alert series.
pub mod label {
    /// Incident correlation key assigned upstream.
    pub const GROUP_ID: &str = "group_id";
    /// Component touched by the alert.
    pub const COMPONENT: &str = "component";
    /// Prefix marking labels copied from the source alert.
    pub const SRC_PREFIX: &str = "src_";
    /// Source alert name on the grouping metric.
    pub const SRC_ALERTNAME: &str = "src_alertname";
    /// Source alert severity on the grouping metric.
    pub const SRC_SEVERITY: &str = "src_severity";
    /// Cluster name in multi-cluster deployments.
    pub const CLUSTER: &str = "cluster";
    /// Cluster id as exported by the backend.
    pub const CLUSTER_ID_SOURCE: &str = "clusterID";
    /// Cluster id as presented to callers.
    pub const CLUSTER_ID: &str = "cluster_id";
    /// Metric name.
    pub const METRIC_NAME: &str = "__name__";
    /// Scraping Prometheus instance.
    pub const PROMETHEUS: &str = "prometheus";
    /// Raw alert state.
    pub const ALERTSTATE: &str = "alertstate";
    /// Raw alert name.
    pub const ALERTNAME: &str = "alertname";
    /// Instance-scoped pod label.
    pub const POD: &str = "pod";
    /// Console URL value on the console metric.
    pub const URL: &str = "url";
}

/// Severity tag value marking unclassified noise.
pub const SEVERITY_NONE: &str = "none";

/// A query window with its sampling step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryRange {
    /// Window start.
    pub start: DateTime<Utc>,
    /// Window end, usually "now".
    pub end: DateTime<Utc>,
    /// Sampling step.
    pub step: TimeDelta,
}

impl QueryRange {
    /// Creates a new query range.
    ///
    /// # Errors
    ///
    /// Returns `IncidentError::UnexpectedShape` if start is after end or the
    /// step is not positive.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, step: TimeDelta) -> Result<Self> {
        if start > end {
            return Err(IncidentError::UnexpectedShape {
                reason: format!("query range start {start} is after end {end}"),
            });
        }
        if step <= TimeDelta::zero() {
            return Err(IncidentError::UnexpectedShape {
                reason: "query step must be positive".to_string(),
            });
        }
        Ok(Self { start, end, step })
    }

    /// Creates a range ending at `end` and reaching `lookback` into the past.
    ///
    /// # Errors
    ///
    /// Same as [`QueryRange::new`].
    pub fn ending_at(end: DateTime<Utc>, lookback: TimeDelta, step: TimeDelta) -> Result<Self> {
        Self::new(end - lookback, end, step)
    }

    /// Returns the resolution window of a series whose samples span
    /// `first..=last`.
    ///
    /// The start is the first sample. The series counts as ended at its last
    /// sample only if that sample lags the window end by more than one step;
    /// otherwise it is still being reported and has no end.
    #[must_use]
    pub fn sample_window(
        &self,
        first: DateTime<Utc>,
        last: DateTime<Utc>,
    ) -> (DateTime<Utc>, Option<DateTime<Utc>>) {
        let end = (self.end - last > self.step).then_some(last);
        (first, end)
    }
}

/// A single (timestamp, value) sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Sample time.
    pub timestamp: DateTime<Utc>,
    /// Sample value.
    pub value: f64,
}

impl Sample {
    /// Creates a new sample.
    #[must_use]
    pub const fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// A labelled, time-ordered sequence of samples.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Series {
    /// Series labels.
    pub labels: LabelSet,
    /// Samples in ascending time order.
    pub samples: Vec<Sample>,
}

impl Series {
    /// Creates a series from labels and samples.
    #[must_use]
    pub const fn new(labels: LabelSet, samples: Vec<Sample>) -> Self {
        Self { labels, samples }
    }

    /// Adds a sample and returns self for chaining.
    #[must_use]
    pub fn sample(mut self, timestamp: DateTime<Utc>, value: f64) -> Self {
        self.samples.push(Sample::new(timestamp, value));
        self
    }

    /// Returns the first and last samples, or `None` for an empty series.
    #[must_use]
    pub fn bounds(&self) -> Option<(&Sample, &Sample)> {
        Some((self.samples.first()?, self.samples.last()?))
    }
}

/// All series returned by one range query.
pub type RangeVector = Vec<Series>;

/// Formats a timestamp as RFC3339 with second precision in UTC.
#[must_use]
pub fn format_rfc3339(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parses a stored RFC3339 timestamp.
///
/// # Errors
///
/// Returns `IncidentError::InvalidTimestamp` naming `field` on failure.
pub fn parse_rfc3339(field: &'static str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| IncidentError::InvalidTimestamp {
            field,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn range() -> QueryRange {
        let end = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        QueryRange::ending_at(end, TimeDelta::minutes(30), TimeDelta::seconds(300)).unwrap()
    }

    #[test]
    fn range_rejects_inverted_window() {
        let now = Utc::now();
        let r = QueryRange::new(now, now - TimeDelta::minutes(1), TimeDelta::seconds(1));
        assert!(matches!(r, Err(IncidentError::UnexpectedShape { .. })));
    }

    #[test]
    fn range_rejects_zero_step() {
        let now = Utc::now();
        let r = QueryRange::new(now - TimeDelta::minutes(1), now, TimeDelta::zero());
        assert!(r.is_err());
    }

    #[test]
    fn sample_window_recent_sample_is_open() {
        let r = range();
        let last = r.end - TimeDelta::minutes(1);
        let (start, end) = r.sample_window(r.start, last);
        assert_eq!(start, r.start);
        assert_eq!(end, None);
    }

    #[test]
    fn sample_window_gap_larger_than_step_is_resolved() {
        let r = range();
        let last = r.end - TimeDelta::minutes(11);
        let (_, end) = r.sample_window(r.start, last);
        assert_eq!(end, Some(last));
    }

    #[test]
    fn sample_window_gap_equal_to_step_is_open() {
        let r = range();
        let last = r.end - r.step;
        let (_, end) = r.sample_window(r.start, last);
        assert_eq!(end, None);
    }

    #[test]
    fn series_bounds() {
        let r = range();
        let series = Series::default()
            .sample(r.start, 1.0)
            .sample(r.end, 2.0);
        let (first, last) = series.bounds().unwrap();
        assert_eq!(first.timestamp, r.start);
        assert_eq!(last.timestamp, r.end);
        assert!(Series::default().bounds().is_none());
    }

    #[test]
    fn rfc3339_roundtrip_truncates_to_seconds() {
        let t = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 5).unwrap()
            + TimeDelta::milliseconds(250);
        let formatted = format_rfc3339(t);
        assert_eq!(formatted, "2025-03-01T12:00:05Z");
        let parsed = parse_rfc3339("start_time", &formatted).unwrap();
        assert_eq!(parsed, t - TimeDelta::milliseconds(250));
    }

    #[test]
    fn parse_rfc3339_names_field() {
        match parse_rfc3339("end_time", "not-a-time") {
            Err(IncidentError::InvalidTimestamp { field, value, .. }) => {
                assert_eq!(field, "end_time");
                assert_eq!(value, "not-a-time");
            }
            other => panic!("expected InvalidTimestamp, got {other:?}"),
        }
    }
}
