//! The incident record reported to callers.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::labels::LabelSet;
use crate::series::{format_rfc3339, parse_rfc3339};
use crate::severity::Severity;

/// Whether an incident or alert is still active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// At least one member is still being reported.
    #[default]
    Firing,
    /// Every member stopped reporting before the window end.
    Resolved,
}

impl Status {
    /// Returns the status as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Firing => "firing",
            Self::Resolved => "resolved",
        }
    }

    /// Derives the status from an optional end time.
    #[must_use]
    pub const fn from_end<T>(end: Option<&T>) -> Self {
        if end.is_some() {
            Self::Resolved
        } else {
            Self::Firing
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A deduplicated group of related alerts sharing a root cause.
///
/// Timestamps are stored in their RFC3339 wire form; an empty `end_time`
/// means the incident is still active.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    /// Upstream-assigned correlation key.
    #[serde(rename = "id")]
    pub group_id: String,
    /// Highest severity observed among member alerts.
    pub severity: Severity,
    /// Earliest start among member series.
    pub start_time: String,
    /// Derived from `end_time`.
    pub status: Status,
    /// Latest end among member series, empty while active.
    pub end_time: String,
    /// Cluster name in multi-cluster deployments.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cluster: String,
    /// Cluster id in multi-cluster deployments.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cluster_id: String,
    /// Console deep link, empty when no console URL was resolved.
    #[serde(rename = "url_details")]
    pub url: String,
    /// Member alert label sets.
    pub alerts: Vec<LabelSet>,
    /// Sorted, deduplicated component names.
    pub affected_components: Vec<String>,
}

impl Incident {
    /// Creates an active incident with the given id and severity.
    #[must_use]
    pub fn new(group_id: impl Into<String>, severity: Severity) -> Self {
        Self {
            group_id: group_id.into(),
            severity,
            ..Self::default()
        }
    }

    /// Returns true if the incident is still active.
    #[must_use]
    pub fn is_firing(&self) -> bool {
        self.end_time.is_empty()
    }

    /// Raises the severity if `severity` is strictly higher.
    pub fn escalate(&mut self, severity: Severity) {
        if severity > self.severity {
            self.severity = severity;
        }
    }

    /// Moves the start time earlier if `start` precedes the stored one.
    ///
    /// An empty stored start is simply replaced.
    ///
    /// # Errors
    ///
    /// Returns `IncidentError::InvalidTimestamp` if the stored start time is
    /// malformed; the stored value is left untouched.
    pub fn update_start_time(&mut self, start: DateTime<Utc>) -> Result<()> {
        if self.start_time.is_empty() {
            self.start_time = format_rfc3339(start);
            return Ok(());
        }
        let existing = parse_rfc3339("start_time", &self.start_time)?;
        if start < existing {
            self.start_time = format_rfc3339(start);
        }
        Ok(())
    }

    /// Folds a member's end time into the incident's end time.
    ///
    /// - A member without an end keeps the whole incident active.
    /// - An already active incident stays active.
    /// - Otherwise the later of the two ends wins.
    ///
    /// # Errors
    ///
    /// Returns `IncidentError::InvalidTimestamp` if the stored end time is
    /// malformed; the stored value is left untouched.
    pub fn update_end_time(&mut self, end: Option<DateTime<Utc>>) -> Result<()> {
        let Some(end) = end else {
            self.end_time.clear();
            return Ok(());
        };
        if self.end_time.is_empty() {
            return Ok(());
        }
        let existing = parse_rfc3339("end_time", &self.end_time)?;
        if end > existing {
            self.end_time = format_rfc3339(end);
        }
        Ok(())
    }

    /// Recomputes `status` from `end_time`.
    pub fn update_status(&mut self) {
        self.status = if self.is_firing() {
            Status::Firing
        } else {
            Status::Resolved
        };
    }

    /// Returns the start time as Unix seconds, if it parses.
    #[must_use]
    pub fn start_unix(&self) -> Option<i64> {
        parse_rfc3339("start_time", &self.start_time)
            .ok()
            .map(|t| t.timestamp())
    }
}
