//! Enriching incident member alerts with live alert state and silences.
//!
//! Member alerts recorded by the builder carry only the labels known at
//! grouping time. Enrichment replaces them with the live alert instances they
//! match, each flagged with its status, time window and silenced state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::builder::IncidentMap;
use crate::incident::{Incident, Status};
use crate::labels::{LabelMatcher, LabelSet};
use crate::series::{QueryRange, Series, format_rfc3339, label};
use crate::severity::Severity;

/// Label names added to enriched alerts.
pub mod display {
    /// Alert name, renamed from `alertname`.
    pub const NAME: &str = "name";
    /// `firing` or `resolved`.
    pub const STATUS: &str = "status";
    /// Earliest start of the alert.
    pub const START_TIME: &str = "start_time";
    /// End of a resolved alert.
    pub const END_TIME: &str = "end_time";
    /// `"true"` if the alert is silenced.
    pub const SILENCED: &str = "silenced";
}

/// Labels never shown to callers.
const HIDDEN_LABELS: [&str; 4] = [
    label::METRIC_NAME,
    label::PROMETHEUS,
    label::ALERTSTATE,
    label::POD,
];

/// A live alert instance taken from the raw alert-state query.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveAlert {
    /// Instance labels with `clusterID` renamed to `cluster_id`.
    pub labels: LabelSet,
    /// Derived from `end`.
    pub status: Status,
    /// First sample in the window.
    pub start: DateTime<Utc>,
    /// Last sample, if it lags the window end by more than one step.
    pub end: Option<DateTime<Utc>>,
}

impl LiveAlert {
    /// Normalizes one raw alert series. Returns `None` for a series without
    /// samples.
    #[must_use]
    pub fn from_series(series: &Series, range: &QueryRange) -> Option<Self> {
        let (first, last) = series.bounds()?;
        let (start, end) = range.sample_window(first.timestamp, last.timestamp);
        Some(Self {
            labels: normalize_labels(&series.labels),
            status: Status::from_end(end.as_ref()),
            start,
            end,
        })
    }

    /// Returns the caller-facing identity of this alert: its labels without
    /// internal and instance-scoped labels, with `alertname` shown as `name`.
    #[must_use]
    pub fn identity(&self) -> LabelSet {
        let mut identity = self.labels.clone();
        for name in HIDDEN_LABELS {
            identity.remove(name);
        }
        identity.rename(label::ALERTNAME, display::NAME);
        identity
    }
}

/// Renames the backend cluster id label to its caller-facing name.
#[must_use]
pub fn normalize_labels(labels: &LabelSet) -> LabelSet {
    let mut normalized = labels.clone();
    normalized.rename(label::CLUSTER_ID_SOURCE, label::CLUSTER_ID);
    normalized
}

/// Live alert instances merged under one displayed identity.
#[derive(Debug)]
struct MergedAlert {
    identity: LabelSet,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
    firing: bool,
    silenced: bool,
}

impl MergedAlert {
    fn open(identity: LabelSet, alert: &LiveAlert, silenced: bool) -> Self {
        Self {
            identity,
            start: alert.start,
            end: alert.end,
            firing: alert.status == Status::Firing,
            silenced,
        }
    }

    fn merge(&mut self, alert: &LiveAlert, silenced: bool) {
        self.start = self.start.min(alert.start);
        self.firing |= alert.status == Status::Firing;
        self.end = match (self.end, alert.end) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        self.silenced &= silenced;
    }

    fn into_labels(self) -> LabelSet {
        let status = if self.firing {
            Status::Firing
        } else {
            Status::Resolved
        };
        let mut labels = self
            .identity
            .with(display::STATUS, status.as_str())
            .with(display::START_TIME, format_rfc3339(self.start))
            .with(display::SILENCED, self.silenced.to_string());
        if let (false, Some(end)) = (self.firing, self.end) {
            labels.insert(display::END_TIME, format_rfc3339(end));
        }
        labels
    }
}

/// Matches incident member alerts against live alerts and silences.
#[derive(Debug, Clone, Default)]
pub struct Enricher {
    alerts: Vec<LiveAlert>,
    silences: Vec<LabelSet>,
}

impl Enricher {
    /// Creates an enricher from the raw alert-state series and the silence
    /// list, both as returned by their backends.
    #[must_use]
    pub fn new(raw_alerts: &[Series], silences: &[LabelSet], range: &QueryRange) -> Self {
        let alerts: Vec<LiveAlert> = raw_alerts
            .iter()
            .filter_map(|s| LiveAlert::from_series(s, range))
            .collect();
        let silences = silences.iter().map(normalize_labels).collect();
        Self { alerts, silences }
    }

    /// Returns true if any silence entry is a subset of the alert's labels.
    #[must_use]
    pub fn is_silenced(&self, alert: &LiveAlert) -> bool {
        LabelMatcher::any(&self.silences, &alert.labels)
    }

    /// Returns the live alerts matching one member alert of an incident.
    ///
    /// The member's labels are extended with the incident's cluster id so
    /// that only alerts from the incident's own cluster are picked up.
    #[must_use]
    pub fn matching<'s>(&'s self, member: &LabelSet, cluster_id: &str) -> Vec<&'s LiveAlert> {
        let mut reference = member.clone();
        if !cluster_id.is_empty() {
            reference.insert(label::CLUSTER_ID, cluster_id);
        }
        let matcher = LabelMatcher::new(&reference);
        self.alerts
            .iter()
            .filter(|a| matcher.matches(&a.labels))
            .collect()
    }

    /// Replaces the incident's member alerts with their enriched live
    /// instances.
    ///
    /// Instances sharing a displayed identity are merged: earliest start,
    /// firing if any instance fires, silenced only if every instance is.
    pub fn enrich(&self, incident: &mut Incident) {
        let mut merged: Vec<MergedAlert> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for member in &incident.alerts {
            for alert in self.matching(member, &incident.cluster_id) {
                let silenced = self.is_silenced(alert);
                let identity = alert.identity();
                let key = identity.to_string();
                if let Some(&i) = index.get(&key) {
                    merged[i].merge(alert, silenced);
                } else {
                    index.insert(key, merged.len());
                    merged.push(MergedAlert::open(identity, alert, silenced));
                }
            }
        }

        if merged.is_empty() {
            debug!(group_id = %incident.group_id, "no live alerts matched incident");
        }
        incident.alerts = merged.into_iter().map(MergedAlert::into_labels).collect();
    }
}

/// Enriches every incident of the map and returns them as a list.
///
/// Each incident is enriched independently, so an alert shared between
/// incidents shows up in each of them.
#[must_use]
pub fn enrich_incidents(
    incidents: IncidentMap,
    raw_alerts: &[Series],
    silences: &[LabelSet],
    range: &QueryRange,
) -> Vec<Incident> {
    let enricher = Enricher::new(raw_alerts, silences, range);
    incidents
        .into_values()
        .map(|mut incident| {
            enricher.enrich(&mut incident);
            incident
        })
        .collect()
}

/// Keeps incidents whose severity is at or above `min`.
#[must_use]
pub fn filter_by_severity(incidents: Vec<Incident>, min: Severity) -> Vec<Incident> {
    incidents
        .into_iter()
        .filter(|i| i.severity.meets(min))
        .collect()
}
