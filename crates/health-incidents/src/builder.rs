//! Folding grouping-metric series into incidents.
//!
//! Every series of the grouping metric describes one source alert assigned
//! to one incident (`group_id`). The [`IncidentBuilder`] folds them into one
//! [`Incident`] per group:
//! - components and alert label sets are deduplicated
//! - severity escalates to the maximum seen
//! - the start moves to the earliest member start
//! - any still-active member keeps the incident active

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::console::ConsoleUrls;
use crate::incident::Incident;
use crate::labels::LabelSet;
use crate::series::{QueryRange, SEVERITY_NONE, Series, format_rfc3339, label};
use crate::severity::Severity;

/// Incidents keyed by group id.
pub type IncidentMap = HashMap<String, Incident>;

/// One member series reduced to what the fold needs.
#[derive(Debug)]
struct Member<'s> {
    component: &'s str,
    alert: LabelSet,
    severity: Severity,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
}

/// An incident under construction plus its dedup sets.
#[derive(Debug)]
struct Accumulator {
    incident: Incident,
    components: BTreeSet<String>,
    alert_keys: HashSet<String>,
}

impl Accumulator {
    fn open(incident: Incident) -> Self {
        Self {
            incident,
            components: BTreeSet::new(),
            alert_keys: HashSet::new(),
        }
    }

    fn fold(&mut self, member: Member<'_>) {
        if self.components.insert(member.component.to_string()) {
            self.incident.affected_components = self.components.iter().cloned().collect();
        }

        if self.alert_keys.insert(member.alert.to_string()) {
            self.incident.alerts.push(member.alert);
        }

        self.incident.escalate(member.severity);

        if let Err(e) = self.incident.update_start_time(member.start) {
            warn!(
                group_id = %self.incident.group_id,
                error = %e,
                "failed to update incident start time"
            );
        }
        if let Err(e) = self.incident.update_end_time(member.end) {
            warn!(
                group_id = %self.incident.group_id,
                error = %e,
                "failed to update incident end time"
            );
        }
        self.incident.update_status();
    }
}

/// Builds incidents from grouping-metric series over one query window.
#[derive(Debug)]
pub struct IncidentBuilder<'a> {
    range: QueryRange,
    console: &'a ConsoleUrls,
    incidents: HashMap<String, Accumulator>,
    skipped: usize,
}

impl<'a> IncidentBuilder<'a> {
    /// Creates a builder for the given window and console lookup.
    #[must_use]
    pub fn new(range: QueryRange, console: &'a ConsoleUrls) -> Self {
        Self {
            range,
            console,
            incidents: HashMap::new(),
            skipped: 0,
        }
    }

    /// Folds one series into its incident.
    ///
    /// Series tagged with severity `none`, series whose last sample does not
    /// map to a classified severity, series without samples and series
    /// without a group id are skipped.
    pub fn fold(&mut self, series: &Series) {
        let labels = &series.labels;
        let alertname = labels.value(label::SRC_ALERTNAME);

        if labels.value(label::SRC_SEVERITY) == SEVERITY_NONE {
            debug!(alert = %alertname, "skipping alert with unknown severity");
            self.skipped += 1;
            return;
        }

        let Some((first, last)) = series.bounds() else {
            debug!(alert = %alertname, "skipping series without samples");
            self.skipped += 1;
            return;
        };

        let severity = Severity::from_sample(last.value);
        if severity == Severity::None {
            debug!(alert = %alertname, value = last.value, "skipping unclassified sample");
            self.skipped += 1;
            return;
        }

        let group_id = labels.value(label::GROUP_ID);
        if group_id.is_empty() {
            warn!(alert = %alertname, "skipping series without group id");
            self.skipped += 1;
            return;
        }

        let (start, end) = self.range.sample_window(first.timestamp, last.timestamp);
        let member = Member {
            component: labels.value(label::COMPONENT),
            alert: source_labels(labels),
            severity,
            start,
            end,
        };

        match self.incidents.entry(group_id.to_string()) {
            Entry::Occupied(mut entry) => {
                let acc = entry.get_mut();
                fill_cluster(&mut acc.incident, labels);
                acc.fold(member);
            }
            Entry::Vacant(entry) => {
                let mut incident = Incident::new(group_id, severity);
                incident.start_time = format_rfc3339(start);
                incident.end_time = end.map(format_rfc3339).unwrap_or_default();
                fill_cluster(&mut incident, labels);
                incident.url = self
                    .console
                    .incident_url(&incident.cluster_id, group_id)
                    .unwrap_or_default();
                entry.insert(Accumulator::open(incident)).fold(member);
            }
        }
    }

    /// Folds every series in order.
    pub fn fold_all<'s, I>(&mut self, series: I)
    where
        I: IntoIterator<Item = &'s Series>,
    {
        for s in series {
            self.fold(s);
        }
    }

    /// Returns the number of incidents built so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    /// Returns true if no incident has been built.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }

    /// Returns the number of series skipped as noise.
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.skipped
    }

    /// Finishes construction, dropping the dedup sets.
    #[must_use]
    pub fn finish(self) -> IncidentMap {
        self.incidents
            .into_iter()
            .map(|(id, acc)| (id, acc.incident))
            .collect()
    }
}

/// Builds incidents from a whole grouping-metric query result.
#[must_use]
pub fn build_incidents(series: &[Series], range: QueryRange, console: &ConsoleUrls) -> IncidentMap {
    let mut builder = IncidentBuilder::new(range, console);
    builder.fold_all(series);
    debug!(
        incidents = builder.len(),
        skipped = builder.skipped(),
        "built incidents"
    );
    builder.finish()
}

/// Returns the `src_*` labels of a grouping series with the prefix stripped.
///
/// Bookkeeping labels such as `group_id` and `component` are dropped.
#[must_use]
pub fn source_labels(labels: &LabelSet) -> LabelSet {
    labels
        .iter()
        .filter_map(|(k, v)| {
            k.strip_prefix(label::SRC_PREFIX)
                .filter(|name| !name.is_empty())
                .map(|name| (name.to_string(), v.to_string()))
        })
        .collect()
}

fn fill_cluster(incident: &mut Incident, labels: &LabelSet) {
    if incident.cluster.is_empty() {
        incident.cluster = labels.value(label::CLUSTER).to_string();
    }
    if incident.cluster_id.is_empty() {
        incident.cluster_id = labels
            .get(label::CLUSTER_ID_SOURCE)
            .or_else(|| labels.get(label::CLUSTER_ID))
            .unwrap_or_default()
            .to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incident::Status;
    use chrono::TimeDelta;
    use proptest::prelude::*;

    fn window() -> QueryRange {
        QueryRange::ending_at(Utc::now(), TimeDelta::minutes(30), TimeDelta::seconds(300))
            .unwrap()
    }

    fn ago(r: &QueryRange, minutes: i64) -> DateTime<Utc> {
        r.end - TimeDelta::minutes(minutes)
    }

    fn grouping(group: &str, alert: &str, severity: &str, component: &str, ns: &str) -> LabelSet {
        let mut labels = LabelSet::from([
            ("group_id", group),
            ("src_alertname", alert),
            ("src_severity", severity),
            ("component", component),
        ]);
        if !ns.is_empty() {
            labels.insert("src_namespace", ns);
        }
        labels
    }

    fn alert(name: &str, ns: &str, severity: &str) -> LabelSet {
        LabelSet::from([("alertname", name), ("namespace", ns), ("severity", severity)])
    }

    mod fold_tests {
        use super::*;

        #[test]
        fn two_alerts_with_same_group_are_one_incident() {
            let r = window();
            let series = vec![
                Series::new(
                    grouping("1", "Alert1", "warning", "monitoring", "openshift-monitoring"),
                    vec![],
                )
                .sample(ago(&r, 1), 0.0),
                Series::new(
                    grouping("1", "Alert2", "warning", "console", "openshift-console"),
                    vec![],
                )
                .sample(ago(&r, 1), 0.0),
            ];

            let incidents = build_incidents(&series, r, &ConsoleUrls::new());
            assert_eq!(incidents.len(), 1);
            let inc = &incidents["1"];
            assert_eq!(inc.severity, Severity::Healthy);
            assert_eq!(inc.status, Status::Firing);
            assert_eq!(inc.start_time, format_rfc3339(ago(&r, 1)));
            assert_eq!(inc.end_time, "");
            assert_eq!(inc.affected_components, vec!["console", "monitoring"]);
            assert_eq!(
                inc.alerts,
                vec![
                    alert("Alert1", "openshift-monitoring", "warning"),
                    alert("Alert2", "openshift-console", "warning"),
                ]
            );
            assert_eq!(inc.url, "");
        }

        #[test]
        fn same_component_is_listed_once_and_severity_escalates() {
            let r = window();
            let series = vec![
                Series::new(
                    grouping("1", "Alert1", "warning", "monitoring", "openshift-monitoring"),
                    vec![],
                )
                .sample(ago(&r, 1), 1.0),
                Series::new(
                    grouping("1", "Alert2", "warning", "monitoring", "openshift-monitoring"),
                    vec![],
                )
                .sample(ago(&r, 1), 0.0),
            ];

            let incidents = build_incidents(&series, r, &ConsoleUrls::new());
            let inc = &incidents["1"];
            assert_eq!(inc.severity, Severity::Warning);
            assert_eq!(inc.affected_components, vec!["monitoring"]);
            assert_eq!(inc.alerts.len(), 2);
        }

        #[test]
        fn none_severity_is_ignored_and_resolution_follows_gaps() {
            let r = window();
            let series = vec![
                Series::new(
                    grouping("1", "Alert2", "warning", "console", "openshift-console"),
                    vec![],
                )
                .sample(ago(&r, 25), 1.0),
                Series::new(grouping("2", "Alert3", "none", "none", ""), vec![])
                    .sample(ago(&r, 1), 0.0),
                Series::new(
                    grouping("1", "Alert1", "critical", "monitoring", "openshift-monitoring"),
                    vec![],
                )
                .sample(ago(&r, 25), 2.0)
                .sample(ago(&r, 11), 2.0),
                Series::new(
                    grouping("2", "Alert4", "warning", "console", "openshift-console"),
                    vec![],
                )
                .sample(ago(&r, 15), 1.0),
            ];

            let incidents = build_incidents(&series, r, &ConsoleUrls::new());
            assert_eq!(incidents.len(), 2);

            let first = &incidents["1"];
            assert_eq!(first.severity, Severity::Critical);
            assert_eq!(first.status, Status::Resolved);
            assert_eq!(first.start_time, format_rfc3339(ago(&r, 25)));
            assert_eq!(first.end_time, format_rfc3339(ago(&r, 11)));
            assert_eq!(first.affected_components, vec!["console", "monitoring"]);
            assert_eq!(
                first.alerts,
                vec![
                    alert("Alert2", "openshift-console", "warning"),
                    alert("Alert1", "openshift-monitoring", "critical"),
                ]
            );

            let second = &incidents["2"];
            assert_eq!(second.severity, Severity::Warning);
            assert_eq!(second.status, Status::Resolved);
            assert_eq!(second.start_time, format_rfc3339(ago(&r, 15)));
            assert_eq!(second.end_time, format_rfc3339(ago(&r, 15)));
            assert_eq!(second.affected_components, vec!["console"]);
            assert_eq!(second.alerts, vec![alert("Alert4", "openshift-console", "warning")]);
        }

        #[test]
        fn duplicate_alert_labels_are_recorded_once() {
            let r = window();
            let labels = grouping("1", "Alert1", "warning", "monitoring", "ns");
            let series = vec![
                Series::new(labels.clone(), vec![]).sample(ago(&r, 2), 1.0),
                Series::new(labels, vec![]).sample(ago(&r, 1), 1.0),
            ];
            let incidents = build_incidents(&series, r, &ConsoleUrls::new());
            assert_eq!(incidents["1"].alerts.len(), 1);
        }

        #[test]
        fn active_member_wins_regardless_of_order() {
            let r = window();
            let active = Series::new(grouping("1", "A", "warning", "c", "ns"), vec![])
                .sample(ago(&r, 20), 1.0)
                .sample(ago(&r, 1), 1.0);
            let resolved = Series::new(grouping("1", "B", "warning", "c", "ns"), vec![])
                .sample(ago(&r, 20), 1.0)
                .sample(ago(&r, 12), 1.0);

            for order in [
                vec![active.clone(), resolved.clone()],
                vec![resolved.clone(), active.clone()],
            ] {
                let incidents = build_incidents(&order, r, &ConsoleUrls::new());
                assert_eq!(incidents["1"].end_time, "");
                assert_eq!(incidents["1"].status, Status::Firing);
            }
        }

        #[test]
        fn series_without_samples_or_group_are_skipped() {
            let r = window();
            let series = vec![
                Series::new(grouping("1", "A", "warning", "c", "ns"), vec![]),
                Series::new(grouping("", "B", "warning", "c", "ns"), vec![])
                    .sample(ago(&r, 1), 1.0),
                Series::new(grouping("2", "C", "warning", "c", "ns"), vec![])
                    .sample(ago(&r, 1), -1.0),
            ];
            let console = ConsoleUrls::new();
            let mut builder = IncidentBuilder::new(r, &console);
            builder.fold_all(&series);
            assert!(builder.is_empty());
            assert_eq!(builder.skipped(), 3);
        }

        #[test]
        fn url_uses_console_of_incident_cluster() {
            let r = window();
            let mut labels = grouping("g1", "A", "warning", "c", "ns");
            labels.insert("clusterID", "B");
            labels.insert("cluster", "cluster-b");
            let series = vec![Series::new(labels, vec![]).sample(ago(&r, 1), 1.0)];
            let console = ConsoleUrls::from_results(&[
                LabelSet::from([("url", "a.url"), ("clusterID", "A")]),
                LabelSet::from([("url", "b.url"), ("clusterID", "B")]),
            ])
            .unwrap();

            let incidents = build_incidents(&series, r, &console);
            let inc = &incidents["g1"];
            assert_eq!(inc.cluster_id, "B");
            assert_eq!(inc.cluster, "cluster-b");
            assert_eq!(inc.url, "b.url/monitoring/incidents?groupId=g1");
        }

        #[test]
        fn malformed_stored_start_is_kept_and_fold_continues() {
            let r = window();
            let console = ConsoleUrls::new();
            let mut builder = IncidentBuilder::new(r, &console);
            builder.fold(
                &Series::new(grouping("1", "A", "warning", "a", "ns"), vec![])
                    .sample(ago(&r, 10), 1.0),
            );
            if let Some(acc) = builder.incidents.get_mut("1") {
                acc.incident.start_time = "corrupt".to_string();
            }
            builder.fold(
                &Series::new(grouping("1", "B", "critical", "b", "ns"), vec![])
                    .sample(ago(&r, 20), 2.0),
            );

            let incidents = builder.finish();
            let inc = &incidents["1"];
            assert_eq!(inc.start_time, "corrupt");
            assert_eq!(inc.severity, Severity::Critical);
            assert_eq!(inc.affected_components, vec!["a", "b"]);
        }
    }

    mod label_tests {
        use super::*;

        #[test]
        fn source_labels_strip_prefix_and_bookkeeping() {
            let labels = LabelSet::from([
                ("group_id", "1"),
                ("component", "monitoring"),
                ("layer", "core"),
                ("src_alertname", "A"),
                ("src_namespace", "ns"),
                ("src_severity", "warning"),
                ("src_", "ignored"),
            ]);
            assert_eq!(source_labels(&labels), alert("A", "ns", "warning"));
        }
    }

    mod property_tests {
        use super::*;

        fn member_strategy() -> impl Strategy<Value = (String, u8, u8, i64)> {
            (
                prop::sample::select(vec!["etcd", "console", "monitoring", "network"]),
                0u8..3,
                0u8..4,
                1i64..29,
            )
                .prop_map(|(component, alert, value, minutes)| {
                    (component.to_string(), alert, value, minutes)
                })
        }

        fn to_series(r: &QueryRange, members: &[(String, u8, u8, i64)]) -> Vec<Series> {
            members
                .iter()
                .map(|(component, alert, value, minutes)| {
                    let severity = if *value == 3 { "none" } else { "warning" };
                    Series::new(
                        grouping("g", &format!("Alert{alert}"), severity, component, "ns"),
                        vec![],
                    )
                    .sample(ago(r, *minutes), f64::from(*value))
                })
                .collect()
        }

        proptest! {
            #[test]
            fn severity_is_max_and_components_sorted_for_any_order(
                members in prop::collection::vec(member_strategy(), 1..12),
            ) {
                let r = window();
                let series = to_series(&r, &members);
                let mut reversed = series.clone();
                reversed.reverse();

                let forward = build_incidents(&series, r, &ConsoleUrls::new());
                let backward = build_incidents(&reversed, r, &ConsoleUrls::new());

                let kept: Vec<_> = members.iter().filter(|m| m.2 != 3).collect();
                if kept.is_empty() {
                    prop_assert!(forward.is_empty());
                    return Ok(());
                }

                let expected_severity = kept
                    .iter()
                    .map(|m| Severity::from_sample(f64::from(m.2)))
                    .max();
                let mut expected_components: Vec<String> =
                    kept.iter().map(|m| m.0.clone()).collect();
                expected_components.sort();
                expected_components.dedup();

                for incidents in [&forward, &backward] {
                    let inc = &incidents["g"];
                    prop_assert_eq!(Some(inc.severity), expected_severity);
                    prop_assert_eq!(&inc.affected_components, &expected_components);
                    prop_assert_eq!(inc.status == Status::Firing, inc.end_time.is_empty());
                }
                prop_assert_eq!(&forward["g"].start_time, &backward["g"].start_time);
                prop_assert_eq!(&forward["g"].end_time, &backward["g"].end_time);
            }

            #[test]
            fn none_series_never_contribute(
                members in prop::collection::vec(member_strategy(), 1..12),
            ) {
                let r = window();
                let series = to_series(&r, &members);
                let incidents = build_incidents(&series, r, &ConsoleUrls::new());
                for inc in incidents.values() {
                    for alert in &inc.alerts {
                        prop_assert_ne!(alert.get("severity"), Some("none"));
                    }
                }
            }
        }
    }
}
