//! Incident correlation and pagination for cluster health alerts.
//!
//! `health-incidents` turns the per-alert series of a grouping metric into
//! incident records, enriches them with live alert state and silences, and
//! pages through the result with a resumable keyset cursor.
//!
//! # Features
//!
//! - **Severity Scale**: ordered levels with max-wins escalation
//! - **Label Matching**: subset matching across pod- and cluster-scoped duplicates
//! - **Incident Builder**: folds noisy, gap-sampled series into active or resolved incidents
//! - **Alert Enrichment**: live status, time window and silenced flag per member alert
//! - **Pagination**: deterministic `(start_time, group_id)` keyset pages
//!
//! # Example
//!
//! ```rust
//! use chrono::{TimeDelta, Utc};
//! use health_incidents::{
//!     ConsoleUrls, LabelSet, QueryRange, Response, Series, Severity, build_incidents,
//!     enrich_incidents, filter_by_severity, paginate,
//! };
//!
//! let range = QueryRange::ending_at(Utc::now(), TimeDelta::hours(1), TimeDelta::seconds(300))
//!     .unwrap();
//!
//! let grouping = vec![
//!     Series::new(
//!         LabelSet::from([
//!             ("group_id", "g1"),
//!             ("component", "monitoring"),
//!             ("src_alertname", "KubePodCrashLooping"),
//!             ("src_namespace", "openshift-monitoring"),
//!             ("src_severity", "warning"),
//!         ]),
//!         vec![],
//!     )
//!     .sample(range.end - TimeDelta::minutes(1), 1.0),
//! ];
//!
//! let incidents = build_incidents(&grouping, range, &ConsoleUrls::new());
//! let incidents = enrich_incidents(incidents, &[], &[], &range);
//! let incidents = filter_by_severity(incidents, Severity::Warning);
//! let page = paginate(incidents, None, 20, range.start.timestamp());
//!
//! let text = Response::from_page(page).unwrap().render().unwrap();
//! assert!(text.contains("<DATA>"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod builder;
pub mod console;
pub mod enrichment;
pub mod error;
pub mod incident;
pub mod labels;
pub mod pagination;
pub mod response;
pub mod series;
pub mod severity;

pub use builder::{IncidentBuilder, IncidentMap, build_incidents, source_labels};
pub use console::{ConsoleUrls, DEFAULT_CLUSTER};
pub use enrichment::{Enricher, LiveAlert, enrich_incidents, filter_by_severity};
pub use error::{IncidentError, Result};
pub use incident::{Incident, Status};
pub use labels::{LabelMatcher, LabelSet};
pub use pagination::{DEFAULT_PAGE_SIZE, Page, PaginationCursor, UNDATED_START, paginate};
pub use response::{DATA_CLOSE, DATA_OPEN, Incidents, Response, extract_data};
pub use series::{
    ALERTS_QUERY, CONSOLE_URL_QUERY, GROUPING_QUERY, QueryRange, RangeVector, Sample, Series,
};
pub use severity::Severity;
