//! Console URL resolution for incident deep links.

use std::collections::HashMap;

use crate::error::{IncidentError, Result};
use crate::labels::LabelSet;
use crate::series::label;

/// Key used for the console of a single-cluster deployment.
pub const DEFAULT_CLUSTER: &str = "default";

/// Console base URLs keyed by cluster id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsoleUrls {
    urls: HashMap<String, String>,
}

impl ConsoleUrls {
    /// Creates an empty lookup; incidents built against it get no deep link.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a lookup with a single default console.
    #[must_use]
    pub fn single(url: impl Into<String>) -> Self {
        let mut urls = HashMap::new();
        urls.insert(DEFAULT_CLUSTER.to_string(), url.into());
        Self { urls }
    }

    /// Builds the lookup from `console_url` query results.
    ///
    /// Each result carries a `url` label and, in multi-cluster deployments,
    /// a `clusterID` label. Results without a cluster id map to the default
    /// console. Results without a URL are ignored.
    ///
    /// # Errors
    ///
    /// Returns `IncidentError::UnexpectedShape` if no result carried a URL.
    pub fn from_results(results: &[LabelSet]) -> Result<Self> {
        let urls: HashMap<String, String> = results
            .iter()
            .filter_map(|ls| {
                let url = ls.get(label::URL).filter(|u| !u.is_empty())?;
                let cluster = ls
                    .get(label::CLUSTER_ID_SOURCE)
                    .filter(|c| !c.is_empty())
                    .unwrap_or(DEFAULT_CLUSTER);
                Some((cluster.to_string(), url.to_string()))
            })
            .collect();

        if urls.is_empty() {
            return Err(IncidentError::UnexpectedShape {
                reason: "console_url not found".to_string(),
            });
        }
        Ok(Self { urls })
    }

    /// Returns the console URL for a cluster id, falling back to the default
    /// console when the id is empty or unknown.
    #[must_use]
    pub fn lookup(&self, cluster_id: &str) -> Option<&str> {
        if !cluster_id.is_empty() {
            if let Some(url) = self.urls.get(cluster_id) {
                return Some(url.as_str());
            }
        }
        self.urls.get(DEFAULT_CLUSTER).map(String::as_str)
    }

    /// Returns the incident deep link for a group in a cluster, if a console
    /// is known.
    #[must_use]
    pub fn incident_url(&self, cluster_id: &str, group_id: &str) -> Option<String> {
        self.lookup(cluster_id)
            .map(|base| format!("{base}/monitoring/incidents?groupId={group_id}"))
    }

    /// Returns the number of known consoles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Returns true if no console is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
