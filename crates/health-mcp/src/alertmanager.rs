//! Alertmanager v2 API client for the silence list.

use health_incidents::LabelSet;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::auth::BearerToken;
use crate::backend::{BackendFuture, SilenceBackend};
use crate::error::{Result, ToolError};
use crate::prometheus::endpoint;

const BACKEND: &str = "alertmanager";

/// Query selecting only silenced alerts.
const SILENCED_ONLY: [(&str, &str); 3] = [
    ("silenced", "true"),
    ("active", "false"),
    ("inhibited", "false"),
];

#[derive(Debug, Deserialize)]
struct GettableAlert {
    labels: LabelSet,
}

/// Parses a `GET /api/v2/alerts` response into alert label sets.
///
/// # Errors
///
/// Returns `ToolError::UnexpectedShape` if the body is not a list of alerts.
pub fn parse_alerts(body: &[u8]) -> Result<Vec<LabelSet>> {
    let alerts: Vec<GettableAlert> = serde_json::from_slice(body)
        .map_err(|e| ToolError::shape(BACKEND, format!("malformed alert list: {e}")))?;
    Ok(alerts.into_iter().map(|a| a.labels).collect())
}

/// Alertmanager client authenticated as the caller.
#[derive(Debug, Clone)]
pub struct AlertmanagerClient {
    http: reqwest::Client,
    base: Url,
    token: BearerToken,
}

impl AlertmanagerClient {
    /// Creates a client for the API at `base`.
    pub fn new(http: reqwest::Client, base: Url, token: BearerToken) -> Self {
        Self { http, base, token }
    }
}

impl SilenceBackend for AlertmanagerClient {
    fn silenced_alerts(&self) -> BackendFuture<'_, Vec<LabelSet>> {
        Box::pin(async move {
            let url = endpoint(&self.base, "api/v2/alerts", BACKEND)?;
            debug!(url = %url, "listing silenced alerts");

            let response = self
                .http
                .get(url)
                .bearer_auth(self.token.expose())
                .query(&SILENCED_ONLY)
                .send()
                .await
                .map_err(|e| ToolError::backend(BACKEND, e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(ToolError::backend(BACKEND, format!("HTTP {status}")));
            }
            let body = response
                .bytes()
                .await
                .map_err(|e| ToolError::backend(BACKEND, e))?;
            parse_alerts(&body)
        })
    }
}
