//! The `get_incidents` tool handler.
//!
//! One call runs the whole pipeline:
//! 1. extract the caller's bearer token and validate parameters
//! 2. read the grouping metric, console URLs, raw alerts and silences
//!    concurrently
//! 3. build, enrich, filter and page the incidents
//! 4. render the page as text with an embedded JSON block

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use health_incidents::{
    ALERTS_QUERY, CONSOLE_URL_QUERY, ConsoleUrls, GROUPING_QUERY, LabelSet, PaginationCursor,
    QueryRange, RangeVector, Response, Severity, build_incidents, enrich_incidents,
    filter_by_severity, paginate,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::BearerToken;
use crate::backend::{BackendConnector, Backends};
use crate::config::ToolConfig;
use crate::error::{Result, ToolError};

/// Name of the tool.
pub const TOOL_NAME: &str = "get_incidents";

/// Parameters of a `get_incidents` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetIncidentsParams {
    /// Lookback in hours. Missing or zero means the configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<u32>,
    /// Lowest severity to report. Missing or empty means `healthy`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_severity: Option<String>,
    /// Cursor returned by the previous page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl GetIncidentsParams {
    /// Sets the lookback in hours.
    #[must_use]
    pub const fn with_time_range(mut self, hours: u32) -> Self {
        self.time_range = Some(hours);
        self
    }

    /// Sets the severity threshold.
    #[must_use]
    pub fn with_min_severity(mut self, severity: impl Into<String>) -> Self {
        self.min_severity = Some(severity.into());
        self
    }

    /// Sets the pagination cursor.
    #[must_use]
    pub fn with_next_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.next_cursor = Some(cursor.into());
        self
    }

    /// Validates the parameters against the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::InvalidParams` for an out-of-range time range and
    /// the underlying incident error for a bad severity or cursor.
    pub fn resolve(&self, config: &ToolConfig) -> Result<ResolvedParams> {
        let hours = match self.time_range {
            None | Some(0) => config.default_time_range_hours,
            Some(h) if h <= config.max_time_range_hours => h,
            Some(h) => {
                return Err(ToolError::InvalidParams {
                    param: "time_range",
                    reason: format!("{h} exceeds the maximum of {}", config.max_time_range_hours),
                });
            }
        };

        let min_severity = match self.min_severity.as_deref().map(str::trim) {
            None | Some("") => Severity::Healthy,
            Some(name) => name.parse()?,
        };

        let cursor = match self.next_cursor.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(token) => Some(PaginationCursor::decode(token)?),
        };

        Ok(ResolvedParams {
            lookback: TimeDelta::hours(i64::from(hours)),
            min_severity,
            cursor,
        })
    }
}

/// Validated call parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParams {
    /// Query window length.
    pub lookback: TimeDelta,
    /// Inclusive severity threshold.
    pub min_severity: Severity,
    /// Position to resume from.
    pub cursor: Option<PaginationCursor>,
}

impl ResolvedParams {
    /// Builds the query window ending at `now`.
    ///
    /// A continuation page reuses the session start carried by the cursor.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::InvalidParams` if the cursor's session start lies
    /// in the future.
    pub fn window(&self, now: DateTime<Utc>, step: TimeDelta) -> Result<QueryRange> {
        let start = match &self.cursor {
            Some(cursor) => DateTime::from_timestamp(cursor.time_start, 0)
                .filter(|start| *start <= now)
                .ok_or_else(|| ToolError::InvalidParams {
                    param: "next_cursor",
                    reason: format!("session start {} is not in the past", cursor.time_start),
                })?,
            None => now - self.lookback,
        };
        Ok(QueryRange::new(start, now, step)?)
    }
}

/// A tool call: headers of the transport request plus tool parameters.
#[derive(Debug, Clone, Default)]
pub struct ToolRequest {
    /// Request headers as (name, value) pairs.
    pub headers: Vec<(String, String)>,
    /// Tool parameters.
    pub params: GetIncidentsParams,
}

impl ToolRequest {
    /// Creates a request with the given parameters and no headers.
    #[must_use]
    pub fn new(params: GetIncidentsParams) -> Self {
        Self {
            headers: Vec::new(),
            params,
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    fn token(&self) -> Result<BearerToken> {
        BearerToken::from_headers(
            self.headers
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str())),
        )
    }
}

/// Results of the backend reads of one call.
#[derive(Debug)]
struct BackendReads {
    grouping: RangeVector,
    console: ConsoleUrls,
    alerts: RangeVector,
    silences: Vec<LabelSet>,
}

/// Serves `get_incidents` calls.
pub struct IncidentTool {
    config: ToolConfig,
    connector: Arc<dyn BackendConnector>,
}

impl std::fmt::Debug for IncidentTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncidentTool")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl IncidentTool {
    /// Creates the tool.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::Config` if the configuration is invalid.
    pub fn new(config: ToolConfig, connector: Arc<dyn BackendConnector>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, connector })
    }

    /// Returns the tool configuration.
    #[must_use]
    pub const fn config(&self) -> &ToolConfig {
        &self.config
    }

    /// Handles one call and returns the text result.
    ///
    /// # Errors
    ///
    /// See [`get_incidents`](Self::get_incidents).
    pub async fn call(&self, request: &ToolRequest, cancel: &CancellationToken) -> Result<String> {
        let response = self.get_incidents(request, cancel).await?;
        Ok(response.render()?)
    }

    /// Handles one call and returns the structured response.
    ///
    /// # Errors
    ///
    /// Fails on a missing or malformed token, invalid parameters, any failed
    /// grouping, alert or silence read, timeout and cancellation. A failed
    /// console URL lookup only drops the incident deep links.
    pub async fn get_incidents(
        &self,
        request: &ToolRequest,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        let token = request.token()?;
        let params = request.params.resolve(&self.config)?;
        let step = TimeDelta::from_std(self.config.query_step)
            .map_err(|e| ToolError::Config(format!("query_step: {e}")))?;
        let range = params.window(Utc::now(), step)?;
        let backends = self.connector.connect(&token)?;

        info!(
            start = %range.start,
            end = %range.end,
            min_severity = %params.min_severity,
            resume = params.cursor.is_some(),
            "get_incidents request"
        );

        let timeout = self.config.query_timeout;
        let reads = tokio::select! {
            () = cancel.cancelled() => return Err(ToolError::Cancelled),
            result = tokio::time::timeout(timeout, read_backends(&backends, &range)) => {
                result.map_err(|_| ToolError::Timeout { secs: timeout.as_secs() })??
            }
        };

        let incidents = build_incidents(&reads.grouping, range, &reads.console);
        let built = incidents.len();
        let incidents = enrich_incidents(incidents, &reads.alerts, &reads.silences, &range);
        let incidents = filter_by_severity(incidents, params.min_severity);
        let matching = incidents.len();
        let page = paginate(
            incidents,
            params.cursor.as_ref(),
            self.config.page_size,
            range.start.timestamp(),
        );
        let response = Response::from_page(page)?;

        info!(
            built,
            matching,
            returned = response.incidents.total,
            more = !response.next_cursor.is_empty(),
            "get_incidents response"
        );
        Ok(response)
    }
}

/// Issues the four backend reads concurrently.
///
/// The first failing required read aborts the others.
async fn read_backends(backends: &Backends, range: &QueryRange) -> Result<BackendReads> {
    let metrics = backends.metrics.as_ref();

    let console = async {
        let urls = match metrics.query_instant(CONSOLE_URL_QUERY).await {
            Ok(results) => ConsoleUrls::from_results(&results).map_err(ToolError::from),
            Err(e) => Err(e),
        };
        Ok::<_, ToolError>(urls.unwrap_or_else(|e| {
            warn!(error = %e, "console URL lookup failed, incidents will have no links");
            ConsoleUrls::new()
        }))
    };

    let (grouping, alerts, silences, console) = tokio::try_join!(
        metrics.query_range(GROUPING_QUERY, range),
        metrics.query_range(ALERTS_QUERY, range),
        backends.silences.silenced_alerts(),
        console,
    )?;

    debug!(
        grouping = grouping.len(),
        alerts = alerts.len(),
        silences = silences.len(),
        consoles = console.len(),
        "backend reads complete"
    );

    Ok(BackendReads {
        grouping,
        console,
        alerts,
        silences,
    })
}
