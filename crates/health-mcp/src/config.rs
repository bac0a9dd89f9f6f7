//! Tool configuration.

use std::time::Duration;

use health_incidents::DEFAULT_PAGE_SIZE;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, ToolError};

/// Default Prometheus (or Thanos querier) endpoint.
pub const DEFAULT_PROMETHEUS_URL: &str = "http://localhost:9090";
/// Default Alertmanager endpoint.
pub const DEFAULT_ALERTMANAGER_URL: &str = "http://localhost:9093";
/// Default sampling step of range queries.
pub const DEFAULT_QUERY_STEP: Duration = Duration::from_secs(300);
/// Smallest accepted step. Range queries send the step in whole seconds.
pub const MIN_QUERY_STEP: Duration = Duration::from_secs(1);
/// Default and maximum lookback, 15 days.
pub const DEFAULT_TIME_RANGE_HOURS: u32 = 360;
/// Default bound on one whole tool call.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration of the `get_incidents` tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Prometheus API base URL.
    pub prometheus_url: String,
    /// Alertmanager API base URL.
    pub alertmanager_url: String,
    /// Incidents per page.
    pub page_size: usize,
    /// Sampling step of range queries.
    pub query_step: Duration,
    /// Lookback used when the caller gives no time range.
    pub default_time_range_hours: u32,
    /// Largest lookback a caller may request.
    pub max_time_range_hours: u32,
    /// Bound on one whole tool call.
    pub query_timeout: Duration,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            prometheus_url: DEFAULT_PROMETHEUS_URL.to_string(),
            alertmanager_url: DEFAULT_ALERTMANAGER_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            query_step: DEFAULT_QUERY_STEP,
            default_time_range_hours: DEFAULT_TIME_RANGE_HOURS,
            max_time_range_hours: DEFAULT_TIME_RANGE_HOURS,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }
}

impl ToolConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the Prometheus URL.
    #[must_use]
    pub fn with_prometheus_url(mut self, url: impl Into<String>) -> Self {
        self.prometheus_url = url.into();
        self
    }

    /// Sets the Alertmanager URL.
    #[must_use]
    pub fn with_alertmanager_url(mut self, url: impl Into<String>) -> Self {
        self.alertmanager_url = url.into();
        self
    }

    /// Sets the page size.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the range query step.
    #[must_use]
    pub const fn with_query_step(mut self, step: Duration) -> Self {
        self.query_step = step;
        self
    }

    /// Sets the default and maximum lookback in hours.
    #[must_use]
    pub const fn with_time_range_hours(mut self, default: u32, max: u32) -> Self {
        self.default_time_range_hours = default;
        self.max_time_range_hours = max;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::Config` describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        validate_url("prometheus_url", &self.prometheus_url)?;
        validate_url("alertmanager_url", &self.alertmanager_url)?;

        if self.page_size == 0 {
            return Err(ToolError::Config("page_size must be positive".to_string()));
        }
        if self.query_step < MIN_QUERY_STEP {
            return Err(ToolError::Config(format!(
                "query_step must be at least {}s, got {:?}",
                MIN_QUERY_STEP.as_secs(),
                self.query_step
            )));
        }
        if self.query_timeout.is_zero() {
            return Err(ToolError::Config(
                "query_timeout must be positive".to_string(),
            ));
        }
        if self.max_time_range_hours == 0 {
            return Err(ToolError::Config(
                "max_time_range_hours must be positive".to_string(),
            ));
        }
        if self.default_time_range_hours == 0
            || self.default_time_range_hours > self.max_time_range_hours
        {
            return Err(ToolError::Config(format!(
                "default_time_range_hours must be within 1..={}, got {}",
                self.max_time_range_hours, self.default_time_range_hours
            )));
        }
        Ok(())
    }
}

fn validate_url(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ToolError::Config(format!("{field} cannot be empty")));
    }
    let url = Url::parse(value)
        .map_err(|e| ToolError::Config(format!("{field} '{value}' is not a valid URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ToolError::Config(format!(
            "{field} must use http or https, got {}",
            url.scheme()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn default_config_is_valid() {
        let config = ToolConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.page_size, 20);
        assert_eq!(config.query_step, Duration::from_secs(300));
        assert_eq!(config.max_time_range_hours, 360);
    }

    #[test]
    fn builder_sets_fields() {
        let config = ToolConfig::new()
            .with_prometheus_url("https://thanos-querier:9091")
            .with_alertmanager_url("https://alertmanager-main:9094")
            .with_page_size(5)
            .with_query_step(Duration::from_secs(60))
            .with_time_range_hours(24, 48)
            .with_query_timeout(Duration::from_secs(5));
        assert!(config.validate().is_ok());
        assert_eq!(config.page_size, 5);
        assert_eq!(config.default_time_range_hours, 24);
        assert_eq!(config.max_time_range_hours, 48);
    }

    #[test_case(ToolConfig::new().with_page_size(0) ; "zero page size")]
    #[test_case(ToolConfig::new().with_query_step(Duration::ZERO) ; "zero step")]
    #[test_case(ToolConfig::new().with_query_step(Duration::from_millis(500)) ; "sub second step")]
    #[test_case(ToolConfig::new().with_query_timeout(Duration::ZERO) ; "zero timeout")]
    #[test_case(ToolConfig::new().with_prometheus_url("") ; "empty prometheus url")]
    #[test_case(ToolConfig::new().with_alertmanager_url("not a url") ; "malformed alertmanager url")]
    #[test_case(ToolConfig::new().with_prometheus_url("ftp://prom") ; "wrong scheme")]
    #[test_case(ToolConfig::new().with_time_range_hours(400, 360) ; "default above max")]
    #[test_case(ToolConfig::new().with_time_range_hours(0, 360) ; "zero default")]
    fn invalid_config_is_rejected(config: ToolConfig) {
        assert!(matches!(config.validate(), Err(ToolError::Config(_))));
    }
}
