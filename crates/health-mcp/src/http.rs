//! HTTP backends built from the tool configuration.

use std::sync::Arc;

use url::Url;

use crate::alertmanager::AlertmanagerClient;
use crate::auth::BearerToken;
use crate::backend::{BackendConnector, Backends};
use crate::config::ToolConfig;
use crate::error::{Result, ToolError};
use crate::prometheus::PrometheusClient;

/// Connects the Prometheus and Alertmanager HTTP clients.
///
/// One connection pool is shared by all requests; each request gets clients
/// bound to its caller's token.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    http: reqwest::Client,
    prometheus: Url,
    alertmanager: Url,
}

impl HttpConnector {
    /// Creates a connector from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::Config` if a URL does not parse or the HTTP client
    /// cannot be built.
    pub fn new(config: &ToolConfig) -> Result<Self> {
        let parse = |field: &str, value: &str| {
            Url::parse(value).map_err(|e| ToolError::Config(format!("{field}: {e}")))
        };
        let http = reqwest::Client::builder()
            .timeout(config.query_timeout)
            .build()
            .map_err(|e| ToolError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            prometheus: parse("prometheus_url", &config.prometheus_url)?,
            alertmanager: parse("alertmanager_url", &config.alertmanager_url)?,
        })
    }
}

impl BackendConnector for HttpConnector {
    fn connect(&self, token: &BearerToken) -> Result<Backends> {
        Ok(Backends::new(
            Arc::new(PrometheusClient::new(
                self.http.clone(),
                self.prometheus.clone(),
                token.clone(),
            )),
            Arc::new(AlertmanagerClient::new(
                self.http.clone(),
                self.alertmanager.clone(),
                token.clone(),
            )),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connects_with_default_config() {
        let connector = HttpConnector::new(&ToolConfig::default()).unwrap();
        let token = BearerToken::new("t").unwrap();
        assert!(connector.connect(&token).is_ok());
    }

    #[test]
    fn rejects_unparsable_url() {
        let config = ToolConfig::default().with_prometheus_url("::not a url::");
        assert!(matches!(
            HttpConnector::new(&config),
            Err(ToolError::Config(_))
        ));
    }
}
