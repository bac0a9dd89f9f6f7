//! Prometheus HTTP API client.

use chrono::{DateTime, Utc};
use health_incidents::{LabelSet, QueryRange, RangeVector, Sample, Series};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::auth::BearerToken;
use crate::backend::{BackendFuture, MetricsBackend};
use crate::error::{Result, ToolError};

const BACKEND: &str = "prometheus";

/// Envelope of every Prometheus API response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryData {
    result_type: String,
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MatrixEntry {
    metric: LabelSet,
    values: Vec<(f64, String)>,
}

#[derive(Debug, Deserialize)]
struct VectorEntry {
    metric: LabelSet,
}

/// Unwraps the envelope and checks the result type.
fn query_result(body: &[u8], expected: &str) -> Result<serde_json::Value> {
    let response: ApiResponse = serde_json::from_slice(body)
        .map_err(|e| ToolError::shape(BACKEND, format!("invalid JSON: {e}")))?;

    if response.status != "success" {
        return Err(ToolError::backend(
            BACKEND,
            format!(
                "{}: {}",
                response.error_type.as_deref().unwrap_or("error"),
                response.error.as_deref().unwrap_or("no error message"),
            ),
        ));
    }
    for warning in &response.warnings {
        warn!(warning = %warning, "prometheus query warning");
    }

    let data = response
        .data
        .ok_or_else(|| ToolError::shape(BACKEND, "missing data"))?;
    if data.result_type != expected {
        return Err(ToolError::shape(
            BACKEND,
            format!("expected {expected} result, got {}", data.result_type),
        ));
    }
    Ok(data.result)
}

fn sample_time(seconds: f64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis((seconds * 1000.0).round() as i64)
        .ok_or_else(|| ToolError::shape(BACKEND, format!("timestamp out of range: {seconds}")))
}

/// Parses a range query response into series.
///
/// # Errors
///
/// Returns `ToolError::Backend` for an error response and
/// `ToolError::UnexpectedShape` if the result is not a well-formed matrix.
pub fn parse_matrix(body: &[u8]) -> Result<RangeVector> {
    let result = query_result(body, "matrix")?;
    let entries: Vec<MatrixEntry> = serde_json::from_value(result)
        .map_err(|e| ToolError::shape(BACKEND, format!("malformed matrix: {e}")))?;

    entries
        .into_iter()
        .map(|entry| {
            let samples = entry
                .values
                .into_iter()
                .map(|(ts, value)| {
                    let value = value.parse::<f64>().map_err(|e| {
                        ToolError::shape(BACKEND, format!("bad sample value '{value}': {e}"))
                    })?;
                    Ok(Sample::new(sample_time(ts)?, value))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Series::new(entry.metric, samples))
        })
        .collect()
}

/// Parses an instant query response into the label sets of its elements.
///
/// # Errors
///
/// Returns `ToolError::Backend` for an error response and
/// `ToolError::UnexpectedShape` if the result is not a well-formed vector.
pub fn parse_vector(body: &[u8]) -> Result<Vec<LabelSet>> {
    let result = query_result(body, "vector")?;
    let entries: Vec<VectorEntry> = serde_json::from_value(result)
        .map_err(|e| ToolError::shape(BACKEND, format!("malformed vector: {e}")))?;
    Ok(entries.into_iter().map(|e| e.metric).collect())
}

/// Joins an API path onto a base URL, keeping any base path prefix.
pub(crate) fn endpoint(base: &Url, path: &str, backend: &'static str) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ToolError::Config(format!("{backend} URL '{base}' cannot be a base")))?
        .pop_if_empty()
        .extend(path.split('/'));
    Ok(url)
}

/// Prometheus client authenticated as the caller.
#[derive(Debug, Clone)]
pub struct PrometheusClient {
    http: reqwest::Client,
    base: Url,
    token: BearerToken,
}

impl PrometheusClient {
    /// Creates a client for the API at `base`.
    pub fn new(http: reqwest::Client, base: Url, token: BearerToken) -> Self {
        Self { http, base, token }
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<Vec<u8>> {
        let url = endpoint(&self.base, path, BACKEND)?;
        debug!(url = %url, "querying prometheus");

        let response = self
            .http
            .get(url)
            .bearer_auth(self.token.expose())
            .query(params)
            .send()
            .await
            .map_err(|e| ToolError::backend(BACKEND, e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ToolError::backend(BACKEND, e))?;

        if !status.is_success() {
            // query errors come back as 4xx/5xx with a JSON error body
            let reason = match query_result(&body, "") {
                Err(ToolError::Backend { reason, .. }) => format!("HTTP {status}: {reason}"),
                _ => format!("HTTP {status}"),
            };
            return Err(ToolError::backend(BACKEND, reason));
        }
        Ok(body.to_vec())
    }
}

impl MetricsBackend for PrometheusClient {
    fn query_range<'a>(
        &'a self,
        query: &'a str,
        range: &'a QueryRange,
    ) -> BackendFuture<'a, RangeVector> {
        Box::pin(async move {
            let params = [
                ("query", query.to_string()),
                ("start", range.start.timestamp().to_string()),
                ("end", range.end.timestamp().to_string()),
                ("step", format!("{}s", range.step.num_seconds())),
            ];
            let body = self.get("api/v1/query_range", &params).await?;
            parse_matrix(&body)
        })
    }

    fn query_instant<'a>(&'a self, query: &'a str) -> BackendFuture<'a, Vec<LabelSet>> {
        Box::pin(async move {
            let body = self
                .get("api/v1/query", &[("query", query.to_string())])
                .await?;
            parse_vector(&body)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MATRIX: &str = r#"{
        "status": "success",
        "data": {
            "resultType": "matrix",
            "result": [
                {
                    "metric": {"group_id": "g1", "src_alertname": "A", "src_severity": "warning"},
                    "values": [[1740830400, "1"], [1740830700.5, "2"]]
                }
            ]
        }
    }"#;

    #[test]
    fn parses_matrix() {
        let series = parse_matrix(MATRIX.as_bytes()).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].labels.get("group_id"), Some("g1"));
        assert_eq!(series[0].samples.len(), 2);
        assert_eq!(series[0].samples[0].timestamp.timestamp(), 1_740_830_400);
        assert_eq!(series[0].samples[1].timestamp.timestamp_millis(), 1_740_830_700_500);
        assert!((series[0].samples[1].value - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn parses_vector_labels() {
        let body = r#"{
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [{"metric": {"url": "https://console", "clusterID": "A"}, "value": [1740830400, "1"]}]
            }
        }"#;
        let labels = parse_vector(body.as_bytes()).unwrap();
        assert_eq!(labels, vec![LabelSet::from([("url", "https://console"), ("clusterID", "A")])]);
    }

    #[test]
    fn wrong_result_type_is_shape_error() {
        let err = parse_vector(MATRIX.as_bytes()).unwrap_err();
        assert!(matches!(err, ToolError::UnexpectedShape { backend: "prometheus", .. }));
    }

    #[test]
    fn error_status_is_backend_error() {
        let body = r#"{"status":"error","errorType":"bad_data","error":"parse error"}"#;
        match parse_matrix(body.as_bytes()) {
            Err(ToolError::Backend { reason, .. }) => assert_eq!(reason, "bad_data: parse error"),
            other => panic!("expected Backend error, got {other:?}"),
        }
    }

    #[test]
    fn non_numeric_sample_is_shape_error() {
        let body = r#"{"status":"success","data":{"resultType":"matrix","result":[
            {"metric":{},"values":[[1740830400,"abc"]]}]}}"#;
        assert!(matches!(
            parse_matrix(body.as_bytes()),
            Err(ToolError::UnexpectedShape { .. })
        ));
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let base = Url::parse("https://thanos.example/prefix/").unwrap();
        let url = endpoint(&base, "api/v1/query", BACKEND).unwrap();
        assert_eq!(url.as_str(), "https://thanos.example/prefix/api/v1/query");

        let base = Url::parse("http://localhost:9090").unwrap();
        let url = endpoint(&base, "api/v1/query_range", BACKEND).unwrap();
        assert_eq!(url.as_str(), "http://localhost:9090/api/v1/query_range");
    }
}
