//! The `get_incidents` tool: cluster health incidents for tool-calling clients.
//!
//! `health-mcp` wires the incident engine of `health-incidents` to its
//! backends. A call authenticates as the caller, reads the grouping metric,
//! console URLs, live alerts and silences concurrently, and answers with one
//! page of incidents rendered as text around a JSON block.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use health_mcp::{GetIncidentsParams, HttpConnector, IncidentTool, ToolConfig, ToolRequest};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> health_mcp::Result<()> {
//! let config = ToolConfig::new().with_prometheus_url("https://thanos-querier:9091");
//! let connector = Arc::new(HttpConnector::new(&config)?);
//! let tool = IncidentTool::new(config, connector)?;
//!
//! let request = ToolRequest::new(GetIncidentsParams::default().with_min_severity("warning"))
//!     .with_header("kubernetes-authorization", "Bearer sha256~token");
//! let text = tool.call(&request, &CancellationToken::new()).await?;
//! println!("{text}");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod alertmanager;
pub mod auth;
pub mod backend;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod http;
pub mod prometheus;
pub mod tool;

pub use alertmanager::AlertmanagerClient;
pub use auth::{AUTH_HEADER, BearerToken};
pub use backend::{BackendConnector, BackendFuture, Backends, MetricsBackend, SilenceBackend};
pub use config::ToolConfig;
pub use descriptor::{ToolAnnotations, ToolDescriptor};
pub use error::{Result, ToolError};
pub use http::HttpConnector;
pub use prometheus::PrometheusClient;
pub use tool::{GetIncidentsParams, IncidentTool, ResolvedParams, TOOL_NAME, ToolRequest};
