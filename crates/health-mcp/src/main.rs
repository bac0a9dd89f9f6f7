//! health-mcp - cluster health incidents tool
//!
//! Runs one `get_incidents` call against Prometheus and Alertmanager and
//! prints the text result, or prints the tool descriptor.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use health_mcp::{
    AUTH_HEADER, GetIncidentsParams, HttpConnector, IncidentTool, ToolConfig, ToolDescriptor,
    ToolRequest,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "health-mcp")]
#[command(about = "Cluster health incidents for tool-calling clients")]
#[command(version)]
struct Cli {
    /// Prometheus (or Thanos querier) base URL
    #[arg(long, env = "PROM_URL", default_value = health_mcp::config::DEFAULT_PROMETHEUS_URL)]
    prometheus_url: String,

    /// Alertmanager base URL
    #[arg(long, env = "ALERTMANAGER_URL", default_value = health_mcp::config::DEFAULT_ALERTMANAGER_URL)]
    alertmanager_url: String,

    /// Incidents per page
    #[arg(long, env = "INCIDENTS_PAGE_SIZE", default_value_t = health_incidents::DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Bound on one call, in seconds
    #[arg(long, env = "QUERY_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one page of incidents
    GetIncidents {
        /// Bearer token forwarded to the backends
        #[arg(long, env = "HEALTH_MCP_TOKEN", hide_env_values = true)]
        token: String,

        /// Maximum incident age in hours
        #[arg(long)]
        time_range: Option<u32>,

        /// Lowest severity to include
        #[arg(long)]
        min_severity: Option<String>,

        /// Cursor of the next page
        #[arg(long)]
        next_cursor: Option<String>,
    },

    /// Print the tool descriptor as JSON
    Describe,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = ToolConfig::new()
        .with_prometheus_url(cli.prometheus_url)
        .with_alertmanager_url(cli.alertmanager_url)
        .with_page_size(cli.page_size)
        .with_query_timeout(Duration::from_secs(cli.timeout_secs));
    config.validate().context("invalid configuration")?;

    match cli.command {
        Commands::Describe => {
            let descriptor = ToolDescriptor::get_incidents(&config);
            println!("{}", serde_json::to_string_pretty(&descriptor)?);
        }
        Commands::GetIncidents {
            token,
            time_range,
            min_severity,
            next_cursor,
        } => {
            let connector = Arc::new(HttpConnector::new(&config)?);
            let tool = IncidentTool::new(config, connector)?;

            let params = GetIncidentsParams {
                time_range,
                min_severity,
                next_cursor,
            };
            let request =
                ToolRequest::new(params).with_header(AUTH_HEADER, format!("Bearer {token}"));

            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("interrupted, cancelling request");
                    on_signal.cancel();
                }
            });

            match tool.call(&request, &cancel).await {
                Ok(text) => print!("{text}"),
                Err(e) => {
                    error!(error = %e, caller_error = e.is_caller_error(), "get_incidents failed");
                    return Err(e.into());
                }
            }
        }
    }

    Ok(())
}
