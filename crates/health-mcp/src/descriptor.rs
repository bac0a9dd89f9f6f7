//! Tool descriptor advertised to tool-calling clients.

use health_incidents::Severity;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::ToolConfig;
use crate::tool::TOOL_NAME;

const DESCRIPTION: &str = "List the incidents in the cluster. \
One incident is a group of related alerts that are likely triggered by the same root cause. \
Use this tool to analyze the cluster health status and determine why a component is failing or degraded. \
Results are paged; when the result carries a nextCursor, call the tool again with next_cursor set to it.";

const TITLE: &str = "Provides information about incidents in the cluster";

/// Behavior hints shown to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    /// Human-readable title.
    pub title: String,
    /// The tool never modifies its environment.
    pub read_only_hint: bool,
}

/// Name, description and input schema of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    /// Tool name used in calls.
    pub name: String,
    /// What the tool does.
    pub description: String,
    /// Behavior hints.
    pub annotations: ToolAnnotations,
    /// JSON schema of the call arguments.
    pub input_schema: Value,
}

impl ToolDescriptor {
    /// Describes `get_incidents` for the given configuration.
    #[must_use]
    pub fn get_incidents(config: &ToolConfig) -> Self {
        let severities: Vec<&str> = Severity::ALL
            .iter()
            .filter(|s| **s != Severity::None)
            .map(Severity::as_str)
            .collect();

        Self {
            name: TOOL_NAME.to_string(),
            description: DESCRIPTION.to_string(),
            annotations: ToolAnnotations {
                title: TITLE.to_string(),
                read_only_hint: true,
            },
            input_schema: json!({
                "type": "object",
                "properties": {
                    "time_range": {
                        "type": "integer",
                        "description": format!(
                            "Maximum age of incidents to include, in hours (max {}). Default: {}",
                            config.max_time_range_hours, config.default_time_range_hours
                        ),
                        "minimum": 1,
                        "maximum": config.max_time_range_hours,
                    },
                    "min_severity": {
                        "type": "string",
                        "description": "Lowest incident severity to include. Default: healthy",
                        "enum": severities,
                    },
                    "next_cursor": {
                        "type": "string",
                        "description": "The nextCursor value of the previous page, to fetch the next page",
                    },
                },
            }),
        }
    }
}
