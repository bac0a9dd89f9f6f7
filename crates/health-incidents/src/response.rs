//! The response envelope and its text rendering.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::incident::Incident;
use crate::pagination::Page;

/// Opening marker of the JSON block in the text result.
pub const DATA_OPEN: &str = "<DATA>";
/// Closing marker of the JSON block in the text result.
pub const DATA_CLOSE: &str = "</DATA>";

/// Incidents on one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Incidents {
    /// Number of incidents on this page.
    pub total: usize,
    /// Incidents on this page, most recent first.
    pub items: Vec<Incident>,
}

/// The `get_incidents` result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Incidents on this page.
    pub incidents: Incidents,
    /// Encoded cursor of the next page, empty on the last page.
    #[serde(
        rename = "nextCursor",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub next_cursor: String,
}

impl Response {
    /// Assembles the response for one page.
    ///
    /// # Errors
    ///
    /// Returns an error if the next cursor cannot be encoded.
    pub fn from_page(page: Page) -> Result<Self> {
        let next_cursor = match &page.next_cursor {
            Some(cursor) => cursor.encode()?,
            None => String::new(),
        };
        Ok(Self {
            incidents: Incidents {
                total: page.items.len(),
                items: page.items,
            },
            next_cursor,
        })
    }

    /// Renders the response as the text result of a tool call, with the JSON
    /// payload between the data markers.
    ///
    /// # Errors
    ///
    /// Returns `IncidentError::Serialization` if the payload cannot be
    /// serialized.
    pub fn render(&self) -> Result<String> {
        let json = serde_json::to_string(self)?;
        let more = if self.next_cursor.is_empty() {
            "This is the last page."
        } else {
            "More incidents are available; call again with next_cursor set to nextCursor."
        };
        Ok(format!(
            "Found {total} incident(s). {more}\n\
             The incident data is the JSON document between the {DATA_OPEN} markers.\n\
             {DATA_OPEN}\n{json}\n{DATA_CLOSE}\n",
            total = self.incidents.total,
        ))
    }
}

/// Returns the JSON payload embedded in a rendered text result.
#[must_use]
pub fn extract_data(text: &str) -> Option<&str> {
    let open = format!("{DATA_OPEN}\n");
    let start = text.find(&open)? + open.len();
    let end = text[start..].find(DATA_CLOSE)? + start;
    Some(text[start..end].trim_end())
}
