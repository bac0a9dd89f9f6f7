//! Keyset pagination over incident lists.
//!
//! Incidents are ordered by `(start_time, group_id)`, both descending. A
//! page resumes strictly after the last key of the previous page, carried by
//! the caller in an opaque [`PaginationCursor`].

use std::cmp::Ordering;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::error::{IncidentError, Result};
use crate::incident::Incident;

/// Default number of incidents per page.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Sort position of an incident without a usable start time. Such incidents
/// sort after all dated ones and a cursor ending on one carries this value
/// as `time_last`.
pub const UNDATED_START: i64 = 0;

/// Position of a pagination session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationCursor {
    /// Window start of the whole session, in Unix seconds. Carried unchanged
    /// from page to page.
    pub time_start: i64,
    /// Start time of the last incident on the previous page, in Unix seconds,
    /// or [`UNDATED_START`] if that incident had no usable start.
    pub time_last: i64,
    /// Group id of the last incident on the previous page.
    pub group_last: String,
}

impl PaginationCursor {
    /// Creates a cursor.
    #[must_use]
    pub fn new(time_start: i64, time_last: i64, group_last: impl Into<String>) -> Self {
        Self {
            time_start,
            time_last,
            group_last: group_last.into(),
        }
    }

    /// Encodes the cursor as base64 of its JSON form.
    ///
    /// # Errors
    ///
    /// Returns `IncidentError::Serialization` if the cursor cannot be
    /// serialized.
    pub fn encode(&self) -> Result<String> {
        let json = serde_json::to_vec(self)?;
        Ok(STANDARD.encode(json))
    }

    /// Decodes and validates a cursor produced by [`encode`](Self::encode).
    ///
    /// # Errors
    ///
    /// Returns `IncidentError::InvalidCursor` if the token is not base64,
    /// does not hold a cursor, or holds an inconsistent one.
    pub fn decode(token: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(token.trim())
            .map_err(|e| IncidentError::InvalidCursor {
                reason: format!("not base64: {e}"),
            })?;
        let cursor: Self =
            serde_json::from_slice(&bytes).map_err(|e| IncidentError::InvalidCursor {
                reason: format!("not a cursor: {e}"),
            })?;
        cursor.validate()?;
        Ok(cursor)
    }

    /// Checks that the cursor is internally consistent.
    ///
    /// # Errors
    ///
    /// Returns `IncidentError::InvalidCursor` describing the first problem.
    pub fn validate(&self) -> Result<()> {
        if self.time_start <= 0 {
            return Err(IncidentError::InvalidCursor {
                reason: format!("time_start must be positive, got {}", self.time_start),
            });
        }
        if self.time_last != UNDATED_START && self.time_last < self.time_start {
            return Err(IncidentError::InvalidCursor {
                reason: format!(
                    "time_last {} precedes time_start {}",
                    self.time_last, self.time_start
                ),
            });
        }
        if self.group_last.is_empty() {
            return Err(IncidentError::InvalidCursor {
                reason: "group_last is empty".to_string(),
            });
        }
        Ok(())
    }

    fn key(&self) -> (i64, &str) {
        (self.time_last, self.group_last.as_str())
    }
}

/// One page of incidents.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Incidents on this page, most recent first.
    pub items: Vec<Incident>,
    /// Cursor for the next page, `None` on the last page.
    pub next_cursor: Option<PaginationCursor>,
}

/// Sort key of an incident. Empty or unparsable start times sort last.
fn sort_key(incident: &Incident) -> (i64, &str) {
    (
        incident.start_unix().unwrap_or(UNDATED_START),
        incident.group_id.as_str(),
    )
}

/// Orders incidents most recent first, ties broken by the greater group id.
fn descending(a: &Incident, b: &Incident) -> Ordering {
    sort_key(b).cmp(&sort_key(a))
}

/// Cuts one page out of `incidents`.
///
/// Without a cursor the page starts at the most recent incident; with one it
/// starts strictly after the cursor position. `window_start` (Unix seconds)
/// seeds `time_start` of the first cursor in a session; later cursors carry
/// the request cursor's `time_start` unchanged.
#[must_use]
pub fn paginate(
    mut incidents: Vec<Incident>,
    cursor: Option<&PaginationCursor>,
    page_size: usize,
    window_start: i64,
) -> Page {
    let page_size = page_size.max(1);
    incidents.sort_by(descending);

    if let Some(cursor) = cursor {
        incidents.retain(|i| sort_key(i) < cursor.key());
    }

    let has_more = incidents.len() > page_size;
    incidents.truncate(page_size);

    let next_cursor = if has_more {
        incidents.last().map(|last| {
            let (time_last, group_last) = sort_key(last);
            PaginationCursor::new(
                cursor.map_or(window_start, |c| c.time_start),
                time_last,
                group_last,
            )
        })
    } else {
        None
    };

    Page {
        items: incidents,
        next_cursor,
    }
}
