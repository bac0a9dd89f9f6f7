//! Bearer token extraction from tool request headers.
//!
//! The caller's cluster credential arrives in a dedicated header so that it
//! does not collide with the transport's own `Authorization` header. It is
//! forwarded unchanged to every backend request.

use std::fmt;

use crate::error::{Result, ToolError};

/// Header carrying the caller's cluster credential.
pub const AUTH_HEADER: &str = "kubernetes-authorization";

const BEARER_PREFIX: &str = "Bearer ";

/// A bearer credential forwarded to the backends.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wraps a raw token.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::InvalidToken` if the token is empty or contains
    /// whitespace.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(ToolError::InvalidToken {
                reason: "empty bearer token".to_string(),
            });
        }
        if token.chars().any(char::is_whitespace) {
            return Err(ToolError::InvalidToken {
                reason: "bearer token contains whitespace".to_string(),
            });
        }
        Ok(Self(token))
    }

    /// Parses an `Authorization`-style header value of the form
    /// `Bearer <token>`.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::InvalidToken` for any other scheme or an empty
    /// credential.
    pub fn from_header_value(value: &str) -> Result<Self> {
        let value = value.trim();
        let token = value
            .strip_prefix(BEARER_PREFIX)
            .ok_or_else(|| ToolError::InvalidToken {
                reason: "unsupported authorization scheme".to_string(),
            })?;
        Self::new(token.trim())
    }

    /// Finds the credential header among the request headers. Header names
    /// are compared case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::MissingToken` if the header is absent and
    /// `ToolError::InvalidToken` if its value is not a bearer credential.
    pub fn from_headers<'h, I>(headers: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'h str, &'h str)>,
    {
        let (_, value) = headers
            .into_iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(AUTH_HEADER))
            .ok_or(ToolError::MissingToken {
                header: AUTH_HEADER,
            })?;
        Self::from_header_value(value)
    }

    /// Returns the raw token.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BearerToken").field(&"[REDACTED]").finish()
    }
}
