//! Backend collaborator traits.
//!
//! The tool reads from two backends: a Prometheus-compatible metrics API and
//! the Alertmanager silence list. Both are reached through object-safe traits
//! so the HTTP clients can be swapped for in-memory fakes.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use health_incidents::{LabelSet, QueryRange, RangeVector};

use crate::auth::BearerToken;
use crate::error::Result;

/// Boxed future returned by backend calls.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// A Prometheus-compatible query API.
pub trait MetricsBackend: Send + Sync {
    /// Runs a range query and returns every series of the resulting matrix.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or if the result is not a
    /// matrix.
    fn query_range<'a>(
        &'a self,
        query: &'a str,
        range: &'a QueryRange,
    ) -> BackendFuture<'a, RangeVector>;

    /// Runs an instant query and returns the label set of every element of
    /// the resulting vector.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or if the result is not a
    /// vector.
    fn query_instant<'a>(&'a self, query: &'a str) -> BackendFuture<'a, Vec<LabelSet>>;
}

/// A source of the current silence list.
pub trait SilenceBackend: Send + Sync {
    /// Returns the label sets of all currently silenced alerts.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an unexpected response.
    fn silenced_alerts(&self) -> BackendFuture<'_, Vec<LabelSet>>;
}

/// Backends bound to one caller's credential.
#[derive(Clone)]
pub struct Backends {
    /// Metrics query API.
    pub metrics: Arc<dyn MetricsBackend>,
    /// Silence list.
    pub silences: Arc<dyn SilenceBackend>,
}

impl Backends {
    /// Bundles a metrics and a silence backend.
    pub fn new(metrics: Arc<dyn MetricsBackend>, silences: Arc<dyn SilenceBackend>) -> Self {
        Self { metrics, silences }
    }
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends").finish_non_exhaustive()
    }
}

/// Creates backends that authenticate as the calling user.
pub trait BackendConnector: Send + Sync {
    /// Binds backends to the caller's token.
    ///
    /// # Errors
    ///
    /// Returns an error if the backends cannot be set up.
    fn connect(&self, token: &BearerToken) -> Result<Backends>;
}
