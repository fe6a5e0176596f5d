//! Error taxonomy for convergence runs.
//!
//! Three families matter at runtime:
//!
//! - [`Error::Config`] — invalid desired configuration, raised before any
//!   cloud call is attempted.
//! - [`Error::Api`] — an unexpected cloud API failure. Fatal; the run aborts
//!   and re-running the process is the recovery path.
//! - [`Error::TopologyUnresolved`] — VPC/security-group identity could not be
//!   derived for an environment. Fatal, since every database resource depends
//!   on it.
//!
//! Divergences that only need operator attention (pending environment changes,
//! database class drift, a declined confirmation) are *not* errors; they fold
//! into the run summary as warnings.

use thiserror::Error;

/// Result type alias for Groundwork operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type shared by all Groundwork crates.
#[derive(Debug, Error, Clone)]
pub enum Error {
    /// Invalid desired configuration. Raised pre-flight, never mid-run.
    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    /// An expected resource was missing where absence is fatal.
    #[error("resource not found: {resource}")]
    NotFound { resource: String },

    /// Unexpected cloud API failure (anything other than "not found").
    #[error("cloud API call '{operation}' failed: {reason}")]
    Api { operation: String, reason: String },

    /// VPC or security-group identity could not be resolved for an environment.
    #[error("network topology for environment '{environment}' unresolved: {reason}")]
    TopologyUnresolved {
        environment: String,
        reason: String,
    },
}

impl Error {
    /// Create a configuration error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create an API error.
    pub fn api(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Api {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a topology-resolution error.
    pub fn topology_unresolved(
        environment: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::TopologyUnresolved {
            environment: environment.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error was raised before any cloud call.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}
