//! Error types for the sweep core

use thiserror::Error;

/// Failure reported by one of the external collaborators
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Listing instances failed entirely
    #[error("instance directory request failed: {0}")]
    Directory(String),

    /// Metrics retrieval failed for one instance
    #[error("metrics request for {instance_id} failed: {message}")]
    Metrics {
        instance_id: String,
        message: String,
    },

    /// A terminate or reboot call failed for one instance
    #[error("{action} of {instance_id} failed: {message}")]
    Remediation {
        instance_id: String,
        action: &'static str,
        message: String,
    },
}

/// Fatal error for a whole classification run
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to list instances")]
    Directory(#[source] ProviderError),
}
