//! Timeout utilities for bounding calls into external collaborators.

use crate::error::{ElfSiftError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Default demangler timeout in milliseconds
pub const DEFAULT_DEMANGLE_TIMEOUT_MS: u64 = 2000;

/// Timeout configuration for bounded operations
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Maximum duration for the operation
    pub duration: Duration,
    /// Whether to log timeout warnings
    pub log_warnings: bool,
    /// Operation name for logging
    pub operation_name: String,
}

impl TimeoutConfig {
    /// Create a new timeout configuration
    pub fn new(seconds: u64, operation: impl Into<String>) -> Self {
        Self::from_duration(Duration::from_secs(seconds), operation)
    }

    pub fn from_duration(duration: Duration, operation: impl Into<String>) -> Self {
        Self {
            duration,
            log_warnings: true,
            operation_name: operation.into(),
        }
    }

    /// Timeout used for demangler subprocesses
    pub fn demangle(millis: u64) -> Self {
        Self::from_duration(Duration::from_millis(millis), "demangle")
    }
}

/// Execute an async operation with a timeout.
///
/// The future is dropped on expiry, which also drops anything it owns.
pub async fn with_timeout<T, F>(config: TimeoutConfig, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    debug!(
        operation = %config.operation_name,
        timeout_ms = config.duration.as_millis() as u64,
        "Starting bounded operation"
    );

    match timeout(config.duration, future).await {
        Ok(result) => result,
        Err(_) => {
            if config.log_warnings {
                warn!(
                    operation = %config.operation_name,
                    timeout_ms = config.duration.as_millis() as u64,
                    "Operation timed out"
                );
            }

            Err(ElfSiftError::Timeout {
                millis: config.duration.as_millis() as u64,
            })
        }
    }
}
