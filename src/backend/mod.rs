//! Backend call contract
//!
//! The native backend owns USB enumeration and driver-store manipulation;
//! this core only talks to it through the single-shot calls below. Every
//! call is wrapped in a timeout so a hung backend cannot wedge the UI.

pub mod mock;

use crate::core::state::{DeviceIdentifiers, DriverInfo, StatusSnapshot};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

pub use mock::MockBackend;

/// Result of a driver-mutating call. `success: false` is a semantic
/// failure reported by the backend, not a transport error; the message is
/// shown to the user either way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub message: String,
    pub success: bool,
}

/// Transport-level backend failures
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend call failed: {0}")]
    Transport(String),

    #[error("backend call timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// The fixed call contract to the native backend.
///
/// All calls are single-shot request/response; there is no streaming and
/// no cancellation of an issued call.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Current connection and driver status, captured atomically
    async fn get_device_status(&self) -> BackendResult<StatusSnapshot>;

    /// Static device identity reference data
    async fn get_device_identifiers(&self) -> BackendResult<DeviceIdentifiers>;

    /// Active driver and the installable set
    async fn get_driver_info(&self) -> BackendResult<DriverInfo>;

    async fn uninstall_xinput(&self) -> BackendResult<OperationResult>;

    async fn reinstall_xinput(&self) -> BackendResult<OperationResult>;

    async fn install_winusb(&self) -> BackendResult<OperationResult>;

    async fn replace_driver(&self, driver_name: &str) -> BackendResult<OperationResult>;
}

/// Bound a backend call. Timeouts surface as [`BackendError::Timeout`] and
/// are handled like any other transport failure.
pub(crate) async fn with_timeout<T, F>(limit: Duration, call: F) -> BackendResult<T>
where
    F: Future<Output = BackendResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::Timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_passes_through_results() {
        let ok = with_timeout(Duration::from_secs(1), async { Ok(7u32) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err: BackendResult<u32> = with_timeout(Duration::from_secs(1), async {
            Err(BackendError::Transport("nope".to_string()))
        })
        .await;
        assert!(matches!(err, Err(BackendError::Transport(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_bounds_slow_calls() {
        let slow = with_timeout(Duration::from_millis(100), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(1u32)
        })
        .await;
        assert!(matches!(slow, Err(BackendError::Timeout(_))));
    }
}
