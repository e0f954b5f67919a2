//! Scripted in-memory backend for tests and the demo console
//!
//! Stands in for the native backend when no hardware is attached:
//! responses are settable, failures and latency are injectable, and every
//! call is logged for ordering checks.

use super::{Backend, BackendError, BackendResult, OperationResult};
use crate::core::state::{DeviceIdentifiers, DriverInfo, StatusSnapshot};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug)]
struct MockInner {
    status: StatusSnapshot,
    identifiers: DeviceIdentifiers,
    driver_info: DriverInfo,
    /// Per-call transport failure injection (call name -> error text)
    failures: HashMap<String, String>,
    /// Per-call semantic result overrides (call name -> result)
    result_overrides: HashMap<String, OperationResult>,
    /// Artificial response delay applied to every call
    latency: Duration,
    /// Call log, in issue order
    calls: Vec<String>,
}

/// Scripted backend. Responses are captured at call entry, then delayed by
/// the configured latency, so an in-flight call returns the state as it was
/// when the call was issued.
#[derive(Debug)]
pub struct MockBackend {
    inner: Mutex<MockInner>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MockInner {
                status: StatusSnapshot::default(),
                identifiers: DeviceIdentifiers::haybox(),
                driver_info: DriverInfo {
                    current_driver: "XInput".to_string(),
                    available_drivers: vec!["XInput".to_string(), "WinUSB".to_string()],
                },
                failures: HashMap::new(),
                result_overrides: HashMap::new(),
                latency: Duration::ZERO,
                calls: Vec::new(),
            }),
        }
    }

    pub fn set_status(&self, status: StatusSnapshot) {
        self.inner.lock().status = status;
    }

    pub fn set_identifiers(&self, identifiers: DeviceIdentifiers) {
        self.inner.lock().identifiers = identifiers;
    }

    pub fn set_driver_info(&self, info: DriverInfo) {
        self.inner.lock().driver_info = info;
    }

    pub fn set_latency(&self, latency: Duration) {
        self.inner.lock().latency = latency;
    }

    /// Make the named call fail at the transport level until cleared
    pub fn fail_call(&self, call: &str, error: &str) {
        self.inner
            .lock()
            .failures
            .insert(call.to_string(), error.to_string());
    }

    pub fn clear_failure(&self, call: &str) {
        self.inner.lock().failures.remove(call);
    }

    /// Override the result of a driver operation (e.g. `success: false`)
    pub fn set_operation_result(&self, call: &str, result: OperationResult) {
        self.inner
            .lock()
            .result_overrides
            .insert(call.to_string(), result);
    }

    /// Calls issued so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().calls.clone()
    }

    pub fn call_count(&self, call: &str) -> usize {
        self.inner.lock().calls.iter().filter(|c| *c == call).count()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    /// Record the call, apply failure injection, and capture the reply
    fn begin<T>(
        &self,
        call: &str,
        reply: impl FnOnce(&mut MockInner) -> T,
    ) -> (Duration, BackendResult<T>) {
        let mut inner = self.inner.lock();
        inner.calls.push(call.to_string());
        let latency = inner.latency;
        if let Some(error) = inner.failures.get(call) {
            return (latency, Err(BackendError::Transport(error.clone())));
        }
        let value = reply(&mut inner);
        (latency, Ok(value))
    }

    /// A driver operation: apply the override if set, otherwise run the
    /// default effect and report its message
    fn operation(
        &self,
        call: &str,
        default: impl FnOnce(&mut MockInner) -> OperationResult,
    ) -> (Duration, BackendResult<OperationResult>) {
        self.begin(call, |inner| {
            if let Some(result) = inner.result_overrides.get(call).cloned() {
                result
            } else {
                default(inner)
            }
        })
    }

    async fn finish<T>(&self, latency: Duration, reply: BackendResult<T>) -> BackendResult<T> {
        if latency > Duration::ZERO {
            tokio::time::sleep(latency).await;
        }
        reply
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn get_device_status(&self) -> BackendResult<StatusSnapshot> {
        let (latency, reply) = self.begin("get_device_status", |inner| inner.status.clone());
        self.finish(latency, reply).await
    }

    async fn get_device_identifiers(&self) -> BackendResult<DeviceIdentifiers> {
        let (latency, reply) =
            self.begin("get_device_identifiers", |inner| inner.identifiers.clone());
        self.finish(latency, reply).await
    }

    async fn get_driver_info(&self) -> BackendResult<DriverInfo> {
        let (latency, reply) = self.begin("get_driver_info", |inner| inner.driver_info.clone());
        self.finish(latency, reply).await
    }

    async fn uninstall_xinput(&self) -> BackendResult<OperationResult> {
        let (latency, reply) = self.operation("uninstall_xinput", |inner| {
            inner.status.xinput_installed = false;
            OperationResult {
                message: "XInput driver successfully uninstalled".to_string(),
                success: true,
            }
        });
        self.finish(latency, reply).await
    }

    async fn reinstall_xinput(&self) -> BackendResult<OperationResult> {
        let (latency, reply) = self.operation("reinstall_xinput", |inner| {
            inner.status.xinput_installed = true;
            OperationResult {
                message: "XInput driver successfully reinstalled".to_string(),
                success: true,
            }
        });
        self.finish(latency, reply).await
    }

    async fn install_winusb(&self) -> BackendResult<OperationResult> {
        let (latency, reply) = self.operation("install_winusb", |inner| {
            if !inner.status.gamecube_adapter_connected {
                return OperationResult {
                    message: "GameCube adapter not found. Please make sure it is connected and in the correct mode.".to_string(),
                    success: false,
                };
            }
            inner.status.winusb_installed = true;
            OperationResult {
                message: "WinUSB driver successfully installed for GameCube adapter".to_string(),
                success: true,
            }
        });
        self.finish(latency, reply).await
    }

    async fn replace_driver(&self, driver_name: &str) -> BackendResult<OperationResult> {
        let name = driver_name.to_string();
        let (latency, reply) = self.operation("replace_driver", |inner| {
            if !inner.driver_info.available_drivers.contains(&name) {
                return OperationResult {
                    message: format!("Driver {} is not available", name),
                    success: false,
                };
            }
            inner.driver_info.current_driver = name.clone();
            OperationResult {
                message: format!("Driver successfully replaced with {}", name),
                success: true,
            }
        });
        self.finish(latency, reply).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_failure_injection() {
        let backend = MockBackend::new();
        backend.fail_call("get_device_status", "backend unreachable");

        let err = backend.get_device_status().await.unwrap_err();
        assert!(err.to_string().contains("backend unreachable"));

        backend.clear_failure("get_device_status");
        assert_ok!(backend.get_device_status().await);
        assert_eq!(backend.call_count("get_device_status"), 2);
    }

    #[tokio::test]
    async fn test_operations_mutate_reported_state() {
        let backend = MockBackend::new();
        backend.set_status(StatusSnapshot {
            xinput_installed: true,
            gamecube_adapter_connected: true,
            ..Default::default()
        });

        let result = backend.uninstall_xinput().await.unwrap();
        assert!(result.success);
        assert!(!backend.get_device_status().await.unwrap().xinput_installed);

        let result = backend.install_winusb().await.unwrap();
        assert!(result.success);
        assert!(backend.get_device_status().await.unwrap().winusb_installed);
    }

    #[tokio::test]
    async fn test_replace_driver_rejects_unknown_name() {
        let backend = MockBackend::new();
        let result = backend.replace_driver("Bogus").await.unwrap();
        assert!(!result.success);

        let result = backend.replace_driver("WinUSB").await.unwrap();
        assert!(result.success);
        let info = backend.get_driver_info().await.unwrap();
        assert_eq!(info.current_driver, "WinUSB");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_captured_at_call_entry() {
        let backend = std::sync::Arc::new(MockBackend::new());
        backend.set_latency(Duration::from_millis(100));

        let slow = {
            let backend = std::sync::Arc::clone(&backend);
            tokio::spawn(async move { backend.get_device_status().await })
        };
        tokio::task::yield_now().await;

        // Mutate after the call was issued; the reply keeps the old payload
        backend.set_status(StatusSnapshot {
            default_mode_connected: true,
            ..Default::default()
        });
        tokio::time::advance(Duration::from_millis(100)).await;

        let reply = slow.await.unwrap().unwrap();
        assert!(!reply.default_mode_connected);
    }
}
