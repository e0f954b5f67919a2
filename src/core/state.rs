//! Shared application state: status cache, reference data, transient outcomes

use crate::core::events::AppEvent;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Full device/driver status as reported by one backend poll.
///
/// A snapshot is only internally consistent at the instant the backend
/// captured it. The cache is replaced whole on every successful poll;
/// individual fields are never mutated client-side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub default_mode_connected: bool,
    pub config_mode_connected: bool,
    pub bootsel_mode_connected: bool,
    pub switch_mode_connected: bool,
    pub xinput_installed: bool,
    pub gamecube_adapter_connected: bool,
    pub winusb_installed: bool,
}

impl StatusSnapshot {
    /// Whether the controller is connected in any of its four modes.
    ///
    /// Recomputed on every read, never cached.
    pub fn any_mode_connected(&self) -> bool {
        self.default_mode_connected
            || self.config_mode_connected
            || self.bootsel_mode_connected
            || self.switch_mode_connected
    }
}

/// USB identity of a single device mode or accessory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsbDeviceInfo {
    pub vid: u16,
    pub pid: u16,
    pub name: String,
}

/// Reference data for every device identity the companion knows about.
///
/// Fetched once at startup and read-only afterwards. If the startup fetch
/// fails, the zero-valued placeholders stay in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentifiers {
    pub default_mode: UsbDeviceInfo,
    pub config_mode: UsbDeviceInfo,
    pub bootsel_mode: UsbDeviceInfo,
    pub switch_mode: UsbDeviceInfo,
    pub gamecube_adapter: UsbDeviceInfo,
}

impl DeviceIdentifiers {
    /// The fixed Haybox identities, as surfaced in the UI and used by the
    /// mock backend. The real backend reports these itself.
    pub fn haybox() -> Self {
        Self {
            default_mode: UsbDeviceInfo {
                vid: 0x2E8A,
                pid: 0x0004,
                name: "Default Mode".to_string(),
            },
            config_mode: UsbDeviceInfo {
                vid: 0x2E8A,
                pid: 0x000A,
                name: "Config Mode".to_string(),
            },
            bootsel_mode: UsbDeviceInfo {
                vid: 0x2E8A,
                pid: 0x0003,
                name: "BOOTSEL Mode".to_string(),
            },
            switch_mode: UsbDeviceInfo {
                vid: 0x2E8A,
                pid: 0x0005,
                name: "Switch Mode".to_string(),
            },
            gamecube_adapter: UsbDeviceInfo {
                vid: 0x057E,
                pid: 0x0337,
                name: "GameCube Adapter".to_string(),
            },
        }
    }

    /// True until a successful identifier fetch replaces the placeholders
    pub fn is_placeholder(&self) -> bool {
        self.default_mode.vid == 0 && self.default_mode.pid == 0
    }
}

/// Active driver name plus the set of installable drivers.
///
/// Refreshed at startup and after every driver-mutating command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverInfo {
    pub current_driver: String,
    pub available_drivers: Vec<String>,
}

/// Transient, user-visible result of an action.
///
/// Published with a sequence number and auto-cleared after a bounded
/// display window; an expiring old outcome never clears a newer one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutcome {
    pub message: String,
    pub success: bool,
}

impl OperationOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: false,
        }
    }
}

/// A privileged driver-management operation the user can trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Remove the XInput driver (confirmation required)
    UninstallXinput,
    /// Restore the XInput driver from the bundled copy
    ReinstallXinput,
    /// Install the WinUSB driver for the GameCube adapter (confirmation required)
    InstallWinusb,
    /// Switch the active driver to the named one (confirmation required)
    ReplaceDriver(String),
}

impl Operation {
    /// Whether this operation is gated by a yes/no confirmation
    pub fn needs_confirmation(&self) -> bool {
        match self {
            Operation::UninstallXinput => true,
            Operation::ReinstallXinput => false,
            Operation::InstallWinusb => true,
            Operation::ReplaceDriver(_) => true,
        }
    }

    /// Prompt text shown by the confirmation gate
    pub fn confirmation_prompt(&self) -> String {
        match self {
            Operation::UninstallXinput => {
                "Uninstall the XInput driver? The controller will stop working as a gamepad until it is reinstalled.".to_string()
            }
            Operation::ReinstallXinput => "Reinstall the XInput driver?".to_string(),
            Operation::InstallWinusb => {
                "Install the WinUSB driver for the GameCube adapter? This replaces the adapter's current driver.".to_string()
            }
            Operation::ReplaceDriver(name) => {
                format!("Replace the active driver with {}?", name)
            }
        }
    }

    /// Progress message published when the backend call is issued
    pub fn starting_message(&self) -> String {
        match self {
            Operation::UninstallXinput => "Uninstalling XInput driver...".to_string(),
            Operation::ReinstallXinput => "Reinstalling XInput driver...".to_string(),
            Operation::InstallWinusb => "Installing WinUSB driver...".to_string(),
            Operation::ReplaceDriver(name) => format!("Replacing driver with {}...", name),
        }
    }

    /// Error message synthesized when the backend call itself fails
    pub fn failure_message(&self, err: &impl fmt::Display) -> String {
        match self {
            Operation::UninstallXinput => format!("Failed to uninstall XInput driver: {}", err),
            Operation::ReinstallXinput => format!("Failed to reinstall XInput driver: {}", err),
            Operation::InstallWinusb => format!("Failed to install WinUSB driver: {}", err),
            Operation::ReplaceDriver(name) => {
                format!("Failed to replace driver with {}: {}", name, err)
            }
        }
    }

    /// Whether the control for this operation is enabled given the current
    /// status and driver info. Evaluated fresh on every read.
    pub fn is_enabled(&self, status: &StatusSnapshot, driver_info: Option<&DriverInfo>) -> bool {
        match self {
            Operation::UninstallXinput => status.xinput_installed && status.any_mode_connected(),
            Operation::ReinstallXinput => status.xinput_installed || status.any_mode_connected(),
            Operation::InstallWinusb => {
                status.gamecube_adapter_connected && !status.winusb_installed
            }
            Operation::ReplaceDriver(name) => {
                driver_info.is_some_and(|info| info.current_driver != *name)
            }
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::UninstallXinput => write!(f, "uninstall-xinput"),
            Operation::ReinstallXinput => write!(f, "reinstall-xinput"),
            Operation::InstallWinusb => write!(f, "install-winusb"),
            Operation::ReplaceDriver(name) => write!(f, "replace-driver({})", name),
        }
    }
}

/// Mutable application state behind the shared lock
#[derive(Debug, Default)]
pub struct AppState {
    /// Last successfully fetched status (last-known-good)
    pub status: StatusSnapshot,
    /// Device reference data, placeholders until fetched
    pub identifiers: DeviceIdentifiers,
    /// Driver info, `None` until the first successful fetch
    pub driver_info: Option<DriverInfo>,
    /// Currently displayed outcome, if any
    pub outcome: Option<OperationOutcome>,
    /// Bumped on every outcome publish; lets expiry skip stale clears
    outcome_seq: u64,
}

/// Owned state shared by the synchronizer and the dispatcher.
///
/// Observers get clones through the read accessors; mutation happens only
/// through the defined operations below.
#[derive(Debug, Default)]
pub struct SharedState {
    inner: Arc<RwLock<AppState>>,
    /// Set while a privileged operation is dispatching; serializes them
    busy: Arc<AtomicBool>,
}

impl SharedState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn status(&self) -> StatusSnapshot {
        self.inner.read().status.clone()
    }

    pub fn identifiers(&self) -> DeviceIdentifiers {
        self.inner.read().identifiers.clone()
    }

    pub fn driver_info(&self) -> Option<DriverInfo> {
        self.inner.read().driver_info.clone()
    }

    pub fn outcome(&self) -> Option<OperationOutcome> {
        self.inner.read().outcome.clone()
    }

    /// Whether a privileged operation is currently dispatching
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Whether the control for `op` should be enabled right now
    pub fn operation_enabled(&self, op: &Operation) -> bool {
        let state = self.inner.read();
        op.is_enabled(&state.status, state.driver_info.as_ref())
    }

    /// Replace the cached snapshot atomically
    pub fn set_status(&self, status: StatusSnapshot) {
        self.inner.write().status = status;
    }

    pub fn set_identifiers(&self, identifiers: DeviceIdentifiers) {
        self.inner.write().identifiers = identifiers;
    }

    pub fn set_driver_info(&self, info: DriverInfo) {
        self.inner.write().driver_info = Some(info);
    }

    /// Claim the in-progress flag. Returns `None` if another operation is
    /// already dispatching. The flag is released when the permit drops, on
    /// every exit path.
    pub fn try_begin_operation(&self) -> Option<OperationPermit> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            Some(OperationPermit {
                busy: Arc::clone(&self.busy),
            })
        } else {
            None
        }
    }

    /// Publish an outcome, notify observers, and schedule its expiry.
    ///
    /// The expiry only clears the outcome if no newer one has been
    /// published in the meantime.
    pub fn publish_outcome(
        &self,
        events: &mpsc::UnboundedSender<AppEvent>,
        outcome: OperationOutcome,
        display_for: Duration,
    ) {
        let seq = {
            let mut state = self.inner.write();
            state.outcome_seq += 1;
            state.outcome = Some(outcome.clone());
            state.outcome_seq
        };
        let _ = events.send(AppEvent::OutcomeChanged(Some(outcome)));

        let inner = Arc::clone(&self.inner);
        let events = events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(display_for).await;
            if clear_outcome(&inner, seq) {
                let _ = events.send(AppEvent::OutcomeChanged(None));
            }
        });
    }
}

/// Clear the outcome published as `seq`. No-op if a newer outcome has
/// replaced it. Returns whether anything was cleared.
fn clear_outcome(inner: &RwLock<AppState>, seq: u64) -> bool {
    let mut state = inner.write();
    if state.outcome_seq == seq && state.outcome.is_some() {
        state.outcome = None;
        true
    } else {
        false
    }
}

/// RAII guard over the in-progress flag
#[derive(Debug)]
pub struct OperationPermit {
    busy: Arc<AtomicBool>,
}

impl Drop for OperationPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}
