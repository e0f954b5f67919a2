//! Haybox Companion core
//!
//! Client-side core of the Haybox controller companion app: keeps a cached
//! status snapshot in sync with the native driver-management backend and
//! dispatches privileged driver operations.
//!
//! # Features
//! - Periodic status polling with last-known-good caching
//! - Manual refresh with transient, auto-expiring feedback messages
//! - Serialized driver operations (uninstall/reinstall XInput, install
//!   WinUSB, replace driver) with confirmation gating
//! - Backend behind an async trait, so the native component, a remote
//!   transport, or the scripted mock all plug in the same way

pub mod backend;
pub mod core;
pub mod dispatch;
pub mod status;

pub use backend::{Backend, BackendError, MockBackend, OperationResult};
pub use core::config::Config;
pub use core::events::AppEvent;
pub use core::state::{
    DeviceIdentifiers, DriverInfo, Operation, OperationOutcome, SharedState, StatusSnapshot,
    UsbDeviceInfo,
};
pub use dispatch::{AutoConfirm, CommandDispatcher, ConfirmationGate, DispatchOutcome};
pub use status::{PollHandle, StatusSynchronizer};
