//! Application event definitions

use super::state::{DeviceIdentifiers, DriverInfo, Operation, OperationOutcome, StatusSnapshot};

/// Events republished to whoever holds the receiver end.
///
/// Both the synchronizer and the dispatcher send over the same unbounded
/// channel; a dropped receiver (torn-down observer) just makes sends no-ops.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A status fetch completed and the cache was replaced
    StatusUpdated(StatusSnapshot),

    /// The one-time startup identifier fetch succeeded
    IdentifiersLoaded(DeviceIdentifiers),

    /// Driver info was (re)fetched
    DriverInfoUpdated(DriverInfo),

    /// The displayed outcome changed (`None` on expiry)
    OutcomeChanged(Option<OperationOutcome>),

    /// A privileged operation started dispatching
    OperationStarted { operation: Operation },

    /// A privileged operation finished (either way) and status was refreshed
    OperationFinished { operation: Operation, success: bool },
}
