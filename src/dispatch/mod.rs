//! Command Dispatcher
//!
//! Runs user-triggered privileged operations through a fixed lifecycle:
//! confirmation, claim the in-progress flag, progress message, exactly one
//! backend call, result message, silent status refresh, flag release.
//! Backend failures never propagate past this module; they become outcome
//! messages and the flag is released on every path.

pub mod confirm;

pub use confirm::{AutoConfirm, ConfirmationGate};

use crate::backend::{with_timeout, Backend, BackendResult, OperationResult};
use crate::core::config::Config;
use crate::core::events::AppEvent;
use crate::core::state::{Operation, OperationOutcome, SharedState};
use crate::status::StatusSynchronizer;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// How a triggered operation resolved. None of these are errors; refusals
/// are normal flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The backend call ran; `success` mirrors the published outcome
    Completed { success: bool },
    /// The confirmation gate said no; nothing was called or changed
    Denied,
    /// The operation's enablement guard failed
    Disabled,
    /// Another privileged operation is already in progress
    Busy,
}

pub struct CommandDispatcher<B> {
    backend: Arc<B>,
    state: Arc<SharedState>,
    sync: Arc<StatusSynchronizer<B>>,
    events: mpsc::UnboundedSender<AppEvent>,
    config: Config,
}

impl<B: Backend + 'static> CommandDispatcher<B> {
    pub fn new(
        backend: Arc<B>,
        sync: Arc<StatusSynchronizer<B>>,
        events: mpsc::UnboundedSender<AppEvent>,
        config: Config,
    ) -> Self {
        Self {
            backend,
            state: Arc::clone(sync.state()),
            sync,
            events,
            config,
        }
    }

    /// Run one operation through the full lifecycle.
    ///
    /// The in-progress flag is held from dispatch start until the
    /// post-operation refresh completes, and released by the permit on
    /// every exit path. The periodic poll is not blocked by it.
    pub async fn trigger(&self, op: Operation, gate: &dyn ConfirmationGate) -> DispatchOutcome {
        if !self.state.operation_enabled(&op) {
            info!(%op, "operation not enabled, ignoring trigger");
            return DispatchOutcome::Disabled;
        }

        if op.needs_confirmation() && !gate.confirm(&op.confirmation_prompt()).await {
            info!(%op, "operation cancelled at confirmation");
            return DispatchOutcome::Denied;
        }

        let permit = match self.state.try_begin_operation() {
            Some(permit) => permit,
            None => {
                warn!(%op, "operation already in progress, ignoring trigger");
                return DispatchOutcome::Busy;
            }
        };

        info!(%op, "dispatching operation");
        let _ = self.events.send(AppEvent::OperationStarted {
            operation: op.clone(),
        });
        self.state.publish_outcome(
            &self.events,
            OperationOutcome::success(op.starting_message()),
            self.config.outcome_display(),
        );

        let result = with_timeout(self.config.operation_timeout(), self.call_backend(&op)).await;
        let outcome = match result {
            Ok(OperationResult { message, success }) => {
                if success {
                    info!(%op, "operation succeeded");
                } else {
                    warn!(%op, %message, "operation reported failure");
                }
                OperationOutcome { message, success }
            }
            Err(e) => {
                warn!(%op, "backend call failed: {}", e);
                OperationOutcome::failure(op.failure_message(&e))
            }
        };
        let success = outcome.success;
        self.state
            .publish_outcome(&self.events, outcome, self.config.outcome_display());

        // Always resync after an operation, success or not. The refresh is
        // silent so it cannot overwrite the outcome just published.
        self.sync.fetch_status(false).await;
        self.sync.refresh_driver_info().await;

        let _ = self.events.send(AppEvent::OperationFinished {
            operation: op,
            success,
        });
        drop(permit);
        DispatchOutcome::Completed { success }
    }

    /// Exactly one backend call per dispatch
    async fn call_backend(&self, op: &Operation) -> BackendResult<OperationResult> {
        match op {
            Operation::UninstallXinput => self.backend.uninstall_xinput().await,
            Operation::ReinstallXinput => self.backend.reinstall_xinput().await,
            Operation::InstallWinusb => self.backend.install_winusb().await,
            Operation::ReplaceDriver(name) => self.backend.replace_driver(name).await,
        }
    }
}
