//! Full startup/operation scenarios wired exactly like the binary does it

use haybox_companion::{
    AppEvent, AutoConfirm, CommandDispatcher, Config, DispatchOutcome, MockBackend, Operation,
    SharedState, StatusSnapshot, StatusSynchronizer,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

struct App {
    backend: Arc<MockBackend>,
    state: Arc<SharedState>,
    sync: Arc<StatusSynchronizer<MockBackend>>,
    dispatcher: CommandDispatcher<MockBackend>,
    events: mpsc::UnboundedReceiver<AppEvent>,
}

fn wire() -> App {
    let backend = Arc::new(MockBackend::new());
    let state = SharedState::new();
    let (tx, events) = mpsc::unbounded_channel();
    let config = Config::default();
    let sync = Arc::new(StatusSynchronizer::new(
        Arc::clone(&backend),
        Arc::clone(&state),
        tx.clone(),
        config.clone(),
    ));
    let dispatcher = CommandDispatcher::new(Arc::clone(&backend), Arc::clone(&sync), tx, config);
    App {
        backend,
        state,
        sync,
        dispatcher,
        events,
    }
}

fn drain(events: &mut mpsc::UnboundedReceiver<AppEvent>) -> Vec<AppEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

#[tokio::test(start_paused = true)]
async fn startup_from_cold_state_enables_the_right_controls() {
    let mut app = wire();
    app.backend.set_status(StatusSnapshot {
        default_mode_connected: true,
        xinput_installed: true,
        ..Default::default()
    });

    app.sync.bootstrap().await;

    let status = app.state.status();
    assert!(status.default_mode_connected);
    assert!(status.xinput_installed);
    assert!(status.any_mode_connected());

    // Uninstall: installed AND connected; reinstall: installed OR connected
    assert!(app.state.operation_enabled(&Operation::UninstallXinput));
    assert!(app.state.operation_enabled(&Operation::ReinstallXinput));
    // No adapter: WinUSB install stays disabled
    assert!(!app.state.operation_enabled(&Operation::InstallWinusb));

    let events = drain(&mut app.events);
    assert!(events
        .iter()
        .any(|e| matches!(e, AppEvent::IdentifiersLoaded(_))));
    assert!(events
        .iter()
        .any(|e| matches!(e, AppEvent::StatusUpdated(s) if s.default_mode_connected)));
}

#[tokio::test(start_paused = true)]
async fn denied_uninstall_makes_no_backend_call() {
    let mut app = wire();
    app.backend.set_status(StatusSnapshot {
        default_mode_connected: true,
        xinput_installed: true,
        ..Default::default()
    });
    app.sync.bootstrap().await;
    let before = app.state.status();
    app.backend.clear_calls();
    drain(&mut app.events);

    let result = app
        .dispatcher
        .trigger(Operation::UninstallXinput, &AutoConfirm(false))
        .await;

    assert_eq!(result, DispatchOutcome::Denied);
    assert!(app.backend.calls().is_empty());
    assert!(!app.state.is_busy());
    assert_eq!(app.state.status(), before);
    assert!(drain(&mut app.events).is_empty());
}

#[tokio::test(start_paused = true)]
async fn failing_winusb_install_reports_and_recovers() {
    let mut app = wire();
    app.backend.set_status(StatusSnapshot {
        gamecube_adapter_connected: true,
        ..Default::default()
    });
    app.sync.bootstrap().await;
    app.backend.fail_call("install_winusb", "connection reset by peer");
    app.backend.clear_calls();
    drain(&mut app.events);

    let result = app
        .dispatcher
        .trigger(Operation::InstallWinusb, &AutoConfirm(true))
        .await;
    assert_eq!(result, DispatchOutcome::Completed { success: false });

    // Error text surfaced, refresh still ran, system back to idle
    let outcome = app.state.outcome().unwrap();
    assert!(!outcome.success);
    assert!(outcome.message.contains("connection reset by peer"));
    assert_eq!(app.backend.call_count("get_device_status"), 1);
    assert!(!app.state.is_busy());

    let events = drain(&mut app.events);
    assert!(events.iter().any(|e| matches!(
        e,
        AppEvent::OperationFinished { success: false, .. }
    )));
}

#[tokio::test(start_paused = true)]
async fn operation_lifecycle_orders_outcome_before_refresh() {
    let mut app = wire();
    app.backend.set_status(StatusSnapshot {
        default_mode_connected: true,
        xinput_installed: true,
        ..Default::default()
    });
    app.sync.bootstrap().await;
    drain(&mut app.events);

    let result = app
        .dispatcher
        .trigger(Operation::UninstallXinput, &AutoConfirm(true))
        .await;
    assert_eq!(result, DispatchOutcome::Completed { success: true });

    // Events arrive as: started, starting outcome, result outcome, status
    // refresh, driver info refresh, finished
    let events = drain(&mut app.events);
    let positions: Vec<&str> = events
        .iter()
        .map(|e| match e {
            AppEvent::OperationStarted { .. } => "started",
            AppEvent::OutcomeChanged(Some(_)) => "outcome",
            AppEvent::OutcomeChanged(None) => "cleared",
            AppEvent::StatusUpdated(_) => "status",
            AppEvent::DriverInfoUpdated(_) => "driver-info",
            AppEvent::OperationFinished { .. } => "finished",
            AppEvent::IdentifiersLoaded(_) => "identifiers",
        })
        .collect();
    assert_eq!(
        positions,
        vec!["started", "outcome", "outcome", "status", "driver-info", "finished"]
    );

    // The silent refresh did not overwrite the result message
    let outcome = app.state.outcome().unwrap();
    assert_eq!(outcome.message, "XInput driver successfully uninstalled");

    // The refreshed snapshot reflects the uninstall
    assert!(!app.state.status().xinput_installed);
}

#[tokio::test(start_paused = true)]
async fn polling_follows_backend_changes_over_time() {
    let mut app = wire();
    app.sync.bootstrap().await;
    let mut poll = app.sync.spawn_periodic();
    drain(&mut app.events);

    app.backend.set_status(StatusSnapshot {
        config_mode_connected: true,
        ..Default::default()
    });
    tokio::time::sleep(Duration::from_millis(501)).await;
    assert!(app.state.status().config_mode_connected);

    // Unchanged backend response: cache stays stable over many polls
    tokio::time::sleep(Duration::from_millis(2000)).await;
    assert!(app.state.status().config_mode_connected);
    assert!(app.state.status().any_mode_connected());

    app.backend.set_status(StatusSnapshot::default());
    tokio::time::sleep(Duration::from_millis(501)).await;
    assert!(!app.state.status().any_mode_connected());

    poll.stop();
}

#[tokio::test(start_paused = true)]
async fn manual_refresh_notice_expires_but_newer_outcome_survives() {
    let mut app = wire();
    app.sync.bootstrap().await;
    drain(&mut app.events);

    app.sync.fetch_status(true).await;
    assert_eq!(app.state.outcome().unwrap().message, "Status refreshed");

    // A second manual refresh republishes before the first notice expires;
    // the first expiry must not clear the second notice
    tokio::time::sleep(Duration::from_millis(1000)).await;
    app.sync.fetch_status(true).await;
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(app.state.outcome().unwrap().message, "Status refreshed");

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(app.state.outcome().is_none());
}
