//! Haybox Companion - console entry point
//!
//! Interactive console around the sync/dispatch core. Runs against the
//! scripted mock backend; the native backend ships with the installer and
//! plugs into the same `Backend` trait.

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use haybox_companion::{
    AppEvent, AutoConfirm, Backend, CommandDispatcher, Config, ConfirmationGate, DispatchOutcome,
    MockBackend, Operation, SharedState, StatusSnapshot, StatusSynchronizer,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "haybox-companion", about = "Haybox controller companion console")]
struct Args {
    /// Override the status poll interval in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Answer yes to every confirmation prompt
    #[arg(long, short = 'y')]
    yes: bool,

    /// Config file path (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Confirmation gate backed by the console's stdin
struct StdinGate {
    lines: Arc<Mutex<Lines<BufReader<Stdin>>>>,
}

#[async_trait]
impl ConfirmationGate for StdinGate {
    async fn confirm(&self, prompt: &str) -> bool {
        println!("{} [y/N]", prompt);
        let mut lines = self.lines.lock().await;
        match lines.next_line().await {
            Ok(Some(line)) => matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            _ => false,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Haybox companion console");

    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(interval) = args.poll_interval_ms {
        config.poll_interval_ms = interval;
    }
    info!("Configuration loaded");

    // Demo backend: a controller in default mode with XInput and the
    // GameCube adapter present
    let backend = Arc::new(MockBackend::new());
    backend.set_status(StatusSnapshot {
        default_mode_connected: true,
        xinput_installed: true,
        gamecube_adapter_connected: true,
        ..Default::default()
    });

    let state = SharedState::new();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let sync = Arc::new(StatusSynchronizer::new(
        Arc::clone(&backend),
        Arc::clone(&state),
        event_tx.clone(),
        config.clone(),
    ));
    let dispatcher = CommandDispatcher::new(
        Arc::clone(&backend),
        Arc::clone(&sync),
        event_tx,
        config.clone(),
    );

    sync.bootstrap().await;
    let mut poll_handle = sync.spawn_periodic();

    // Drain events into the log; the console renders on demand
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                AppEvent::OutcomeChanged(Some(outcome)) => {
                    println!(
                        "[{}] {}",
                        if outcome.success { "ok" } else { "error" },
                        outcome.message
                    );
                }
                other => debug!(?other, "event"),
            }
        }
    });

    let lines = Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()).lines()));
    let gate: Box<dyn ConfirmationGate> = if args.yes {
        Box::new(AutoConfirm(true))
    } else {
        Box::new(StdinGate {
            lines: Arc::clone(&lines),
        })
    };

    print_status(&state);
    println!("Commands: status, ids, drivers, refresh, uninstall, reinstall, winusb, replace <driver>, quit");

    loop {
        let line = {
            let mut lines = lines.lock().await;
            lines.next_line().await?
        };
        let Some(line) = line else { break };

        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("status") => print_status(&state),
            Some("ids") => {
                let ids = state.identifiers();
                for dev in [
                    &ids.default_mode,
                    &ids.config_mode,
                    &ids.bootsel_mode,
                    &ids.switch_mode,
                    &ids.gamecube_adapter,
                ] {
                    println!("  {:<16} VID 0x{:04X}  PID 0x{:04X}", dev.name, dev.vid, dev.pid);
                }
            }
            Some("drivers") => match state.driver_info() {
                Some(info) => {
                    println!("  current:   {}", info.current_driver);
                    println!("  available: {}", info.available_drivers.join(", "));
                }
                None => println!("  driver info not loaded"),
            },
            Some("refresh") => sync.fetch_status(true).await,
            Some("uninstall") => {
                run(&dispatcher, Operation::UninstallXinput, gate.as_ref()).await
            }
            Some("reinstall") => {
                run(&dispatcher, Operation::ReinstallXinput, gate.as_ref()).await
            }
            Some("winusb") => run(&dispatcher, Operation::InstallWinusb, gate.as_ref()).await,
            Some("replace") => match parts.next() {
                Some(name) => {
                    run(
                        &dispatcher,
                        Operation::ReplaceDriver(name.to_string()),
                        gate.as_ref(),
                    )
                    .await
                }
                None => println!("usage: replace <driver>"),
            },
            Some("quit") | Some("exit") => break,
            Some(other) => println!("unknown command: {}", other),
            None => {}
        }
    }

    poll_handle.stop();
    info!("Haybox companion console stopped");
    Ok(())
}

async fn run<B: Backend + 'static>(
    dispatcher: &CommandDispatcher<B>,
    op: Operation,
    gate: &dyn ConfirmationGate,
) {
    match dispatcher.trigger(op.clone(), gate).await {
        DispatchOutcome::Completed { .. } => {}
        DispatchOutcome::Denied => println!("{}: cancelled", op),
        DispatchOutcome::Disabled => println!("{}: not available right now", op),
        DispatchOutcome::Busy => println!("{}: another operation is in progress", op),
    }
}

fn print_status(state: &SharedState) {
    let status = state.status();
    let flag = |b: bool| if b { "yes" } else { "no" };
    println!("  default mode connected:  {}", flag(status.default_mode_connected));
    println!("  config mode connected:   {}", flag(status.config_mode_connected));
    println!("  bootsel mode connected:  {}", flag(status.bootsel_mode_connected));
    println!("  switch mode connected:   {}", flag(status.switch_mode_connected));
    println!("  xinput installed:        {}", flag(status.xinput_installed));
    println!("  gamecube adapter:        {}", flag(status.gamecube_adapter_connected));
    println!("  winusb installed:        {}", flag(status.winusb_installed));
}
