pub mod audio;
pub mod settings;
pub mod timer;
mod utils;

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use audio::{AudioEngineHandle, SoundPlayer};
use log::{error, info, warn};
use serde_json::json;
use settings::{AppConfig, SettingsStore};
use tokio::io::{AsyncBufReadExt, BufReader};
use timer::{
    commands::{execute, Command},
    EventEmitter, TimerController,
};

/// Writes each event as one JSON line on stdout.
pub struct StdoutEmitter;

impl EventEmitter for StdoutEmitter {
    fn emit(&self, event: &str, payload: serde_json::Value) {
        let line = json!({ "event": event, "payload": payload });
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", line) {
            error!("Failed to write {} event: {}", event, e);
        }
    }
}

pub fn run() {
    let config = AppConfig::from_env();

    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(config.log_level())
        .init();

    info!("WorkFocus starting up...");
    for rejected in &config.ignored {
        warn!("Ignoring {}", rejected);
    }

    if let Err(e) = run_console(config) {
        error!("WorkFocus stopped: {:#}", e);
        std::process::exit(1);
    }
}

fn run_console(config: AppConfig) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build async runtime")?;

    info!(
        "Tick every {:?}, synthesizing at {} Hz",
        config.tick_interval, config.sample_rate
    );

    let audio = Arc::new(AudioEngineHandle::new(config.sample_rate));
    let sound: Arc<dyn SoundPlayer> = audio.clone();
    let events: Arc<dyn EventEmitter> = Arc::new(StdoutEmitter);
    let controller = TimerController::new(
        sound,
        Arc::clone(&events),
        Arc::new(SettingsStore::default()),
        config.tick_interval,
    );

    let result = runtime.block_on(async {
        let result = read_commands(&controller, events.as_ref()).await;
        controller.shutdown().await;
        result
    });

    // Let the final stop reach the device before the process exits
    if !audio.flush() {
        warn!("Audio thread exited before shutdown");
    }
    result
}

async fn read_commands(
    controller: &TimerController,
    events: &dyn EventEmitter,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                warn!("Rejected command {:?}: {:#}", line, e);
                events.emit("command-error", json!({ "message": format!("{:#}", e) }));
                continue;
            }
        };

        if command == Command::Quit {
            info!("Quit requested");
            break;
        }

        match execute(controller, command).await {
            Ok(snapshot) if command == Command::Status => match serde_json::to_value(&snapshot) {
                Ok(value) => events.emit("timer-status", value),
                Err(e) => error!("Failed to serialize status: {}", e),
            },
            Ok(_) => {}
            Err(message) => events.emit("command-error", json!({ "message": message })),
        }
    }

    Ok(())
}
