use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use log::{debug, error, info};
use serde::Serialize;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use crate::{
    audio::{NoiseFamily, SoundPlayer},
    settings::{SettingsStore, SoundSettings},
};

use super::display::{format_clock, primary_action_label, status_message};
use super::state::{DurationConfig, SessionState, TickOutcome, TimerMode, TimerStatus};

/// Receives everything the UI needs to re-render.
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: &str, payload: serde_json::Value);
}

/// The ambient voice that should be playing right now.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoiceRequest {
    pub family: NoiseFamily,
    pub volume: u8,
}

/// Ambient sound plays only while enabled and a countdown is actually running.
pub fn desired_voice(session: &SessionState, sound: &SoundSettings) -> Option<VoiceRequest> {
    (sound.enabled && session.is_running() && !session.is_completed()).then_some(VoiceRequest {
        family: sound.family,
        volume: sound.volume,
    })
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub mode: TimerMode,
    pub mode_label: &'static str,
    pub mode_description: &'static str,
    pub status: TimerStatus,
    pub remaining_secs: u32,
    pub total_secs: u32,
    pub elapsed_secs: u32,
    pub running: bool,
    pub completed: bool,
    pub last_completed_mode: Option<TimerMode>,
    pub completed_work_count: u32,
    pub cycle_count: u32,
    pub progress_percent: f64,
    pub display_time: String,
    pub status_message: Option<&'static str>,
    pub primary_action: &'static str,
    pub can_edit_duration: bool,
    pub durations: DurationConfig,
    pub sound: SoundSettings,
}

impl TimerSnapshot {
    pub fn capture(session: &SessionState, sound: SoundSettings) -> Self {
        Self {
            mode: session.mode(),
            mode_label: session.mode().label(),
            mode_description: session.mode().description(),
            status: session.status(),
            remaining_secs: session.remaining_secs(),
            total_secs: session.total_secs(),
            elapsed_secs: session.elapsed_secs(),
            running: session.is_running(),
            completed: session.is_completed(),
            last_completed_mode: session.last_completed_mode(),
            completed_work_count: session.completed_work_count(),
            cycle_count: session.cycle_count(),
            progress_percent: session.progress_percent(),
            display_time: format_clock(session.display_secs()),
            status_message: status_message(session),
            primary_action: primary_action_label(session),
            can_edit_duration: session.can_edit_duration(),
            durations: session.durations(),
            sound,
        }
    }
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
struct TimerTickEvent {
    remaining_secs: u32,
    display_time: String,
    progress_percent: f64,
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
struct SessionCompletedEvent {
    finished_mode: TimerMode,
    next_mode: TimerMode,
    completed_work_count: u32,
    cycle_count: u32,
    completed_at: DateTime<Utc>,
}

struct ControllerState {
    session: SessionState,
    /// Last voice request handed to the sound player.
    applied_voice: Option<VoiceRequest>,
}

#[derive(Clone)]
pub struct TimerController {
    state: Arc<Mutex<ControllerState>>,
    settings: Arc<SettingsStore>,
    sound: Arc<dyn SoundPlayer>,
    events: Arc<dyn EventEmitter>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
}

impl TimerController {
    pub fn new(
        sound: Arc<dyn SoundPlayer>,
        events: Arc<dyn EventEmitter>,
        settings: Arc<SettingsStore>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(ControllerState {
                session: SessionState::new(),
                applied_voice: None,
            })),
            settings,
            sound,
            events,
            ticker: Arc::new(Mutex::new(None)),
            tick_interval,
        }
    }

    pub async fn get_snapshot(&self) -> TimerSnapshot {
        let guard = self.state.lock().await;
        TimerSnapshot::capture(&guard.session, self.settings.sound())
    }

    pub async fn start(&self) -> TimerSnapshot {
        // The output may need waking on every start, not just the first
        self.sound.resume();

        let snapshot = self
            .mutate(|session| {
                session.start();
                info!(
                    "{} started with {} remaining",
                    session.mode(),
                    format_clock(session.remaining_secs())
                );
            })
            .await;
        self.spawn_ticker().await;
        snapshot
    }

    pub async fn pause(&self) -> TimerSnapshot {
        self.cancel_ticker().await;
        self.mutate(|session| session.pause()).await
    }

    pub async fn reset(&self) -> TimerSnapshot {
        self.cancel_ticker().await;
        self.mutate(|session| session.reset()).await
    }

    pub async fn switch_mode(&self, mode: TimerMode) -> TimerSnapshot {
        self.cancel_ticker().await;
        self.mutate(|session| {
            session.switch_mode(mode);
            info!("Switched to {}", mode);
        })
        .await
    }

    pub async fn set_duration(&self, mode: TimerMode, minutes: u32) -> TimerSnapshot {
        self.mutate(|session| {
            let stored = session.set_duration(mode, minutes);
            debug!("{} duration set to {} min", mode, stored);
        })
        .await
    }

    pub async fn set_sound_enabled(&self, enabled: bool) -> TimerSnapshot {
        self.update_sound(|sound| sound.enabled = enabled).await
    }

    pub async fn set_sound_family(&self, family: NoiseFamily) -> TimerSnapshot {
        self.update_sound(|sound| sound.family = family).await
    }

    pub async fn set_volume(&self, volume: u8) -> TimerSnapshot {
        self.update_sound(|sound| sound.volume = volume).await
    }

    /// Advances the countdown by one tick. Completion, chime and the mode
    /// advance all happen under one lock, so no other command observes a
    /// half-applied transition.
    pub async fn tick(&self) -> TickOutcome {
        let mut guard = self.state.lock().await;
        let outcome = guard.session.tick();

        match outcome {
            TickOutcome::Ignored => {}
            TickOutcome::Counting { remaining_secs } => {
                emit(
                    self.events.as_ref(),
                    "timer-tick",
                    &TimerTickEvent {
                        remaining_secs,
                        display_time: format_clock(remaining_secs),
                        progress_percent: guard.session.progress_percent(),
                    },
                );
            }
            TickOutcome::Completed { finished, next } => {
                info!("{} completed; next up: {}", finished, next);
                self.sound.play_chime();
                self.reconcile_ambient(&mut guard);
                self.emit_state(&guard.session);
                emit(
                    self.events.as_ref(),
                    "session-completed",
                    &SessionCompletedEvent {
                        finished_mode: finished,
                        next_mode: next,
                        completed_work_count: guard.session.completed_work_count(),
                        cycle_count: guard.session.cycle_count(),
                        completed_at: Utc::now(),
                    },
                );
            }
        }

        outcome
    }

    /// Stops the clock and silences ambient sound.
    pub async fn shutdown(&self) {
        self.cancel_ticker().await;
        let mut guard = self.state.lock().await;
        guard.session.pause();
        self.reconcile_ambient(&mut guard);
    }

    async fn mutate(&self, op: impl FnOnce(&mut SessionState)) -> TimerSnapshot {
        let mut guard = self.state.lock().await;
        op(&mut guard.session);
        self.reconcile_ambient(&mut guard);
        self.emit_state(&guard.session)
    }

    async fn update_sound(&self, change: impl FnOnce(&mut SoundSettings)) -> TimerSnapshot {
        let mut guard = self.state.lock().await;
        let sound = self.settings.update_sound(change);
        debug!("Sound settings now {:?}", sound);
        self.reconcile_ambient(&mut guard);
        self.emit_state(&guard.session)
    }

    /// Diffs the desired voice against the last applied one and issues the
    /// minimal stop/start/retune. Family changes always restart.
    fn reconcile_ambient(&self, guard: &mut ControllerState) {
        let desired = desired_voice(&guard.session, &self.settings.sound());

        match (guard.applied_voice, desired) {
            (None, None) => {}
            (Some(_), None) => self.sound.stop_ambient(),
            (Some(current), Some(wanted)) if current.family == wanted.family => {
                if current.volume != wanted.volume {
                    self.sound.set_volume(wanted.volume);
                }
            }
            (_, Some(wanted)) => self.sound.start_ambient(wanted.family, wanted.volume),
        }

        guard.applied_voice = desired;
    }

    fn emit_state(&self, session: &SessionState) -> TimerSnapshot {
        let snapshot = TimerSnapshot::capture(session, self.settings.sound());
        emit(self.events.as_ref(), "timer-state-changed", &snapshot);
        snapshot
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let controller = self.clone();
        let tick_interval = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick resolves immediately
            interval.tick().await;

            loop {
                interval.tick().await;
                match controller.tick().await {
                    TickOutcome::Counting { .. } => continue,
                    TickOutcome::Completed { .. } | TickOutcome::Ignored => break,
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }
}

fn emit<T: Serialize>(events: &dyn EventEmitter, name: &str, payload: &T) {
    match serde_json::to_value(payload) {
        Ok(value) => events.emit(name, value),
        Err(e) => error!("Failed to serialize {} payload: {}", name, e),
    }
}
