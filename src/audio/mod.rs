pub mod chime;
pub mod engine;
pub mod noise;
pub mod output;
pub mod shaper;

pub use engine::{AudioEngine, OutputBackend, VoiceHandle};
pub use noise::NoiseFamily;

use output::RodioBackend;

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    mpsc::{self, Receiver, Sender},
    Arc, Mutex,
};
use std::thread;

const ENABLE_LOGS: bool = true;

/// What the timer needs from the sound subsystem. Every call returns
/// immediately; failures are logged, never reported back, since sound
/// must never gate the countdown.
pub trait SoundPlayer: Send + Sync {
    fn resume(&self);
    fn start_ambient(&self, family: NoiseFamily, volume: u8);
    fn stop_ambient(&self);
    fn set_volume(&self, volume: u8);
    fn play_chime(&self);
}

enum AudioCommand {
    Resume,
    StartAmbient {
        family: NoiseFamily,
        volume: u8,
        generation: u64,
    },
    StopAmbient,
    SetVolume(u8),
    PlayChime,
    /// Acknowledged once every earlier command has been handled.
    Flush(Sender<()>),
    Shutdown,
}

/// Builds the engine on the audio thread and runs it until shutdown.
type Worker = dyn Fn(Receiver<AudioCommand>) + Send + Sync;

pub struct AudioEngineHandle {
    tx: Arc<Mutex<Option<Sender<AudioCommand>>>>,
    worker: Arc<Worker>,
    /// Bumped by every ambient start/stop request; a start whose generation
    /// is stale by the time the audio thread sees it is dropped.
    ambient_generation: Arc<AtomicU64>,
    ambient_playing: Arc<AtomicBool>,
}

impl AudioEngineHandle {
    /// Plays through the default output device.
    pub fn new(sample_rate: u32) -> Self {
        Self::with_backend(sample_rate, RodioBackend::new)
    }

    /// `make_backend` runs on the audio thread, so the backend itself
    /// need not be `Send`.
    pub fn with_backend<B, F>(sample_rate: u32, make_backend: F) -> Self
    where
        B: OutputBackend + 'static,
        F: Fn(u32) -> B + Send + Sync + 'static,
    {
        let ambient_generation = Arc::new(AtomicU64::new(0));
        let ambient_playing = Arc::new(AtomicBool::new(false));

        let generation = Arc::clone(&ambient_generation);
        let playing = Arc::clone(&ambient_playing);
        let worker = move |rx: Receiver<AudioCommand>| {
            let engine = AudioEngine::new(make_backend(sample_rate));
            run_engine(engine, rx, &generation, &playing);
        };

        Self {
            tx: Arc::new(Mutex::new(None)),
            worker: Arc::new(worker),
            ambient_generation,
            ambient_playing,
        }
    }

    fn ensure_thread(&self) -> Result<Sender<AudioCommand>, String> {
        let mut guard = self.tx.lock().map_err(|e| e.to_string())?;
        if let Some(tx) = guard.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<AudioCommand>();
        let worker = Arc::clone(&self.worker);

        // Dedicated audio thread holding the non-Send output stream
        thread::Builder::new()
            .name("audio-engine".to_string())
            .spawn(move || worker(rx))
            .map_err(|e| e.to_string())?;

        *guard = Some(tx.clone());
        Ok(tx)
    }

    fn send(&self, cmd: AudioCommand) -> Result<(), String> {
        let tx = self.ensure_thread()?;
        tx.send(cmd).map_err(|e| e.to_string())
    }

    fn dispatch(&self, what: &str, cmd: AudioCommand) {
        if let Err(e) = self.send(cmd) {
            crate::log_error!("Failed to {}: {}", what, e);
        }
    }

    fn running_sender(&self) -> Option<Sender<AudioCommand>> {
        self.tx.lock().ok().and_then(|guard| guard.clone())
    }

    /// Blocks until the audio thread has handled every command sent so
    /// far. Returns false if the thread is gone.
    pub fn flush(&self) -> bool {
        let Some(tx) = self.running_sender() else {
            return true;
        };
        let (ack_tx, ack_rx) = mpsc::channel();
        tx.send(AudioCommand::Flush(ack_tx)).is_ok() && ack_rx.recv().is_ok()
    }

    pub fn is_ambient_playing(&self) -> bool {
        self.ambient_playing.load(Ordering::SeqCst)
    }
}

fn run_engine<B: OutputBackend>(
    mut engine: AudioEngine<B>,
    rx: Receiver<AudioCommand>,
    generation: &AtomicU64,
    playing: &AtomicBool,
) {
    while let Ok(cmd) = rx.recv() {
        match cmd {
            AudioCommand::Resume => {
                if let Err(e) = engine.resume() {
                    crate::log_warn!("Audio output resume failed: {:#}", e);
                }
            }
            AudioCommand::StartAmbient {
                family,
                volume,
                generation: requested,
            } => {
                if requested != generation.load(Ordering::SeqCst) {
                    crate::log_debug!("Skipping stale ambient start for {}", family);
                    continue;
                }
                if let Err(e) = engine.start_ambient(family, volume) {
                    crate::log_error!("Ambient sound skipped: {:#}", e);
                }
            }
            AudioCommand::StopAmbient => engine.stop_ambient(),
            AudioCommand::SetVolume(volume) => engine.set_volume(volume),
            AudioCommand::PlayChime => {
                if let Err(e) = engine.play_chime() {
                    crate::log_error!("Completion chime skipped: {:#}", e);
                }
            }
            AudioCommand::Flush(ack) => {
                playing.store(engine.active_ambient().is_some(), Ordering::SeqCst);
                let _ = ack.send(());
                continue;
            }
            AudioCommand::Shutdown => break,
        }
        playing.store(engine.active_ambient().is_some(), Ordering::SeqCst);
    }

    engine.suspend();
    playing.store(false, Ordering::SeqCst);
}

impl SoundPlayer for AudioEngineHandle {
    fn resume(&self) {
        self.dispatch("resume audio output", AudioCommand::Resume);
    }

    fn start_ambient(&self, family: NoiseFamily, volume: u8) {
        let generation = self.ambient_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.dispatch(
            "start ambient sound",
            AudioCommand::StartAmbient {
                family,
                volume,
                generation,
            },
        );
    }

    fn stop_ambient(&self) {
        self.ambient_generation.fetch_add(1, Ordering::SeqCst);
        // Nothing to stop if the thread never started
        if let Some(tx) = self.running_sender() {
            let _ = tx.send(AudioCommand::StopAmbient);
        }
    }

    fn set_volume(&self, volume: u8) {
        self.dispatch("set ambient volume", AudioCommand::SetVolume(volume.min(100)));
    }

    fn play_chime(&self) {
        self.dispatch("play completion chime", AudioCommand::PlayChime);
    }
}

impl Drop for AudioEngineHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.running_sender() {
            let _ = tx.send(AudioCommand::Shutdown);
        }
    }
}
