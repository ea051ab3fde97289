pub mod commands;
pub mod controller;
pub mod display;
pub mod state;

pub use controller::{desired_voice, EventEmitter, TimerController, TimerSnapshot, VoiceRequest};
pub use state::{DurationConfig, SessionState, TickOutcome, TimerMode, TimerStatus};
