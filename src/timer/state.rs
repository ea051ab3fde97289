use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_DURATION_MINUTES: u32 = 1;
pub const MAX_DURATION_MINUTES: u32 = 120;

/// Every fourth completed work session earns a long break.
pub const LONG_BREAK_INTERVAL: u32 = 4;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum TimerMode {
    #[default]
    Work,
    ShortBreak,
    LongBreak,
}

impl TimerMode {
    pub fn label(&self) -> &'static str {
        match self {
            TimerMode::Work => "Focus Time",
            TimerMode::ShortBreak => "Short Break",
            TimerMode::LongBreak => "Long Break",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TimerMode::Work => "Time to focus and get work done!",
            TimerMode::ShortBreak => "Take a short break and recharge",
            TimerMode::LongBreak => "Time for a longer break!",
        }
    }

    pub fn is_break(&self) -> bool {
        !matches!(self, TimerMode::Work)
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TimerMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "work" | "focus" => Ok(TimerMode::Work),
            "short" | "shortbreak" | "short-break" => Ok(TimerMode::ShortBreak),
            "long" | "longbreak" | "long-break" => Ok(TimerMode::LongBreak),
            other => Err(anyhow!("unknown timer mode: {other}")),
        }
    }
}

/// Derived phase of the countdown; not stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
    Completed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DurationConfig {
    pub work_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
}

impl Default for DurationConfig {
    fn default() -> Self {
        Self {
            work_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
        }
    }
}

impl DurationConfig {
    pub fn minutes(&self, mode: TimerMode) -> u32 {
        match mode {
            TimerMode::Work => self.work_minutes,
            TimerMode::ShortBreak => self.short_break_minutes,
            TimerMode::LongBreak => self.long_break_minutes,
        }
    }

    pub fn seconds(&self, mode: TimerMode) -> u32 {
        self.minutes(mode) * 60
    }

    fn set(&mut self, mode: TimerMode, minutes: u32) {
        match mode {
            TimerMode::Work => self.work_minutes = minutes,
            TimerMode::ShortBreak => self.short_break_minutes = minutes,
            TimerMode::LongBreak => self.long_break_minutes = minutes,
        }
    }
}

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing armed or not running; the tick was ignored.
    Ignored,
    Counting { remaining_secs: u32 },
    /// The countdown hit zero. `next` is the mode already switched to.
    Completed { finished: TimerMode, next: TimerMode },
}

/// Countdown, mode sequencing and pomodoro counters. Owns no clock and no
/// sound; callers drive `tick` and react to its outcome.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    mode: TimerMode,
    durations: DurationConfig,
    remaining_secs: u32,
    total_secs: u32,
    running: bool,
    completed: bool,
    last_completed_mode: Option<TimerMode>,
    completed_work_count: u32,
    cycle_count: u32,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::with_durations(DurationConfig::default())
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_durations(durations: DurationConfig) -> Self {
        Self {
            mode: TimerMode::Work,
            durations,
            remaining_secs: 0,
            total_secs: 0,
            running: false,
            completed: false,
            last_completed_mode: None,
            completed_work_count: 0,
            cycle_count: 1,
        }
    }

    /// Arms the current mode's duration if nothing is armed, then runs.
    /// A paused countdown resumes where it stopped.
    pub fn start(&mut self) {
        if self.remaining_secs == 0 {
            self.total_secs = self.durations.seconds(self.mode);
            self.remaining_secs = self.total_secs;
        }
        self.running = true;
        self.completed = false;
        self.last_completed_mode = None;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn reset(&mut self) {
        self.running = false;
        self.remaining_secs = 0;
        self.total_secs = 0;
        self.completed = false;
        self.last_completed_mode = None;
    }

    pub fn switch_mode(&mut self, mode: TimerMode) {
        self.mode = mode;
        self.reset();
    }

    /// Stores the clamped duration for the next `start` of `mode` and
    /// returns the value actually stored.
    pub fn set_duration(&mut self, mode: TimerMode, minutes: u32) -> u32 {
        let minutes = minutes.clamp(MIN_DURATION_MINUTES, MAX_DURATION_MINUTES);
        self.durations.set(mode, minutes);
        minutes
    }

    pub fn tick(&mut self) -> TickOutcome {
        if !self.running || self.remaining_secs == 0 {
            return TickOutcome::Ignored;
        }

        if self.remaining_secs > 1 {
            self.remaining_secs -= 1;
            return TickOutcome::Counting {
                remaining_secs: self.remaining_secs,
            };
        }

        let finished = self.mode;
        self.remaining_secs = 0;
        self.total_secs = 0;
        self.running = false;
        self.completed = true;
        self.last_completed_mode = Some(finished);
        self.advance_mode(finished);

        TickOutcome::Completed {
            finished,
            next: self.mode,
        }
    }

    fn advance_mode(&mut self, finished: TimerMode) {
        self.mode = match finished {
            TimerMode::Work => {
                self.completed_work_count += 1;
                if self.completed_work_count % LONG_BREAK_INTERVAL == 0 {
                    TimerMode::LongBreak
                } else {
                    TimerMode::ShortBreak
                }
            }
            TimerMode::LongBreak => {
                self.cycle_count += 1;
                TimerMode::Work
            }
            TimerMode::ShortBreak => TimerMode::Work,
        };
    }

    pub fn status(&self) -> TimerStatus {
        if self.running {
            TimerStatus::Running
        } else if self.completed {
            TimerStatus::Completed
        } else if self.remaining_secs > 0 {
            TimerStatus::Paused
        } else {
            TimerStatus::Idle
        }
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn durations(&self) -> DurationConfig {
        self.durations
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn total_secs(&self) -> u32 {
        self.total_secs
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.total_secs - self.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn last_completed_mode(&self) -> Option<TimerMode> {
        self.last_completed_mode
    }

    pub fn completed_work_count(&self) -> u32 {
        self.completed_work_count
    }

    pub fn cycle_count(&self) -> u32 {
        self.cycle_count
    }

    pub fn progress_percent(&self) -> f64 {
        if self.total_secs == 0 {
            return 0.0;
        }
        f64::from(self.elapsed_secs()) / f64::from(self.total_secs) * 100.0
    }

    /// Seconds to show on the clock face: the live countdown when armed,
    /// otherwise the configured length of the current mode.
    pub fn display_secs(&self) -> u32 {
        if self.remaining_secs > 0 {
            self.remaining_secs
        } else {
            self.durations.seconds(self.mode)
        }
    }

    /// Durations are only editable while nothing is armed.
    pub fn can_edit_duration(&self) -> bool {
        !self.running && self.remaining_secs == 0
    }
}
