use super::state::{SessionState, TimerStatus};

/// `MM:SS`, minutes unbounded (two hours renders as `120:00`).
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// One-line encouragement under the clock, if the phase has one.
pub fn status_message(state: &SessionState) -> Option<&'static str> {
    match state.status() {
        TimerStatus::Completed => Some(match state.last_completed_mode() {
            Some(finished) if !finished.is_break() => "Great work!",
            _ => "Break time over!",
        }),
        TimerStatus::Running if state.mode().is_break() => Some("Enjoy your break..."),
        TimerStatus::Running => Some("Stay focused..."),
        TimerStatus::Idle | TimerStatus::Paused => None,
    }
}

pub fn primary_action_label(state: &SessionState) -> &'static str {
    match state.status() {
        TimerStatus::Running => "Pause",
        TimerStatus::Paused => "Resume",
        TimerStatus::Idle | TimerStatus::Completed => "Start",
    }
}
