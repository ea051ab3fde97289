use std::str::FromStr;

use anyhow::{anyhow, bail, Context};

use crate::audio::NoiseFamily;

use super::state::{TimerMode, MAX_DURATION_MINUTES, MIN_DURATION_MINUTES};
use super::{TimerController, TimerSnapshot};

pub const INVALID_NUMBER: &str = "Please enter a valid number";

/// Validates duration text from an input field. Only digits are accepted;
/// an empty or zero entry falls back to the one-minute floor and anything
/// above two hours is capped.
pub fn parse_duration_input(text: &str) -> Result<u32, String> {
    let text = text.trim();
    if !text.chars().all(|c| c.is_ascii_digit()) {
        return Err(INVALID_NUMBER.to_string());
    }

    let minutes = match text.parse::<u64>() {
        Ok(value) => value.min(u64::from(MAX_DURATION_MINUTES)) as u32,
        Err(_) if text.is_empty() => MIN_DURATION_MINUTES,
        // Only digits left, so the parse failed on overflow
        Err(_) => MAX_DURATION_MINUTES,
    };
    Ok(minutes.max(MIN_DURATION_MINUTES))
}

/// Validates volume text; digits only, capped at 100.
pub fn parse_volume_input(text: &str) -> Result<u8, String> {
    let text = text.trim();
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return Err(INVALID_NUMBER.to_string());
    }
    Ok(text.parse::<u64>().map(|v| v.min(100) as u8).unwrap_or(100))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Pause,
    Reset,
    SwitchMode(TimerMode),
    SetDuration { mode: TimerMode, minutes: u32 },
    SetSoundEnabled(bool),
    SetFamily(NoiseFamily),
    SetVolume(u8),
    Status,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or_else(|| anyhow!("empty command"))?;
        let arg = words.next();

        let need = |what: &str| arg.with_context(|| format!("`{verb}` needs {what}"));

        let command = match verb.to_ascii_lowercase().as_str() {
            "start" | "resume" => Command::Start,
            "pause" => Command::Pause,
            "reset" => Command::Reset,
            "mode" => Command::SwitchMode(need("a mode")?.parse()?),
            "duration" => {
                let mode = need("a mode")?.parse()?;
                let minutes = words
                    .next()
                    .context("`duration` needs minutes")
                    .and_then(|text| parse_duration_input(text).map_err(|e| anyhow!(e)))?;
                Command::SetDuration { mode, minutes }
            }
            "sound" => match need("on or off")?.to_ascii_lowercase().as_str() {
                "on" => Command::SetSoundEnabled(true),
                "off" => Command::SetSoundEnabled(false),
                other => bail!("expected on or off, got {other}"),
            },
            "family" => Command::SetFamily(need("a sound family")?.parse()?),
            "volume" => {
                let volume = parse_volume_input(need("a level")?).map_err(|e| anyhow!(e))?;
                Command::SetVolume(volume)
            }
            "status" => Command::Status,
            "quit" | "exit" => Command::Quit,
            other => bail!("unknown command: {other}"),
        };

        Ok(command)
    }
}

/// Runs one command against the controller. `Quit` is the caller's job.
pub async fn execute(
    controller: &TimerController,
    command: Command,
) -> Result<TimerSnapshot, String> {
    let snapshot = match command {
        Command::Start => controller.start().await,
        Command::Pause => controller.pause().await,
        Command::Reset => controller.reset().await,
        Command::SwitchMode(mode) => controller.switch_mode(mode).await,
        Command::SetDuration { mode, minutes } => controller.set_duration(mode, minutes).await,
        Command::SetSoundEnabled(enabled) => controller.set_sound_enabled(enabled).await,
        Command::SetFamily(family) => controller.set_sound_family(family).await,
        Command::SetVolume(volume) => controller.set_volume(volume).await,
        Command::Status => controller.get_snapshot().await,
        Command::Quit => return Err("quit is handled by the console loop".to_string()),
    };
    Ok(snapshot)
}
