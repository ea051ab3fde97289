use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use std::time::Duration;

use crate::audio::noise::DEFAULT_SAMPLE_RATE;
use crate::audio::NoiseFamily;

pub const DEFAULT_VOLUME: u8 = 50;

const DEBUG_VAR: &str = "WORKFOCUS_DEBUG";

/// Synthesis rates outside this range fall back to the default.
pub const MIN_SAMPLE_RATE: u32 = 8000;
pub const MAX_SAMPLE_RATE: u32 = 192_000;

/// Ambient sound preferences chosen by the user. Lives for the process only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SoundSettings {
    pub enabled: bool,
    pub family: NoiseFamily,
    pub volume: u8,
}

impl Default for SoundSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            family: NoiseFamily::default(),
            volume: DEFAULT_VOLUME,
        }
    }
}

pub struct SettingsStore {
    data: RwLock<SoundSettings>,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(SoundSettings::default())
    }
}

impl SettingsStore {
    pub fn new(initial: SoundSettings) -> Self {
        Self {
            data: RwLock::new(initial),
        }
    }

    pub fn sound(&self) -> SoundSettings {
        *self.data.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Applies `change` and returns the settings as stored. Volume is
    /// clamped to 0..=100.
    pub fn update_sound(&self, change: impl FnOnce(&mut SoundSettings)) -> SoundSettings {
        let mut guard = self.data.write().unwrap_or_else(|e| e.into_inner());
        change(&mut *guard);
        guard.volume = guard.volume.min(100);
        *guard
    }
}

/// Process-level knobs read once at startup, before logging exists.
/// Rejected values are kept in `ignored` so `run()` can report them once
/// the logger is up.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub debug: bool,
    pub tick_interval: Duration,
    pub sample_rate: u32,
    pub ignored: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            debug: false,
            tick_interval: Duration::from_secs(1),
            sample_rate: DEFAULT_SAMPLE_RATE,
            ignored: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let mut ignored = Vec::new();

        let debug = lookup(DEBUG_VAR)
            .map(|value| is_truthy(&value))
            .unwrap_or(defaults.debug);

        let tick_interval = parse_positive(&lookup, "WORKFOCUS_TICK_MS", &mut ignored)
            .map(Duration::from_millis)
            .unwrap_or(defaults.tick_interval);

        let sample_rate = parse_positive(&lookup, "WORKFOCUS_SAMPLE_RATE", &mut ignored)
            .and_then(|rate| match u32::try_from(rate) {
                Ok(rate) if (MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&rate) => Some(rate),
                _ => {
                    ignored.push(format!(
                        "WORKFOCUS_SAMPLE_RATE={}: expected {}..={} Hz",
                        rate, MIN_SAMPLE_RATE, MAX_SAMPLE_RATE
                    ));
                    None
                }
            })
            .unwrap_or(defaults.sample_rate);

        Self {
            debug,
            tick_interval,
            sample_rate,
            ignored,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        if self.debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    value == "1" || value.eq_ignore_ascii_case("true")
}

fn parse_positive(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    ignored: &mut Vec<String>,
) -> Option<u64> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Some(value),
        _ => {
            ignored.push(format!("{}={:?}: expected a positive integer", key, raw));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_config_defaults() {
        let config = config_from(&[]);
        assert!(!config.debug);
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.log_level(), LevelFilter::Info);
        assert!(config.ignored.is_empty());
    }

    #[test]
    fn test_config_overrides() {
        let config = config_from(&[
            ("WORKFOCUS_DEBUG", "TRUE"),
            ("WORKFOCUS_TICK_MS", "250"),
            ("WORKFOCUS_SAMPLE_RATE", "48000"),
        ]);
        assert!(config.debug);
        assert_eq!(config.log_level(), LevelFilter::Debug);
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.sample_rate, 48000);
    }

    #[test]
    fn test_config_rejects_garbage() {
        let config = config_from(&[
            ("WORKFOCUS_TICK_MS", "0"),
            ("WORKFOCUS_SAMPLE_RATE", "fast"),
        ]);
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.ignored.len(), 2);
    }

    #[test]
    fn test_config_rejects_unusable_sample_rates() {
        for raw in ["2", "7999", "1000000"] {
            let config = config_from(&[("WORKFOCUS_SAMPLE_RATE", raw)]);
            assert_eq!(config.sample_rate, 44100, "accepted {raw}");
            assert_eq!(config.ignored.len(), 1);
        }
        let config = config_from(&[("WORKFOCUS_SAMPLE_RATE", "8000")]);
        assert_eq!(config.sample_rate, 8000);
    }

    #[test]
    fn test_store_clamps_volume() {
        let store = SettingsStore::default();
        let updated = store.update_sound(|s| {
            s.enabled = true;
            s.family = NoiseFamily::Ocean;
            s.volume = 180;
        });
        assert_eq!(updated.volume, 100);
        assert_eq!(store.sound(), updated);
        assert_eq!(store.sound().family, NoiseFamily::Ocean);
    }
}
