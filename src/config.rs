use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} must be positive (got {value})")]
    NonPositiveWindow { name: &'static str, value: f64 },
    #[error("min_chorus_fraction must be within [0, 1] (got {0})")]
    FractionOutOfRange(f64),
    #[error("register_base {0} leaves no room for a triad below the melody")]
    RegisterTooHigh(u8),
    #[error("chord_velocity must be a MIDI velocity 0-127 (got {0})")]
    VelocityOutOfRange(u8),
}

/// Tunable parameters of the arrangement pipeline.
/// The defaults are what `Default` yields; every field can be overridden
/// from the `[pipeline]` table of the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Window length for repetition (chorus) detection, in seconds.
    pub segment_seconds: f64,
    /// Window length for chord estimation, in seconds.
    pub measure_seconds: f64,
    /// Smallest share of the melody the chorus may hold before the
    /// detector falls back to the full melody.
    pub min_chorus_fraction: f64,
    /// MIDI pitch the chord root octave is anchored at (36 = C two
    /// octaves below middle C).
    pub register_base: u8,
    /// Velocity of the synthesized chord notes, softer than the melody.
    pub chord_velocity: u8,
    /// Chord quality when the melody offers both thirds or neither:
    /// true = major (the classic beginner-arrangement default).
    pub ambiguous_third_major: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            segment_seconds: 4.0,
            measure_seconds: 2.0,
            min_chorus_fraction: 0.2,
            register_base: 36,
            chord_velocity: 70,
            ambiguous_third_major: true,
        }
    }
}

impl PipelineConfig {
    /// Check the window and register invariants before a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.segment_seconds <= 0.0 || !self.segment_seconds.is_finite() {
            return Err(ConfigError::NonPositiveWindow {
                name: "segment_seconds",
                value: self.segment_seconds,
            });
        }
        if self.measure_seconds <= 0.0 || !self.measure_seconds.is_finite() {
            return Err(ConfigError::NonPositiveWindow {
                name: "measure_seconds",
                value: self.measure_seconds,
            });
        }
        if !(0.0..=1.0).contains(&self.min_chorus_fraction) {
            return Err(ConfigError::FractionOutOfRange(self.min_chorus_fraction));
        }
        // Highest triad voice: root pc 11 plus a fifth above the anchor
        if self.register_base > 127 - 18 {
            return Err(ConfigError::RegisterTooHigh(self.register_base));
        }
        if self.chord_velocity > 127 {
            return Err(ConfigError::VelocityOutOfRange(self.chord_velocity));
        }
        Ok(())
    }
}

/// Application configuration loaded from a TOML config file.
/// All fields have sensible defaults, so the config file is optional.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Directory arrangements are written to (default: next to the input).
    pub out_dir: Option<PathBuf>,
    /// Number of parallel workers. 0 = auto-detect (cores / 2, min 1).
    pub workers: usize,
    /// Pipeline parameter overrides.
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Load config from `~/.config/refrain/config.toml`.
    /// Returns default config if the file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        match config_path {
            Some(path) if path.exists() => match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<AppConfig>(&contents) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", path.display());
                        config
                    }
                    Err(e) => {
                        log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                        Self::default()
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Resolve worker count: 0 → auto-detect (cores / 2, min 1).
    pub fn resolve_workers(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            let cores = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(2);
            (cores / 2).max(1)
        }
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
