use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::analysis::bands::Band;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    /// Threshold overrides by name, clamped to [0, 1] when applied
    #[serde(default)]
    pub thresholds: BTreeMap<String, f32>,
    /// Band overrides or additions by name
    #[serde(default)]
    pub bands: BTreeMap<String, Band>,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    #[serde(default = "default_smoothing")]
    pub smoothing: f32,
    #[serde(default = "default_min_time_between_beats_ms")]
    pub min_time_between_beats_ms: u64,
    #[serde(default = "default_history_size")]
    pub history_size: usize,
    #[serde(default = "default_min_decibels")]
    pub min_decibels: f32,
    #[serde(default = "default_max_decibels")]
    pub max_decibels: f32,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_fps")]
    pub fps: u32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            fft_size: default_fft_size(),
            smoothing: default_smoothing(),
            min_time_between_beats_ms: default_min_time_between_beats_ms(),
            history_size: default_history_size(),
            min_decibels: default_min_decibels(),
            max_decibels: default_max_decibels(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { fps: default_fps() }
    }
}

fn default_fft_size() -> usize { 2048 }
fn default_smoothing() -> f32 { 0.5 }
fn default_min_time_between_beats_ms() -> u64 { 100 }
fn default_history_size() -> usize { 10 }
fn default_min_decibels() -> f32 { -90.0 }
fn default_max_decibels() -> f32 { -10.0 }
fn default_fps() -> u32 { 60 }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(err) => {
            log::warn!("Invalid config {}: {}", path.display(), err);
            None
        }
    }
}

/// Resolve the config file: explicit path, then `./audiopulse.toml`, then the
/// per-user config directories.
pub fn find_config(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(|| {
        let local = PathBuf::from("audiopulse.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("audiopulse").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("audiopulse").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    })
}
