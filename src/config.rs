// Every tunable of the sketch, loadable from `chronotope.toml`.
// Missing sections/fields fall back to the values the sketch was tuned with.

use crate::error::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Default, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub gesture: GestureConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub snapshots: SnapshotConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfig {
    #[serde(default)]
    pub index: u32,
    #[serde(default = "default_camera_width")]
    pub width: u32,
    #[serde(default = "default_camera_height")]
    pub height: u32,
    /// Show the feed like a mirror. Landmarks are detected on the mirrored frame.
    #[serde(default = "default_true")]
    pub mirror: bool,
}

fn default_camera_width() -> u32 { 640 }
fn default_camera_height() -> u32 { 480 }
fn default_true() -> bool { true }

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: default_camera_width(),
            height: default_camera_height(),
            mirror: true,
        }
    }
}

/// Window size; zero means "same as the camera".
#[derive(Debug, Default, Deserialize, Clone)]
pub struct WindowConfig {
    #[serde(default)]
    pub width: usize,
    #[serde(default)]
    pub height: usize,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TrackerKind {
    /// Pointer-driven simulated hands.
    Mouse,
    /// External landmark helper process.
    Subprocess,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TrackerConfig {
    #[serde(default = "default_tracker_kind")]
    pub kind: TrackerKind,
    #[serde(default = "default_tracker_command")]
    pub command: String,
    #[serde(default = "default_tracker_args")]
    pub args: Vec<String>,
    #[serde(default = "default_confidence")]
    pub min_confidence: f32,
}

fn default_tracker_kind() -> TrackerKind { TrackerKind::Mouse }
fn default_tracker_command() -> String { "python3".to_string() }
fn default_tracker_args() -> Vec<String> { vec!["hand_landmarks.py".to_string()] }
fn default_confidence() -> f32 { 0.3 }

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            kind: default_tracker_kind(),
            command: default_tracker_command(),
            args: default_tracker_args(),
            min_confidence: default_confidence(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GestureMode {
    /// Thumb, index and middle tips pinched together on one hand.
    Close,
    /// Index tips of two hands brought together.
    Far,
    /// One hand curled into a fist.
    Fist,
}

impl GestureMode {
    pub fn next(self) -> Self {
        match self {
            GestureMode::Close => GestureMode::Far,
            GestureMode::Far => GestureMode::Fist,
            GestureMode::Fist => GestureMode::Close,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GestureMode::Close => "CLOSE",
            GestureMode::Far => "FAR",
            GestureMode::Fist => "FIST",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GestureConfig {
    #[serde(default = "default_mode")]
    pub mode: GestureMode,
    /// Consecutive frames a raw gesture must hold before it is confirmed.
    #[serde(default = "default_frame_threshold")]
    pub frame_threshold: u32,
    #[serde(default = "default_base_centroid_threshold")]
    pub base_centroid_threshold: f32,
    #[serde(default = "default_reference_hand_size")]
    pub reference_hand_size: f32,
    #[serde(default = "default_far_threshold")]
    pub far_threshold: f32,
    #[serde(default = "default_smoothing_window")]
    pub smoothing_window: usize,
    #[serde(default = "default_fist_threshold")]
    pub fist_threshold: f32,
    #[serde(default = "default_open_threshold")]
    pub open_threshold: f32,
}

fn default_mode() -> GestureMode { GestureMode::Close }
fn default_frame_threshold() -> u32 { 3 }
fn default_base_centroid_threshold() -> f32 { 32.0 }
fn default_reference_hand_size() -> f32 { 128.0 }
fn default_far_threshold() -> f32 { 96.0 }
fn default_smoothing_window() -> usize { 6 }
fn default_fist_threshold() -> f32 { 35.0 }
fn default_open_threshold() -> f32 { 70.0 }

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            frame_threshold: default_frame_threshold(),
            base_centroid_threshold: default_base_centroid_threshold(),
            reference_hand_size: default_reference_hand_size(),
            far_threshold: default_far_threshold(),
            smoothing_window: default_smoothing_window(),
            fist_threshold: default_fist_threshold(),
            open_threshold: default_open_threshold(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SelectionConfig {
    /// A selection is kept only if one side is longer than this (pixels).
    #[serde(default = "default_min_size")]
    pub min_size: f32,
    #[serde(default = "default_development_ms")]
    pub development_ms: u64,
}

fn default_min_size() -> f32 { 80.0 }
fn default_development_ms() -> u64 { 750 }

impl Default for SelectionConfig {
    fn default() -> Self {
        Self { min_size: default_min_size(), development_ms: default_development_ms() }
    }
}

impl SelectionConfig {
    pub fn development(&self) -> Duration {
        Duration::from_millis(self.development_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SnapshotConfig {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_true")]
    pub fade: bool,
    /// Time a snapshot stays fully opaque.
    #[serde(default = "default_fade_delay_ms")]
    pub fade_delay_ms: u64,
    #[serde(default = "default_fade_duration_ms")]
    pub fade_duration_ms: u64,
}

fn default_limit() -> usize { 20 }
fn default_fade_delay_ms() -> u64 { 120_000 }
fn default_fade_duration_ms() -> u64 { 10_000 }

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            fade: true,
            fade_delay_ms: default_fade_delay_ms(),
            fade_duration_ms: default_fade_duration_ms(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Missing file means defaults; a broken file is reported and ignored.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("{e}; using defaults");
                Self::default()
            }
        }
    }
}
