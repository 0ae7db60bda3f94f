//! Core value types shared by the session manager, the device controller and
//! the host backends.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Rational time value (`value / timescale` seconds), the device-native
/// representation of exposure and frame durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaTime {
    pub value: i64,
    pub timescale: i32,
}

impl MediaTime {
    pub const fn new(value: i64, timescale: i32) -> Self {
        Self { value, timescale }
    }

    /// Duration of one frame at the given rate.
    pub const fn per_frame(fps: i32) -> Self {
        Self::new(1, fps)
    }

    pub fn is_valid(&self) -> bool {
        self.timescale > 0
    }

    pub fn seconds(&self) -> f64 {
        if self.timescale == 0 {
            return 0.0;
        }
        self.value as f64 / self.timescale as f64
    }

    /// Numeric comparison, so `1/30` and `2/60` compare equal.
    pub fn cmp_duration(&self, other: &MediaTime) -> Ordering {
        let lhs = self.value as i128 * other.timescale as i128;
        let rhs = other.value as i128 * self.timescale as i128;
        lhs.cmp(&rhs)
    }

    pub fn same_duration(&self, other: &MediaTime) -> bool {
        self.cmp_duration(other) == Ordering::Equal
    }
}

impl fmt::Display for MediaTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.value, self.timescale)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExposureMode {
    ContinuousAuto,
    Custom,
}

/// A single UI-originated parameter edit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "parameter", content = "value", rename_all = "snake_case")]
pub enum ParameterChange {
    Sensitivity(f32),
    /// Seconds per exposure, e.g. `1.0 / 60.0`.
    ShutterSpeed(f32),
    Stabilization(bool),
}

/// Whether a transaction changed the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyOutcome {
    Applied,
    /// The device does not support the change; nothing was written.
    Unsupported,
}

/// Basic identity of a discovered capture device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
}

impl DeviceInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Point-in-time view of the device state for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub device: DeviceInfo,
    pub iso: f32,
    pub min_iso: f32,
    pub max_iso: f32,
    pub exposure_duration: MediaTime,
    pub min_exposure_duration: MediaTime,
    pub max_exposure_duration: MediaTime,
    pub active_min_frame_duration: MediaTime,
    pub active_max_frame_duration: MediaTime,
    pub exposure_mode: ExposureMode,
    pub smooth_autofocus: bool,
}

/// How the preview fills its host surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoGravity {
    ResizeAspect,
    ResizeAspectFill,
    Resize,
}

/// The sink attached to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureOutput {
    MovieFile,
}
