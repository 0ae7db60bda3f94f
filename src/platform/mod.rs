//! Host capture API seam
//!
//! The capture pipeline and the physical device belong to the host platform.
//! This module describes the primitives the rest of the crate relies on:
//! device discovery, capability checks, input/output attachment, the
//! lock-for-configuration primitive and the exposure/frame-duration
//! accessors. Backends implement [`CaptureHost`] and [`CaptureDevice`].

use crate::errors::CameraError;
use crate::types::{CaptureOutput, DeviceInfo, DeviceSnapshot, ExposureMode, MediaTime, VideoGravity};
use std::sync::Arc;

pub mod nokhwa_host;

pub use nokhwa_host::{NokhwaDevice, NokhwaHost, NokhwaHostOptions};

/// A physical camera as exposed by the host.
///
/// Setters are only legal between [`lock_for_configuration`] and
/// [`unlock_for_configuration`]; getters may be called at any time.
///
/// [`lock_for_configuration`]: CaptureDevice::lock_for_configuration
/// [`unlock_for_configuration`]: CaptureDevice::unlock_for_configuration
pub trait CaptureDevice: Send + Sync {
    fn info(&self) -> DeviceInfo;

    /// Request exclusive configuration access. Fails when the device is
    /// unavailable or held by another client.
    fn lock_for_configuration(&self) -> Result<(), CameraError>;
    fn unlock_for_configuration(&self);

    fn iso(&self) -> f32;
    fn min_iso(&self) -> f32;
    fn max_iso(&self) -> f32;

    fn exposure_duration(&self) -> MediaTime;
    fn min_exposure_duration(&self) -> MediaTime;
    fn max_exposure_duration(&self) -> MediaTime;

    fn exposure_mode(&self) -> ExposureMode;
    /// Switch to custom exposure with both values set in one write.
    fn set_exposure_mode_custom(&self, duration: MediaTime, iso: f32) -> Result<(), CameraError>;

    fn active_min_frame_duration(&self) -> MediaTime;
    fn active_max_frame_duration(&self) -> MediaTime;
    fn set_active_max_frame_duration(&self, duration: MediaTime) -> Result<(), CameraError>;

    fn smooth_autofocus_enabled(&self) -> bool;
    fn set_smooth_autofocus_enabled(&self, enabled: bool) -> Result<(), CameraError>;

    fn snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            device: self.info(),
            iso: self.iso(),
            min_iso: self.min_iso(),
            max_iso: self.max_iso(),
            exposure_duration: self.exposure_duration(),
            min_exposure_duration: self.min_exposure_duration(),
            max_exposure_duration: self.max_exposure_duration(),
            active_min_frame_duration: self.active_min_frame_duration(),
            active_max_frame_duration: self.active_max_frame_duration(),
            exposure_mode: self.exposure_mode(),
            smooth_autofocus: self.smooth_autofocus_enabled(),
        }
    }
}

/// The host side of a capture session.
///
/// `can_add_*` are advisory pre-flight checks; callers still handle an
/// `add_*` failure.
pub trait CaptureHost: Send + Sync {
    /// Discover the default video-capable device, if any.
    fn default_video_device(&self) -> Option<Arc<dyn CaptureDevice>>;

    fn begin_configuration(&self);
    fn commit_configuration(&self);

    fn can_add_input(&self, device: &DeviceInfo) -> bool;
    fn add_input(&self, device: &DeviceInfo) -> Result<(), CameraError>;
    fn remove_input(&self, device: &DeviceInfo);

    fn can_add_output(&self, output: CaptureOutput) -> bool;
    fn add_output(&self, output: CaptureOutput) -> Result<(), CameraError>;
    fn remove_output(&self, output: CaptureOutput);

    /// Attach the live preview layer of the host view to the session.
    fn bind_preview(&self, gravity: VideoGravity) -> Result<(), CameraError>;
    fn unbind_preview(&self);

    fn start_running(&self) -> Result<(), CameraError>;
    fn stop_running(&self);
}
