//! Simulated capture hardware
//!
//! Default ranges follow a typical phone back camera: ISO 32–3072,
//! exposure 1/16000 s – 1/2 s, frame rate 24–60 fps.

use crate::errors::CameraError;
use crate::platform::{CaptureDevice, CaptureHost};
use crate::types::{CaptureOutput, DeviceInfo, ExposureMode, MediaTime, VideoGravity};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
struct DeviceState {
    iso: f32,
    min_iso: f32,
    max_iso: f32,
    exposure_duration: MediaTime,
    min_exposure: MediaTime,
    max_exposure: MediaTime,
    exposure_mode: ExposureMode,
    active_min_frame_duration: MediaTime,
    active_max_frame_duration: MediaTime,
    smooth_autofocus: bool,
    locked: bool,
    fail_lock: bool,
    reject_mutations: bool,
    reject_autofocus: bool,
    lock_count: u64,
    unlock_count: u64,
    write_count: u64,
}

pub struct SimulatedDevice {
    info: DeviceInfo,
    state: Mutex<DeviceState>,
}

impl SimulatedDevice {
    pub fn new() -> Self {
        Self {
            info: DeviceInfo::new("sim-0", "Simulated Back Camera"),
            state: Mutex::new(DeviceState {
                iso: 100.0,
                min_iso: 32.0,
                max_iso: 3072.0,
                exposure_duration: MediaTime::new(1, 60),
                min_exposure: MediaTime::new(1, 16_000),
                max_exposure: MediaTime::new(1, 2),
                exposure_mode: ExposureMode::ContinuousAuto,
                active_min_frame_duration: MediaTime::per_frame(60),
                active_max_frame_duration: MediaTime::per_frame(24),
                smooth_autofocus: false,
                locked: false,
                fail_lock: false,
                reject_mutations: false,
                reject_autofocus: false,
                lock_count: 0,
                unlock_count: 0,
                write_count: 0,
            }),
        }
    }

    pub fn with_iso_range(self, min_iso: f32, max_iso: f32) -> Self {
        {
            let mut state = self.state();
            state.min_iso = min_iso;
            state.max_iso = max_iso;
            state.iso = state.iso.clamp(min_iso, max_iso);
        }
        self
    }

    /// Fixed frame rate: min and max frame duration equal.
    pub fn with_fixed_frame_rate(self, fps: i32) -> Self {
        {
            let mut state = self.state();
            state.active_min_frame_duration = MediaTime::per_frame(fps);
            state.active_max_frame_duration = MediaTime::per_frame(fps);
        }
        self
    }

    pub fn with_frame_rate_range(self, min_fps: i32, max_fps: i32) -> Self {
        {
            let mut state = self.state();
            state.active_min_frame_duration = MediaTime::per_frame(max_fps);
            state.active_max_frame_duration = MediaTime::per_frame(min_fps);
        }
        self
    }

    pub fn set_fail_lock(&self, fail: bool) {
        self.state().fail_lock = fail;
    }

    pub fn set_reject_mutations(&self, reject: bool) {
        self.state().reject_mutations = reject;
    }

    /// Reject only smooth-autofocus writes.
    pub fn set_reject_autofocus(&self, reject: bool) {
        self.state().reject_autofocus = reject;
    }

    pub fn is_locked(&self) -> bool {
        self.state().locked
    }

    pub fn lock_count(&self) -> u64 {
        self.state().lock_count
    }

    pub fn unlock_count(&self) -> u64 {
        self.state().unlock_count
    }

    /// Successful property writes.
    pub fn write_count(&self) -> u64 {
        self.state().write_count
    }

    fn state(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn writable(&self) -> Result<MutexGuard<'_, DeviceState>, CameraError> {
        let state = self.state();
        if !state.locked {
            return Err(CameraError::ConfigurationError(
                "property written outside a configuration lock".to_string(),
            ));
        }
        if state.reject_mutations {
            return Err(CameraError::ConfigurationError(
                "device rejected the configuration".to_string(),
            ));
        }
        Ok(state)
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureDevice for SimulatedDevice {
    fn info(&self) -> DeviceInfo {
        self.info.clone()
    }

    fn lock_for_configuration(&self) -> Result<(), CameraError> {
        let mut state = self.state();
        if state.fail_lock {
            return Err(CameraError::LockAcquisitionFailed(
                "device is in use by another client".to_string(),
            ));
        }
        if state.locked {
            return Err(CameraError::LockAcquisitionFailed(
                "device is already locked for configuration".to_string(),
            ));
        }
        state.locked = true;
        state.lock_count += 1;
        Ok(())
    }

    fn unlock_for_configuration(&self) {
        let mut state = self.state();
        if state.locked {
            state.locked = false;
            state.unlock_count += 1;
        }
    }

    fn iso(&self) -> f32 {
        self.state().iso
    }

    fn min_iso(&self) -> f32 {
        self.state().min_iso
    }

    fn max_iso(&self) -> f32 {
        self.state().max_iso
    }

    fn exposure_duration(&self) -> MediaTime {
        self.state().exposure_duration
    }

    fn min_exposure_duration(&self) -> MediaTime {
        self.state().min_exposure
    }

    fn max_exposure_duration(&self) -> MediaTime {
        self.state().max_exposure
    }

    fn exposure_mode(&self) -> ExposureMode {
        self.state().exposure_mode
    }

    fn set_exposure_mode_custom(&self, duration: MediaTime, iso: f32) -> Result<(), CameraError> {
        let mut state = self.writable()?;
        if !duration.is_valid()
            || duration.cmp_duration(&state.min_exposure).is_lt()
            || duration.cmp_duration(&state.max_exposure).is_gt()
        {
            return Err(CameraError::ConfigurationError(format!(
                "exposure duration {} out of range",
                duration
            )));
        }
        if !(state.min_iso..=state.max_iso).contains(&iso) {
            return Err(CameraError::ConfigurationError(format!("ISO {} out of range", iso)));
        }
        state.exposure_duration = duration;
        state.iso = iso;
        state.exposure_mode = ExposureMode::Custom;
        state.write_count += 1;
        Ok(())
    }

    fn active_min_frame_duration(&self) -> MediaTime {
        self.state().active_min_frame_duration
    }

    fn active_max_frame_duration(&self) -> MediaTime {
        self.state().active_max_frame_duration
    }

    fn set_active_max_frame_duration(&self, duration: MediaTime) -> Result<(), CameraError> {
        let mut state = self.writable()?;
        state.active_max_frame_duration = duration;
        state.write_count += 1;
        Ok(())
    }

    fn smooth_autofocus_enabled(&self) -> bool {
        self.state().smooth_autofocus
    }

    fn set_smooth_autofocus_enabled(&self, enabled: bool) -> Result<(), CameraError> {
        let mut state = self.writable()?;
        if state.reject_autofocus {
            return Err(CameraError::ConfigurationError(
                "smooth autofocus not supported".to_string(),
            ));
        }
        state.smooth_autofocus = enabled;
        state.write_count += 1;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct HostState {
    inputs: Vec<DeviceInfo>,
    outputs: Vec<CaptureOutput>,
    configuring: bool,
    running: bool,
    preview: Option<VideoGravity>,
    refuse_input: bool,
    refuse_output: bool,
    fail_preview: bool,
    discoveries: u64,
    commits: u64,
    unguarded_mutations: u64,
}

/// Simulated host session. Capability checks only consult the refusal
/// flags, so duplicate attachment is prevented by the caller, not the host.
pub struct SimulatedHost {
    device: Option<Arc<SimulatedDevice>>,
    state: Mutex<HostState>,
}

impl SimulatedHost {
    pub fn new(device: Arc<SimulatedDevice>) -> Self {
        Self {
            device: Some(device),
            state: Mutex::new(HostState::default()),
        }
    }

    /// Host with no camera attached.
    pub fn without_device() -> Self {
        Self {
            device: None,
            state: Mutex::new(HostState::default()),
        }
    }

    pub fn device(&self) -> Option<Arc<SimulatedDevice>> {
        self.device.clone()
    }

    pub fn refuse_input(&self, refuse: bool) {
        self.state().refuse_input = refuse;
    }

    pub fn refuse_output(&self, refuse: bool) {
        self.state().refuse_output = refuse;
    }

    pub fn fail_preview(&self, fail: bool) {
        self.state().fail_preview = fail;
    }

    pub fn input_count(&self) -> usize {
        self.state().inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.state().outputs.len()
    }

    pub fn is_running(&self) -> bool {
        self.state().running
    }

    pub fn is_configuring(&self) -> bool {
        self.state().configuring
    }

    pub fn preview(&self) -> Option<VideoGravity> {
        self.state().preview
    }

    pub fn discoveries(&self) -> u64 {
        self.state().discoveries
    }

    pub fn commits(&self) -> u64 {
        self.state().commits
    }

    /// Attach/detach calls made outside begin/commit.
    pub fn unguarded_mutations(&self) -> u64 {
        self.state().unguarded_mutations
    }

    fn state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_mutation(state: &mut HostState) {
        if !state.configuring {
            state.unguarded_mutations += 1;
        }
    }
}

impl CaptureHost for SimulatedHost {
    fn default_video_device(&self) -> Option<Arc<dyn CaptureDevice>> {
        self.state().discoveries += 1;
        self.device
            .clone()
            .map(|device| device as Arc<dyn CaptureDevice>)
    }

    fn begin_configuration(&self) {
        self.state().configuring = true;
    }

    fn commit_configuration(&self) {
        let mut state = self.state();
        state.configuring = false;
        state.commits += 1;
    }

    fn can_add_input(&self, _device: &DeviceInfo) -> bool {
        !self.state().refuse_input
    }

    fn add_input(&self, device: &DeviceInfo) -> Result<(), CameraError> {
        let mut state = self.state();
        Self::record_mutation(&mut state);
        state.inputs.push(device.clone());
        Ok(())
    }

    fn remove_input(&self, device: &DeviceInfo) {
        let mut state = self.state();
        Self::record_mutation(&mut state);
        state.inputs.retain(|input| input.id != device.id);
    }

    fn can_add_output(&self, _output: CaptureOutput) -> bool {
        !self.state().refuse_output
    }

    fn add_output(&self, output: CaptureOutput) -> Result<(), CameraError> {
        let mut state = self.state();
        Self::record_mutation(&mut state);
        state.outputs.push(output);
        Ok(())
    }

    fn remove_output(&self, output: CaptureOutput) {
        let mut state = self.state();
        Self::record_mutation(&mut state);
        state.outputs.retain(|o| *o != output);
    }

    fn bind_preview(&self, gravity: VideoGravity) -> Result<(), CameraError> {
        let mut state = self.state();
        if state.fail_preview {
            return Err(CameraError::InitializationError(
                "preview surface unavailable".to_string(),
            ));
        }
        state.preview = Some(gravity);
        Ok(())
    }

    fn unbind_preview(&self) {
        self.state().preview = None;
    }

    fn start_running(&self) -> Result<(), CameraError> {
        self.state().running = true;
        Ok(())
    }

    fn stop_running(&self) {
        self.state().running = false;
    }
}
