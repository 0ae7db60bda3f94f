use crate::errors::CameraError;
use crate::platform::{CaptureDevice, CaptureHost};
use crate::types::{CaptureOutput, DeviceInfo, ExposureMode, MediaTime, VideoGravity};
use nokhwa::{
    pixel_format::RgbFormat,
    query,
    utils::{
        ApiBackend, CameraIndex, ControlValueSetter, KnownCameraControl, RequestedFormat,
        RequestedFormatType,
    },
    CallbackCamera, NokhwaError,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// V4L2 exposure mode control, reached through nokhwa's raw control id.
const V4L2_CID_EXPOSURE_AUTO: u128 = 0x009a_0901;
const V4L2_EXPOSURE_MANUAL: i64 = 1;
const V4L2_CID_FOCUS_AUTO: u128 = 0x009a_090c;

/// Tuning for mapping device-native controls onto ISO and frame durations.
///
/// UVC cameras expose gain rather than ISO and a fixed frame-rate range per
/// format, so the ranges here describe how this backend presents them.
#[derive(Debug, Clone)]
pub struct NokhwaHostOptions {
    pub backend: ApiBackend,
    pub min_iso: f32,
    pub max_iso: f32,
    pub initial_iso: f32,
    /// Gain control range the ISO range is mapped onto.
    pub gain_range: (i64, i64),
    pub min_exposure: MediaTime,
    pub max_exposure: MediaTime,
    pub initial_exposure: MediaTime,
    pub min_fps: i32,
    pub max_fps: i32,
}

impl Default for NokhwaHostOptions {
    fn default() -> Self {
        Self {
            backend: ApiBackend::Auto,
            min_iso: 100.0,
            max_iso: 3200.0,
            initial_iso: 400.0,
            gain_range: (0, 255),
            min_exposure: MediaTime::new(1, 10_000),
            max_exposure: MediaTime::new(1, 2),
            initial_exposure: MediaTime::new(1, 60),
            min_fps: 24,
            max_fps: 30,
        }
    }
}

#[derive(Debug, Clone)]
struct DeviceCache {
    iso: f32,
    exposure_duration: MediaTime,
    exposure_mode: ExposureMode,
    active_min_frame_duration: MediaTime,
    active_max_frame_duration: MediaTime,
    smooth_autofocus: bool,
}

/// Camera opened through nokhwa.
///
/// Reads are served from the last values written, since the backend only
/// exposes write access to the controls this crate drives.
pub struct NokhwaDevice {
    camera: Arc<Mutex<CallbackCamera>>,
    info: DeviceInfo,
    options: NokhwaHostOptions,
    locked: AtomicBool,
    cache: Mutex<DeviceCache>,
}

impl NokhwaDevice {
    pub fn open(
        index: CameraIndex,
        info: DeviceInfo,
        options: NokhwaHostOptions,
    ) -> Result<Self, CameraError> {
        let requested_format = RequestedFormat::new::<RgbFormat>(RequestedFormatType::None);
        let camera = CallbackCamera::new(index, requested_format, |_| {}).map_err(|e| {
            CameraError::InitializationError(format!("Failed to initialize camera: {}", e))
        })?;

        let cache = DeviceCache {
            iso: options.initial_iso,
            exposure_duration: options.initial_exposure,
            exposure_mode: ExposureMode::ContinuousAuto,
            active_min_frame_duration: MediaTime::per_frame(options.max_fps),
            active_max_frame_duration: MediaTime::per_frame(options.min_fps),
            smooth_autofocus: false,
        };

        Ok(Self {
            camera: Arc::new(Mutex::new(camera)),
            info,
            options,
            locked: AtomicBool::new(false),
            cache: Mutex::new(cache),
        })
    }

    fn cache(&self) -> MutexGuard<'_, DeviceCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn camera(&self) -> Result<MutexGuard<'_, CallbackCamera>, CameraError> {
        self.camera
            .lock()
            .map_err(|_| CameraError::ConfigurationError("Failed to lock camera".to_string()))
    }

    fn ensure_locked(&self) -> Result<(), CameraError> {
        if self.locked.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(CameraError::ConfigurationError(
                "device is not locked for configuration".to_string(),
            ))
        }
    }

    fn iso_to_gain(&self, iso: f32) -> i64 {
        let (gain_min, gain_max) = self.options.gain_range;
        let span = (self.options.max_iso - self.options.min_iso).max(f32::EPSILON);
        let t = ((iso - self.options.min_iso) / span).clamp(0.0, 1.0) as f64;
        gain_min + ((gain_max - gain_min) as f64 * t).round() as i64
    }

    fn start_stream(&self) -> Result<(), CameraError> {
        self.camera()?.open_stream().map_err(|e| {
            CameraError::InitializationError(format!("Failed to start stream: {}", e))
        })
    }

    fn stop_stream(&self) -> Result<(), CameraError> {
        self.camera()?.stop_stream().map_err(|e| {
            CameraError::InitializationError(format!("Failed to stop stream: {}", e))
        })
    }
}

/// Exposure time in the 100 µs units used by UVC/V4L2.
fn exposure_to_100us(duration: MediaTime) -> i64 {
    (duration.seconds() * 10_000.0).round().max(1.0) as i64
}

/// Frame rate whose frame duration is `duration`.
fn duration_to_fps(duration: MediaTime) -> u32 {
    let seconds = duration.seconds();
    if seconds <= 0.0 {
        return 0;
    }
    (1.0 / seconds).round() as u32
}

/// Writes the device needs from the camera handle.
trait ControlSink {
    fn set_control(
        &mut self,
        control: KnownCameraControl,
        value: ControlValueSetter,
    ) -> Result<(), NokhwaError>;
    fn set_fps(&mut self, fps: u32) -> Result<(), NokhwaError>;
}

impl ControlSink for CallbackCamera {
    fn set_control(
        &mut self,
        control: KnownCameraControl,
        value: ControlValueSetter,
    ) -> Result<(), NokhwaError> {
        self.set_camera_control(control, value)
    }

    fn set_fps(&mut self, fps: u32) -> Result<(), NokhwaError> {
        self.set_frame_rate(fps)
    }
}

/// Write exposure then gain. The cache follows each write that lands, so a
/// failed gain write still leaves the new exposure visible to readers.
fn write_custom_exposure(
    sink: &mut impl ControlSink,
    cache: &mut DeviceCache,
    duration: MediaTime,
    iso: f32,
    gain: i64,
) -> Result<(), CameraError> {
    if let Err(e) = sink.set_control(
        KnownCameraControl::Other(V4L2_CID_EXPOSURE_AUTO),
        ControlValueSetter::Integer(V4L2_EXPOSURE_MANUAL),
    ) {
        log::debug!("Manual exposure mode control not available: {}", e);
    }
    sink.set_control(
        KnownCameraControl::Exposure,
        ControlValueSetter::Integer(exposure_to_100us(duration)),
    )
    .map_err(|e| CameraError::ConfigurationError(format!("Failed to set exposure: {}", e)))?;
    cache.exposure_duration = duration;
    cache.exposure_mode = ExposureMode::Custom;

    sink.set_control(KnownCameraControl::Gain, ControlValueSetter::Integer(gain))
        .map_err(|e| CameraError::ConfigurationError(format!("Failed to set gain: {}", e)))?;
    cache.iso = iso;
    Ok(())
}

fn write_max_frame_duration(
    sink: &mut impl ControlSink,
    cache: &mut DeviceCache,
    duration: MediaTime,
) -> Result<(), CameraError> {
    if duration.cmp_duration(&cache.active_min_frame_duration).is_lt() {
        return Err(CameraError::ConfigurationError(format!(
            "max frame duration {} below min frame duration {}",
            duration, cache.active_min_frame_duration
        )));
    }
    let fps = duration_to_fps(duration);
    if fps == 0 {
        return Err(CameraError::ConfigurationError(format!(
            "frame duration {} has no usable frame rate",
            duration
        )));
    }
    sink.set_fps(fps).map_err(|e| {
        CameraError::ConfigurationError(format!("Failed to set frame rate {}: {}", fps, e))
    })?;
    cache.active_max_frame_duration = duration;
    Ok(())
}

fn write_smooth_autofocus(
    sink: &mut impl ControlSink,
    cache: &mut DeviceCache,
    enabled: bool,
) -> Result<(), CameraError> {
    sink.set_control(
        KnownCameraControl::Other(V4L2_CID_FOCUS_AUTO),
        ControlValueSetter::Boolean(enabled),
    )
    .map_err(|e| CameraError::ConfigurationError(format!("Failed to set autofocus: {}", e)))?;
    cache.smooth_autofocus = enabled;
    Ok(())
}

impl CaptureDevice for NokhwaDevice {
    fn info(&self) -> DeviceInfo {
        self.info.clone()
    }

    fn lock_for_configuration(&self) -> Result<(), CameraError> {
        if self.camera.is_poisoned() {
            return Err(CameraError::LockAcquisitionFailed(
                "camera handle is unusable after a previous failure".to_string(),
            ));
        }
        self.locked
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| {
                CameraError::LockAcquisitionFailed(format!(
                    "device {} is already locked for configuration",
                    self.info.id
                ))
            })
    }

    fn unlock_for_configuration(&self) {
        self.locked.store(false, Ordering::Release);
    }

    fn iso(&self) -> f32 {
        self.cache().iso
    }

    fn min_iso(&self) -> f32 {
        self.options.min_iso
    }

    fn max_iso(&self) -> f32 {
        self.options.max_iso
    }

    fn exposure_duration(&self) -> MediaTime {
        self.cache().exposure_duration
    }

    fn min_exposure_duration(&self) -> MediaTime {
        self.options.min_exposure
    }

    fn max_exposure_duration(&self) -> MediaTime {
        self.options.max_exposure
    }

    fn exposure_mode(&self) -> ExposureMode {
        self.cache().exposure_mode
    }

    fn set_exposure_mode_custom(&self, duration: MediaTime, iso: f32) -> Result<(), CameraError> {
        self.ensure_locked()?;
        if !duration.is_valid()
            || duration.cmp_duration(&self.options.min_exposure).is_lt()
            || duration.cmp_duration(&self.options.max_exposure).is_gt()
        {
            return Err(CameraError::ConfigurationError(format!(
                "exposure duration {} outside device range [{}, {}]",
                duration, self.options.min_exposure, self.options.max_exposure
            )));
        }
        if !(self.options.min_iso..=self.options.max_iso).contains(&iso) {
            return Err(CameraError::ConfigurationError(format!(
                "ISO {} outside device range [{}, {}]",
                iso, self.options.min_iso, self.options.max_iso
            )));
        }

        let gain = self.iso_to_gain(iso);
        let mut camera = self.camera()?;
        write_custom_exposure(&mut *camera, &mut self.cache(), duration, iso, gain)
    }

    fn active_min_frame_duration(&self) -> MediaTime {
        self.cache().active_min_frame_duration
    }

    fn active_max_frame_duration(&self) -> MediaTime {
        self.cache().active_max_frame_duration
    }

    fn set_active_max_frame_duration(&self, duration: MediaTime) -> Result<(), CameraError> {
        self.ensure_locked()?;
        let mut camera = self.camera()?;
        write_max_frame_duration(&mut *camera, &mut self.cache(), duration)
    }

    fn smooth_autofocus_enabled(&self) -> bool {
        self.cache().smooth_autofocus
    }

    fn set_smooth_autofocus_enabled(&self, enabled: bool) -> Result<(), CameraError> {
        self.ensure_locked()?;
        let mut camera = self.camera()?;
        write_smooth_autofocus(&mut *camera, &mut self.cache(), enabled)
    }
}

impl Drop for NokhwaDevice {
    fn drop(&mut self) {
        if let Ok(mut camera) = self.camera.lock() {
            let _ = camera.stop_stream();
        }
    }
}

// Thread-safe implementation
unsafe impl Send for NokhwaDevice {}
unsafe impl Sync for NokhwaDevice {}

#[derive(Debug, Default)]
struct Attachments {
    input: Option<DeviceInfo>,
    preview: Option<VideoGravity>,
    configuring: bool,
}

/// Host backed by the platform camera stack through nokhwa.
pub struct NokhwaHost {
    options: NokhwaHostOptions,
    device: Mutex<Option<Arc<NokhwaDevice>>>,
    attachments: Mutex<Attachments>,
    preview_frames: Arc<AtomicU64>,
}

impl NokhwaHost {
    pub fn new(options: NokhwaHostOptions) -> Self {
        Self {
            options,
            device: Mutex::new(None),
            attachments: Mutex::new(Attachments::default()),
            preview_frames: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Frames delivered to the preview since it was bound.
    pub fn preview_frames(&self) -> u64 {
        self.preview_frames.load(Ordering::Relaxed)
    }

    fn discovered(&self) -> Option<Arc<NokhwaDevice>> {
        self.device
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn attachments(&self) -> MutexGuard<'_, Attachments> {
        self.attachments.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn discover(&self) -> Result<Arc<NokhwaDevice>, CameraError> {
        let cameras = query(self.options.backend).map_err(|e| {
            CameraError::InitializationError(format!("Failed to query cameras: {}", e))
        })?;
        let camera_info = cameras.into_iter().next().ok_or_else(|| {
            CameraError::DeviceUnavailable("no video capture device found".to_string())
        })?;

        let info = DeviceInfo::new(camera_info.index().to_string(), camera_info.human_name());
        log::info!("Discovered default camera: {} ({})", info.name, info.id);
        let device =
            NokhwaDevice::open(camera_info.index().clone(), info, self.options.clone())?;
        Ok(Arc::new(device))
    }
}

impl Default for NokhwaHost {
    fn default() -> Self {
        Self::new(NokhwaHostOptions::default())
    }
}

impl CaptureHost for NokhwaHost {
    fn default_video_device(&self) -> Option<Arc<dyn CaptureDevice>> {
        let mut slot = self.device.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            match self.discover() {
                Ok(device) => *slot = Some(device),
                Err(e) => {
                    log::warn!("Camera discovery failed: {}", e);
                    return None;
                }
            }
        }
        slot.clone().map(|device| device as Arc<dyn CaptureDevice>)
    }

    fn begin_configuration(&self) {
        self.attachments().configuring = true;
    }

    fn commit_configuration(&self) {
        self.attachments().configuring = false;
    }

    fn can_add_input(&self, device: &DeviceInfo) -> bool {
        let attachments = self.attachments();
        attachments.input.is_none()
            && self
                .discovered()
                .is_some_and(|discovered| discovered.info.id == device.id)
    }

    fn add_input(&self, device: &DeviceInfo) -> Result<(), CameraError> {
        if !self.can_add_input(device) {
            return Err(CameraError::ConfigurationError(format!(
                "cannot attach input {}",
                device.id
            )));
        }
        self.attachments().input = Some(device.clone());
        Ok(())
    }

    fn remove_input(&self, device: &DeviceInfo) {
        let mut attachments = self.attachments();
        if attachments.input.as_ref().is_some_and(|input| input.id == device.id) {
            attachments.input = None;
        }
    }

    fn can_add_output(&self, _output: CaptureOutput) -> bool {
        // No movie writer in this backend.
        false
    }

    fn add_output(&self, output: CaptureOutput) -> Result<(), CameraError> {
        Err(CameraError::ConfigurationError(format!(
            "{:?} output is not supported by the nokhwa backend",
            output
        )))
    }

    fn remove_output(&self, _output: CaptureOutput) {}

    fn bind_preview(&self, gravity: VideoGravity) -> Result<(), CameraError> {
        let device = self.discovered().ok_or_else(|| {
            CameraError::DeviceUnavailable("preview requested before discovery".to_string())
        })?;
        let frames = self.preview_frames.clone();
        frames.store(0, Ordering::Relaxed);
        device
            .camera()?
            .set_callback(move |_buffer| {
                frames.fetch_add(1, Ordering::Relaxed);
            })
            .map_err(|e| {
                CameraError::InitializationError(format!("Failed to set callback: {}", e))
            })?;
        self.attachments().preview = Some(gravity);
        Ok(())
    }

    fn unbind_preview(&self) {
        self.attachments().preview = None;
    }

    fn start_running(&self) -> Result<(), CameraError> {
        let device = self.discovered().ok_or_else(|| {
            CameraError::DeviceUnavailable("no device attached to session".to_string())
        })?;
        device.start_stream()
    }

    fn stop_running(&self) {
        if let Some(device) = self.discovered() {
            if let Err(e) = device.stop_stream() {
                log::warn!("Failed to stop camera stream: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        controls: Vec<KnownCameraControl>,
        fps: Vec<u32>,
        fail_on: Option<KnownCameraControl>,
        fail_fps: bool,
    }

    impl ControlSink for RecordingSink {
        fn set_control(
            &mut self,
            control: KnownCameraControl,
            value: ControlValueSetter,
        ) -> Result<(), NokhwaError> {
            if self.fail_on == Some(control) {
                return Err(NokhwaError::SetPropertyError {
                    property: format!("{:?}", control),
                    value: format!("{:?}", value),
                    error: "rejected".to_string(),
                });
            }
            self.controls.push(control);
            Ok(())
        }

        fn set_fps(&mut self, fps: u32) -> Result<(), NokhwaError> {
            if self.fail_fps {
                return Err(NokhwaError::SetPropertyError {
                    property: "frame rate".to_string(),
                    value: fps.to_string(),
                    error: "rejected".to_string(),
                });
            }
            self.fps.push(fps);
            Ok(())
        }
    }

    fn cache() -> DeviceCache {
        DeviceCache {
            iso: 400.0,
            exposure_duration: MediaTime::new(1, 60),
            exposure_mode: ExposureMode::ContinuousAuto,
            active_min_frame_duration: MediaTime::per_frame(30),
            active_max_frame_duration: MediaTime::per_frame(24),
            smooth_autofocus: false,
        }
    }

    #[test]
    fn exposure_written_in_100us_units() {
        assert_eq!(exposure_to_100us(MediaTime::new(1, 100)), 100);
        assert_eq!(exposure_to_100us(MediaTime::new(1, 100_000)), 1);
    }

    #[test]
    fn custom_exposure_updates_cache() {
        let mut sink = RecordingSink::default();
        let mut cache = cache();
        write_custom_exposure(&mut sink, &mut cache, MediaTime::new(1, 125), 800.0, 60).unwrap();

        assert_eq!(
            sink.controls,
            vec![
                KnownCameraControl::Other(V4L2_CID_EXPOSURE_AUTO),
                KnownCameraControl::Exposure,
                KnownCameraControl::Gain,
            ]
        );
        assert_eq!(cache.exposure_duration, MediaTime::new(1, 125));
        assert_eq!(cache.iso, 800.0);
        assert_eq!(cache.exposure_mode, ExposureMode::Custom);
    }

    #[test]
    fn failed_gain_write_keeps_landed_exposure() {
        let mut sink = RecordingSink {
            fail_on: Some(KnownCameraControl::Gain),
            ..Default::default()
        };
        let mut cache = cache();
        let err = write_custom_exposure(&mut sink, &mut cache, MediaTime::new(1, 125), 800.0, 60)
            .unwrap_err();

        assert!(matches!(err, CameraError::ConfigurationError(_)));
        assert_eq!(cache.exposure_duration, MediaTime::new(1, 125));
        assert_eq!(cache.iso, 400.0);
    }

    #[test]
    fn failed_exposure_write_leaves_cache_alone() {
        let mut sink = RecordingSink {
            fail_on: Some(KnownCameraControl::Exposure),
            ..Default::default()
        };
        let mut cache = cache();
        assert!(
            write_custom_exposure(&mut sink, &mut cache, MediaTime::new(1, 125), 800.0, 60).is_err()
        );
        assert_eq!(cache.exposure_duration, MediaTime::new(1, 60));
        assert!(!sink.controls.contains(&KnownCameraControl::Gain));
    }

    #[test]
    fn pinning_frame_duration_sets_camera_frame_rate() {
        let mut sink = RecordingSink::default();
        let mut cache = cache();
        write_max_frame_duration(&mut sink, &mut cache, MediaTime::per_frame(30)).unwrap();

        assert_eq!(sink.fps, vec![30]);
        assert_eq!(cache.active_max_frame_duration, MediaTime::per_frame(30));
    }

    #[test]
    fn rejected_frame_rate_is_configuration_error() {
        let mut sink = RecordingSink {
            fail_fps: true,
            ..Default::default()
        };
        let mut cache = cache();
        let err = write_max_frame_duration(&mut sink, &mut cache, MediaTime::per_frame(30))
            .unwrap_err();
        assert!(matches!(err, CameraError::ConfigurationError(_)));
        assert_eq!(cache.active_max_frame_duration, MediaTime::per_frame(24));
    }

    #[test]
    fn smooth_autofocus_drives_focus_auto_control() {
        let mut sink = RecordingSink::default();
        let mut cache = cache();
        write_smooth_autofocus(&mut sink, &mut cache, true).unwrap();

        assert_eq!(sink.controls, vec![KnownCameraControl::Other(V4L2_CID_FOCUS_AUTO)]);
        assert!(cache.smooth_autofocus);
    }
}
