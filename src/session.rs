//! Capture session manager
//!
//! Owns the pipeline that binds the default camera to its output sink and
//! the preview surface. The device is resolved once, in [`CaptureSession::start`],
//! and handed back to the caller so it can be injected into a
//! [`DeviceController`](crate::controller::DeviceController).

use crate::errors::CameraError;
use crate::platform::{CaptureDevice, CaptureHost};
use crate::types::{CaptureOutput, DeviceInfo, VideoGravity};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Stopped,
    Closed,
}

struct Pipeline {
    state: SessionState,
    configured: bool,
    configuring: bool,
    input: Option<DeviceInfo>,
    output: Option<CaptureOutput>,
    preview_bound: bool,
    device: Option<Arc<dyn CaptureDevice>>,
}

/// Open configuration window on the session. Inputs and outputs may only be
/// attached or detached through this guard; dropping it commits.
struct SessionConfiguration<'a> {
    host: &'a dyn CaptureHost,
    pipeline: &'a mut Pipeline,
}

impl<'a> SessionConfiguration<'a> {
    fn begin(host: &'a dyn CaptureHost, pipeline: &'a mut Pipeline) -> Self {
        host.begin_configuration();
        pipeline.configuring = true;
        Self { host, pipeline }
    }

    fn add_input(&mut self, device: &DeviceInfo) {
        if self.pipeline.input.is_some() {
            log::debug!("Input already attached, skipping {}", device.id);
            return;
        }
        if !self.host.can_add_input(device) {
            log::warn!("Session cannot accept input {}, continuing without it", device.id);
            return;
        }
        match self.host.add_input(device) {
            Ok(()) => self.pipeline.input = Some(device.clone()),
            Err(e) => log::warn!("Error setting up video input: {}", e),
        }
    }

    fn add_output(&mut self, output: CaptureOutput) {
        if self.pipeline.output.is_some() {
            log::debug!("Output already attached, skipping {:?}", output);
            return;
        }
        if !self.host.can_add_output(output) {
            log::warn!("Session cannot accept {:?} output, continuing without it", output);
            return;
        }
        match self.host.add_output(output) {
            Ok(()) => self.pipeline.output = Some(output),
            Err(e) => log::warn!("Error setting up {:?} output: {}", output, e),
        }
    }

    fn remove_all(&mut self) {
        if let Some(input) = self.pipeline.input.take() {
            self.host.remove_input(&input);
        }
        if let Some(output) = self.pipeline.output.take() {
            self.host.remove_output(output);
        }
    }
}

impl Drop for SessionConfiguration<'_> {
    fn drop(&mut self) {
        self.pipeline.configuring = false;
        self.host.commit_configuration();
    }
}

pub struct CaptureSession {
    host: Arc<dyn CaptureHost>,
    gravity: VideoGravity,
    pipeline: Mutex<Pipeline>,
}

impl CaptureSession {
    pub fn new(host: Arc<dyn CaptureHost>) -> Self {
        Self::with_gravity(host, VideoGravity::ResizeAspectFill)
    }

    pub fn with_gravity(host: Arc<dyn CaptureHost>, gravity: VideoGravity) -> Self {
        Self {
            host,
            gravity,
            pipeline: Mutex::new(Pipeline {
                state: SessionState::Idle,
                configured: false,
                configuring: false,
                input: None,
                output: None,
                preview_bound: false,
                device: None,
            }),
        }
    }

    fn pipeline(&self) -> Result<MutexGuard<'_, Pipeline>, CameraError> {
        self.pipeline
            .lock()
            .map_err(|_| CameraError::InitializationError("session state lock poisoned".to_string()))
    }

    /// Configure the pipeline on first call and start it running.
    ///
    /// Later calls reuse the configured pipeline and only restart it if it
    /// was stopped; inputs and outputs are never attached twice.
    pub fn start(&self) -> Result<Arc<dyn CaptureDevice>, CameraError> {
        let mut pipeline = self.pipeline()?;
        if pipeline.state == SessionState::Closed {
            return Err(CameraError::InitializationError(
                "capture session is closed".to_string(),
            ));
        }

        let device = match pipeline.device.clone() {
            Some(device) => device,
            None => {
                let device = self.host.default_video_device().ok_or_else(|| {
                    log::error!("Device not connected");
                    CameraError::DeviceUnavailable("no video capture device found".to_string())
                })?;
                pipeline.device = Some(device.clone());
                device
            }
        };

        if !pipeline.configured {
            let info = device.info();
            {
                let mut configuration = SessionConfiguration::begin(self.host.as_ref(), &mut pipeline);
                configuration.add_input(&info);
                configuration.add_output(CaptureOutput::MovieFile);
            }
            pipeline.configured = true;

            match self.host.bind_preview(self.gravity) {
                Ok(()) => pipeline.preview_bound = true,
                Err(e) => log::warn!("Failed to bind preview surface: {}", e),
            }
            log::info!(
                "Capture session configured for {} (input: {}, output: {})",
                info.name,
                pipeline.input.is_some(),
                pipeline.output.is_some()
            );
        }

        if pipeline.state != SessionState::Running {
            self.host.start_running()?;
            pipeline.state = SessionState::Running;
            log::info!("Capture session running");
        }

        Ok(device)
    }

    /// Stop the pipeline. No-op unless running.
    pub fn stop(&self) -> Result<(), CameraError> {
        let mut pipeline = self.pipeline()?;
        if pipeline.state != SessionState::Running {
            return Ok(());
        }
        self.host.stop_running();
        pipeline.state = SessionState::Stopped;
        log::info!("Capture session stopped");
        Ok(())
    }

    /// Tear the pipeline down: stop, detach everything, unbind the preview.
    pub fn close(&self) -> Result<(), CameraError> {
        let mut pipeline = self.pipeline()?;
        if pipeline.state == SessionState::Closed {
            return Ok(());
        }
        if pipeline.state == SessionState::Running {
            self.host.stop_running();
        }
        if pipeline.input.is_some() || pipeline.output.is_some() {
            let mut configuration = SessionConfiguration::begin(self.host.as_ref(), &mut pipeline);
            configuration.remove_all();
        }
        if pipeline.preview_bound {
            self.host.unbind_preview();
            pipeline.preview_bound = false;
        }
        pipeline.device = None;
        pipeline.state = SessionState::Closed;
        log::info!("Capture session closed");
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.pipeline().map(|p| p.state).unwrap_or(SessionState::Closed)
    }

    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }

    pub fn is_configuring(&self) -> bool {
        self.pipeline().map(|p| p.configuring).unwrap_or(false)
    }

    pub fn input(&self) -> Option<DeviceInfo> {
        self.pipeline().ok().and_then(|p| p.input.clone())
    }

    pub fn output(&self) -> Option<CaptureOutput> {
        self.pipeline().ok().and_then(|p| p.output)
    }

    pub fn device(&self) -> Option<Arc<dyn CaptureDevice>> {
        self.pipeline().ok().and_then(|p| p.device.clone())
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("Error closing capture session in drop: {}", e);
        }
    }
}
