use crate::commands::config::current_config;
use crate::controller::DeviceController;
use crate::controls::ControlPanel;
use crate::platform::{CaptureHost, NokhwaHost};
use crate::session::CaptureSession;
use crate::types::DeviceSnapshot;
use std::sync::{Arc, RwLock as SyncRwLock};
use tauri::command;
use tokio::sync::RwLock;

/// Live capture pipeline and the controls bound to its device.
pub struct ActiveCapture {
    pub session: Arc<CaptureSession>,
    pub panel: Arc<ControlPanel>,
}

lazy_static::lazy_static! {
    static ref CAPTURE_HOST: SyncRwLock<Option<Arc<dyn CaptureHost>>> = SyncRwLock::new(None);
    static ref ACTIVE_CAPTURE: Arc<RwLock<Option<ActiveCapture>>> = Arc::new(RwLock::new(None));
}

/// Replace the host used by the next session (defaults to the nokhwa host).
pub fn set_capture_host(host: Arc<dyn CaptureHost>) {
    match CAPTURE_HOST.write() {
        Ok(mut slot) => *slot = Some(host),
        Err(e) => log::error!("Failed to install capture host: {}", e),
    }
}

fn capture_host() -> Arc<dyn CaptureHost> {
    let installed = CAPTURE_HOST.read().ok().and_then(|slot| slot.clone());
    installed.unwrap_or_else(|| {
        let host: Arc<dyn CaptureHost> = Arc::new(NokhwaHost::default());
        set_capture_host(host.clone());
        host
    })
}

/// Run `f` against the active control panel on the blocking pool, since
/// control changes write to the camera.
pub(crate) async fn with_panel<T, F>(f: F) -> Result<T, String>
where
    F: FnOnce(&ControlPanel) -> T + Send + 'static,
    T: Send + 'static,
{
    let active = ACTIVE_CAPTURE.read().await;
    let panel = active
        .as_ref()
        .map(|capture| capture.panel.clone())
        .ok_or_else(|| "Capture session not started".to_string())?;
    tokio::task::spawn_blocking(move || f(panel.as_ref()))
        .await
        .map_err(|e| format!("Task join error: {}", e))
}

/// Start the capture session, configuring it on first use.
#[command]
pub async fn start_capture_session() -> Result<DeviceSnapshot, String> {
    let mut active = ACTIVE_CAPTURE.write().await;

    if let Some(capture) = active.as_ref() {
        let session = capture.session.clone();
        tokio::task::spawn_blocking(move || session.start())
            .await
            .map_err(|e| format!("Task join error: {}", e))?
            .map_err(|e| format!("Failed to start capture session: {}", e))?;
        return Ok(capture.panel.controller().snapshot());
    }

    let session = Arc::new(CaptureSession::new(capture_host()));
    let starting = session.clone();
    let device = tokio::task::spawn_blocking(move || starting.start())
        .await
        .map_err(|e| format!("Task join error: {}", e))?
        .map_err(|e| {
            log::error!("Failed to start capture session: {}", e);
            format!("Failed to start capture session: {}", e)
        })?;

    let config = current_config();
    let controller = Arc::new(DeviceController::new(device));
    let panel = Arc::new(ControlPanel::new(
        controller.clone(),
        config.controls,
        config.export.target,
    ));
    let snapshot = controller.snapshot();
    log::info!(
        "Capture session started on {} (ISO {}, exposure {})",
        snapshot.device.name,
        snapshot.iso,
        snapshot.exposure_duration
    );

    *active = Some(ActiveCapture { session, panel });
    Ok(snapshot)
}

/// Stop the running pipeline, keeping it configured.
#[command]
pub async fn stop_capture_session() -> Result<(), String> {
    let active = ACTIVE_CAPTURE.read().await;
    let Some(session) = active.as_ref().map(|capture| capture.session.clone()) else {
        return Ok(());
    };
    tokio::task::spawn_blocking(move || session.stop())
        .await
        .map_err(|e| format!("Task join error: {}", e))?
        .map_err(|e| format!("Failed to stop capture session: {}", e))
}

/// Tear the session down; the next start discovers the device again.
#[command]
pub async fn close_capture_session() -> Result<(), String> {
    let mut active = ACTIVE_CAPTURE.write().await;
    if let Some(capture) = active.take() {
        let session = capture.session;
        tokio::task::spawn_blocking(move || session.close())
            .await
            .map_err(|e| format!("Task join error: {}", e))?
            .map_err(|e| format!("Failed to close capture session: {}", e))?;
    }
    Ok(())
}

/// Whether a session is currently running.
#[command]
pub async fn is_capture_running() -> Result<bool, String> {
    let active = ACTIVE_CAPTURE.read().await;
    Ok(active
        .as_ref()
        .is_some_and(|capture| capture.session.is_running()))
}
