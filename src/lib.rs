//! SlogCam: manual exposure camera controls for Tauri applications
//!
//! This crate drives a single capture screen: a live preview of the default
//! camera with ISO, shutter speed and stabilization controls, plus a launch
//! telemetry event.
//!
//! # Features
//! - Capture session management with idempotent start
//! - Transactional device configuration with scoped lock-for-configuration
//! - ISO clamping and shutter-fraction to rational duration conversion
//! - Serialized parameter changes on a shared device handle
//! - Fire-and-forget app-open telemetry
//!
//! # Usage
//! ```rust,ignore
//! fn main() {
//!     tauri::Builder::default()
//!         .plugin(slogcam::init())
//!         .run(tauri::generate_context!())
//!         .expect("error while running tauri application");
//! }
//! ```
//!
//! Without Tauri, wire the pieces directly:
//! ```rust,ignore
//! use slogcam::{CaptureSession, DeviceController, NokhwaHost};
//! use std::sync::Arc;
//!
//! let session = CaptureSession::new(Arc::new(NokhwaHost::default()));
//! let controller = DeviceController::new(session.start()?);
//! controller.apply_sensitivity(800.0)?;
//! controller.apply_exposure_duration(1.0 / 125.0)?;
//! ```
pub mod commands;
pub mod config;
pub mod controller;
pub mod controls;
pub mod errors;
pub mod platform;
pub mod session;
pub mod telemetry;
pub mod types;

// Testing utilities - simulated hardware for offline testing
pub mod testing;

// Re-exports for convenience
pub use config::SlogCamConfig;
pub use controller::{ConfigurationLock, DeviceController};
pub use controls::ControlPanel;
pub use errors::CameraError;
pub use platform::{CaptureDevice, CaptureHost, NokhwaHost};
pub use session::CaptureSession;
pub use telemetry::{AppOpenEvent, TelemetryReporter};
pub use types::{ApplyOutcome, DeviceSnapshot, MediaTime, ParameterChange};

use tauri::{
    plugin::{Builder, TauriPlugin},
    Manager, Runtime,
};

/// Initialize the SlogCam plugin with all commands.
///
/// The plugin fires the app-open telemetry event once during setup, using
/// the host application's identifier and product name.
pub fn init<R: Runtime>() -> TauriPlugin<R> {
    Builder::new("slogcam")
        .invoke_handler(tauri::generate_handler![
            // Session commands
            commands::session::start_capture_session,
            commands::session::stop_capture_session,
            commands::session::close_capture_session,
            commands::session::is_capture_running,
            // Control commands
            commands::controls::set_iso,
            commands::controls::set_shutter_speed,
            commands::controls::set_stabilization,
            commands::controls::get_device_state,
            commands::controls::get_control_panel,
            commands::controls::get_last_transaction,
            commands::controls::export_to_slog,
            // Configuration commands
            commands::config::get_config,
            commands::config::update_config,
            commands::config::reset_config,
            commands::config::get_controls_config,
            commands::config::get_telemetry_config,
            // Telemetry commands
            commands::telemetry::send_app_open,
        ])
        .setup(|app, _api| {
            let config = commands::config::current_config().telemetry;
            if !config.enabled {
                log::debug!("Telemetry disabled, skipping app open event");
                return Ok(());
            }
            let event = AppOpenEvent::from_host(
                &config,
                &app.config().identifier,
                &app.package_info().name,
            );
            match TelemetryReporter::from_config(&config) {
                Ok(reporter) => {
                    tauri::async_runtime::spawn(async move {
                        reporter.report_app_open(&event).await;
                    });
                }
                Err(e) => log::warn!("Telemetry unavailable: {}", e),
            }
            Ok(())
        })
        .build()
}

/// Initialize logging for the camera system
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "slogcam=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

#[cfg(test)]
mod lib_tests {
    use super::*;

    #[test]
    fn test_crate_info() {
        let info = get_info();
        assert_eq!(info.name, "slogcam");
        assert!(!info.version.is_empty());
        assert!(!info.description.is_empty());
    }
}
