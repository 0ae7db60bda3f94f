use crate::commands::session::with_panel;
use crate::controller::TransactionRecord;
use crate::controls::{ControlInfo, ControlUpdate, PanelValues};
use crate::types::DeviceSnapshot;
use serde::{Deserialize, Serialize};
use tauri::command;

/// Control schema plus the values currently displayed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlPanelState {
    pub controls: Vec<ControlInfo>,
    pub values: PanelValues,
}

#[command]
pub async fn set_iso(value: f32) -> Result<ControlUpdate, String> {
    log::debug!("ISO slider changed to {}", value);
    with_panel(move |panel| panel.on_iso_changed(value)).await
}

/// Shutter speed in seconds per exposure, e.g. `0.016666` for 1/60.
#[command]
pub async fn set_shutter_speed(value: f32) -> Result<ControlUpdate, String> {
    log::debug!("Shutter speed slider changed to {}", value);
    with_panel(move |panel| panel.on_shutter_speed_changed(value)).await
}

#[command]
pub async fn set_stabilization(enabled: bool) -> Result<ControlUpdate, String> {
    log::debug!("Stabilization switch changed to {}", enabled);
    with_panel(move |panel| panel.on_stabilization_changed(enabled)).await
}

#[command]
pub async fn get_device_state() -> Result<DeviceSnapshot, String> {
    with_panel(move |panel| panel.controller().snapshot()).await
}

#[command]
pub async fn get_control_panel() -> Result<ControlPanelState, String> {
    with_panel(move |panel| ControlPanelState {
        controls: panel.controls(),
        values: panel.values(),
    })
    .await
}

#[command]
pub async fn get_last_transaction() -> Result<Option<TransactionRecord>, String> {
    with_panel(move |panel| panel.controller().last_transaction()).await
}

/// Export action. Only logs for now.
#[command]
pub async fn export_to_slog() -> Result<(), String> {
    with_panel(move |panel| panel.on_export()).await
}
