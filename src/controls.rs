//! On-screen controls
//!
//! The capture screen has two sliders (ISO, shutter speed), one switch
//! (stabilization) and one action button (export). [`ControlPanel`] holds the
//! values the screen displays and forwards every change to the
//! [`DeviceController`]. Whether a control snaps back after the device
//! rejects a change is decided here, by the configured [`RollbackPolicy`].

use crate::config::{ControlsConfig, RollbackPolicy};
use crate::controller::{clamp_iso, DeviceController};
use crate::errors::CameraError;
use crate::types::{ApplyOutcome, ParameterChange};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlId {
    Iso,
    ShutterSpeed,
    Stabilization,
    Export,
}

impl FromStr for ControlId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Iso" | "iso" => Ok(Self::Iso),
            "ShutterSpeed" | "shutter_speed" => Ok(Self::ShutterSpeed),
            "Stabilization" | "stabilization" => Ok(Self::Stabilization),
            "Export" | "export" => Ok(Self::Export),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlKind {
    Slider,
    Switch,
    Button,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ControlValue {
    F32(f32),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlInfo {
    pub id: ControlId,
    pub kind: ControlKind,
    pub label: String,
    pub min: Option<f32>,
    pub max: Option<f32>,
    pub default: Option<ControlValue>,
}

pub fn all_controls(config: &ControlsConfig, export_target: &str) -> Vec<ControlInfo> {
    vec![
        ControlInfo {
            id: ControlId::Iso,
            kind: ControlKind::Slider,
            label: "ISO".to_string(),
            min: Some(config.iso_min),
            max: Some(config.iso_max),
            default: Some(ControlValue::F32(config.iso_default)),
        },
        ControlInfo {
            id: ControlId::ShutterSpeed,
            kind: ControlKind::Slider,
            label: "Shutter Speed".to_string(),
            min: Some(config.shutter_min),
            max: Some(config.shutter_max),
            default: Some(ControlValue::F32(config.shutter_default)),
        },
        ControlInfo {
            id: ControlId::Stabilization,
            kind: ControlKind::Switch,
            label: "Stabilization".to_string(),
            min: None,
            max: None,
            default: Some(ControlValue::Bool(config.stabilization_default)),
        },
        ControlInfo {
            id: ControlId::Export,
            kind: ControlKind::Button,
            label: format!("Export to {}", export_target),
            min: None,
            max: None,
            default: None,
        },
    ]
}

pub fn validate_control_value(
    config: &ControlsConfig,
    id: ControlId,
    value: &ControlValue,
) -> Result<(), CameraError> {
    let (min, max) = match (id, value) {
        (ControlId::Iso, ControlValue::F32(_)) => (config.iso_min, config.iso_max),
        (ControlId::ShutterSpeed, ControlValue::F32(_)) => (config.shutter_min, config.shutter_max),
        (ControlId::Stabilization, ControlValue::Bool(_)) => return Ok(()),
        (ControlId::Export, _) => {
            return Err(CameraError::InvalidParameter(
                "export is an action and takes no value".to_string(),
            ))
        }
        _ => {
            return Err(CameraError::InvalidParameter(
                "control value kind mismatch".to_string(),
            ))
        }
    };
    if let ControlValue::F32(v) = value {
        if !v.is_finite() {
            return Err(CameraError::InvalidParameter("value is not a number".to_string()));
        }
        if *v < min {
            return Err(CameraError::InvalidParameter("value below minimum".to_string()));
        }
        if *v > max {
            return Err(CameraError::InvalidParameter("value above maximum".to_string()));
        }
    }
    Ok(())
}

/// Values currently shown on screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanelValues {
    pub iso: f32,
    pub shutter_speed: f32,
    pub stabilization: bool,
}

/// Result of a control interaction as the screen should render it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlUpdate {
    pub id: ControlId,
    /// Value the control shows after the interaction.
    pub displayed: ControlValue,
    pub outcome: Option<ApplyOutcome>,
    pub error: Option<String>,
}

impl ControlUpdate {
    pub fn applied(&self) -> bool {
        self.outcome == Some(ApplyOutcome::Applied)
    }
}

pub struct ControlPanel {
    controller: Arc<DeviceController>,
    config: ControlsConfig,
    export_target: String,
    values: Mutex<PanelValues>,
}

impl ControlPanel {
    pub fn new(
        controller: Arc<DeviceController>,
        config: ControlsConfig,
        export_target: impl Into<String>,
    ) -> Self {
        let values = PanelValues {
            iso: config.iso_default,
            shutter_speed: config.shutter_default,
            stabilization: config.stabilization_default,
        };
        Self {
            controller,
            config,
            export_target: export_target.into(),
            values: Mutex::new(values),
        }
    }

    pub fn controller(&self) -> &Arc<DeviceController> {
        &self.controller
    }

    pub fn controls(&self) -> Vec<ControlInfo> {
        all_controls(&self.config, &self.export_target)
    }

    pub fn values(&self) -> PanelValues {
        *self.values_guard()
    }

    fn values_guard(&self) -> MutexGuard<'_, PanelValues> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// ISO slider moved. The value is held to the slider range and then to
    /// the device's native range, so a successful update shows what the
    /// device applied.
    pub fn on_iso_changed(&self, value: f32) -> ControlUpdate {
        let device = self.controller.device();
        let value = clamp_iso(
            value.clamp(self.config.iso_min, self.config.iso_max),
            device.min_iso(),
            device.max_iso(),
        );
        self.update(ControlId::Iso, ControlValue::F32(value))
    }

    /// Shutter speed slider moved, in seconds per exposure.
    pub fn on_shutter_speed_changed(&self, value: f32) -> ControlUpdate {
        let value = value.clamp(self.config.shutter_min, self.config.shutter_max);
        self.update(ControlId::ShutterSpeed, ControlValue::F32(value))
    }

    pub fn on_stabilization_changed(&self, enabled: bool) -> ControlUpdate {
        self.update(ControlId::Stabilization, ControlValue::Bool(enabled))
    }

    /// Export button pressed.
    pub fn on_export(&self) {
        log::info!("Exporting to {}...", self.export_target);
    }

    fn update(&self, id: ControlId, value: ControlValue) -> ControlUpdate {
        let mut values = self.values_guard();
        let previous = read_value(&values, id);
        write_value(&mut values, id, value);

        let result = validate_control_value(&self.config, id, &value).and_then(|()| {
            let change = match (id, value) {
                (ControlId::Iso, ControlValue::F32(v)) => ParameterChange::Sensitivity(v),
                (ControlId::ShutterSpeed, ControlValue::F32(v)) => ParameterChange::ShutterSpeed(v),
                (ControlId::Stabilization, ControlValue::Bool(v)) => ParameterChange::Stabilization(v),
                _ => {
                    return Err(CameraError::InvalidParameter(
                        "control value kind mismatch".to_string(),
                    ))
                }
            };
            self.controller.apply(change)
        });

        match result {
            Ok(outcome) => ControlUpdate {
                id,
                displayed: value,
                outcome: Some(outcome),
                error: None,
            },
            Err(e) => {
                log::warn!("{:?} change did not take effect: {}", id, e);
                let displayed = match (self.config.rollback, previous) {
                    (RollbackPolicy::Revert, Some(previous)) => {
                        write_value(&mut values, id, previous);
                        previous
                    }
                    _ => value,
                };
                ControlUpdate {
                    id,
                    displayed,
                    outcome: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

/// Displayed value of a control; the export button has none.
fn read_value(values: &PanelValues, id: ControlId) -> Option<ControlValue> {
    match id {
        ControlId::Iso => Some(ControlValue::F32(values.iso)),
        ControlId::ShutterSpeed => Some(ControlValue::F32(values.shutter_speed)),
        ControlId::Stabilization => Some(ControlValue::Bool(values.stabilization)),
        ControlId::Export => None,
    }
}

fn write_value(values: &mut PanelValues, id: ControlId, value: ControlValue) {
    match (id, value) {
        (ControlId::Iso, ControlValue::F32(v)) => values.iso = v,
        (ControlId::ShutterSpeed, ControlValue::F32(v)) => values.shutter_speed = v,
        (ControlId::Stabilization, ControlValue::Bool(v)) => values.stabilization = v,
        _ => {}
    }
}
