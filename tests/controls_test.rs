#[cfg(test)]
mod controls_tests {
    use slogcam::config::{ControlsConfig, RollbackPolicy};
    use slogcam::controls::{ControlId, ControlKind, ControlPanel, ControlValue};
    use slogcam::testing::SimulatedDevice;
    use slogcam::types::{ApplyOutcome, MediaTime};
    use slogcam::DeviceController;
    use std::sync::Arc;

    fn panel_with(rollback: RollbackPolicy) -> (Arc<SimulatedDevice>, ControlPanel) {
        let device = Arc::new(SimulatedDevice::new());
        let controller = Arc::new(DeviceController::new(device.clone()));
        let config = ControlsConfig {
            rollback,
            ..ControlsConfig::default()
        };
        (device, ControlPanel::new(controller, config, "Slog"))
    }

    #[test]
    fn test_panel_starts_at_configured_defaults() {
        let (_device, panel) = panel_with(RollbackPolicy::Optimistic);
        let values = panel.values();
        assert_eq!(values.iso, 400.0);
        assert_eq!(values.shutter_speed, 1.0 / 60.0);
        assert!(!values.stabilization);

        let controls = panel.controls();
        assert_eq!(controls.len(), 4);
        assert_eq!(controls[0].kind, ControlKind::Slider);
        assert_eq!(controls[2].kind, ControlKind::Switch);
        assert_eq!(controls[3].kind, ControlKind::Button);
    }

    #[test]
    fn test_slider_changes_reach_device() {
        let (_device, panel) = panel_with(RollbackPolicy::Optimistic);

        let update = panel.on_iso_changed(1600.0);
        assert!(update.applied());
        assert_eq!(update.displayed, ControlValue::F32(1600.0));

        let update = panel.on_shutter_speed_changed(1.0 / 500.0);
        assert!(update.applied());

        let state = panel.controller().snapshot();
        assert_eq!(state.iso, 1600.0);
        assert_eq!(state.exposure_duration, MediaTime::new(1, 500));
        assert_eq!(panel.values().iso, 1600.0);
    }

    #[test]
    fn test_slider_value_held_to_range() {
        let device = Arc::new(SimulatedDevice::new().with_iso_range(100.0, 3200.0));
        let controller = Arc::new(DeviceController::new(device));
        let panel = ControlPanel::new(controller, ControlsConfig::default(), "Slog");

        let update = panel.on_iso_changed(12_800.0);
        assert_eq!(update.displayed, ControlValue::F32(3200.0));
        assert_eq!(panel.controller().snapshot().iso, 3200.0);
    }

    #[test]
    fn test_slider_shows_value_device_applied() {
        // Slider tops out at 3200, the simulated sensor at 3072.
        let (_device, panel) = panel_with(RollbackPolicy::Optimistic);

        let update = panel.on_iso_changed(3200.0);
        assert!(update.applied());
        assert_eq!(update.displayed, ControlValue::F32(3072.0));
        assert_eq!(panel.values().iso, 3072.0);
        assert_eq!(panel.controller().snapshot().iso, 3072.0);
    }

    #[test]
    fn test_optimistic_policy_keeps_moved_value_on_failure() {
        let (device, panel) = panel_with(RollbackPolicy::Optimistic);
        device.set_fail_lock(true);

        let update = panel.on_iso_changed(1600.0);
        assert!(!update.applied());
        assert!(update.error.is_some());
        assert_eq!(update.displayed, ControlValue::F32(1600.0));
        assert_eq!(panel.values().iso, 1600.0);
        assert_eq!(panel.controller().snapshot().iso, 100.0);
    }

    #[test]
    fn test_revert_policy_restores_previous_value() {
        let (device, panel) = panel_with(RollbackPolicy::Revert);
        device.set_reject_mutations(true);

        let update = panel.on_stabilization_changed(true);
        assert_eq!(update.id, ControlId::Stabilization);
        assert!(update.error.is_some());
        assert_eq!(update.displayed, ControlValue::Bool(false));
        assert!(!panel.values().stabilization);

        let update = panel.on_iso_changed(1600.0);
        assert_eq!(update.displayed, ControlValue::F32(400.0));
        assert_eq!(panel.values().iso, 400.0);
    }

    #[test]
    fn test_stabilization_switch_on_fixed_rate_device() {
        let device = Arc::new(SimulatedDevice::new().with_fixed_frame_rate(30));
        let controller = Arc::new(DeviceController::new(device.clone()));
        let panel = ControlPanel::new(controller, ControlsConfig::default(), "Slog");

        let update = panel.on_stabilization_changed(true);
        assert_eq!(update.outcome, Some(ApplyOutcome::Unsupported));
        assert!(update.error.is_none());
        assert!(panel.values().stabilization);
    }

    #[test]
    fn test_export_button_has_no_device_effect() {
        let (device, panel) = panel_with(RollbackPolicy::Optimistic);
        panel.on_export();
        assert_eq!(device.lock_count(), 0);
        assert_eq!(device.write_count(), 0);
    }
}
