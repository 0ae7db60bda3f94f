#[cfg(test)]
mod commands_tests {
    use slogcam::commands::config::{get_config, get_controls_config, get_telemetry_config};
    use slogcam::commands::controls::{
        export_to_slog, get_control_panel, get_device_state, get_last_transaction, set_iso,
        set_shutter_speed, set_stabilization,
    };
    use slogcam::commands::session::{
        close_capture_session, is_capture_running, set_capture_host, start_capture_session,
        stop_capture_session,
    };
    use slogcam::controller::TransactionState;
    use slogcam::controls::ControlValue;
    use slogcam::testing::{SimulatedDevice, SimulatedHost};
    use slogcam::types::MediaTime;
    use std::sync::Arc;

    // The command layer keeps one global session, so the whole lifecycle is
    // exercised in a single test.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_capture_lifecycle_through_commands() {
        let host = Arc::new(SimulatedHost::new(Arc::new(SimulatedDevice::new())));
        set_capture_host(host.clone());
        close_capture_session().await.unwrap();

        assert!(set_iso(800.0).await.is_err());
        assert!(get_device_state().await.is_err());
        assert!(!is_capture_running().await.unwrap());

        let snapshot = start_capture_session().await.unwrap();
        assert_eq!(snapshot.device.name, "Simulated Back Camera");
        assert!(is_capture_running().await.unwrap());

        // Second start reuses the running pipeline.
        start_capture_session().await.unwrap();
        assert_eq!(host.input_count(), 1);
        assert_eq!(host.output_count(), 1);

        let update = set_iso(800.0).await.unwrap();
        assert!(update.applied());
        let update = set_shutter_speed(1.0 / 125.0).await.unwrap();
        assert!(update.applied());

        let state = get_device_state().await.unwrap();
        assert_eq!(state.iso, 800.0);
        assert_eq!(state.exposure_duration, MediaTime::new(1, 125));

        // Control changes run on the blocking pool and still serialize.
        let (a, b) = tokio::join!(set_iso(1600.0), set_shutter_speed(1.0 / 250.0));
        assert!(a.unwrap().applied());
        assert!(b.unwrap().applied());
        let state = get_device_state().await.unwrap();
        assert_eq!(state.iso, 1600.0);
        assert_eq!(state.exposure_duration, MediaTime::new(1, 250));
        set_iso(800.0).await.unwrap();

        let update = set_stabilization(true).await.unwrap();
        assert_eq!(update.displayed, ControlValue::Bool(true));
        let record = get_last_transaction().await.unwrap().unwrap();
        assert_eq!(
            record.terminal(),
            Some(TransactionState::Unlocked { success: true })
        );

        let panel = get_control_panel().await.unwrap();
        assert_eq!(panel.controls.len(), 4);
        assert_eq!(panel.values.iso, 800.0);
        assert!(panel.values.stabilization);

        export_to_slog().await.unwrap();

        stop_capture_session().await.unwrap();
        assert!(!is_capture_running().await.unwrap());
        assert!(!host.is_running());

        close_capture_session().await.unwrap();
        assert_eq!(host.input_count(), 0);
        assert!(set_iso(800.0).await.is_err());
    }

    #[tokio::test]
    async fn test_config_commands_return_current_config() {
        let config = get_config().await.unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(get_controls_config().await.unwrap(), config.controls);
        assert_eq!(get_telemetry_config().await.unwrap(), config.telemetry);
    }
}
