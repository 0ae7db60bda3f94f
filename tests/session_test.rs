#[cfg(test)]
mod session_tests {
    use slogcam::errors::CameraError;
    use slogcam::session::SessionState;
    use slogcam::testing::{SimulatedDevice, SimulatedHost};
    use slogcam::types::{CaptureOutput, VideoGravity};
    use slogcam::{CaptureDevice, CaptureSession};
    use std::sync::Arc;

    fn simulated_host() -> Arc<SimulatedHost> {
        Arc::new(SimulatedHost::new(Arc::new(SimulatedDevice::new())))
    }

    #[test]
    fn test_start_configures_and_runs() {
        let host = simulated_host();
        let session = CaptureSession::new(host.clone());

        let device = session.start().unwrap();
        assert_eq!(device.info().id, "sim-0");

        assert_eq!(session.state(), SessionState::Running);
        assert!(host.is_running());
        assert_eq!(host.input_count(), 1);
        assert_eq!(host.output_count(), 1);
        assert_eq!(host.preview(), Some(VideoGravity::ResizeAspectFill));
        assert_eq!(host.commits(), 1);
        assert_eq!(host.unguarded_mutations(), 0);
        assert!(!host.is_configuring());
        assert!(!session.is_configuring());
        assert_eq!(session.output(), Some(CaptureOutput::MovieFile));
    }

    #[test]
    fn test_start_twice_attaches_once() {
        let host = simulated_host();
        let session = CaptureSession::new(host.clone());

        session.start().unwrap();
        session.start().unwrap();

        assert_eq!(host.input_count(), 1);
        assert_eq!(host.output_count(), 1);
        assert_eq!(host.commits(), 1);
        assert_eq!(host.discoveries(), 1);
    }

    #[test]
    fn test_restart_after_stop_reuses_pipeline() {
        let host = simulated_host();
        let session = CaptureSession::new(host.clone());

        session.start().unwrap();
        session.stop().unwrap();
        assert_eq!(session.state(), SessionState::Stopped);
        assert!(!host.is_running());

        session.start().unwrap();
        assert!(host.is_running());
        assert_eq!(host.input_count(), 1);
        assert_eq!(host.output_count(), 1);
    }

    #[test]
    fn test_missing_device_is_fatal_to_start() {
        let host = Arc::new(SimulatedHost::without_device());
        let session = CaptureSession::new(host.clone());

        let err = session.start().err().unwrap();
        assert!(matches!(err, CameraError::DeviceUnavailable(_)));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!host.is_running());
        assert_eq!(host.input_count(), 0);
    }

    #[test]
    fn test_refused_components_are_omitted() {
        let host = simulated_host();
        host.refuse_input(true);
        host.refuse_output(true);
        let session = CaptureSession::new(host.clone());

        session.start().unwrap();

        assert!(host.is_running());
        assert_eq!(host.input_count(), 0);
        assert_eq!(host.output_count(), 0);
        assert!(session.input().is_none());
        assert!(session.output().is_none());
    }

    #[test]
    fn test_preview_failure_does_not_block_start() {
        let host = simulated_host();
        host.fail_preview(true);
        let session = CaptureSession::new(host.clone());

        session.start().unwrap();
        assert!(host.is_running());
        assert!(host.preview().is_none());
    }

    #[test]
    fn test_stop_is_noop_when_not_running() {
        let host = simulated_host();
        let session = CaptureSession::new(host.clone());

        session.stop().unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!host.is_running());
    }

    #[test]
    fn test_close_tears_everything_down() {
        let host = simulated_host();
        let session = CaptureSession::with_gravity(host.clone(), VideoGravity::ResizeAspect);

        session.start().unwrap();
        assert_eq!(host.preview(), Some(VideoGravity::ResizeAspect));

        session.close().unwrap();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(!host.is_running());
        assert_eq!(host.input_count(), 0);
        assert_eq!(host.output_count(), 0);
        assert!(host.preview().is_none());
        assert_eq!(host.unguarded_mutations(), 0);
        assert!(session.device().is_none());

        let err = session.start().err().unwrap();
        assert!(matches!(err, CameraError::InitializationError(_)));
    }

    #[test]
    fn test_drop_closes_session() {
        let host = simulated_host();
        {
            let session = CaptureSession::new(host.clone());
            session.start().unwrap();
        }
        assert!(!host.is_running());
        assert_eq!(host.input_count(), 0);
    }
}
