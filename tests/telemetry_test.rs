#[cfg(test)]
mod telemetry_tests {
    use slogcam::telemetry::{AppOpenEvent, TelemetryError, TelemetryReporter, APP_OPEN_ENDPOINT};
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn reporter_for(server: &MockServer) -> TelemetryReporter {
        TelemetryReporter::new(
            format!("{}/action/app_open", server.uri()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn event() -> AppOpenEvent {
        AppOpenEvent::new(Some("com.example.slogcam"), Some("SlogCam"))
    }

    #[test]
    fn test_default_endpoint() {
        assert_eq!(APP_OPEN_ENDPOINT, "https://api.magicive.com/action/app_open");
    }

    #[tokio::test]
    async fn test_app_open_posts_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/action/app_open"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({
                "bundle_identifier": "com.example.slogcam",
                "app_name": "SlogCam"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let reporter = reporter_for(&server);
        assert!(reporter.report_app_open(&event()).await);
    }

    #[tokio::test]
    async fn test_non_200_status_is_reported_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/action/app_open"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let reporter = reporter_for(&server);
        let err = reporter.send_app_open(&event()).await.unwrap_err();
        assert!(matches!(err, TelemetryError::Status(status) if status.as_u16() == 500));
        assert!(!reporter.report_app_open(&event()).await);
    }

    #[tokio::test]
    async fn test_other_success_codes_are_not_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let reporter = reporter_for(&server);
        assert!(!reporter.report_app_open(&event()).await);
    }

    #[tokio::test]
    async fn test_transport_failure_is_logged_only() {
        let reporter =
            TelemetryReporter::new("http://127.0.0.1:9/action/app_open", Duration::from_secs(2))
                .unwrap();
        let err = reporter.send_app_open(&event()).await.unwrap_err();
        assert!(matches!(err, TelemetryError::Transport(_)));
        assert!(!reporter.report_app_open(&event()).await);
    }

    #[tokio::test]
    async fn test_spawned_event_does_not_block_caller() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let handle = reporter_for(&server).spawn_app_open(event());
        assert!(handle.await.unwrap());
    }
}
