use crate::commands::config::current_config;
use crate::telemetry::{AppOpenEvent, TelemetryReporter};
use tauri::command;

/// Send the app-open event now and report whether the server accepted it.
#[command]
pub async fn send_app_open(bundle_identifier: String, app_name: String) -> Result<bool, String> {
    let config = current_config().telemetry;
    if !config.enabled {
        log::debug!("Telemetry disabled, app open event not sent");
        return Ok(false);
    }
    let reporter = TelemetryReporter::from_config(&config).map_err(|e| e.to_string())?;
    let event = AppOpenEvent::from_host(&config, &bundle_identifier, &app_name);
    Ok(reporter.report_app_open(&event).await)
}
