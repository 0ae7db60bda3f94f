use crate::config::{ControlsConfig, SlogCamConfig, TelemetryConfig};
use std::sync::{Arc, RwLock};
use tauri::command;

lazy_static::lazy_static! {
    static ref GLOBAL_CONFIG: Arc<RwLock<SlogCamConfig>> = Arc::new(RwLock::new(SlogCamConfig::load_or_default()));
}

/// Snapshot of the configuration in effect.
pub fn current_config() -> SlogCamConfig {
    match GLOBAL_CONFIG.read() {
        Ok(config) => config.clone(),
        Err(e) => {
            log::warn!("Config lock poisoned, using defaults: {}", e);
            SlogCamConfig::default()
        }
    }
}

/// Get the current configuration
#[command]
pub async fn get_config() -> Result<SlogCamConfig, String> {
    let config = GLOBAL_CONFIG.read().map_err(|e| e.to_string())?;
    Ok(config.clone())
}

/// Update configuration. Control ranges apply to the next session.
#[command]
pub async fn update_config(new_config: SlogCamConfig) -> Result<(), String> {
    new_config.validate()?;

    {
        let mut config = GLOBAL_CONFIG.write().map_err(|e| e.to_string())?;
        *config = new_config.clone();
    }

    new_config
        .save_to_file(SlogCamConfig::default_path())
        .map_err(|e| e.to_string())?;

    Ok(())
}

/// Reset configuration to defaults
#[command]
pub async fn reset_config() -> Result<SlogCamConfig, String> {
    let default_config = SlogCamConfig::default();

    {
        let mut config = GLOBAL_CONFIG
            .write()
            .map_err(|e| format!("Failed to write config: {}", e))?;
        *config = default_config.clone();
    }

    default_config
        .save_to_file(SlogCamConfig::default_path())
        .map_err(|e| e.to_string())?;

    Ok(default_config)
}

#[command]
pub async fn get_controls_config() -> Result<ControlsConfig, String> {
    let config = GLOBAL_CONFIG.read().map_err(|e| e.to_string())?;
    Ok(config.controls.clone())
}

#[command]
pub async fn get_telemetry_config() -> Result<TelemetryConfig, String> {
    let config = GLOBAL_CONFIG.read().map_err(|e| e.to_string())?;
    Ok(config.telemetry.clone())
}
