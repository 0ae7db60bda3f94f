//! Configuration management for SlogCam
//!
//! Provides configuration loading, saving, and validation for the on-screen
//! control ranges, the launch telemetry event and the export action.

use crate::errors::CameraError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlogCamConfig {
    pub controls: ControlsConfig,
    pub telemetry: TelemetryConfig,
    pub export: ExportConfig,
}

/// What the control panel shows after the device rejects a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RollbackPolicy {
    /// Keep the control where the user moved it.
    Optimistic,
    /// Put the control back to its previous value.
    Revert,
}

/// On-screen control ranges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlsConfig {
    pub iso_min: f32,
    pub iso_max: f32,
    pub iso_default: f32,
    /// Shutter speed slider bounds in seconds per exposure
    pub shutter_min: f32,
    pub shutter_max: f32,
    pub shutter_default: f32,
    pub stabilization_default: bool,
    pub rollback: RollbackPolicy,
}

/// Launch telemetry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub endpoint: String,
    /// Overrides the identifier reported by the host application
    pub bundle_identifier: Option<String>,
    /// Overrides the display name reported by the host application
    pub app_name: Option<String>,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Name of the export target shown on the action button
    pub target: String,
}

impl Default for SlogCamConfig {
    fn default() -> Self {
        Self {
            controls: ControlsConfig::default(),
            telemetry: TelemetryConfig {
                enabled: true,
                endpoint: crate::telemetry::APP_OPEN_ENDPOINT.to_string(),
                bundle_identifier: None,
                app_name: None,
                timeout_ms: 10_000,
            },
            export: ExportConfig {
                target: "Slog".to_string(),
            },
        }
    }
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            iso_min: 100.0,
            iso_max: 3200.0,
            iso_default: 400.0,
            shutter_min: 1.0 / 8000.0,
            shutter_max: 1.0 / 30.0,
            shutter_default: 1.0 / 60.0,
            stabilization_default: false,
            rollback: RollbackPolicy::Optimistic,
        }
    }
}

impl SlogCamConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CameraError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| CameraError::ConfigFile(format!("Failed to read config file: {}", e)))?;

        let config: SlogCamConfig = toml::from_str(&contents)
            .map_err(|e| CameraError::ConfigFile(format!("Failed to parse config file: {}", e)))?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CameraError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CameraError::ConfigFile(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| CameraError::ConfigFile(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| CameraError::ConfigFile(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("slogcam.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        let c = &self.controls;
        if !(c.iso_min > 0.0 && c.iso_min < c.iso_max) {
            return Err("ISO range must be positive with min below max".to_string());
        }
        if !(c.iso_min..=c.iso_max).contains(&c.iso_default) {
            return Err("Default ISO must lie within the ISO range".to_string());
        }
        if !(c.shutter_min > 0.0 && c.shutter_min < c.shutter_max) {
            return Err("Shutter range must be positive with min below max".to_string());
        }
        if !(c.shutter_min..=c.shutter_max).contains(&c.shutter_default) {
            return Err("Default shutter speed must lie within the shutter range".to_string());
        }

        if self.telemetry.enabled && !self.telemetry.endpoint.starts_with("http") {
            return Err("Telemetry endpoint must be an http(s) URL".to_string());
        }
        if self.telemetry.timeout_ms == 0 {
            return Err("Telemetry timeout must be greater than zero".to_string());
        }

        if self.export.target.trim().is_empty() {
            return Err("Export target must not be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SlogCamConfig::default();
        assert_eq!(config.controls.iso_default, 400.0);
        assert_eq!(config.controls.rollback, RollbackPolicy::Optimistic);
        assert_eq!(config.export.target, "Slog");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut bad_iso = SlogCamConfig::default();
        bad_iso.controls.iso_min = 5000.0;
        assert!(bad_iso.validate().is_err());

        let mut bad_shutter = SlogCamConfig::default();
        bad_shutter.controls.shutter_default = 1.0;
        assert!(bad_shutter.validate().is_err());

        let mut bad_endpoint = SlogCamConfig::default();
        bad_endpoint.telemetry.endpoint = "ftp://example".to_string();
        assert!(bad_endpoint.validate().is_err());

        let mut disabled = SlogCamConfig::default();
        disabled.telemetry.enabled = false;
        disabled.telemetry.endpoint = String::new();
        assert!(disabled.validate().is_ok());
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("nested").join("slogcam.toml");

        let mut config = SlogCamConfig::default();
        config.controls.rollback = RollbackPolicy::Revert;
        config.telemetry.app_name = Some("Field Camera".to_string());
        config.save_to_file(&config_path).unwrap();

        let loaded = SlogCamConfig::load_from_file(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_toml_format() {
        let toml_string = toml::to_string_pretty(&SlogCamConfig::default()).unwrap();
        assert!(toml_string.contains("[controls]"));
        assert!(toml_string.contains("[telemetry]"));
        assert!(toml_string.contains("[export]"));
        assert!(toml_string.contains("rollback = \"optimistic\""));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = SlogCamConfig::load_from_file("nonexistent_file.toml");
        assert_eq!(result.unwrap(), SlogCamConfig::default());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "controls = 3").unwrap();
        assert!(matches!(
            SlogCamConfig::load_from_file(&path),
            Err(CameraError::ConfigFile(_))
        ));
    }
}
