use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    /// No capture device could be discovered on the host.
    #[error("Capture device unavailable: {0}")]
    DeviceUnavailable(String),
    /// The device refused the lock-for-configuration request.
    #[error("Failed to lock device for configuration: {0}")]
    LockAcquisitionFailed(String),
    /// The request could not be converted into a device-native value.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// The device rejected a mutation while locked.
    #[error("Device configuration error: {0}")]
    ConfigurationError(String),
    #[error("Camera initialization error: {0}")]
    InitializationError(String),
    #[error("Configuration file error: {0}")]
    ConfigFile(String),
}

impl CameraError {
    /// True for failures that happen around a configuration transaction:
    /// the lock could not be taken or the device rejected the write.
    pub fn is_configuration_failure(&self) -> bool {
        matches!(
            self,
            CameraError::LockAcquisitionFailed(_) | CameraError::ConfigurationError(_)
        )
    }
}
