//! Device configuration controller
//!
//! Every parameter change runs as one configuration transaction:
//!
//! ```text
//! Idle -> LockAcquired -> Mutated -> Unlocked(success)
//! Idle -> LockAcquisitionFailed -> Idle
//! LockAcquired -> MutationRejected -> Unlocked(failure)
//! ```
//!
//! Transactions are serialized by the controller, so at most one holds the
//! device lock at any time, and each one re-reads the parameter it does not
//! change while holding the lock. The device lock is owned by a
//! [`ConfigurationLock`] guard and released on every exit path.

use crate::errors::CameraError;
use crate::platform::CaptureDevice;
use crate::types::{ApplyOutcome, DeviceSnapshot, MediaTime, ParameterChange};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionState {
    Idle,
    LockAcquired,
    Mutated,
    LockAcquisitionFailed,
    MutationRejected,
    Unlocked { success: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Sensitivity,
    ExposureDuration,
    Stabilization,
}

/// States visited by the most recent transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub operation: Operation,
    pub states: Vec<TransactionState>,
}

impl TransactionRecord {
    pub fn terminal(&self) -> Option<TransactionState> {
        self.states.last().copied()
    }
}

/// Scoped lock-for-configuration. The device is unlocked when this drops,
/// including during unwinding.
pub struct ConfigurationLock<'a> {
    device: &'a dyn CaptureDevice,
}

impl<'a> ConfigurationLock<'a> {
    pub fn acquire(device: &'a dyn CaptureDevice) -> Result<Self, CameraError> {
        device.lock_for_configuration().map_err(|e| match e {
            CameraError::LockAcquisitionFailed(_) => e,
            other => CameraError::LockAcquisitionFailed(other.to_string()),
        })?;
        Ok(Self { device })
    }

    pub fn device(&self) -> &dyn CaptureDevice {
        self.device
    }
}

impl Drop for ConfigurationLock<'_> {
    fn drop(&mut self) {
        self.device.unlock_for_configuration();
    }
}

/// Convert a shutter-speed fraction (seconds per exposure, e.g. `1/60`) to a
/// device duration of `1 / round(1 / fraction)`.
pub fn shutter_fraction_to_duration(fraction: f32) -> Result<MediaTime, CameraError> {
    if !fraction.is_finite() || fraction <= 0.0 {
        return Err(CameraError::InvalidParameter(format!(
            "shutter speed fraction must be a positive number, got {}",
            fraction
        )));
    }
    let denominator = (1.0 / fraction as f64).round();
    if denominator < 1.0 || denominator > i32::MAX as f64 {
        return Err(CameraError::InvalidParameter(format!(
            "shutter speed fraction {} yields unusable timescale {}",
            fraction, denominator
        )));
    }
    Ok(MediaTime::new(1, denominator as i32))
}

/// Clamp a requested ISO into the device's native range.
pub fn clamp_iso(iso: f32, min_iso: f32, max_iso: f32) -> f32 {
    iso.max(min_iso).min(max_iso)
}

pub struct DeviceController {
    device: Arc<dyn CaptureDevice>,
    /// Held for the whole transaction; stores the last transaction record.
    gate: Mutex<Option<TransactionRecord>>,
}

impl DeviceController {
    pub fn new(device: Arc<dyn CaptureDevice>) -> Self {
        Self {
            device,
            gate: Mutex::new(None),
        }
    }

    pub fn device(&self) -> &Arc<dyn CaptureDevice> {
        &self.device
    }

    fn gate(&self) -> MutexGuard<'_, Option<TransactionRecord>> {
        // The device lock is released by the guard even if a transaction
        // panicked, so a poisoned gate carries no broken invariant.
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the sensitivity, keeping the current exposure duration.
    pub fn apply_sensitivity(&self, iso: f32) -> Result<ApplyOutcome, CameraError> {
        if !iso.is_finite() {
            return Err(CameraError::InvalidParameter(format!(
                "ISO must be a finite number, got {}",
                iso
            )));
        }
        self.transact(Operation::Sensitivity, |device| {
            let target = clamp_iso(iso, device.min_iso(), device.max_iso());
            if target != iso {
                log::debug!(
                    "Clamped ISO {} to device range [{}, {}]",
                    iso,
                    device.min_iso(),
                    device.max_iso()
                );
            }
            let duration = device.exposure_duration();
            device.set_exposure_mode_custom(duration, target)?;
            log::debug!("ISO set to {} (exposure {})", target, duration);
            Ok(ApplyOutcome::Applied)
        })
    }

    /// Set the exposure duration from a shutter-speed fraction, keeping the
    /// current ISO. Invalid fractions are rejected before the device is locked.
    pub fn apply_exposure_duration(&self, fraction: f32) -> Result<ApplyOutcome, CameraError> {
        let duration = shutter_fraction_to_duration(fraction).map_err(|e| {
            log::warn!("Rejected shutter speed change: {}", e);
            e
        })?;
        self.transact(Operation::ExposureDuration, |device| {
            let iso = device.iso();
            device.set_exposure_mode_custom(duration, iso)?;
            log::debug!("Exposure set to {} (ISO {})", duration, iso);
            Ok(ApplyOutcome::Applied)
        })
    }

    /// Pin the frame rate and set smooth autofocus when the device exposes a
    /// variable frame-duration range. Devices with a fixed range are left
    /// untouched and the call still succeeds. If the autofocus write fails,
    /// the max frame duration is restored before the error is returned.
    pub fn apply_stabilization(&self, enabled: bool) -> Result<ApplyOutcome, CameraError> {
        self.transact(Operation::Stabilization, |device| {
            let min = device.active_min_frame_duration();
            let max = device.active_max_frame_duration();
            if max.same_duration(&min) {
                log::debug!("Frame duration range is fixed at {}, stabilization unchanged", min);
                return Ok(ApplyOutcome::Unsupported);
            }
            device.set_active_max_frame_duration(min)?;
            if let Err(e) = device.set_smooth_autofocus_enabled(enabled) {
                // Undo the frame-rate pin.
                if let Err(restore) = device.set_active_max_frame_duration(max) {
                    log::warn!("Failed to restore max frame duration {}: {}", max, restore);
                }
                return Err(e);
            }
            log::debug!("Stabilization {} (frame duration pinned to {})", enabled, min);
            Ok(ApplyOutcome::Applied)
        })
    }

    pub fn apply(&self, change: ParameterChange) -> Result<ApplyOutcome, CameraError> {
        match change {
            ParameterChange::Sensitivity(iso) => self.apply_sensitivity(iso),
            ParameterChange::ShutterSpeed(fraction) => self.apply_exposure_duration(fraction),
            ParameterChange::Stabilization(enabled) => self.apply_stabilization(enabled),
        }
    }

    /// Read the device state between transactions.
    pub fn snapshot(&self) -> DeviceSnapshot {
        let _gate = self.gate();
        self.device.snapshot()
    }

    pub fn last_transaction(&self) -> Option<TransactionRecord> {
        self.gate().clone()
    }

    fn transact<F>(&self, operation: Operation, mutate: F) -> Result<ApplyOutcome, CameraError>
    where
        F: FnOnce(&dyn CaptureDevice) -> Result<ApplyOutcome, CameraError>,
    {
        let mut gate = self.gate();
        let mut states = vec![TransactionState::Idle];

        let result = match ConfigurationLock::acquire(self.device.as_ref()) {
            Err(e) => {
                states.push(TransactionState::LockAcquisitionFailed);
                states.push(TransactionState::Idle);
                Err(e)
            }
            Ok(lock) => {
                states.push(TransactionState::LockAcquired);
                let result = mutate(lock.device()).map_err(|e| match e {
                    CameraError::ConfigurationError(_) => e,
                    other => CameraError::ConfigurationError(other.to_string()),
                });
                match result {
                    Ok(ApplyOutcome::Applied) => states.push(TransactionState::Mutated),
                    Ok(ApplyOutcome::Unsupported) => {}
                    Err(_) => states.push(TransactionState::MutationRejected),
                }
                drop(lock);
                states.push(TransactionState::Unlocked {
                    success: result.is_ok(),
                });
                result
            }
        };

        match &result {
            Ok(outcome) => log::info!("{:?} transaction completed: {:?}", operation, outcome),
            Err(e) => log::error!("{:?} transaction failed: {}", operation, e),
        }
        *gate = Some(TransactionRecord { operation, states });
        result
    }
}
