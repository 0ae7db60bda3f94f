//! Testing utilities for SlogCam
//!
//! Provides a simulated capture host and device with fault injection, so the
//! session manager and the configuration controller can be exercised without
//! camera hardware.

pub mod simulated;

pub use simulated::{SimulatedDevice, SimulatedHost};
