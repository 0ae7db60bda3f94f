pub mod config;
pub mod controls;
pub mod session;
pub mod telemetry;

pub use config::*;
pub use controls::*;
pub use session::*;
pub use telemetry::*;
