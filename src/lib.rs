//! crabview: asynchronous camera controller
//!
//! Drives a camera device through its open/close lifecycle on a single
//! controller thread, keeps an immutable snapshot of what the open device
//! supports, and relays lifecycle notifications to listeners.
//!
//! # Features
//! - Non-blocking lifecycle: `start`/`stop` return immediately, completion is
//!   reported through listeners or a tokio channel
//! - Intent coalescing while a hardware operation is in flight
//! - Capability gating and clamping of camera parameters
//! - Transparent restart when facing or session type changes
//! - Pluggable drivers: a synthetic driver for tests and a nokhwa-backed
//!   desktop driver (feature `native`)
//!
//! # Usage
//! ```rust,ignore
//! use crabview::{Camera, CameraEvent};
//! use crabview::testing::SyntheticDriver;
//!
//! let camera = Camera::new(SyntheticDriver::new())?;
//! let mut events = camera.subscribe();
//! camera.start();
//! // events.recv().await == Some(CameraEvent::Opened(options))
//! ```
pub mod camera;
pub mod config;
pub mod controller;
pub mod errors;
pub mod invariant_ppt;
pub mod listener;
pub mod options;
pub mod platform;
pub mod types;

// Testing utilities - synthetic driver for offline testing
pub mod testing;

// Re-exports for convenience
pub use camera::Camera;
pub use config::CrabViewConfig;
pub use controller::{CameraDriver, CameraState, Completion, ControllerSettings, OpenRequest};
pub use errors::CameraError;
pub use listener::{CameraEvent, CameraListener, ListenerId};
pub use options::{CameraOptions, DeviceCapabilities, ExtraProperties};
pub use types::{
    Audio, Facing, Flash, Hdr, Parameter, Parameters, PreviewSize, SessionType, VideoQuality,
    WhiteBalance,
};

/// Initialize logging for the camera system
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "crabview=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
        native_driver: cfg!(feature = "native"),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    /// Whether the nokhwa driver was compiled in
    pub native_driver: bool,
}
