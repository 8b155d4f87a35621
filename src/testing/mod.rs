//! Testing utilities for crabview
//!
//! Provides a synthetic camera driver so the controller can be exercised
//! without hardware.

pub mod synthetic;

pub use synthetic::{back_camera, front_camera, DriverProbe, SyntheticDriver, SyntheticHandle};
