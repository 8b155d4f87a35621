//! Hardware drivers for real cameras.

#[cfg(feature = "native")]
pub mod native;

#[cfg(feature = "native")]
pub use native::NativeDriver;
