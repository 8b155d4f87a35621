use thiserror::Error;

/// Errors surfaced by the camera controller.
///
/// Hardware failures travel through [`crate::CameraListener::on_camera_error`];
/// contract violations are returned synchronously from the offending call.
/// The type is `Clone` so one failure can be fanned out to every listener.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Camera device busy: {0}")]
    DeviceBusy(String),

    #[error("Camera open failed: {0}")]
    OpenFailed(String),

    #[error("Camera driver error: {0}")]
    Driver(String),

    #[error("Contract violation: {0}")]
    ContractViolation(String),

    #[error("Camera controller has shut down")]
    ControllerShutdown,

    #[error("Timed out waiting for {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CameraError {
    pub fn driver(msg: impl Into<String>) -> Self {
        CameraError::Driver(msg.into())
    }

    pub fn open_failed(msg: impl Into<String>) -> Self {
        CameraError::OpenFailed(msg.into())
    }

    pub fn contract(msg: impl Into<String>) -> Self {
        CameraError::ContractViolation(msg.into())
    }

    /// True for failures that happened while acquiring the device.
    pub fn is_open_failure(&self) -> bool {
        matches!(
            self,
            CameraError::PermissionDenied(_) | CameraError::DeviceBusy(_) | CameraError::OpenFailed(_)
        )
    }

    pub fn is_contract_violation(&self) -> bool {
        matches!(self, CameraError::ContractViolation(_))
    }
}
