#[cfg(test)]
mod error_tests {
    use crabview::errors::CameraError;
    use std::error::Error;

    #[test]
    fn test_camera_error_permission_denied() {
        let error = CameraError::PermissionDenied("Access denied".to_string());
        assert!(error.to_string().contains("Permission denied"));
        assert!(error.to_string().contains("Access denied"));
    }

    #[test]
    fn test_camera_error_display_trait() {
        let error = CameraError::OpenFailed("Display test".to_string());
        assert_eq!(format!("{}", error), "Camera open failed: Display test");

        let error = CameraError::ControllerShutdown;
        assert_eq!(error.to_string(), "Camera controller has shut down");
    }

    #[test]
    fn test_camera_error_debug_format() {
        let error = CameraError::DeviceBusy("Debug test".to_string());
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("DeviceBusy"));
        assert!(debug_str.contains("Debug test"));
    }

    #[test]
    fn test_camera_error_implements_error_trait() {
        let error = CameraError::driver("Error trait test");
        let _error_trait: &dyn Error = &error;
        assert!(error.source().is_none());
    }

    #[test]
    fn test_error_classification() {
        let open_failures = [
            CameraError::PermissionDenied("p".to_string()),
            CameraError::DeviceBusy("b".to_string()),
            CameraError::OpenFailed("o".to_string()),
        ];
        for error in &open_failures {
            assert!(error.is_open_failure(), "{:?}", error);
            assert!(!error.is_contract_violation(), "{:?}", error);
        }

        let others = [
            CameraError::Driver("d".to_string()),
            CameraError::ContractViolation("c".to_string()),
            CameraError::ControllerShutdown,
            CameraError::Timeout("t".to_string()),
            CameraError::Config("f".to_string()),
        ];
        for error in &others {
            assert!(!error.is_open_failure(), "{:?}", error);
            assert!(!error.to_string().is_empty());
        }
        assert!(CameraError::contract("x").is_contract_violation());
    }

    #[test]
    fn test_error_clone_equality() {
        let error = CameraError::Timeout("controller shutdown".to_string());
        assert_eq!(error.clone(), error);
        assert_ne!(error, CameraError::Timeout("other".to_string()));
    }

    #[test]
    fn test_error_converts_to_anyhow() {
        let result: anyhow::Result<()> = Err(CameraError::Config("bad zoom".to_string()).into());
        let message = result.unwrap_err().to_string();
        assert!(message.contains("Configuration error"));
    }
}
