//! Desktop webcam driver built on nokhwa.
//!
//! Desktop cameras expose no lens direction, so the first enumerated device
//! stands in for the back camera and the second (if any) for the front one.
//! Flash, white balance and zoom are not exposed through nokhwa's portable
//! surface; the device reports the conservative default capability set.

use crate::controller::{CameraDriver, Completion, OpenRequest};
use crate::errors::CameraError;
use crate::options::DeviceCapabilities;
use crate::types::{Facing, Parameter, PreviewSize};
use nokhwa::{
    pixel_format::RgbFormat,
    query,
    utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType},
    CallbackCamera,
};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

#[derive(Default)]
struct NativeSlot {
    camera: Option<CallbackCamera>,
    device_count: usize,
}

/// Camera driver for the platform's native capture API.
pub struct NativeDriver {
    slot: Arc<Mutex<NativeSlot>>,
}

impl Default for NativeDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeDriver {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(NativeSlot::default())),
        }
    }

    /// Human-readable names of the cameras nokhwa can see.
    pub fn list_devices() -> Result<Vec<String>, CameraError> {
        let cameras = query(ApiBackend::Auto)
            .map_err(|e| CameraError::driver(format!("Failed to query cameras: {}", e)))?;
        Ok(cameras.iter().map(|info| info.human_name()).collect())
    }
}

/// Map a nokhwa open failure onto the hardware-open error kinds.
fn classify_open_error(message: String) -> CameraError {
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") {
        CameraError::PermissionDenied(message)
    } else if lower.contains("busy") || lower.contains("in use") {
        CameraError::DeviceBusy(message)
    } else {
        CameraError::OpenFailed(message)
    }
}

fn open_device(request: OpenRequest) -> Result<(CallbackCamera, usize), CameraError> {
    let cameras = query(ApiBackend::Auto)
        .map_err(|e| CameraError::open_failed(format!("Failed to query cameras: {}", e)))?;

    let position = match request.facing {
        Facing::Back => 0,
        Facing::Front => 1,
    };
    let info = cameras.get(position).ok_or_else(|| {
        CameraError::open_failed(format!(
            "No {:?} camera: {} device(s) found",
            request.facing,
            cameras.len()
        ))
    })?;
    let index: CameraIndex = info.index().clone();
    log::info!("native: opening {} for {:?}", info.human_name(), request.facing);

    let requested_format = RequestedFormat::new::<RgbFormat>(RequestedFormatType::None);
    let mut camera = CallbackCamera::new(index, requested_format, |_| {})
        .map_err(|e| classify_open_error(format!("Failed to initialize camera: {}", e)))?;
    camera
        .open_stream()
        .map_err(|e| classify_open_error(format!("Failed to start stream: {}", e)))?;

    Ok((camera, cameras.len()))
}

impl CameraDriver for NativeDriver {
    fn name(&self) -> &str {
        "native"
    }

    fn open(&mut self, request: OpenRequest, done: Completion) {
        let slot = Arc::clone(&self.slot);
        // Opening blocks inside the platform API; keep it off the controller thread.
        let spawned = thread::Builder::new()
            .name("crabview-native-open".to_string())
            .spawn(move || match open_device(request) {
                Ok((camera, device_count)) => {
                    let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
                    slot.camera = Some(camera);
                    slot.device_count = device_count;
                    drop(slot);
                    done.succeed();
                }
                Err(e) => done.fail(e),
            });
        if let Err(e) = spawned {
            log::error!("Failed to spawn native open thread: {}", e);
        }
    }

    fn capabilities(&self) -> Result<DeviceCapabilities, CameraError> {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match &slot.camera {
            Some(camera) if camera.is_stream_open() => {
                let facings = if slot.device_count > 1 {
                    vec![Facing::Back, Facing::Front]
                } else {
                    vec![Facing::Back]
                };
                Ok(DeviceCapabilities {
                    facings,
                    ..DeviceCapabilities::default()
                })
            }
            _ => Err(CameraError::driver("native camera stream is not open")),
        }
    }

    fn apply(&mut self, parameter: Parameter) -> Result<(), CameraError> {
        log::debug!("native: {} has no device control, keeping {:?}", parameter.name(), parameter);
        Ok(())
    }

    fn close(&mut self, done: Completion) {
        let slot = Arc::clone(&self.slot);
        let spawned = thread::Builder::new()
            .name("crabview-native-close".to_string())
            .spawn(move || {
                let camera = slot
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .camera
                    .take();
                let result = match camera {
                    Some(mut camera) => camera
                        .stop_stream()
                        .map_err(|e| CameraError::driver(format!("Failed to stop stream: {}", e))),
                    None => Ok(()),
                };
                done.finish(result);
            });
        if let Err(e) = spawned {
            log::error!("Failed to spawn native close thread: {}", e);
        }
    }

    fn discard(&mut self) {
        let camera = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .camera
            .take();
        if let Some(mut camera) = camera {
            let _ = camera.stop_stream();
        }
    }

    fn attach_preview(&mut self, size: PreviewSize) -> Result<(), CameraError> {
        log::debug!("native: preview target {}", size);
        Ok(())
    }
}
