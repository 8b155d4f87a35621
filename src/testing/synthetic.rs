//! In-process camera driver for offline testing
//!
//! [`SyntheticDriver`] behaves like a two-lens phone camera: a well-equipped
//! back camera and a minimal front camera. Open and close complete on a
//! separate callback thread after a configurable latency, just like a real
//! platform API. A cloneable [`SyntheticHandle`] lets tests inject failures and
//! inspect what the controller asked the driver to do.

use crate::controller::{CameraDriver, Completion, OpenRequest};
use crate::errors::CameraError;
use crate::options::DeviceCapabilities;
use crate::types::{
    Audio, Facing, Flash, Hdr, Parameter, PreviewSize, VideoQuality, WhiteBalance,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

/// Capabilities of the synthetic back camera
pub fn back_camera() -> DeviceCapabilities {
    DeviceCapabilities {
        facings: vec![Facing::Back, Facing::Front],
        flash_modes: Flash::values().to_vec(),
        white_balances: WhiteBalance::values().to_vec(),
        hdr_modes: vec![Hdr::Off, Hdr::On],
        max_zoom_ratio: 4.0,
        min_exposure_index: -12,
        max_exposure_index: 12,
        exposure_step: 1.0 / 6.0,
        auto_focus: true,
        video_snapshot: true,
        horizontal_view_angle: 65.0,
        vertical_view_angle: 50.0,
    }
}

/// Capabilities of the synthetic front camera: no flash, zoom or exposure control
pub fn front_camera() -> DeviceCapabilities {
    DeviceCapabilities {
        facings: vec![Facing::Back, Facing::Front],
        flash_modes: vec![Flash::Off],
        white_balances: vec![WhiteBalance::Auto],
        hdr_modes: vec![Hdr::Off],
        max_zoom_ratio: 1.0,
        min_exposure_index: 0,
        max_exposure_index: 0,
        exposure_step: 0.0,
        auto_focus: false,
        video_snapshot: false,
        horizontal_view_angle: 70.0,
        vertical_view_angle: 55.0,
    }
}

/// Record of everything the controller asked of the driver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriverProbe {
    pub opens: u32,
    pub closes: u32,
    pub discards: u32,
    /// Request passed to the most recent open
    pub last_request: Option<OpenRequest>,
    /// In-place parameters in the order they were applied
    pub applied: Vec<Parameter>,
    pub previews_attached: Vec<PreviewSize>,
    pub preview_detaches: u32,
    pub recordings: Vec<(VideoQuality, Audio)>,
    pub recordings_stopped: u32,
    /// Set if an open or close began while another was still running
    pub overlapping_operations: bool,
}

#[derive(Debug)]
struct SyntheticState {
    back: DeviceCapabilities,
    front: DeviceCapabilities,
    latency: Duration,
    fail_next_open: Option<CameraError>,
    fail_next_close: Option<CameraError>,
    fail_apply: bool,
    open_device: Option<Facing>,
    busy: bool,
    probe: DriverProbe,
}

/// Shared control over a [`SyntheticDriver`] that has been moved into a camera.
#[derive(Debug, Clone)]
pub struct SyntheticHandle {
    state: Arc<Mutex<SyntheticState>>,
}

impl SyntheticHandle {
    fn lock(&self) -> MutexGuard<'_, SyntheticState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next open fail with `error`.
    pub fn fail_next_open(&self, error: CameraError) {
        self.lock().fail_next_open = Some(error);
    }

    /// Make the next close report `error` (the device is still released).
    pub fn fail_next_close(&self, error: CameraError) {
        self.lock().fail_next_close = Some(error);
    }

    /// Make every in-place parameter application fail.
    pub fn fail_apply(&self, fail: bool) {
        self.lock().fail_apply = fail;
    }

    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    pub fn set_capabilities(&self, facing: Facing, caps: DeviceCapabilities) {
        let mut state = self.lock();
        match facing {
            Facing::Back => state.back = caps,
            Facing::Front => state.front = caps,
        }
    }

    /// Lens currently held open, if any
    pub fn open_device(&self) -> Option<Facing> {
        self.lock().open_device
    }

    pub fn probe(&self) -> DriverProbe {
        self.lock().probe.clone()
    }
}

/// Camera driver backed by in-memory state.
#[derive(Debug)]
pub struct SyntheticDriver {
    handle: SyntheticHandle,
}

impl Default for SyntheticDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticDriver {
    pub fn new() -> Self {
        Self::with_latency(Duration::from_millis(5))
    }

    pub fn with_latency(latency: Duration) -> Self {
        let state = SyntheticState {
            back: back_camera(),
            front: front_camera(),
            latency,
            fail_next_open: None,
            fail_next_close: None,
            fail_apply: false,
            open_device: None,
            busy: false,
            probe: DriverProbe::default(),
        };
        Self {
            handle: SyntheticHandle {
                state: Arc::new(Mutex::new(state)),
            },
        }
    }

    pub fn handle(&self) -> SyntheticHandle {
        self.handle.clone()
    }

    /// Finish an operation on the callback thread once the latency elapses.
    fn complete_later<F>(&self, latency: Duration, finish: F)
    where
        F: FnOnce(&SyntheticHandle) + Send + 'static,
    {
        let handle = self.handle.clone();
        let spawned = thread::Builder::new()
            .name("crabview-synthetic".to_string())
            .spawn(move || {
                if !latency.is_zero() {
                    thread::sleep(latency);
                }
                finish(&handle);
            });
        if let Err(e) = spawned {
            // The closure (and the completion inside it) is dropped, which
            // reports a driver failure to the controller.
            log::error!("Failed to spawn synthetic callback thread: {}", e);
        }
    }
}

impl CameraDriver for SyntheticDriver {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn open(&mut self, request: OpenRequest, done: Completion) {
        let latency = {
            let mut state = self.handle.lock();
            state.probe.opens += 1;
            state.probe.last_request = Some(request);
            if state.busy {
                state.probe.overlapping_operations = true;
            }
            state.busy = true;
            state.latency
        };
        log::debug!("synthetic: opening {:?} camera", request.facing);

        self.complete_later(latency, move |handle| {
            let mut state = handle.lock();
            state.busy = false;
            let failure = state.fail_next_open.take();
            if failure.is_none() {
                state.open_device = Some(request.facing);
            }
            drop(state);
            match failure {
                Some(error) => done.fail(error),
                None => done.succeed(),
            }
        });
    }

    fn capabilities(&self) -> Result<DeviceCapabilities, CameraError> {
        let state = self.handle.lock();
        match state.open_device {
            Some(Facing::Back) => Ok(state.back.clone()),
            Some(Facing::Front) => Ok(state.front.clone()),
            None => Err(CameraError::driver("no synthetic device is open")),
        }
    }

    fn apply(&mut self, parameter: Parameter) -> Result<(), CameraError> {
        let mut state = self.handle.lock();
        if state.open_device.is_none() {
            return Err(CameraError::driver("no synthetic device is open"));
        }
        if state.fail_apply {
            return Err(CameraError::driver(format!(
                "synthetic device rejected {}",
                parameter.name()
            )));
        }
        state.probe.applied.push(parameter);
        Ok(())
    }

    fn close(&mut self, done: Completion) {
        let latency = {
            let mut state = self.handle.lock();
            state.probe.closes += 1;
            if state.busy {
                state.probe.overlapping_operations = true;
            }
            state.busy = true;
            state.latency
        };
        log::debug!("synthetic: closing camera");

        self.complete_later(latency, move |handle| {
            let mut state = handle.lock();
            state.busy = false;
            state.open_device = None;
            let failure = state.fail_next_close.take();
            drop(state);
            match failure {
                Some(error) => done.fail(error),
                None => done.succeed(),
            }
        });
    }

    fn discard(&mut self) {
        let mut state = self.handle.lock();
        state.probe.discards += 1;
        state.open_device = None;
    }

    fn attach_preview(&mut self, size: PreviewSize) -> Result<(), CameraError> {
        self.handle.lock().probe.previews_attached.push(size);
        Ok(())
    }

    fn detach_preview(&mut self) {
        self.handle.lock().probe.preview_detaches += 1;
    }

    fn start_recording(&mut self, quality: VideoQuality, audio: Audio) -> Result<(), CameraError> {
        self.handle.lock().probe.recordings.push((quality, audio));
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<(), CameraError> {
        self.handle.lock().probe.recordings_stopped += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Command;
    use crate::options::CameraOptions;

    fn request(facing: Facing) -> OpenRequest {
        OpenRequest {
            facing,
            session_type: Default::default(),
            video_quality: VideoQuality::default(),
            audio: Audio::default(),
            preview: None,
        }
    }

    fn open_completion(tx: &crossbeam_channel::Sender<Command>) -> Completion {
        Completion::new(tx.clone(), 1, crate::controller::driver::OperationKind::Open)
    }

    #[test]
    fn test_capability_profiles() {
        let back = CameraOptions::from_capabilities(&back_camera());
        assert!(back.is_zoom_supported());
        assert!(back.is_exposure_correction_supported());
        assert_eq!(back.exposure_correction_min_value(), -2.0);
        assert_eq!(back.exposure_correction_max_value(), 2.0);

        let front = CameraOptions::from_capabilities(&front_camera());
        assert!(!front.is_zoom_supported());
        assert!(!front.is_exposure_correction_supported());
        assert!(!front.supports_flash(Flash::On));
    }

    #[test]
    fn test_open_completes_on_callback_thread() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut driver = SyntheticDriver::with_latency(Duration::ZERO);
        let handle = driver.handle();

        driver.open(request(Facing::Front), open_completion(&tx));
        match rx.recv_timeout(Duration::from_secs(1)) {
            Ok(Command::OpenFinished { result, .. }) => assert!(result.is_ok()),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(handle.open_device(), Some(Facing::Front));
        assert_eq!(driver.capabilities().unwrap(), front_camera());
    }

    #[test]
    fn test_injected_open_failure() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut driver = SyntheticDriver::with_latency(Duration::ZERO);
        let handle = driver.handle();
        handle.fail_next_open(CameraError::PermissionDenied("test".to_string()));

        driver.open(request(Facing::Back), open_completion(&tx));
        match rx.recv_timeout(Duration::from_secs(1)) {
            Ok(Command::OpenFinished { result, .. }) => {
                assert!(matches!(result, Err(CameraError::PermissionDenied(_))))
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(handle.open_device(), None);
        assert!(driver.capabilities().is_err());
    }

    #[test]
    fn test_apply_requires_open_device() {
        let mut driver = SyntheticDriver::new();
        assert!(driver.apply(Parameter::Flash(Flash::On)).is_err());
        assert!(driver.handle().probe().applied.is_empty());
    }
}
