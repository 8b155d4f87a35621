//! Caller-facing camera object.
//!
//! [`Camera`] forwards every request to the controller thread and never blocks
//! on hardware. It keeps the last-known parameter values so getters answer
//! immediately, and validates in-place setters against the snapshot received
//! with the most recent "opened" notification.

use crate::config::CrabViewConfig;
use crate::controller::relay::Relay;
use crate::controller::{CameraDriver, CameraState, Command, Controller, ControllerSettings};
use crate::errors::CameraError;
use crate::listener::{CameraEvent, CameraListener, ChannelListener, ListenerId};
use crate::options::{CameraOptions, ExtraProperties};
use crate::types::{
    Audio, Facing, Flash, Hdr, Parameter, Parameters, PreviewSize, SessionType, VideoQuality,
    WhiteBalance,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// How long dropping a [`Camera`] waits for the device to be released.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

pub struct Camera {
    controller: Controller,
    relay: Arc<Relay>,
}

impl Camera {
    /// Create a camera with default parameters and settings.
    pub fn new(driver: impl CameraDriver + 'static) -> Result<Self, CameraError> {
        Self::with_settings(
            Box::new(driver),
            Parameters::default(),
            ControllerSettings::default(),
        )
    }

    pub fn with_settings(
        driver: Box<dyn CameraDriver>,
        initial: Parameters,
        settings: ControllerSettings,
    ) -> Result<Self, CameraError> {
        let relay = Arc::new(Relay::new(initial));
        let controller = Controller::spawn(driver, &settings, Arc::clone(&relay))?;
        Ok(Self { controller, relay })
    }

    /// Create a camera whose defaults come from a loaded configuration.
    pub fn from_config(
        driver: Box<dyn CameraDriver>,
        config: &CrabViewConfig,
    ) -> Result<Self, CameraError> {
        config.validate().map_err(CameraError::Config)?;
        Self::with_settings(driver, config.camera.parameters(), config.controller.clone())
    }

    fn send(&self, command: Command) {
        if let Err(e) = self.controller.send(command) {
            log::warn!("Dropping camera request: {}", e);
        }
    }

    // Lifecycle

    /// Request the device open. Completion arrives as `on_camera_opened`.
    pub fn start(&self) {
        self.send(Command::Start);
    }

    /// Request the device closed. Completion arrives as `on_camera_closed`.
    pub fn stop(&self) {
        self.send(Command::Stop);
    }

    /// Release the device and stop the controller thread.
    pub fn destroy(mut self, timeout: Duration) -> Result<(), CameraError> {
        self.controller.shutdown(timeout)
    }

    pub fn state(&self) -> CameraState {
        self.relay.state()
    }

    pub fn is_camera_available(&self) -> bool {
        self.relay.state() == CameraState::Open
    }

    /// Snapshot of the open device, absent until the first "opened"
    /// notification and again from the "closed" notification on.
    pub fn camera_options(&self) -> Option<Arc<CameraOptions>> {
        self.relay.options()
    }

    pub fn extra_properties(&self) -> Option<ExtraProperties> {
        self.relay.extra()
    }

    // Preview surface

    pub fn on_surface_available(&self, size: PreviewSize) {
        self.send(Command::SurfaceAvailable(size));
    }

    pub fn on_surface_destroyed(&self) {
        self.send(Command::SurfaceDestroyed);
    }

    // Parameters

    fn submit(&self, parameter: Parameter) {
        match self.relay.accept(parameter) {
            Some(accepted) => self.send(Command::Set(accepted)),
            None => log::debug!("Ignoring unsupported {:?}", parameter),
        }
    }

    pub fn parameters(&self) -> Parameters {
        self.relay.params()
    }

    /// Changing facing while open closes and reopens the device.
    pub fn set_facing(&self, facing: Facing) {
        self.submit(Parameter::Facing(facing));
    }

    pub fn facing(&self) -> Facing {
        self.relay.params().facing
    }

    /// Changing the session type while open closes and reopens the device.
    pub fn set_session_type(&self, session_type: SessionType) {
        self.submit(Parameter::SessionType(session_type));
    }

    pub fn session_type(&self) -> SessionType {
        self.relay.params().session_type
    }

    /// Normalized zoom; clamped into 0.0..=1.0 on a device that supports zoom.
    pub fn set_zoom(&self, zoom: f32) {
        self.submit(Parameter::Zoom(zoom));
    }

    pub fn zoom(&self) -> f32 {
        self.relay.params().zoom
    }

    /// Exposure compensation in EV; clamped into the supported range.
    pub fn set_exposure_correction(&self, ev: f32) {
        self.submit(Parameter::ExposureCorrection(ev));
    }

    pub fn exposure_correction(&self) -> f32 {
        self.relay.params().exposure_correction
    }

    pub fn set_flash(&self, flash: Flash) {
        self.submit(Parameter::Flash(flash));
    }

    pub fn flash(&self) -> Flash {
        self.relay.params().flash
    }

    pub fn set_white_balance(&self, white_balance: WhiteBalance) {
        self.submit(Parameter::WhiteBalance(white_balance));
    }

    pub fn white_balance(&self) -> WhiteBalance {
        self.relay.params().white_balance
    }

    pub fn set_hdr(&self, hdr: Hdr) {
        self.submit(Parameter::Hdr(hdr));
    }

    pub fn hdr(&self) -> Hdr {
        self.relay.params().hdr
    }

    pub fn set_audio(&self, audio: Audio) {
        self.submit(Parameter::Audio(audio));
    }

    pub fn audio(&self) -> Audio {
        self.relay.params().audio
    }

    /// Set the encoding target for the next recording.
    ///
    /// # Errors
    /// `ContractViolation` while a recording is active; the recording keeps
    /// its original quality.
    pub fn set_video_quality(&self, quality: VideoQuality) -> Result<(), CameraError> {
        if self.relay.is_recording() {
            return Err(CameraError::contract(
                "video quality cannot change while recording",
            ));
        }
        self.submit(Parameter::VideoQuality(quality));
        Ok(())
    }

    pub fn video_quality(&self) -> VideoQuality {
        self.relay.params().video_quality
    }

    // Recording

    /// Begin recording with the current video quality and audio setting.
    ///
    /// # Errors
    /// `ContractViolation` unless the camera is open in a video session and
    /// not already recording.
    pub fn start_recording(&self) -> Result<(), CameraError> {
        if self.relay.state() != CameraState::Open {
            return Err(CameraError::contract("recording requires an open camera"));
        }
        if self.relay.params().session_type != SessionType::Video {
            return Err(CameraError::contract(
                "recording requires SessionType::Video",
            ));
        }
        if !self.relay.begin_recording() {
            return Err(CameraError::contract("a recording is already active"));
        }
        self.send(Command::StartRecording);
        Ok(())
    }

    pub fn stop_recording(&self) {
        self.send(Command::StopRecording);
    }

    pub fn is_recording(&self) -> bool {
        self.relay.is_recording()
    }

    // Listeners

    /// Register a listener; it sees every notification emitted after the
    /// registration reaches the controller thread.
    pub fn add_listener(&self, listener: Arc<dyn CameraListener>) -> ListenerId {
        let id = self.relay.next_listener_id();
        let relay = Arc::clone(&self.relay);
        let registered = Arc::clone(&listener);
        let post = Command::Post(Box::new(move || relay.register(id, registered)));
        if self.controller.send(post).is_err() {
            // No controller thread left to race with.
            self.relay.register(id, listener);
        }
        id
    }

    pub fn remove_listener(&self, id: ListenerId) {
        let relay = Arc::clone(&self.relay);
        let post = Command::Post(Box::new(move || {
            if !relay.unregister(id) {
                log::debug!("Listener {:?} was not registered", id);
            }
        }));
        if self.controller.send(post).is_err() {
            self.relay.unregister(id);
        }
    }

    pub fn clear_listeners(&self) {
        let relay = Arc::clone(&self.relay);
        if self
            .controller
            .send(Command::Post(Box::new(move || relay.clear_listeners())))
            .is_err()
        {
            self.relay.clear_listeners();
        }
    }

    /// Receive notifications on a tokio channel.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<CameraEvent> {
        let (listener, rx) = ChannelListener::new();
        self.add_listener(Arc::new(listener));
        rx
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        if let Err(e) = self.controller.shutdown(DEFAULT_SHUTDOWN_TIMEOUT) {
            log::warn!("Error shutting down camera controller in drop: {}", e);
        }
    }
}
