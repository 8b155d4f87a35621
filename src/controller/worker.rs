use super::driver::{CameraDriver, Completion, OperationKind, OpenRequest};
use super::relay::Relay;
use super::{CameraState, Command};
use crate::assert_invariant;
use crate::errors::CameraError;
use crate::invariant_ppt::{SINGLE_HARDWARE_OPERATION, SNAPSHOT_PRESENT_IFF_OPEN};
use crate::listener::CameraEvent;
use crate::options::{CameraOptions, ExtraProperties};
use crate::types::{Parameter, Parameters, PreviewSize, SessionType};
use crossbeam_channel::{Receiver, Sender};
use std::collections::VecDeque;
use std::sync::Arc;

/// Lifecycle requests that arrived while a hardware operation was in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Start,
    Stop,
    Restart,
}

pub(crate) struct Worker {
    driver: Box<dyn CameraDriver>,
    relay: Arc<Relay>,
    tx: Sender<Command>,
    state: CameraState,
    params: Parameters,
    options: Option<Arc<CameraOptions>>,
    pending: VecDeque<Intent>,
    /// Id of the most recent hardware operation; completions for older ids are stale
    op: u64,
    in_flight: bool,
    reopen_after_close: bool,
    start_deferred: bool,
    require_surface: bool,
    surface: Option<PreviewSize>,
    recording: bool,
    shutting_down: bool,
}

impl Worker {
    pub(crate) fn new(
        driver: Box<dyn CameraDriver>,
        require_surface: bool,
        relay: Arc<Relay>,
        tx: Sender<Command>,
    ) -> Self {
        let params = relay.params();
        Self {
            driver,
            relay,
            tx,
            state: CameraState::Closed,
            params,
            options: None,
            pending: VecDeque::new(),
            op: 0,
            in_flight: false,
            reopen_after_close: false,
            start_deferred: false,
            require_surface,
            surface: None,
            recording: false,
            shutting_down: false,
        }
    }

    pub(crate) fn run(mut self, rx: Receiver<Command>) {
        log::info!("Camera controller started with driver {}", self.driver.name());

        while let Ok(command) = rx.recv() {
            log::trace!("controller <- {:?} ({})", command, self.state);
            self.handle(command);
            if self.shutting_down && self.state == CameraState::Closed && !self.in_flight {
                break;
            }
        }

        log::info!("Camera controller stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Start => {
                if self.shutting_down {
                    log::debug!("Ignoring start during shutdown");
                    return;
                }
                self.submit(Intent::Start);
            }
            Command::Stop => self.submit(Intent::Stop),
            Command::Set(parameter) => self.set_parameter(parameter),
            Command::SurfaceAvailable(size) => self.surface_available(size),
            Command::SurfaceDestroyed => self.surface_destroyed(),
            Command::StartRecording => self.start_recording(),
            Command::StopRecording => self.stop_recording(),
            Command::Post(task) => task(),
            Command::OpenFinished { op, result } => self.open_finished(op, result),
            Command::CloseFinished { op, result } => self.close_finished(op, result),
            Command::Shutdown => {
                log::debug!("Controller shutdown requested");
                self.shutting_down = true;
                self.pending.clear();
                self.submit(Intent::Stop);
            }
        }
    }

    // Lifecycle

    /// Whether the device ends up open once every queued intent has run.
    fn target_open(&self) -> bool {
        let base = match self.state {
            CameraState::Closed => self.start_deferred,
            CameraState::Opening | CameraState::Open => true,
            CameraState::Closing => self.reopen_after_close,
        };
        self.pending.iter().fold(base, |open, intent| match intent {
            Intent::Start => true,
            Intent::Stop => false,
            Intent::Restart => open,
        })
    }

    fn submit(&mut self, intent: Intent) {
        if !self.state.is_transitioning() {
            self.execute(intent);
            return;
        }

        match intent {
            Intent::Start => {
                if self.target_open() {
                    log::debug!("Start while {}: already headed open", self.state);
                } else {
                    self.pending.push_back(Intent::Start);
                }
            }
            Intent::Stop => {
                self.pending.retain(|queued| *queued != Intent::Restart);
                self.reopen_after_close = false;
                if self.target_open() {
                    self.pending.push_back(Intent::Stop);
                } else {
                    log::debug!("Stop while {}: already headed closed", self.state);
                }
            }
            Intent::Restart => {
                let restart_queued = self.pending.contains(&Intent::Restart)
                    || (self.state == CameraState::Closing && self.reopen_after_close);
                if restart_queued {
                    log::debug!("Coalescing restart request");
                } else if self.target_open() {
                    self.pending.push_back(Intent::Restart);
                }
            }
        }
    }

    fn execute(&mut self, intent: Intent) {
        match (intent, self.state) {
            (Intent::Start, CameraState::Closed) => self.open_when_ready(),
            (Intent::Start, CameraState::Open) => log::debug!("Start ignored: camera already open"),
            (Intent::Stop, CameraState::Open) => self.begin_close(false),
            (Intent::Stop, CameraState::Closed) => {
                if self.start_deferred {
                    log::debug!("Dropping deferred start");
                    self.start_deferred = false;
                } else {
                    log::debug!("Stop ignored: camera already closed");
                }
            }
            (Intent::Restart, CameraState::Open) => {
                log::info!("Restarting camera to apply new configuration");
                self.begin_close(true);
            }
            (Intent::Restart, CameraState::Closed) => {}
            (intent, state) => {
                // submit() only executes outside transitional states
                log::error!("Intent {:?} reached controller in state {}", intent, state);
            }
        }
    }

    fn drain_pending(&mut self) {
        while !self.state.is_transitioning() {
            match self.pending.pop_front() {
                Some(intent) => self.execute(intent),
                None => break,
            }
        }
    }

    fn open_when_ready(&mut self) {
        if self.require_surface && self.surface.is_none() {
            log::info!("Deferring camera open until a preview surface is available");
            self.start_deferred = true;
            return;
        }
        self.start_deferred = false;
        self.begin_open();
    }

    fn begin_open(&mut self) {
        assert_invariant!(!self.in_flight, SINGLE_HARDWARE_OPERATION, "controller::begin_open");
        self.op += 1;
        self.in_flight = true;
        self.set_state(CameraState::Opening);

        let request = OpenRequest {
            facing: self.params.facing,
            session_type: self.params.session_type,
            video_quality: self.params.video_quality,
            audio: self.params.audio,
            preview: self.surface,
        };
        log::info!(
            "Opening camera #{} ({:?}, {:?})",
            self.op,
            request.facing,
            request.session_type
        );
        let done = Completion::new(self.tx.clone(), self.op, OperationKind::Open);
        self.driver.open(request, done);
    }

    fn open_finished(&mut self, op: u64, result: Result<(), CameraError>) {
        if op != self.op || self.state != CameraState::Opening {
            log::warn!("Ignoring stale open completion #{} ({})", op, self.state);
            return;
        }
        self.in_flight = false;

        match result.and_then(|()| self.driver.capabilities()) {
            Ok(caps) => {
                let options = Arc::new(CameraOptions::from_capabilities(&caps));
                let extra = ExtraProperties::from_capabilities(&caps);
                self.apply_stored_parameters(&options);

                if let Some(size) = self.surface {
                    if let Err(e) = self.driver.attach_preview(size) {
                        log::warn!("Failed to attach preview {}: {}", size, e);
                    }
                }

                self.options = Some(Arc::clone(&options));
                self.set_state(CameraState::Open);
                log::info!("Camera #{} open", op);
                self.relay.publish_opened(options, extra);
            }
            Err(e) => {
                log::error!("Camera open #{} failed: {}", op, e);
                self.driver.discard();
                self.set_state(CameraState::Closed);
                self.relay.emit(CameraEvent::Error(e));
            }
        }

        self.drain_pending();
    }

    fn apply_stored_parameters(&mut self, options: &CameraOptions) {
        for requested in self.params.in_place() {
            let Some(applied) = options.accept(requested) else {
                log::debug!("Open device does not support {:?}, keeping request", requested);
                continue;
            };
            if applied != requested {
                self.params.set(applied);
                self.relay.reconcile(requested, applied);
            }
            if let Err(e) = self.driver.apply(applied) {
                log::warn!("Failed to apply {} on open: {}", applied.name(), e);
            }
        }
    }

    fn begin_close(&mut self, reopen: bool) {
        assert_invariant!(!self.in_flight, SINGLE_HARDWARE_OPERATION, "controller::begin_close");
        if self.recording {
            self.end_recording();
        }

        self.op += 1;
        self.in_flight = true;
        self.reopen_after_close = reopen;
        self.options = None;
        self.set_state(CameraState::Closing);

        log::info!("Closing camera #{}", self.op);
        let done = Completion::new(self.tx.clone(), self.op, OperationKind::Close);
        self.driver.close(done);
    }

    fn close_finished(&mut self, op: u64, result: Result<(), CameraError>) {
        if op != self.op || self.state != CameraState::Closing {
            log::warn!("Ignoring stale close completion #{} ({})", op, self.state);
            return;
        }
        self.in_flight = false;

        if let Err(e) = &result {
            log::warn!("Camera close #{} reported an error: {}", op, e);
        }
        self.set_state(CameraState::Closed);
        log::info!("Camera #{} closed", op);
        self.relay.publish_closed();
        if let Err(e) = result {
            self.relay.emit(CameraEvent::Error(e));
        }

        if std::mem::take(&mut self.reopen_after_close) && !self.shutting_down {
            self.open_when_ready();
        }
        self.drain_pending();
    }

    fn set_state(&mut self, state: CameraState) {
        log::debug!("Camera state {} -> {}", self.state, state);
        self.state = state;
        self.relay.set_state(state);
        assert_invariant!(
            self.options.is_some() == (state == CameraState::Open),
            SNAPSHOT_PRESENT_IFF_OPEN,
            "controller::set_state"
        );
    }

    // Parameters

    fn set_parameter(&mut self, parameter: Parameter) {
        if parameter.requires_restart() {
            if !self.params.set(parameter) {
                return;
            }
            match self.state {
                CameraState::Open | CameraState::Opening => self.submit(Intent::Restart),
                CameraState::Closed | CameraState::Closing => {
                    log::debug!("Stored {:?} for next open", parameter);
                }
            }
            return;
        }

        let Some(options) = self.options.clone() else {
            self.params.set(parameter);
            return;
        };

        // The facade may have cached `parameter` before this device's
        // snapshot reached it, so every outcome is written back.
        let current = self.params.current(parameter);
        let Some(applied) = options.accept(parameter) else {
            log::debug!("Ignoring unsupported {:?}", parameter);
            self.relay.reconcile(parameter, current);
            return;
        };

        if matches!(applied, Parameter::VideoQuality(_)) && self.recording {
            log::warn!("Ignoring video quality change during recording");
            self.relay.reconcile(parameter, current);
            return;
        }

        match self.driver.apply(applied) {
            Ok(()) => {
                self.params.set(applied);
                if applied != parameter {
                    self.relay.reconcile(parameter, applied);
                }
                match applied {
                    Parameter::Zoom(v) => self.relay.emit(CameraEvent::ZoomChanged(v)),
                    Parameter::ExposureCorrection(v) => {
                        self.relay.emit(CameraEvent::ExposureCorrectionChanged(v))
                    }
                    _ => {}
                }
            }
            Err(e) => {
                log::warn!("Failed to apply {}: {}", applied.name(), e);
                self.relay.reconcile(parameter, current);
                self.relay.emit(CameraEvent::Error(e));
            }
        }
    }

    // Preview surface

    fn surface_available(&mut self, size: PreviewSize) {
        log::debug!("Preview surface available: {}", size);
        self.surface = Some(size);
        match self.state {
            CameraState::Open => {
                if let Err(e) = self.driver.attach_preview(size) {
                    log::warn!("Failed to attach preview {}: {}", size, e);
                }
            }
            CameraState::Closed if self.start_deferred && !self.shutting_down => {
                self.open_when_ready();
            }
            _ => {}
        }
    }

    fn surface_destroyed(&mut self) {
        log::debug!("Preview surface destroyed");
        self.surface = None;
        if self.state == CameraState::Open {
            self.driver.detach_preview();
        }
    }

    // Recording

    fn start_recording(&mut self) {
        if self.state != CameraState::Open || self.params.session_type != SessionType::Video {
            self.relay.end_recording();
            self.relay.emit(CameraEvent::Error(CameraError::contract(
                "recording requires an open video session",
            )));
            return;
        }
        if self.recording {
            return;
        }

        match self
            .driver
            .start_recording(self.params.video_quality, self.params.audio)
        {
            Ok(()) => {
                log::info!("Recording started ({:?})", self.params.video_quality);
                self.recording = true;
                self.relay.emit(CameraEvent::RecordingStarted);
            }
            Err(e) => {
                log::error!("Failed to start recording: {}", e);
                self.relay.end_recording();
                self.relay.emit(CameraEvent::Error(e));
            }
        }
    }

    fn stop_recording(&mut self) {
        if self.recording {
            self.end_recording();
        } else {
            self.relay.end_recording();
        }
    }

    fn end_recording(&mut self) {
        if let Err(e) = self.driver.stop_recording() {
            log::warn!("Driver failed to stop recording cleanly: {}", e);
        }
        self.recording = false;
        self.relay.end_recording();
        log::info!("Recording stopped");
        self.relay.emit(CameraEvent::RecordingStopped);
    }
}
