//! Camera controller state machine.
//!
//! All lifecycle transitions, parameter applications and driver callbacks run
//! on a single controller thread. Callers enqueue [`Command`]s from any thread;
//! drivers report completion by posting back into the same queue.

pub mod driver;
pub(crate) mod relay;
mod worker;

pub use driver::{CameraDriver, Completion, OpenRequest};

use crate::errors::CameraError;
use crate::types::{Parameter, PreviewSize};
use crossbeam_channel::{Receiver, Sender};
use relay::Relay;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Lifecycle state of the camera device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CameraState {
    Closed,
    Opening,
    Open,
    Closing,
}

impl CameraState {
    /// A hardware open or close is in flight.
    pub fn is_transitioning(&self) -> bool {
        matches!(self, CameraState::Opening | CameraState::Closing)
    }
}

impl fmt::Display for CameraState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CameraState::Closed => "closed",
            CameraState::Opening => "opening",
            CameraState::Open => "open",
            CameraState::Closing => "closing",
        };
        f.write_str(name)
    }
}

/// Messages processed by the controller thread, in arrival order.
pub(crate) enum Command {
    Start,
    Stop,
    Set(Parameter),
    SurfaceAvailable(PreviewSize),
    SurfaceDestroyed,
    StartRecording,
    StopRecording,
    /// Run a closure on the controller thread
    Post(Box<dyn FnOnce() + Send>),
    OpenFinished {
        op: u64,
        result: Result<(), CameraError>,
    },
    CloseFinished {
        op: u64,
        result: Result<(), CameraError>,
    },
    Shutdown,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Start => f.write_str("Start"),
            Command::Stop => f.write_str("Stop"),
            Command::Set(p) => write!(f, "Set({:?})", p),
            Command::SurfaceAvailable(size) => write!(f, "SurfaceAvailable({})", size),
            Command::SurfaceDestroyed => f.write_str("SurfaceDestroyed"),
            Command::StartRecording => f.write_str("StartRecording"),
            Command::StopRecording => f.write_str("StopRecording"),
            Command::Post(_) => f.write_str("Post"),
            Command::OpenFinished { op, result } => {
                write!(f, "OpenFinished(#{}, ok={})", op, result.is_ok())
            }
            Command::CloseFinished { op, result } => {
                write!(f, "CloseFinished(#{}, ok={})", op, result.is_ok())
            }
            Command::Shutdown => f.write_str("Shutdown"),
        }
    }
}

/// Behaviour switches for the controller thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    /// Defer opening until a preview surface is available
    pub require_surface: bool,
    /// Name of the controller thread
    pub thread_name: String,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            require_surface: false,
            thread_name: "crabview-controller".to_string(),
        }
    }
}

/// Owning handle to the controller thread.
pub(crate) struct Controller {
    tx: Sender<Command>,
    thread: Option<JoinHandle<()>>,
}

impl Controller {
    pub(crate) fn spawn(
        driver: Box<dyn CameraDriver>,
        settings: &ControllerSettings,
        relay: Arc<Relay>,
    ) -> Result<Self, CameraError> {
        let (tx, rx): (Sender<Command>, Receiver<Command>) = crossbeam_channel::unbounded();
        let worker = worker::Worker::new(driver, settings.require_surface, relay, tx.clone());

        let thread = std::thread::Builder::new()
            .name(settings.thread_name.clone())
            .spawn(move || worker.run(rx))
            .map_err(|e| CameraError::driver(format!("failed to spawn controller thread: {e}")))?;

        Ok(Self {
            tx,
            thread: Some(thread),
        })
    }

    pub(crate) fn send(&self, command: Command) -> Result<(), CameraError> {
        self.tx.send(command).map_err(|_| CameraError::ControllerShutdown)
    }

    /// Release the device and stop the controller thread.
    ///
    /// Waits at most `join_timeout` for the driver to finish closing. On
    /// timeout the thread is left to finish on its own.
    pub(crate) fn shutdown(&mut self, join_timeout: Duration) -> Result<(), CameraError> {
        let Some(handle) = self.thread.take() else {
            return Ok(());
        };
        if self.tx.send(Command::Shutdown).is_err() {
            log::debug!("Camera controller already stopped, joining");
        }

        let start = Instant::now();
        loop {
            if handle.is_finished() {
                if handle.join().is_err() {
                    log::error!("Camera controller thread panicked");
                }
                return Ok(());
            }
            if start.elapsed() >= join_timeout {
                log::warn!("Camera controller did not shut down within {:?}", join_timeout);
                return Err(CameraError::Timeout("controller shutdown".to_string()));
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }
}
