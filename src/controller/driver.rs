//! The hardware seam.
//!
//! A [`CameraDriver`] is owned by the controller thread and only ever called
//! from it. Open and close are asynchronous: the driver receives a
//! [`Completion`] and fulfils it from whatever thread its platform API calls
//! back on. Fulfilling a completion only posts a message into the controller
//! queue, it never touches controller state directly.

use super::Command;
use crate::errors::CameraError;
use crate::options::DeviceCapabilities;
use crate::types::{Audio, Facing, Parameter, PreviewSize, SessionType, VideoQuality};
use crossbeam_channel::Sender;

/// Everything a driver needs to acquire the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenRequest {
    pub facing: Facing,
    pub session_type: SessionType,
    pub video_quality: VideoQuality,
    pub audio: Audio,
    /// Preview target size, when a surface is already available
    pub preview: Option<PreviewSize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OperationKind {
    Open,
    Close,
}

/// One-shot handle reporting the outcome of an open or close.
///
/// Dropping it unfulfilled reports a driver failure, so a misbehaving driver
/// cannot leave the controller stuck in a transitional state.
pub struct Completion {
    tx: Option<Sender<Command>>,
    op: u64,
    kind: OperationKind,
}

impl Completion {
    pub(crate) fn new(tx: Sender<Command>, op: u64, kind: OperationKind) -> Self {
        Self {
            tx: Some(tx),
            op,
            kind,
        }
    }

    pub fn succeed(self) {
        self.finish(Ok(()))
    }

    pub fn fail(self, error: CameraError) {
        self.finish(Err(error))
    }

    pub fn finish(mut self, result: Result<(), CameraError>) {
        self.send(result);
    }

    fn send(&mut self, result: Result<(), CameraError>) {
        let Some(tx) = self.tx.take() else {
            return;
        };
        let command = match self.kind {
            OperationKind::Open => Command::OpenFinished {
                op: self.op,
                result,
            },
            OperationKind::Close => Command::CloseFinished {
                op: self.op,
                result,
            },
        };
        if tx.send(command).is_err() {
            log::debug!("Controller gone before {:?} #{} completed", self.kind, self.op);
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if self.tx.is_some() {
            log::warn!("Driver dropped {:?} #{} without completing it", self.kind, self.op);
            self.send(Err(CameraError::driver("operation dropped without completion")));
        }
    }
}

/// Polymorphic binding to a concrete camera implementation.
pub trait CameraDriver: Send {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Begin acquiring the device. `done` must be fulfilled exactly once.
    ///
    /// When reporting failure the driver must already have released anything
    /// it acquired.
    fn open(&mut self, request: OpenRequest, done: Completion);

    /// Raw capabilities of the device opened by the last successful `open`.
    fn capabilities(&self) -> Result<DeviceCapabilities, CameraError>;

    /// Apply an in-place setting to the live device.
    fn apply(&mut self, parameter: Parameter) -> Result<(), CameraError>;

    /// Begin releasing the device. `done` must be fulfilled exactly once.
    fn close(&mut self, done: Completion);

    /// Drop whatever a failed open left behind.
    fn discard(&mut self) {}

    fn attach_preview(&mut self, _size: PreviewSize) -> Result<(), CameraError> {
        Ok(())
    }

    fn detach_preview(&mut self) {}

    fn start_recording(&mut self, _quality: VideoQuality, _audio: Audio) -> Result<(), CameraError> {
        Err(CameraError::driver(format!(
            "{} does not support video recording",
            self.name()
        )))
    }

    fn stop_recording(&mut self) -> Result<(), CameraError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_reports_once() {
        let (tx, rx) = crossbeam_channel::unbounded();
        Completion::new(tx, 7, OperationKind::Open).succeed();
        match rx.try_recv() {
            Ok(Command::OpenFinished { op, result }) => {
                assert_eq!(op, 7);
                assert!(result.is_ok());
            }
            _ => panic!("expected OpenFinished"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_completion_reports_failure() {
        let (tx, rx) = crossbeam_channel::unbounded();
        drop(Completion::new(tx, 3, OperationKind::Close));
        match rx.try_recv() {
            Ok(Command::CloseFinished { op, result }) => {
                assert_eq!(op, 3);
                assert!(matches!(result, Err(CameraError::Driver(_))));
            }
            _ => panic!("expected CloseFinished"),
        }
    }
}
