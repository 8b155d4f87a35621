//! Listener registration and notification types.

use crate::errors::CameraError;
use crate::options::CameraOptions;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Observer of camera lifecycle notifications.
///
/// Every method is invoked on the controller thread, in the order the
/// controller emitted the notifications. Implementations must not block.
pub trait CameraListener: Send + Sync {
    fn on_camera_opened(&self, _options: &Arc<CameraOptions>) {}

    fn on_camera_closed(&self) {}

    fn on_camera_error(&self, _error: &CameraError) {}

    fn on_recording_started(&self) {}

    fn on_recording_stopped(&self) {}

    fn on_zoom_changed(&self, _zoom: f32) {}

    fn on_exposure_correction_changed(&self, _exposure_correction: f32) {}
}

/// Owned form of a notification, as delivered to channel subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum CameraEvent {
    Opened(Arc<CameraOptions>),
    Closed,
    Error(CameraError),
    RecordingStarted,
    RecordingStopped,
    ZoomChanged(f32),
    ExposureCorrectionChanged(f32),
}

impl CameraEvent {
    /// Invoke the matching listener method.
    pub fn deliver(&self, listener: &dyn CameraListener) {
        match self {
            CameraEvent::Opened(options) => listener.on_camera_opened(options),
            CameraEvent::Closed => listener.on_camera_closed(),
            CameraEvent::Error(error) => listener.on_camera_error(error),
            CameraEvent::RecordingStarted => listener.on_recording_started(),
            CameraEvent::RecordingStopped => listener.on_recording_stopped(),
            CameraEvent::ZoomChanged(v) => listener.on_zoom_changed(*v),
            CameraEvent::ExposureCorrectionChanged(v) => listener.on_exposure_correction_changed(*v),
        }
    }
}

/// Handle identifying a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

/// Forwards notifications into a tokio channel.
///
/// Callers that need to wait for a notification read the receiver and apply
/// their own timeout; the controller offers none.
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<CameraEvent>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CameraEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: CameraEvent) {
        // A dropped receiver just means nobody is listening anymore.
        let _ = self.tx.send(event);
    }
}

impl CameraListener for ChannelListener {
    fn on_camera_opened(&self, options: &Arc<CameraOptions>) {
        self.forward(CameraEvent::Opened(Arc::clone(options)));
    }

    fn on_camera_closed(&self) {
        self.forward(CameraEvent::Closed);
    }

    fn on_camera_error(&self, error: &CameraError) {
        self.forward(CameraEvent::Error(error.clone()));
    }

    fn on_recording_started(&self) {
        self.forward(CameraEvent::RecordingStarted);
    }

    fn on_recording_stopped(&self) {
        self.forward(CameraEvent::RecordingStopped);
    }

    fn on_zoom_changed(&self, zoom: f32) {
        self.forward(CameraEvent::ZoomChanged(zoom));
    }

    fn on_exposure_correction_changed(&self, exposure_correction: f32) {
        self.forward(CameraEvent::ExposureCorrectionChanged(exposure_correction));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_listener_forwards_in_order() {
        let (listener, mut rx) = ChannelListener::new();
        CameraEvent::Closed.deliver(&listener);
        CameraEvent::ZoomChanged(0.5).deliver(&listener);
        CameraEvent::Error(CameraError::driver("boom")).deliver(&listener);

        assert_eq!(rx.try_recv().unwrap(), CameraEvent::Closed);
        assert_eq!(rx.try_recv().unwrap(), CameraEvent::ZoomChanged(0.5));
        assert_eq!(
            rx.try_recv().unwrap(),
            CameraEvent::Error(CameraError::driver("boom"))
        );
    }

    #[test]
    fn test_channel_listener_survives_dropped_receiver() {
        let (listener, rx) = ChannelListener::new();
        drop(rx);
        listener.on_camera_closed();
    }
}
