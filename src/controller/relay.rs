//! State shared between the facade and the controller thread.
//!
//! The controller thread is the only writer of the lifecycle state and the
//! snapshot caches, and the only thread that iterates listeners. Callers read
//! through the facade and write the parameter cache when a setter is accepted.

use super::CameraState;
use crate::listener::{CameraEvent, CameraListener, ListenerId};
use crate::options::{CameraOptions, ExtraProperties};
use crate::types::{Parameter, Parameters};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub(crate) struct Relay {
    listeners: Mutex<Vec<(ListenerId, Arc<dyn CameraListener>)>>,
    next_listener: AtomicU64,
    state: RwLock<CameraState>,
    options: RwLock<Option<Arc<CameraOptions>>>,
    extra: RwLock<Option<ExtraProperties>>,
    params: RwLock<Parameters>,
    recording: AtomicBool,
}

impl Relay {
    pub(crate) fn new(params: Parameters) -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(1),
            state: RwLock::new(CameraState::Closed),
            options: RwLock::new(None),
            extra: RwLock::new(None),
            params: RwLock::new(params),
            recording: AtomicBool::new(false),
        }
    }

    pub(crate) fn next_listener_id(&self) -> ListenerId {
        ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn register(&self, id: ListenerId, listener: Arc<dyn CameraListener>) {
        lock(&self.listeners).push((id, listener));
    }

    pub(crate) fn unregister(&self, id: ListenerId) -> bool {
        let mut listeners = lock(&self.listeners);
        let before = listeners.len();
        listeners.retain(|(registered, _)| *registered != id);
        listeners.len() != before
    }

    pub(crate) fn clear_listeners(&self) {
        lock(&self.listeners).clear();
    }

    #[cfg(test)]
    pub(crate) fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    /// Fan a notification out to every registered listener.
    pub(crate) fn emit(&self, event: CameraEvent) {
        let listeners: Vec<Arc<dyn CameraListener>> = lock(&self.listeners)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            let delivered = panic::catch_unwind(AssertUnwindSafe(|| event.deliver(listener.as_ref())));
            if delivered.is_err() {
                log::error!("Camera listener panicked while handling {:?}", event);
            }
        }
    }

    pub(crate) fn publish_opened(&self, options: Arc<CameraOptions>, extra: ExtraProperties) {
        *write(&self.options) = Some(Arc::clone(&options));
        *write(&self.extra) = Some(extra);
        self.emit(CameraEvent::Opened(options));
    }

    pub(crate) fn publish_closed(&self) {
        *write(&self.options) = None;
        *write(&self.extra) = None;
        self.emit(CameraEvent::Closed);
    }

    pub(crate) fn state(&self) -> CameraState {
        *read(&self.state)
    }

    pub(crate) fn set_state(&self, state: CameraState) {
        *write(&self.state) = state;
    }

    pub(crate) fn options(&self) -> Option<Arc<CameraOptions>> {
        read(&self.options).clone()
    }

    pub(crate) fn extra(&self) -> Option<ExtraProperties> {
        *read(&self.extra)
    }

    pub(crate) fn params(&self) -> Parameters {
        *read(&self.params)
    }

    /// Validate and store a setter value.
    ///
    /// Only an `Open` device's snapshot gates the value. In any other state
    /// the raw value is stored for the next open. Returns the value to forward
    /// to the controller, or `None` when the open device does not support it.
    pub(crate) fn accept(&self, parameter: Parameter) -> Option<Parameter> {
        // Holding the options read lock while writing params keeps the check
        // and the store atomic with respect to open/close publication.
        let options = read(&self.options);
        let open = *read(&self.state) == CameraState::Open;
        let accepted = match options.as_ref().filter(|_| open) {
            Some(options) => options.accept(parameter)?,
            None => match parameter {
                Parameter::Zoom(v) | Parameter::ExposureCorrection(v) if v.is_nan() => return None,
                _ => parameter,
            },
        };
        write(&self.params).set(accepted);
        Some(accepted)
    }

    /// Replace a cached request with the value the device actually took,
    /// unless a newer request already overwrote it.
    pub(crate) fn reconcile(&self, requested: Parameter, applied: Parameter) {
        let mut params = write(&self.params);
        let mut scratch = *params;
        if !scratch.set(requested) {
            params.set(applied);
        }
    }

    pub(crate) fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }

    /// Claim the recording slot; false if a recording is already active.
    pub(crate) fn begin_recording(&self) -> bool {
        self.recording
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub(crate) fn end_recording(&self) {
        self.recording.store(false, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
