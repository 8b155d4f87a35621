//! Shared helpers for controller integration tests

#![allow(dead_code)]

use crabview::testing::{SyntheticDriver, SyntheticHandle};
use crabview::{Camera, CameraEvent, CameraOptions, CameraState, ControllerSettings, Parameters};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

/// Upper bound for any single notification to arrive
pub const WAIT: Duration = Duration::from_secs(5);

/// How long to watch for notifications that must not arrive
pub const QUIET: Duration = Duration::from_millis(150);

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub struct Harness {
    pub camera: Camera,
    pub driver: SyntheticHandle,
    pub events: UnboundedReceiver<CameraEvent>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(Parameters::default(), ControllerSettings::default())
    }

    pub fn with_settings(initial: Parameters, settings: ControllerSettings) -> Self {
        init_logging();
        let driver = SyntheticDriver::new();
        let handle = driver.handle();
        let camera = Camera::with_settings(Box::new(driver), initial, settings)
            .expect("controller should spawn");
        let events = camera.subscribe();
        Self {
            camera,
            driver: handle,
            events,
        }
    }

    pub async fn next(&mut self) -> CameraEvent {
        timeout(WAIT, self.events.recv())
            .await
            .expect("timed out waiting for a camera notification")
            .expect("notification stream closed")
    }

    pub async fn expect_opened(&mut self) -> Arc<CameraOptions> {
        match self.next().await {
            CameraEvent::Opened(options) => options,
            other => panic!("expected Opened, got {:?}", other),
        }
    }

    pub async fn expect_closed(&mut self) {
        match self.next().await {
            CameraEvent::Closed => {}
            other => panic!("expected Closed, got {:?}", other),
        }
    }

    /// Assert that no notification arrives for a while.
    pub async fn expect_quiet(&mut self) {
        if let Ok(Some(event)) = timeout(QUIET, self.events.recv()).await {
            panic!("unexpected notification {:?}", event);
        }
    }

    pub async fn open(&mut self) -> Arc<CameraOptions> {
        self.camera.start();
        self.expect_opened().await
    }

    /// Poll until the controller reports `state`.
    pub async fn wait_for_state(&self, state: CameraState) {
        let deadline = Instant::now() + WAIT;
        while self.camera.state() != state {
            assert!(Instant::now() < deadline, "camera never reached {:?}", state);
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    /// Every in-place getter agrees with the last value the driver applied.
    pub fn assert_getters_match_driver(&self) {
        let applied = self.driver.probe().applied;
        for current in self.camera.parameters().in_place() {
            let last = applied.iter().rev().find(|p| p.name() == current.name());
            assert_eq!(
                last,
                Some(&current),
                "{} getter disagrees with the driver",
                current.name()
            );
        }
    }
}
