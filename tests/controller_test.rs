//! Lifecycle tests for the camera controller, driven through the synthetic driver.

mod common;

use common::Harness;
use crabview::invariant_ppt::{
    contract_test, SINGLE_HARDWARE_OPERATION, SNAPSHOT_PRESENT_IFF_OPEN,
};
use crabview::{
    CameraError, CameraEvent, CameraListener, CameraOptions, CameraState, ControllerSettings,
    Facing, Flash, Parameter, Parameters, PreviewSize, SessionType, WhiteBalance,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_open_then_close() {
    let mut h = Harness::new();
    assert_eq!(h.camera.state(), CameraState::Closed);
    assert!(h.camera.camera_options().is_none());

    let options = h.open().await;
    assert!(h.camera.is_camera_available());
    assert_eq!(h.camera.state(), CameraState::Open);
    assert_eq!(h.camera.camera_options(), Some(options));
    assert!(h.camera.extra_properties().is_some());

    h.camera.stop();
    h.expect_closed().await;
    assert!(!h.camera.is_camera_available());
    assert_eq!(h.camera.state(), CameraState::Closed);
    assert!(h.camera.camera_options().is_none());
    assert!(h.camera.extra_properties().is_none());
}

#[tokio::test]
async fn test_open_twice_notifies_once() {
    let mut h = Harness::new();
    h.camera.start();
    h.camera.start();
    h.expect_opened().await;
    h.expect_quiet().await;

    h.camera.start();
    h.expect_quiet().await;
    assert_eq!(h.driver.probe().opens, 1);
}

#[tokio::test]
async fn test_close_twice_notifies_once() {
    let mut h = Harness::new();
    h.open().await;

    h.camera.stop();
    h.camera.stop();
    h.expect_closed().await;
    h.expect_quiet().await;
    assert_eq!(h.driver.probe().closes, 1);
}

#[tokio::test]
async fn test_stop_while_closed_is_ignored() {
    let mut h = Harness::new();
    h.camera.stop();
    h.expect_quiet().await;
    assert_eq!(h.driver.probe().closes, 0);
}

#[tokio::test]
async fn test_concurrent_calls() {
    let mut h = Harness::new();
    h.camera.start();
    h.camera.stop();
    h.camera.start();
    h.camera.stop();

    h.expect_opened().await;
    h.expect_closed().await;
    h.expect_opened().await;
    h.expect_closed().await;
    h.expect_quiet().await;

    assert_eq!(h.camera.state(), CameraState::Closed);
    assert!(!h.driver.probe().overlapping_operations);
}

#[tokio::test]
async fn test_stop_while_opening_completes_open_first() {
    let mut h = Harness::new();
    h.driver.set_latency(Duration::from_millis(50));
    h.camera.start();
    h.camera.stop();

    h.expect_opened().await;
    h.expect_closed().await;
    h.expect_quiet().await;
    assert!(h.camera.camera_options().is_none());
    assert_eq!(h.driver.open_device(), None);
}

#[tokio::test]
async fn test_facing_change_restarts() {
    let mut h = Harness::new();
    let back = h.open().await;
    assert!(back.is_zoom_supported());

    h.camera.set_facing(Facing::Front);
    assert_eq!(h.camera.facing(), Facing::Front);

    h.expect_closed().await;
    let front = h.expect_opened().await;
    assert!(!front.is_zoom_supported());
    assert_eq!(h.camera.camera_options(), Some(front));

    let probe = h.driver.probe();
    assert_eq!(probe.opens, 2);
    assert_eq!(probe.last_request.map(|r| r.facing), Some(Facing::Front));
    assert_eq!(h.driver.open_device(), Some(Facing::Front));
    h.assert_getters_match_driver();
}

#[tokio::test]
async fn test_session_type_change_restarts() {
    let mut h = Harness::new();
    h.open().await;

    h.camera.set_session_type(SessionType::Video);
    assert_eq!(h.camera.session_type(), SessionType::Video);
    h.expect_closed().await;
    h.expect_opened().await;

    let request = h.driver.probe().last_request.expect("open request recorded");
    assert_eq!(request.session_type, SessionType::Video);
    h.assert_getters_match_driver();
}

#[tokio::test]
async fn test_restart_reapplies_current_values() {
    let mut h = Harness::new();
    h.open().await;
    h.camera.set_flash(Flash::Torch);
    h.camera.set_white_balance(WhiteBalance::Cloudy);
    h.camera.set_exposure_correction(1.0);
    h.camera.set_zoom(0.5);
    assert!(matches!(h.next().await, CameraEvent::ExposureCorrectionChanged(v) if v == 1.0));
    assert!(matches!(h.next().await, CameraEvent::ZoomChanged(v) if v == 0.5));
    let before = h.driver.probe().applied.len();

    h.camera.set_session_type(SessionType::Video);
    h.expect_closed().await;
    h.expect_opened().await;

    let probe = h.driver.probe();
    assert_eq!(probe.applied.len(), before + h.camera.parameters().in_place().len());
    assert!(probe.applied[before..].contains(&Parameter::Flash(Flash::Torch)));
    h.assert_getters_match_driver();
}

#[tokio::test]
async fn test_unchanged_facing_does_not_restart() {
    let mut h = Harness::new();
    h.open().await;
    h.camera.set_facing(Facing::Back);
    h.expect_quiet().await;
    assert_eq!(h.driver.probe().opens, 1);
}

#[tokio::test]
async fn test_restart_requests_coalesce() {
    let mut h = Harness::new();
    h.open().await;

    h.camera.set_facing(Facing::Front);
    h.camera.set_session_type(SessionType::Video);
    h.camera.set_facing(Facing::Back);

    h.expect_closed().await;
    h.expect_opened().await;
    h.expect_quiet().await;

    let request = h.driver.probe().last_request.expect("open request recorded");
    assert_eq!(request.facing, Facing::Back);
    assert_eq!(request.session_type, SessionType::Video);
    assert_eq!(h.driver.probe().opens, 2);
    h.assert_getters_match_driver();
}

#[tokio::test]
async fn test_facing_change_while_closed_applies_on_next_open() {
    let mut h = Harness::new();
    h.camera.set_facing(Facing::Front);
    h.expect_quiet().await;

    let options = h.open().await;
    assert!(!options.supports_flash(crabview::Flash::On));
    assert_eq!(h.driver.open_device(), Some(Facing::Front));
}

#[tokio::test]
async fn test_stop_cancels_pending_restart() {
    let mut h = Harness::new();
    h.open().await;
    h.driver.set_latency(Duration::from_millis(50));

    h.camera.set_facing(Facing::Front);
    h.camera.stop();

    h.expect_closed().await;
    h.expect_quiet().await;
    assert_eq!(h.camera.state(), CameraState::Closed);
    assert_eq!(h.driver.probe().opens, 1);

    // The new facing is still used by the next open.
    h.open().await;
    assert_eq!(h.driver.open_device(), Some(Facing::Front));
}

#[tokio::test]
async fn test_open_failure_reports_error() {
    let mut h = Harness::new();
    h.driver
        .fail_next_open(CameraError::PermissionDenied("camera access revoked".to_string()));
    h.camera.start();

    match h.next().await {
        CameraEvent::Error(e) => {
            assert!(e.is_open_failure());
            assert!(matches!(e, CameraError::PermissionDenied(_)));
        }
        other => panic!("expected Error, got {:?}", other),
    }
    h.expect_quiet().await;
    assert_eq!(h.camera.state(), CameraState::Closed);
    assert!(h.camera.camera_options().is_none());
    assert_eq!(h.driver.probe().discards, 1);

    // A later start succeeds.
    h.open().await;
    assert!(h.camera.is_camera_available());
}

#[tokio::test]
async fn test_open_failure_with_queued_start() {
    let mut h = Harness::new();
    h.driver.set_latency(Duration::from_millis(30));
    h.driver.fail_next_open(CameraError::DeviceBusy("in use".to_string()));
    h.camera.start();
    h.camera.stop();
    h.camera.start();

    assert!(matches!(h.next().await, CameraEvent::Error(CameraError::DeviceBusy(_))));
    h.expect_opened().await;
    h.expect_quiet().await;
    assert_eq!(h.driver.probe().opens, 2);
}

#[tokio::test]
async fn test_close_failure_still_closes() {
    let mut h = Harness::new();
    h.open().await;
    h.driver.fail_next_close(CameraError::driver("flush failed"));
    h.camera.stop();

    h.expect_closed().await;
    assert!(matches!(h.next().await, CameraEvent::Error(CameraError::Driver(_))));
    assert_eq!(h.camera.state(), CameraState::Closed);
}

#[tokio::test]
async fn test_start_waits_for_surface() {
    let settings = ControllerSettings {
        require_surface: true,
        ..ControllerSettings::default()
    };
    let mut h = Harness::with_settings(Parameters::default(), settings);

    h.camera.start();
    h.expect_quiet().await;
    assert_eq!(h.camera.state(), CameraState::Closed);
    assert_eq!(h.driver.probe().opens, 0);

    let size = PreviewSize::new(1280, 720);
    h.camera.on_surface_available(size);
    h.expect_opened().await;

    let probe = h.driver.probe();
    assert_eq!(probe.last_request.and_then(|r| r.preview), Some(size));
    assert_eq!(probe.previews_attached, vec![size]);
}

#[tokio::test]
async fn test_stop_drops_deferred_start() {
    let settings = ControllerSettings {
        require_surface: true,
        ..ControllerSettings::default()
    };
    let mut h = Harness::with_settings(Parameters::default(), settings);

    h.camera.start();
    h.camera.stop();
    h.camera.on_surface_available(PreviewSize::new(640, 480));
    h.expect_quiet().await;
    assert_eq!(h.driver.probe().opens, 0);
}

#[tokio::test]
async fn test_surface_destroyed_keeps_session_open() {
    let mut h = Harness::new();
    h.camera.on_surface_available(PreviewSize::new(640, 480));
    h.open().await;

    h.camera.on_surface_destroyed();
    h.expect_quiet().await;
    assert_eq!(h.camera.state(), CameraState::Open);
    assert_eq!(h.driver.probe().preview_detaches, 1);

    let replacement = PreviewSize::new(1920, 1080);
    h.camera.on_surface_available(replacement);
    h.camera.stop();
    h.expect_closed().await;
    assert_eq!(h.driver.probe().previews_attached.last(), Some(&replacement));
}

struct CountingListener {
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl CameraListener for CountingListener {
    fn on_camera_opened(&self, _options: &Arc<CameraOptions>) {
        self.opened.fetch_add(1, Ordering::SeqCst);
    }

    fn on_camera_closed(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_removed_listener_stops_receiving() {
    let mut h = Harness::new();
    let counter = Arc::new(CountingListener {
        opened: AtomicUsize::new(0),
        closed: AtomicUsize::new(0),
    });
    let id = h.camera.add_listener(counter.clone());

    h.open().await;
    h.camera.remove_listener(id);
    h.camera.stop();
    h.expect_closed().await;

    // Notifications are fanned out in order, so the opened delivery to the
    // counter finished before the removal ran.
    assert_eq!(counter.opened.load(Ordering::SeqCst), 1);
    assert_eq!(counter.closed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_clear_listeners() {
    let mut h = Harness::new();
    let counter = Arc::new(CountingListener {
        opened: AtomicUsize::new(0),
        closed: AtomicUsize::new(0),
    });
    h.camera.add_listener(counter.clone());
    h.camera.clear_listeners();

    // Re-subscribe after clearing, the old subscription is gone too.
    let mut events = h.camera.subscribe();
    h.camera.start();
    let event = tokio::time::timeout(common::WAIT, events.recv())
        .await
        .expect("timed out")
        .expect("stream closed");
    assert!(matches!(event, CameraEvent::Opened(_)));
    assert_eq!(counter.opened.load(Ordering::SeqCst), 0);
}

struct PanickingListener;

impl CameraListener for PanickingListener {
    fn on_camera_opened(&self, _options: &Arc<CameraOptions>) {
        panic!("listener failure");
    }
}

#[tokio::test]
async fn test_panicking_listener_does_not_stop_controller() {
    let mut h = Harness::new();
    h.camera.add_listener(Arc::new(PanickingListener));

    h.open().await;
    h.camera.stop();
    h.expect_closed().await;
}

#[tokio::test]
async fn test_destroy_releases_device() {
    let mut h = Harness::new();
    h.open().await;

    let driver = h.driver.clone();
    h.camera
        .destroy(Duration::from_secs(2))
        .expect("controller should stop in time");
    assert_eq!(driver.open_device(), None);
    assert_eq!(driver.probe().closes, 1);
}

#[tokio::test]
async fn test_destroy_while_opening() {
    let mut h = Harness::new();
    h.driver.set_latency(Duration::from_millis(50));
    h.camera.start();

    let driver = h.driver.clone();
    h.camera
        .destroy(Duration::from_secs(2))
        .expect("controller should stop in time");
    assert_eq!(driver.open_device(), None);
    assert_eq!(driver.probe().opens, 1);
    assert_eq!(driver.probe().closes, 1);
}

#[tokio::test]
async fn contract_controller_lifecycle() {
    let mut h = Harness::new();
    h.open().await;
    h.camera.set_facing(Facing::Front);
    h.expect_closed().await;
    h.expect_opened().await;
    h.camera.stop();
    h.expect_closed().await;

    contract_test(
        "controller lifecycle",
        &[SNAPSHOT_PRESENT_IFF_OPEN, SINGLE_HARDWARE_OPERATION],
    );
}
