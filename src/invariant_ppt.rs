//! Runtime invariant checks with a contract-test registry.
//!
//! The controller asserts its state-machine invariants on every transition.
//! Each check is counted in a process-wide registry (the checks run on the
//! controller thread, not on the test thread), so tests can prove that an
//! invariant was actually exercised and not merely never violated.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crabview::invariant_ppt::*;
//!
//! assert_invariant!(
//!     options.is_some() == (state == CameraState::Open),
//!     SNAPSHOT_PRESENT_IFF_OPEN,
//!     "controller::set_state"
//! );
//!
//! #[test]
//! fn contract_controller_lifecycle() {
//!     // ... drive a camera through open/close ...
//!     contract_test("controller lifecycle", &[SNAPSHOT_PRESENT_IFF_OPEN]);
//! }
//! ```

use std::collections::HashMap;
use std::sync::Mutex;

/// The capability snapshot exists exactly while the device is open.
pub const SNAPSHOT_PRESENT_IFF_OPEN: &str = "Capability snapshot is present iff the camera is open";

/// The controller never starts a hardware operation while another is pending.
pub const SINGLE_HARDWARE_OPERATION: &str = "At most one hardware open or close is in flight";

lazy_static::lazy_static! {
    static ref INVARIANT_LOG: Mutex<HashMap<&'static str, u64>> = Mutex::new(HashMap::new());
}

/// Assert an invariant and record that it was checked.
///
/// # Arguments
/// * `condition` - The invariant condition (must be true)
/// * `message` - Static description of the invariant
/// * `context` - Optional context (module/function name)
///
/// # Panics
/// Panics if the condition is false.
#[macro_export]
macro_rules! assert_invariant {
    ($condition:expr, $message:expr) => {
        $crate::invariant_ppt::__assert_invariant_impl($condition, $message, None)
    };
    ($condition:expr, $message:expr, $context:expr) => {
        $crate::invariant_ppt::__assert_invariant_impl($condition, $message, Some($context))
    };
}

#[doc(hidden)]
pub fn __assert_invariant_impl(condition: bool, message: &'static str, context: Option<&str>) {
    {
        let mut log = INVARIANT_LOG
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *log.entry(message).or_insert(0) += 1;
    }

    if !condition {
        let ctx = context.unwrap_or("unknown");
        log::error!("Invariant violated [{}]: {}", ctx, message);
        panic!("INVARIANT VIOLATION [{}]: {}", ctx, message);
    }
}

/// How many times an invariant has been checked in this process.
pub fn invariant_check_count(message: &str) -> u64 {
    INVARIANT_LOG
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .get(message)
        .copied()
        .unwrap_or(0)
}

/// Check that specific invariants were verified at least once.
///
/// # Panics
/// Panics if any required invariant was never checked.
pub fn contract_test(test_name: &str, required_invariants: &[&str]) {
    let missing: Vec<&str> = required_invariants
        .iter()
        .copied()
        .filter(|invariant| invariant_check_count(invariant) == 0)
        .collect();

    if !missing.is_empty() {
        panic!(
            "CONTRACT FAILURE [{}]: The following invariants were not checked:\n  - {}",
            test_name,
            missing.join("\n  - ")
        );
    }
}
