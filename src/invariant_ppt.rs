//! PPT invariants for the configuration and control paths.
//!
//! Builders, the control endpoint and the host driver assert these while they
//! validate parameters. With the `ppt` feature every passing assertion is
//! recorded so contract tests can check that a path actually guarded itself.
//! The tick path never touches this module; it reports through
//! [`crate::invariant_rt`] instead.

#[cfg(feature = "ppt")]
use lazy_static::lazy_static;
#[cfg(feature = "ppt")]
use std::collections::BTreeSet;
#[cfg(feature = "ppt")]
use std::sync::Mutex;

pub const CONFIG_VALIDATED: u32 = 1;
pub const CONFIG_REJECTS_INVALID: u32 = 2;
pub const RING_COVERS_WINDOWS: u32 = 3;
pub const CONTROL_PREVALIDATED: u32 = 4;
pub const RING_FIXED_WHILE_RUNNING: u32 = 5;
pub const HOST_PERIOD_APPLIED: u32 = 6;

/// Short name used in failure messages.
pub fn invariant_name(id: u32) -> &'static str {
    match id {
        CONFIG_VALIDATED => "config-validated",
        CONFIG_REJECTS_INVALID => "config-rejects-invalid",
        RING_COVERS_WINDOWS => "ring-covers-windows",
        CONTROL_PREVALIDATED => "control-prevalidated",
        RING_FIXED_WHILE_RUNNING => "ring-fixed-while-running",
        HOST_PERIOD_APPLIED => "host-period-applied",
        _ => "unnamed",
    }
}

fn failure_message(id: u32, message: &str, context: Option<&str>) -> String {
    match context {
        Some(ctx) => format!(
            "invariant {} ({}) violated: {} [{}]",
            id,
            invariant_name(id),
            message,
            ctx
        ),
        None => format!(
            "invariant {} ({}) violated: {}",
            id,
            invariant_name(id),
            message
        ),
    }
}

#[cfg(feature = "ppt")]
lazy_static! {
    static ref RECORDED: Mutex<BTreeSet<u32>> = Mutex::new(BTreeSet::new());
}

#[cfg(feature = "ppt")]
fn recorded() -> std::sync::MutexGuard<'static, BTreeSet<u32>> {
    // A failed assertion panics while no guard is held, so poisoning only
    // comes from a panicking test thread and the set is still consistent.
    RECORDED
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Check `condition`; on failure log and panic, otherwise record `id`.
#[cfg(feature = "ppt")]
pub(crate) fn assert_invariant(id: u32, condition: bool, message: &str, context: Option<&str>) {
    if !condition {
        let msg = failure_message(id, message, context);
        log::error!("{}", msg);
        panic!("{}", msg);
    }
    recorded().insert(id);
}

#[cfg(not(feature = "ppt"))]
pub(crate) fn assert_invariant(id: u32, condition: bool, message: &str, context: Option<&str>) {
    if !condition {
        panic!("{}", failure_message(id, message, context));
    }
}

/// Invariants recorded since the last clear, in ascending order.
#[cfg(feature = "ppt")]
pub fn recorded_invariants() -> Vec<u32> {
    recorded().iter().copied().collect()
}

#[cfg(not(feature = "ppt"))]
pub fn recorded_invariants() -> Vec<u32> {
    Vec::new()
}

/// Panic unless every invariant in `required` has been recorded.
#[cfg(feature = "ppt")]
pub fn contract_test(test_name: &str, required: &[u32]) {
    let missing: Vec<String> = {
        let log = recorded();
        required
            .iter()
            .filter(|id| !log.contains(id))
            .map(|&id| format!("{} ({})", id, invariant_name(id)))
            .collect()
    };
    if !missing.is_empty() {
        panic!(
            "contract '{}' not enforced; missing invariants: {}",
            test_name,
            missing.join(", ")
        );
    }
}

#[cfg(not(feature = "ppt"))]
pub fn contract_test(_test_name: &str, _required: &[u32]) {}

#[cfg(feature = "ppt")]
pub fn clear_invariant_log() {
    recorded().clear();
}

#[cfg(not(feature = "ppt"))]
pub fn clear_invariant_log() {}
