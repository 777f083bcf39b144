//! RT-safe invariant signaling for the tick path.
//!
//! This module provides a two-tier invariant system:
//! - **Tier 1 (RT-safe)**: Lock-free signaling of invariant IDs from the tick thread
//! - **Tier 2 (Non-RT)**: Verification and contract testing on the control thread
//!
//! # Design Philosophy
//!
//! RT code **signals facts**. Non-RT code **judges correctness**.
//!
//! Unlike traditional `assert_invariant` which uses locks, this system:
//! - Never allocates in the RT path
//! - Never locks in the RT path
//! - Never panics in the RT path
//! - Uses lock-free SPSC queues for cross-thread communication
//!
//! # Example
//!
//! ```ignore
//! // Tick thread signals that a spike window closed
//! signal_invariant(&mut invariant_tx, INV_SPIKE_COMPLETED);
//!
//! // Control thread verifies contracts
//! let signals = drain_invariant_signals(&mut invariant_rx);
//! assert!(signals.contains(&INV_SPIKE_COMPLETED));
//! ```

use rtrb::{Consumer, Producer, RingBuffer};

// ============================================================================
// RT-Safe Invariant IDs (Tier 1)
// ============================================================================
// These are integer IDs, not strings. No allocation, no formatting.

/// A falling sample above threshold opened a spike record.
pub const INV_SPIKE_DETECTED: u8 = 1;

/// A post-peak window closed and metrics were emitted.
pub const INV_SPIKE_COMPLETED: u8 = 2;

/// A threshold crossing during tracking was ignored (no re-trigger).
pub const INV_TRIGGER_IGNORED: u8 = 3;

/// A reconfiguration was applied between ticks.
pub const INV_CONFIG_APPLIED: u8 = 4;

/// A new sampling period was applied between ticks.
pub const INV_PERIOD_APPLIED: u8 = 5;

/// History and state were cleared.
pub const INV_STATE_RESET: u8 = 6;

/// Control message was drained and handled.
pub const INV_CONTROL_MSG_PROCESSED: u8 = 7;

/// Completed metrics could not be queued and were dropped.
pub const INV_METRICS_DROPPED: u8 = 8;

/// A control message failed validation on the tick thread and was not applied.
pub const INV_CONTROL_REJECTED: u8 = 9;

// ============================================================================
// Invariant Signal Queue
// ============================================================================

/// Capacity for invariant signal queue.
/// Signals are sparse (a few per spike), so this covers many spikes between
/// control-thread drains.
pub const INVARIANT_QUEUE_CAPACITY: usize = 256;

/// Creates a new invariant signal queue pair.
///
/// Returns (producer for the tick thread, consumer for the control thread).
pub fn new_invariant_queue() -> (Producer<u8>, Consumer<u8>) {
    RingBuffer::new(INVARIANT_QUEUE_CAPACITY)
}

/// Signals an invariant was checked in the RT path.
///
/// # RT Safety
/// - No allocation
/// - No locking
/// - No panics
/// - If queue is full, signal is dropped (preferable to blocking)
#[inline]
pub fn signal_invariant(tx: &mut Producer<u8>, id: u8) {
    // push() returns Err if full - we drop silently rather than block
    let _ = tx.push(id);
}

// ============================================================================
// Non-RT Verification (Tier 2)
// ============================================================================

/// Drains all pending invariant signals from the queue.
///
/// Call this from the control thread to collect signals for contract verification.
pub fn drain_invariant_signals(rx: &mut Consumer<u8>) -> Vec<u8> {
    let mut signals = Vec::with_capacity(INVARIANT_QUEUE_CAPACITY);
    while let Ok(id) = rx.pop() {
        signals.push(id);
    }
    signals
}

/// Counts occurrences of each invariant ID in a signal list.
pub fn count_invariant_signals(signals: &[u8]) -> [usize; 256] {
    let mut counts = [0usize; 256];
    for &id in signals {
        counts[id as usize] += 1;
    }
    counts
}

/// Contract verification: asserts that required invariants were signaled.
///
/// # Panics
/// Panics if any required invariant was not signaled at least once.
#[cfg(any(test, feature = "ppt"))]
pub fn contract_test_rt(contract_name: &str, signals: &[u8], required: &[u8]) {
    let counts = count_invariant_signals(signals);
    let mut missing = Vec::new();

    for &id in required {
        if counts[id as usize] == 0 {
            missing.push(invariant_name(id));
        }
    }

    if !missing.is_empty() {
        let present: Vec<&str> = signals
            .iter()
            .map(|&id| invariant_name(id))
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();

        panic!(
            "RT Contract '{}' missing invariants: {:?}. Present: {:?}",
            contract_name, missing, present
        );
    }
}

/// Maps invariant ID to human-readable name (for diagnostics only).
pub const fn invariant_name(id: u8) -> &'static str {
    match id {
        INV_SPIKE_DETECTED => "SPIKE_DETECTED",
        INV_SPIKE_COMPLETED => "SPIKE_COMPLETED",
        INV_TRIGGER_IGNORED => "TRIGGER_IGNORED",
        INV_CONFIG_APPLIED => "CONFIG_APPLIED",
        INV_PERIOD_APPLIED => "PERIOD_APPLIED",
        INV_STATE_RESET => "STATE_RESET",
        INV_CONTROL_MSG_PROCESSED => "CONTROL_MSG_PROCESSED",
        INV_METRICS_DROPPED => "METRICS_DROPPED",
        INV_CONTROL_REJECTED => "CONTROL_REJECTED",
        _ => "UNKNOWN",
    }
}

// ============================================================================
// Tests
// ============================================================================
