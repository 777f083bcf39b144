//! Control message types for control → tick-thread communication.
//!
//! These messages are sent via lock-free SPSC queue from the control thread
//! to the thread that drives ticks. They carry reconfiguration, period-change
//! notifications and resets without blocking.
//!
//! # Design Philosophy
//!
//! All messages are:
//! - Fixed-size (no heap allocation)
//! - Copy (can be sent across threads)
//! - Validated before they are sent
//!
//! The tick thread drains the control queue at the start of each tick, so
//! every change lands between ticks.

use crate::config::{check_period, AnalyzerConfig};
use crate::error::AnalyzerError;
use crate::invariant_ppt::{
    assert_invariant, CONFIG_REJECTS_INVALID, CONTROL_PREVALIDATED, RING_FIXED_WHILE_RUNNING,
};
use crate::invariant_rt::drain_invariant_signals;
use crate::state::SpikeMetrics;
use rtrb::{Consumer, Producer, RingBuffer};

/// Capacity for control message queue.
pub const CONTROL_QUEUE_CAPACITY: usize = 256;

/// Capacity for the completed-metrics queue.
pub const METRICS_QUEUE_CAPACITY: usize = 256;

/// Creates a new control message queue pair.
///
/// Returns (producer for the control thread, consumer for the tick thread).
pub fn new_control_queue() -> (Producer<ControlMsg>, Consumer<ControlMsg>) {
    RingBuffer::new(CONTROL_QUEUE_CAPACITY)
}

/// Creates a new metrics queue pair.
///
/// Returns (producer for the tick thread, consumer for the control thread).
pub fn new_metrics_queue() -> (Producer<SpikeMetrics>, Consumer<SpikeMetrics>) {
    RingBuffer::new(METRICS_QUEUE_CAPACITY)
}

/// Control messages sent from the control thread to the tick thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlMsg {
    /// Replace the detection parameters. Resets to idle.
    Reconfigure(AnalyzerConfig),

    /// The host changed its sampling period. Resets to idle.
    SetPeriod {
        /// New period in ms
        period_ms: f64,
    },

    /// Clear history and restart at tick 0.
    Reset,
}

impl ControlMsg {
    /// Returns a human-readable description (for debugging).
    pub fn description(&self) -> &'static str {
        match self {
            ControlMsg::Reconfigure(_) => "Reconfigure",
            ControlMsg::SetPeriod { .. } => "SetPeriod",
            ControlMsg::Reset => "Reset",
        }
    }
}

/// Control-thread side of a split analyzer.
///
/// Mirrors the configuration the tick thread will run with, so every message is
/// checked here and the tick thread only ever applies settings that fit its
/// ring. Created together with its [`AnalyzerHandle`](crate::rt::AnalyzerHandle).
pub struct AnalyzerControl {
    control_tx: Producer<ControlMsg>,
    metrics_rx: Consumer<SpikeMetrics>,
    invariant_rx: Consumer<u8>,
    config: AnalyzerConfig,
    period_ms: f64,
    capacity: usize,
}

impl AnalyzerControl {
    pub(crate) fn new(
        control_tx: Producer<ControlMsg>,
        metrics_rx: Consumer<SpikeMetrics>,
        invariant_rx: Consumer<u8>,
        config: AnalyzerConfig,
        period_ms: f64,
        capacity: usize,
    ) -> Self {
        Self {
            control_tx,
            metrics_rx,
            invariant_rx,
            config,
            period_ms,
            capacity,
        }
    }

    /// Validate and queue a control message.
    pub fn send(&mut self, msg: ControlMsg) -> Result<(), AnalyzerError> {
        match msg {
            ControlMsg::Reconfigure(config) => self.check_reconfigure(&config)?,
            ControlMsg::SetPeriod { period_ms } => self.check_period(period_ms)?,
            ControlMsg::Reset => {}
        }
        assert_invariant(
            CONTROL_PREVALIDATED,
            true,
            "control message validated before queueing",
            Some(msg.description()),
        );
        self.control_tx.push(msg).map_err(|_| {
            log::warn!("control queue full, dropping {}", msg.description());
            AnalyzerError::ControlQueueFull
        })?;
        match msg {
            ControlMsg::Reconfigure(config) => self.config = config,
            ControlMsg::SetPeriod { period_ms } => self.period_ms = period_ms,
            ControlMsg::Reset => {}
        }
        log::debug!("queued {}", msg.description());
        Ok(())
    }

    /// Queue a new parameter set.
    pub fn reconfigure(&mut self, config: AnalyzerConfig) -> Result<(), AnalyzerError> {
        self.send(ControlMsg::Reconfigure(config))
    }

    /// Queue a period-change notification.
    pub fn set_period(&mut self, period_ms: f64) -> Result<(), AnalyzerError> {
        self.send(ControlMsg::SetPeriod { period_ms })
    }

    /// Queue a full reset.
    pub fn reset(&mut self) -> Result<(), AnalyzerError> {
        self.send(ControlMsg::Reset)
    }

    fn check_reconfigure(&self, config: &AnalyzerConfig) -> Result<(), AnalyzerError> {
        // Resizing the ring would allocate on the tick thread.
        if config.history_ms != self.config.history_ms {
            assert_invariant(
                RING_FIXED_WHILE_RUNNING,
                true,
                "history change refused on a running handle",
                None,
            );
            log::warn!(
                "refusing history change {} -> {} ms on a running analyzer",
                self.config.history_ms,
                config.history_ms
            );
            return Err(AnalyzerError::invalid(
                "history length is fixed while the analyzer runs",
            ));
        }
        config
            .validate(self.period_ms, self.capacity)
            .map(|_| ())
            .map_err(|e| self.rejected(e))
    }

    fn check_period(&self, period_ms: f64) -> Result<(), AnalyzerError> {
        check_period(period_ms).map_err(|e| self.rejected(e))?;
        self.config
            .validate(period_ms, self.capacity)
            .map(|_| ())
            .map_err(|e| self.rejected(e))
    }

    fn rejected(&self, err: AnalyzerError) -> AnalyzerError {
        assert_invariant(
            CONFIG_REJECTS_INVALID,
            matches!(
                err,
                AnalyzerError::InvalidConfiguration(_) | AnalyzerError::InvalidPeriod(_)
            ),
            "rejected control message carries a configuration error",
            None,
        );
        log::warn!("control message rejected: {}", err);
        err
    }

    /// Collect the metrics of every spike completed since the last drain.
    pub fn drain_metrics(&mut self) -> Vec<SpikeMetrics> {
        let mut spikes = Vec::with_capacity(self.metrics_rx.slots());
        while let Ok(m) = self.metrics_rx.pop() {
            spikes.push(m);
        }
        spikes
    }

    /// Collect the RT invariant signals raised since the last drain.
    pub fn drain_invariant_signals(&mut self) -> Vec<u8> {
        drain_invariant_signals(&mut self.invariant_rx)
    }

    /// Configuration the tick thread runs with once queued messages are applied.
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn period_ms(&self) -> f64 {
        self.period_ms
    }

    /// Ring capacity of the tick-thread analyzer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_msg_is_copy() {
        let msg = ControlMsg::SetPeriod { period_ms: 0.5 };
        let msg2 = msg; // Copy
        assert!(matches!(msg2, ControlMsg::SetPeriod { .. }));
        assert_eq!(msg, msg2);
    }

    #[test]
    fn test_control_queue_roundtrip() {
        let (mut tx, mut rx) = new_control_queue();

        tx.push(ControlMsg::SetPeriod { period_ms: 0.5 }).unwrap();
        tx.push(ControlMsg::Reset).unwrap();

        let msg1 = rx.pop().unwrap();
        let msg2 = rx.pop().unwrap();

        assert!(matches!(msg1, ControlMsg::SetPeriod { period_ms } if (period_ms - 0.5).abs() < 1e-12));
        assert!(matches!(msg2, ControlMsg::Reset));
    }

    #[test]
    fn test_descriptions() {
        assert_eq!(
            ControlMsg::Reconfigure(AnalyzerConfig::default()).description(),
            "Reconfigure"
        );
        assert_eq!(ControlMsg::Reset.description(), "Reset");
    }
}
