//! Detection state and per-tick outputs.

// IMPORTANT: Everything here is touched on the tick path. No allocation, no logging.

/// Per-spike bookkeeping, alive only while the post-peak window is tracked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpikeRecord {
    /// Tick at which the peak test fired.
    pub peak_tick: i64,
    /// Mid-voltage crossing found before the peak.
    pub pre_mid_tick: i64,
    /// Slope across the rising crossing.
    pub depol_slope: f64,
    /// Ticks from the rising crossing to the peak; the falling part is added at the end.
    pub duration_ticks: usize,
    /// Sample `peak_lookback_ticks` before the peak tick.
    pub v_max: f64,
    /// Running minimum since the peak.
    pub v_min: f64,
    /// Counter that starts at `half_window` and ends at the full window.
    pub ticks_since_peak: usize,
    /// Locator window captured when the spike was detected.
    pub half_window: usize,
}

/// Two-phase detection state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SpikeState {
    /// Waiting for the next peak.
    #[default]
    Idle,
    /// Past a peak, tracking the minimum and the falling crossing.
    TrackingPostPeak(SpikeRecord),
}

impl SpikeState {
    /// In-progress record, if any.
    pub fn record(&self) -> Option<&SpikeRecord> {
        match self {
            SpikeState::Idle => None,
            SpikeState::TrackingPostPeak(record) => Some(record),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, SpikeState::Idle)
    }
}

/// Metrics of one completed spike.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpikeMetrics {
    /// Mid-crossing to mid-crossing duration, ms.
    pub duration_ms: f64,
    /// Depolarization slope (input units per ms, positive on the upstroke).
    pub depol_slope: f64,
    /// Repolarization slope (input units per ms).
    pub repol_slope: f64,
    /// `v_max - v_min`.
    pub amplitude: f64,
    /// Minimum filtered value inside the post-peak window.
    pub v_min: f64,
    /// Value captured at detection as the spike maximum.
    pub v_max: f64,
    /// Tick at which the peak test fired.
    pub peak_tick: i64,
    /// Rising mid-voltage crossing.
    pub pre_mid_tick: i64,
    /// Falling mid-voltage crossing.
    pub post_mid_tick: i64,
    /// Tick at which the metrics were finalized.
    pub completed_tick: i64,
}

/// What happened on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickEvent {
    #[default]
    None,
    /// Idle -> TrackingPostPeak.
    SpikeDetected,
    /// TrackingPostPeak -> Idle; metrics were emitted.
    SpikeCompleted,
    /// A sample crossed the threshold while a spike was still being tracked.
    TriggerIgnored,
}

/// Outputs of one tick.
///
/// `filtered` and `in_spike` are refreshed every tick. `last_spike` holds the
/// metrics of the most recent completed spike until the next one completes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickOutputs {
    pub filtered: f64,
    pub in_spike: bool,
    pub event: TickEvent,
    pub last_spike: Option<SpikeMetrics>,
}

impl TickOutputs {
    /// Metrics emitted on this very tick.
    pub fn completed(&self) -> Option<&SpikeMetrics> {
        match self.event {
            TickEvent::SpikeCompleted => self.last_spike.as_ref(),
            _ => None,
        }
    }

    /// Numeric view of the in-spike indicator, `1.0` or `0.0`.
    pub fn in_spike_level(&self) -> f64 {
        if self.in_spike {
            1.0
        } else {
            0.0
        }
    }
}
