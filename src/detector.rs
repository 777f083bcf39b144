//! Detector module: the per-tick spike detection state machine.

// IMPORTANT: Do not call assert_invariant or any PPT logging in the tick path to avoid locks/allocs.

use crate::config::{AnalyzerConfig, TickWindows};
use crate::error::AnalyzerError;
use crate::filter::causal_filter;
use crate::locator::locate_mid_voltage;
use crate::ring::SampleRing;
use crate::slope::slope_between;
use crate::state::{SpikeMetrics, SpikeRecord, SpikeState, TickEvent, TickOutputs};

/// Online spike detector and waveform meter.
///
/// Each call to [`execute`](Self::execute) consumes one raw sample: the sample is
/// smoothed, written to the ring at the current tick, and the two-phase state
/// machine advances. Completed spikes show up in the returned [`TickOutputs`].
///
/// # Example
/// ```
/// use spikemeter::config::AnalyzerConfig;
/// use spikemeter::detector::SpikeAnalyzer;
///
/// let config = AnalyzerConfig { threshold: 0.5, window_ms: 10.0, history_ms: 100.0, ..Default::default() };
/// let mut analyzer = SpikeAnalyzer::new(config, 1.0).unwrap();
/// let out = analyzer.execute(0.0);
/// assert!(!out.in_spike);
/// ```
#[derive(Debug, Clone)]
pub struct SpikeAnalyzer {
    config: AnalyzerConfig,
    period_ms: f64,
    windows: TickWindows,
    ring: SampleRing,
    tick: i64,
    state: SpikeState,
    outputs: TickOutputs,
    spikes_completed: u64,
}

impl SpikeAnalyzer {
    /// Validate `config` at `period_ms` and allocate the ring.
    pub fn new(config: AnalyzerConfig, period_ms: f64) -> Result<Self, AnalyzerError> {
        let capacity = config.ring_capacity(period_ms)?;
        let windows = config.validate(period_ms, capacity)?;
        let ring = SampleRing::new(capacity)?;
        log::debug!(
            "spike analyzer ready: period={}ms ring={} window={} half={} slope={} ticks",
            period_ms,
            capacity,
            windows.window,
            windows.half_window,
            windows.slope
        );
        Ok(Self {
            config,
            period_ms,
            windows,
            ring,
            tick: 0,
            state: SpikeState::Idle,
            outputs: TickOutputs::default(),
            spikes_completed: 0,
        })
    }

    /// Process one raw sample.
    pub fn execute(&mut self, raw: f64) -> TickOutputs {
        let tick = self.tick;
        let value = causal_filter(&self.ring, tick, raw, self.config.filter_taps);
        self.ring.write(tick, value);

        self.outputs.filtered = value;
        self.outputs.event = TickEvent::None;
        self.state = match self.state {
            SpikeState::Idle => self.step_idle(tick, value),
            SpikeState::TrackingPostPeak(record) => self.step_tracking(tick, value, record),
        };

        self.tick += 1;
        self.outputs
    }

    fn step_idle(&mut self, tick: i64, value: f64) -> SpikeState {
        if value > self.config.threshold {
            let lookback = self.ring.read(tick - self.config.peak_lookback_ticks as i64);
            // Past the apex: the sample is lower than it was a few ticks ago.
            if value < lookback {
                let record = self.open_record(tick, lookback);
                self.outputs.in_spike = true;
                self.outputs.event = TickEvent::SpikeDetected;
                return SpikeState::TrackingPostPeak(record);
            }
            self.outputs.in_spike = false;
        }
        SpikeState::Idle
    }

    fn open_record(&self, peak_tick: i64, lookback: f64) -> SpikeRecord {
        let half_window = self.windows.half_window;
        let pre_mid_tick = locate_mid_voltage(&self.ring, half_window, peak_tick);
        let depol_slope = slope_between(
            &self.ring,
            pre_mid_tick - self.windows.slope as i64,
            pre_mid_tick,
            self.slope_dt(),
        );
        SpikeRecord {
            peak_tick,
            pre_mid_tick,
            depol_slope,
            duration_ticks: self.ring.distance(pre_mid_tick, peak_tick),
            v_max: lookback,
            v_min: self.config.v_min_seed,
            ticks_since_peak: half_window,
            half_window,
        }
    }

    fn step_tracking(&mut self, tick: i64, value: f64, mut record: SpikeRecord) -> SpikeState {
        if record.ticks_since_peak < self.windows.window {
            record.ticks_since_peak += 1;
            if value < record.v_min {
                record.v_min = value;
            }
            if value > self.config.threshold {
                self.outputs.event = TickEvent::TriggerIgnored;
            }
            self.outputs.in_spike = true;
            return SpikeState::TrackingPostPeak(record);
        }

        let post_mid_tick = locate_mid_voltage(&self.ring, record.half_window, tick);
        // Reads forward of the crossing. A crossing closer than `slope` ticks to the
        // current tick reads a slot from the previous lap.
        let repol_slope = slope_between(
            &self.ring,
            post_mid_tick + self.windows.slope as i64,
            post_mid_tick,
            self.slope_dt(),
        );
        let duration_ticks = record.duration_ticks + self.ring.distance(post_mid_tick, tick);

        self.outputs.last_spike = Some(SpikeMetrics {
            duration_ms: duration_ticks as f64 * self.period_ms,
            depol_slope: record.depol_slope,
            repol_slope,
            amplitude: record.v_max - record.v_min,
            v_min: record.v_min,
            v_max: record.v_max,
            peak_tick: record.peak_tick,
            pre_mid_tick: record.pre_mid_tick,
            post_mid_tick,
            completed_tick: tick,
        });
        self.outputs.in_spike = false;
        self.outputs.event = TickEvent::SpikeCompleted;
        self.spikes_completed += 1;
        SpikeState::Idle
    }

    #[inline]
    fn slope_dt(&self) -> f64 {
        self.windows.slope as f64 * self.period_ms
    }

    fn abandon_spike(&mut self) {
        self.state = SpikeState::Idle;
        self.outputs.in_spike = false;
        self.outputs.event = TickEvent::None;
    }

    /// Replace the configuration between ticks.
    ///
    /// Any spike in progress is discarded. The ring keeps its contents unless
    /// `history_ms` changed, in which case it is reallocated and the run restarts
    /// at tick 0. On error nothing changes.
    pub fn reconfigure(&mut self, config: AnalyzerConfig) -> Result<(), AnalyzerError> {
        let resize = config.history_ms != self.config.history_ms;
        let capacity = if resize {
            config.ring_capacity(self.period_ms)?
        } else {
            self.ring.capacity()
        };
        let windows = config.validate(self.period_ms, capacity)?;
        if resize && capacity != self.ring.capacity() {
            self.ring = SampleRing::new(capacity)?;
            self.tick = 0;
            self.outputs = TickOutputs::default();
        }
        self.config = config;
        self.windows = windows;
        self.abandon_spike();
        Ok(())
    }

    /// Apply a new sampling period; tick windows are recomputed.
    ///
    /// The ring keeps its capacity, so the new windows must still fit it. Any
    /// spike in progress is discarded.
    pub fn set_period(&mut self, period_ms: f64) -> Result<(), AnalyzerError> {
        let windows = self.config.validate(period_ms, self.ring.capacity())?;
        self.period_ms = period_ms;
        self.windows = windows;
        self.abandon_spike();
        Ok(())
    }

    /// Clear the history and start over at tick 0 with the same configuration.
    pub fn reset(&mut self) {
        self.ring.clear();
        self.tick = 0;
        self.state = SpikeState::Idle;
        self.outputs = TickOutputs::default();
        self.spikes_completed = 0;
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn period_ms(&self) -> f64 {
        self.period_ms
    }

    pub fn windows(&self) -> TickWindows {
        self.windows
    }

    pub fn ring(&self) -> &SampleRing {
        &self.ring
    }

    /// Tick the next sample will be written at.
    pub fn tick(&self) -> i64 {
        self.tick
    }

    pub fn state(&self) -> &SpikeState {
        &self.state
    }

    /// Outputs of the last executed tick.
    pub fn outputs(&self) -> &TickOutputs {
        &self.outputs
    }

    pub fn spikes_completed(&self) -> u64 {
        self.spikes_completed
    }
}
