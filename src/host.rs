//! Host-facing capabilities and a synchronous tick driver.
//!
//! A host supplies the sampling period and consumes finished spikes. Both are
//! expressed as traits so the analyzer never depends on a host type.

use crate::detector::SpikeAnalyzer;
use crate::error::AnalyzerError;
use crate::invariant_ppt::{assert_invariant, HOST_PERIOD_APPLIED};
use crate::state::{SpikeMetrics, TickOutputs};

/// Supplies the current sampling period.
pub trait PeriodSource {
    /// Period in ms. Polled once per tick.
    fn current_period_ms(&self) -> f64;
}

/// Receives the metrics of every completed spike.
pub trait MetricsSink {
    fn report_metrics(&mut self, metrics: &SpikeMetrics);
}

/// A fixed period.
impl PeriodSource for f64 {
    fn current_period_ms(&self) -> f64 {
        *self
    }
}

impl<P: PeriodSource + ?Sized> PeriodSource for &P {
    fn current_period_ms(&self) -> f64 {
        (**self).current_period_ms()
    }
}

/// Collects every spike.
impl MetricsSink for Vec<SpikeMetrics> {
    fn report_metrics(&mut self, metrics: &SpikeMetrics) {
        self.push(*metrics);
    }
}

impl<S: MetricsSink + ?Sized> MetricsSink for &mut S {
    fn report_metrics(&mut self, metrics: &SpikeMetrics) {
        (**self).report_metrics(metrics)
    }
}

/// Drives an analyzer from a host on a single thread.
///
/// Each tick polls the period source; a changed period is applied before the
/// sample is processed, which resets detection to idle. Completed spikes go
/// to the sink.
pub struct TickDriver<P, S> {
    analyzer: SpikeAnalyzer,
    period: P,
    sink: S,
}

impl<P: PeriodSource, S: MetricsSink> TickDriver<P, S> {
    /// Wrap an analyzer, aligning it with the host's current period.
    pub fn new(mut analyzer: SpikeAnalyzer, period: P, sink: S) -> Result<Self, AnalyzerError> {
        let host_period = period.current_period_ms();
        if host_period != analyzer.period_ms() {
            analyzer.set_period(host_period)?;
        }
        Ok(Self {
            analyzer,
            period,
            sink,
        })
    }

    /// Process one raw sample.
    ///
    /// # Errors
    /// Returns an error, without processing the sample, if the host reports a
    /// period the analyzer cannot run at. The previous period stays in force.
    pub fn tick(&mut self, raw: f64) -> Result<TickOutputs, AnalyzerError> {
        self.sync_period()?;
        let out = self.analyzer.execute(raw);
        if let Some(metrics) = out.completed() {
            log::debug!(
                "spike at tick {}: duration={:.3}ms amplitude={:.3}",
                metrics.peak_tick,
                metrics.duration_ms,
                metrics.amplitude
            );
            self.sink.report_metrics(metrics);
        }
        Ok(out)
    }

    /// Feed a whole slice, stopping at the first period error.
    pub fn run(&mut self, samples: &[f64]) -> Result<(), AnalyzerError> {
        for &raw in samples {
            self.tick(raw)?;
        }
        Ok(())
    }

    fn sync_period(&mut self) -> Result<(), AnalyzerError> {
        let host_period = self.period.current_period_ms();
        if host_period == self.analyzer.period_ms() {
            return Ok(());
        }
        let previous = self.analyzer.period_ms();
        if let Err(e) = self.analyzer.set_period(host_period) {
            log::warn!("host period {} ms rejected: {}", host_period, e);
            return Err(e);
        }
        assert_invariant(
            HOST_PERIOD_APPLIED,
            self.analyzer.period_ms() == host_period && self.analyzer.state().is_idle(),
            "host period applied and detection reset",
            None,
        );
        log::info!(
            "sampling period changed {} -> {} ms, windows now {:?}",
            previous,
            host_period,
            self.analyzer.windows()
        );
        Ok(())
    }

    pub fn analyzer(&self) -> &SpikeAnalyzer {
        &self.analyzer
    }

    pub fn period(&self) -> &P {
        &self.period
    }

    pub fn period_mut(&mut self) -> &mut P {
        &mut self.period
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Give back the analyzer and the sink.
    pub fn into_parts(self) -> (SpikeAnalyzer, S) {
        (self.analyzer, self.sink)
    }
}
