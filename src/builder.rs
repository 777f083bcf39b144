//! Builder API for analyzers.

use crate::config::AnalyzerConfig;
use crate::control::AnalyzerControl;
use crate::detector::SpikeAnalyzer;
use crate::error::AnalyzerError;
use crate::invariant_ppt::{
    assert_invariant, CONFIG_REJECTS_INVALID, CONFIG_VALIDATED, RING_COVERS_WINDOWS,
};
use crate::rt::AnalyzerHandle;

/// Fluent construction of a [`SpikeAnalyzer`].
///
/// ```
/// use spikemeter::builder::AnalyzerBuilder;
///
/// let analyzer = AnalyzerBuilder::new(1.0)
///     .threshold(0.5)
///     .window_ms(10.0)
///     .history_ms(100.0)
///     .build()
///     .unwrap();
/// assert_eq!(analyzer.windows().half_window, 5);
/// ```
#[derive(Debug, Clone)]
pub struct AnalyzerBuilder {
    config: AnalyzerConfig,
    period_ms: f64,
}

impl AnalyzerBuilder {
    /// Start from the default configuration at `period_ms`.
    pub fn new(period_ms: f64) -> Self {
        Self::from_config(AnalyzerConfig::default(), period_ms)
    }

    /// Start from an existing configuration, e.g. one loaded from TOML.
    pub fn from_config(config: AnalyzerConfig, period_ms: f64) -> Self {
        Self { config, period_ms }
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.config.threshold = threshold;
        self
    }

    pub fn window_ms(mut self, window_ms: f64) -> Self {
        self.config.window_ms = window_ms;
        self
    }

    pub fn slope_ms(mut self, slope_ms: f64) -> Self {
        self.config.slope_ms = slope_ms;
        self
    }

    pub fn filter_taps(mut self, taps: usize) -> Self {
        self.config.filter_taps = taps;
        self
    }

    pub fn history_ms(mut self, history_ms: f64) -> Self {
        self.config.history_ms = history_ms;
        self
    }

    pub fn peak_lookback_ticks(mut self, ticks: usize) -> Self {
        self.config.peak_lookback_ticks = ticks;
        self
    }

    /// Seed of the running post-peak minimum.
    pub fn v_min_seed(mut self, seed: f64) -> Self {
        self.config.v_min_seed = seed;
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Validate and allocate.
    pub fn build(self) -> Result<SpikeAnalyzer, AnalyzerError> {
        match SpikeAnalyzer::new(self.config, self.period_ms) {
            Ok(analyzer) => {
                let windows = analyzer.windows();
                let capacity = analyzer.ring().capacity();
                assert_invariant(
                    CONFIG_VALIDATED,
                    windows.slope > 0 && windows.window >= 2,
                    "accepted configuration has usable windows",
                    None,
                );
                assert_invariant(
                    RING_COVERS_WINDOWS,
                    windows.window + windows.slope < capacity
                        && self.config.peak_lookback_ticks < capacity
                        && self.config.filter_taps < capacity,
                    "ring holds every window the tick path reads",
                    None,
                );
                Ok(analyzer)
            }
            Err(e) => {
                assert_invariant(
                    CONFIG_REJECTS_INVALID,
                    matches!(
                        e,
                        AnalyzerError::InvalidConfiguration(_) | AnalyzerError::InvalidPeriod(_)
                    ),
                    "rejected configuration reports why",
                    None,
                );
                log::warn!("analyzer configuration rejected: {}", e);
                Err(e)
            }
        }
    }

    /// Validate, allocate and split for a two-thread host.
    pub fn build_rt(self) -> Result<(AnalyzerHandle, AnalyzerControl), AnalyzerError> {
        self.build().map(AnalyzerHandle::split)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_matches_manual_config() {
        let built = AnalyzerBuilder::new(1.0)
            .threshold(0.5)
            .window_ms(10.0)
            .slope_ms(2.0)
            .history_ms(100.0)
            .build()
            .unwrap();
        let manual = SpikeAnalyzer::new(
            AnalyzerConfig {
                threshold: 0.5,
                window_ms: 10.0,
                slope_ms: 2.0,
                history_ms: 100.0,
                ..AnalyzerConfig::default()
            },
            1.0,
        )
        .unwrap();
        assert_eq!(built.config(), manual.config());
        assert_eq!(built.windows(), manual.windows());
        assert_eq!(built.ring().capacity(), manual.ring().capacity());
    }

    #[test]
    fn builder_reports_invalid_configuration() {
        let err = AnalyzerBuilder::new(1.0)
            .window_ms(10.0)
            .history_ms(8.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidConfiguration(_)));
    }

    #[test]
    fn builder_rejects_oversized_slope_and_history() {
        let slope = AnalyzerBuilder::new(1.0)
            .window_ms(10.0)
            .slope_ms(1e30)
            .history_ms(100.0)
            .build();
        assert!(matches!(slope, Err(AnalyzerError::InvalidConfiguration(_))));

        let history = AnalyzerBuilder::new(1.0).history_ms(1e30).build();
        assert!(matches!(history, Err(AnalyzerError::InvalidConfiguration(_))));
    }

    #[test]
    fn builder_sets_min_seed() {
        let analyzer = AnalyzerBuilder::new(1.0)
            .window_ms(10.0)
            .history_ms(100.0)
            .v_min_seed(42.0)
            .build()
            .unwrap();
        assert_eq!(analyzer.config().v_min_seed, 42.0);
    }

    #[test]
    fn builder_defaults_fit_default_history() {
        let analyzer = AnalyzerBuilder::new(0.5).build().unwrap();
        assert_eq!(analyzer.ring().capacity(), 8000);
        assert_eq!(analyzer.windows().window, 200);
    }

    #[test]
    fn build_rt_shares_capacity() {
        let (handle, control) = AnalyzerBuilder::new(1.0)
            .window_ms(10.0)
            .history_ms(100.0)
            .build_rt()
            .unwrap();
        assert_eq!(control.capacity(), handle.analyzer().ring().capacity());
        assert_eq!(control.config(), handle.analyzer().config());
    }
}
