//! Analyzer configuration: parameters, TOML loading and validation.
//!
//! Durations are expressed in milliseconds and converted to tick counts against
//! the current sampling period, truncating toward zero. Validation happens here,
//! before anything touches the ring, so the tick path never sees a window that
//! does not fit.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::AnalyzerError;

/// Look-back used by the peak test (`value < buffer[tick - 3]`).
pub const DEFAULT_PEAK_LOOKBACK_TICKS: usize = 3;
/// Seed for the running minimum, above any physiological voltage.
pub const DEFAULT_V_MIN_SEED: f64 = 10_000.0;
/// Largest ring accepted, in samples (128 MiB of `f64`).
pub const MAX_RING_CAPACITY: usize = 1 << 24;

/// Detection parameters. Immutable during a run; change them through an
/// explicit reconfiguration, which also resets detection state.
///
/// # Example
/// ```
/// use spikemeter::config::AnalyzerConfig;
/// let config = AnalyzerConfig::default();
/// assert_eq!(config.window_ms, 100.0);
/// assert_eq!(config.filter_taps, 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Firing threshold, in input units.
    pub threshold: f64,
    /// Post-peak analysis window (whole window, not half), ms.
    pub window_ms: f64,
    /// Half-width used for the slope measurements, ms.
    pub slope_ms: f64,
    /// History taps of the smoothing filter. 0 disables filtering.
    pub filter_taps: usize,
    /// Time span kept in the ring buffer, ms.
    pub history_ms: f64,
    /// How far back the peak test compares the current sample.
    pub peak_lookback_ticks: usize,
    /// Initial value of the running minimum.
    pub v_min_seed: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            window_ms: 100.0,
            slope_ms: 2.0,
            filter_taps: 0,
            history_ms: 4000.0,
            peak_lookback_ticks: DEFAULT_PEAK_LOOKBACK_TICKS,
            v_min_seed: DEFAULT_V_MIN_SEED,
        }
    }
}

/// Tick-denominated windows derived from a configuration and a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickWindows {
    /// Post-peak window length.
    pub window: usize,
    /// Window scanned by the mid-voltage locator on each side of the peak.
    pub half_window: usize,
    /// Slope half-width.
    pub slope: usize,
}

/// Convert a duration to whole ticks, truncating toward zero.
///
/// Saturating: a negative or NaN quotient gives 0 and a quotient beyond
/// `usize::MAX` (including infinity) gives `usize::MAX`. Callers compare the
/// result against the ring capacity before using it in arithmetic.
#[inline]
pub fn ms_to_ticks(ms: f64, period_ms: f64) -> usize {
    (ms / period_ms) as usize
}

/// Reject periods that are zero, negative or not finite.
pub fn check_period(period_ms: f64) -> Result<(), AnalyzerError> {
    if period_ms.is_finite() && period_ms > 0.0 {
        Ok(())
    } else {
        Err(AnalyzerError::InvalidPeriod(period_ms))
    }
}

impl AnalyzerConfig {
    /// Tick windows for `period_ms`, without any validation.
    pub fn windows(&self, period_ms: f64) -> TickWindows {
        let window = ms_to_ticks(self.window_ms, period_ms);
        TickWindows {
            window,
            half_window: window / 2,
            slope: ms_to_ticks(self.slope_ms, period_ms),
        }
    }

    /// Ring capacity needed to hold `history_ms` at `period_ms`.
    pub fn ring_capacity(&self, period_ms: f64) -> Result<usize, AnalyzerError> {
        check_period(period_ms)?;
        if !self.history_ms.is_finite() || self.history_ms <= 0.0 {
            return Err(AnalyzerError::invalid(format!(
                "history length must be positive, got {} ms",
                self.history_ms
            )));
        }
        let capacity = ms_to_ticks(self.history_ms, period_ms);
        if capacity == 0 {
            return Err(AnalyzerError::invalid(format!(
                "history of {} ms holds no sample at a {} ms period",
                self.history_ms, period_ms
            )));
        }
        if capacity > MAX_RING_CAPACITY {
            return Err(AnalyzerError::invalid(format!(
                "history of {} ms needs {} samples at a {} ms period, at most {} allowed",
                self.history_ms, capacity, period_ms, MAX_RING_CAPACITY
            )));
        }
        Ok(capacity)
    }

    /// Validate against a ring of `capacity` slots sampled every `period_ms`.
    ///
    /// Pure and lock-free: safe to call between ticks on the tick thread.
    pub fn validate(&self, period_ms: f64, capacity: usize) -> Result<TickWindows, AnalyzerError> {
        check_period(period_ms)?;
        if !self.threshold.is_finite() {
            return Err(AnalyzerError::invalid("firing threshold must be finite"));
        }
        if !self.v_min_seed.is_finite() {
            return Err(AnalyzerError::invalid("minimum seed must be finite"));
        }

        let windows = self.windows(period_ms);
        if windows.window < 2 {
            return Err(AnalyzerError::invalid(format!(
                "post-peak window of {} ms spans {} ticks, at least 2 required",
                self.window_ms, windows.window
            )));
        }
        if windows.window >= capacity {
            return Err(AnalyzerError::invalid(format!(
                "post-peak window of {} ticks does not fit a ring of {} samples",
                windows.window, capacity
            )));
        }
        if windows.slope == 0 {
            return Err(AnalyzerError::invalid(format!(
                "slope half-width of {} ms is shorter than one {} ms tick",
                self.slope_ms, period_ms
            )));
        }
        // Both terms may be saturated tick counts.
        let reach = windows.window.checked_add(windows.slope);
        if reach.map_or(true, |r| r >= capacity) {
            return Err(AnalyzerError::invalid(format!(
                "window of {} ticks plus slope of {} ticks does not fit a ring of {} samples",
                windows.window, windows.slope, capacity
            )));
        }
        if self.peak_lookback_ticks == 0 || self.peak_lookback_ticks >= capacity {
            return Err(AnalyzerError::invalid(format!(
                "peak look-back must be in 1..{}, got {}",
                capacity, self.peak_lookback_ticks
            )));
        }
        if self.filter_taps >= capacity {
            return Err(AnalyzerError::invalid(format!(
                "filter taps ({}) must be fewer than ring samples ({})",
                self.filter_taps, capacity
            )));
        }
        Ok(windows)
    }
}

/// On-disk layout. Every key is optional and falls back to the defaults.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    detection: DetectionSection,
    #[serde(default)]
    buffer: BufferSection,
    #[serde(default)]
    sentinels: SentinelSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct DetectionSection {
    threshold: Option<f64>,
    window_ms: Option<f64>,
    slope_ms: Option<f64>,
    filter_taps: Option<usize>,
    peak_lookback_ticks: Option<usize>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct BufferSection {
    history_ms: Option<f64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct SentinelSection {
    v_min_seed: Option<f64>,
}

/// Parse a TOML document, merging it over [`AnalyzerConfig::default`].
///
/// # Errors
/// Returns an error if the document is not valid TOML or has unknown keys.
pub fn parse_config(content: &str) -> Result<AnalyzerConfig> {
    let file: ConfigFile = toml::from_str(content).context("malformed analyzer configuration")?;
    let mut config = AnalyzerConfig::default();

    let d = file.detection;
    if let Some(v) = d.threshold {
        config.threshold = v;
    }
    if let Some(v) = d.window_ms {
        config.window_ms = v;
    }
    if let Some(v) = d.slope_ms {
        config.slope_ms = v;
    }
    if let Some(v) = d.filter_taps {
        config.filter_taps = v;
    }
    if let Some(v) = d.peak_lookback_ticks {
        config.peak_lookback_ticks = v;
    }
    if let Some(v) = file.buffer.history_ms {
        config.history_ms = v;
    }
    if let Some(v) = file.sentinels.v_min_seed {
        config.v_min_seed = v;
    }
    Ok(config)
}

/// Load a TOML file and merge it over the defaults.
///
/// The result is not validated: validation needs the sampling period, which
/// only the host knows.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
/// ```no_run
/// use spikemeter::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<AnalyzerConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let config =
        parse_config(&content).with_context(|| format!("while parsing {}", path.display()))?;
    log::info!(
        "loaded analyzer config from {}: threshold={} window={}ms slope={}ms taps={}",
        path.display(),
        config.threshold,
        config.window_ms,
        config.slope_ms,
        config.filter_taps
    );
    Ok(config)
}

/// Render a configuration in the same layout [`load_config`] reads.
///
/// # Errors
/// Returns an error if serialization fails.
pub fn to_toml_string(config: &AnalyzerConfig) -> Result<String> {
    let file = ConfigFile {
        detection: DetectionSection {
            threshold: Some(config.threshold),
            window_ms: Some(config.window_ms),
            slope_ms: Some(config.slope_ms),
            filter_taps: Some(config.filter_taps),
            peak_lookback_ticks: Some(config.peak_lookback_ticks),
        },
        buffer: BufferSection {
            history_ms: Some(config.history_ms),
        },
        sentinels: SentinelSection {
            v_min_seed: Some(config.v_min_seed),
        },
    };
    toml::to_string_pretty(&file).context("cannot serialize analyzer configuration")
}
