//! Online spike detection and waveform measurement for sampled voltage signals.
//!
//! One raw sample goes in per tick. It is smoothed, buffered, and a two-phase
//! state machine watches for a peak above threshold, then measures duration at
//! half-height, rising and falling slopes, amplitude and extrema.

pub mod builder;
pub mod config;
pub mod control;
pub mod detector;
pub mod error;
pub mod filter;
#[doc(hidden)]
pub mod harness;
pub mod host;
#[doc(hidden)]
pub mod invariant_ppt;
pub mod invariant_rt;
pub mod locator;
pub mod ring;
pub mod rt;
pub mod slope;
pub mod state;

pub use builder::AnalyzerBuilder;
pub use config::{load_config, AnalyzerConfig, TickWindows};
pub use control::{AnalyzerControl, ControlMsg};
pub use detector::SpikeAnalyzer;
pub use error::AnalyzerError;
pub use host::{MetricsSink, PeriodSource, TickDriver};
pub use rt::AnalyzerHandle;
pub use state::{SpikeMetrics, SpikeState, TickEvent, TickOutputs};
