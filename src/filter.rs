//! Causal smoothing of the incoming sample against buffered history.

#![forbid(unsafe_code)]

use crate::ring::SampleRing;

/// Weight of the raw sample in the smoothed output.
pub const RAW_WEIGHT: f64 = 0.3;
/// Weight shared evenly by the buffered history taps.
pub const HISTORY_WEIGHT: f64 = 0.7;

/// Smooth `raw` with the `taps` samples buffered just before `tick`.
///
/// With `taps == 0` the raw value is returned untouched and the ring is not read.
/// Only ticks `tick - taps ..= tick - 1` are read, so the filter never sees
/// anything that is not already available at `tick`.
#[inline]
pub fn causal_filter(ring: &SampleRing, tick: i64, raw: f64, taps: usize) -> f64 {
    if taps == 0 {
        return raw;
    }
    let per_tap = HISTORY_WEIGHT / taps as f64;
    let mut filtered = raw * RAW_WEIGHT;
    for back in 1..=taps as i64 {
        filtered += ring.read(tick - back) * per_tap;
    }
    filtered
}
