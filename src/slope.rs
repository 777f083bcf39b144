//! Signed rate of change between two buffered samples.

#![forbid(unsafe_code)]

use crate::ring::SampleRing;

/// Rate of change from `earlier` to `later` over `dt`, sign inverted.
///
/// A falling pair yields a positive rate: `slope(2.0, 1.0, 5.0) == 0.2`.
/// `dt` is strictly positive once a configuration has been validated.
#[inline]
pub fn slope(earlier: f64, later: f64, dt: f64) -> f64 {
    (later - earlier) / -dt
}

/// [`slope`] between the samples buffered at two ticks.
#[inline]
pub fn slope_between(ring: &SampleRing, earlier_tick: i64, later_tick: i64, dt: f64) -> f64 {
    slope(ring.read(earlier_tick), ring.read(later_tick), dt)
}
