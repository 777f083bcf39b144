//! Ring module: fixed-capacity sample history addressed by absolute tick.

#![forbid(unsafe_code)]

use crate::error::AnalyzerError;

/// Forward distance from `from` to `to` along a ring of `size` slots.
///
/// Always in `[0, size)`, for any pair of signed ticks.
#[inline]
pub fn circular_distance(from: i64, to: i64, size: usize) -> usize {
    debug_assert!(size > 0);
    (to - from).rem_euclid(size as i64) as usize
}

/// Circular store of filtered samples.
///
/// Ticks are absolute and unbounded; the ring maps them onto slots modulo
/// `capacity`. A read does not know whether its slot was written in the current
/// lap, so callers never look further back than `capacity - 1` ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRing {
    data: Vec<f64>,
}

impl SampleRing {
    /// Allocate a zero-filled ring. Allocation failure is reported, not aborted on.
    pub fn new(capacity: usize) -> Result<Self, AnalyzerError> {
        if capacity == 0 {
            return Err(AnalyzerError::invalid("ring capacity must be at least one sample"));
        }
        let mut data = Vec::new();
        data.try_reserve_exact(capacity).map_err(|e| {
            AnalyzerError::invalid(format!("cannot allocate a ring of {} samples: {}", capacity, e))
        })?;
        data.resize(capacity, 0.0);
        Ok(Self { data })
    }

    /// Number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    #[inline]
    fn slot(&self, tick: i64) -> usize {
        tick.rem_euclid(self.data.len() as i64) as usize
    }

    /// Store `value` at the slot for `tick`.
    #[inline]
    pub fn write(&mut self, tick: i64, value: f64) {
        let slot = self.slot(tick);
        self.data[slot] = value;
    }

    /// Value held by the slot for `tick`.
    #[inline]
    pub fn read(&self, tick: i64) -> f64 {
        self.data[self.slot(tick)]
    }

    /// Forward distance between two ticks on this ring.
    #[inline]
    pub fn distance(&self, from: i64, to: i64) -> usize {
        circular_distance(from, to, self.data.len())
    }

    /// Zero every slot.
    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }
}
