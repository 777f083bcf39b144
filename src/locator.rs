//! Mid-voltage (half-height) crossing locator.

#![forbid(unsafe_code)]

use crate::ring::SampleRing;

/// Tick inside the window ending at `reference` whose value lies closest to the
/// midpoint of the window's minimum and maximum.
///
/// The window covers `reference - window + 1 ..= reference`. Ties go to the
/// oldest tick. Minimum and maximum are taken over the whole window regardless
/// of which side of the peak they fall on, so a baseline that differs before and
/// after the peak shifts the midpoint.
///
/// Two linear passes, no allocation. A zero-sized window returns `reference`.
pub fn locate_mid_voltage(ring: &SampleRing, window: usize, reference: i64) -> i64 {
    if window == 0 {
        return reference;
    }
    debug_assert!(window <= ring.capacity());
    let first = reference - window as i64 + 1;

    let mut min = ring.read(reference);
    let mut max = min;
    for tick in first..=reference {
        let v = ring.read(tick);
        if v < min {
            min = v;
        }
        if v > max {
            max = v;
        }
    }
    let midpoint = (min + max) / 2.0;

    let mut closest = first;
    let mut best = (ring.read(first) - midpoint).abs();
    for tick in first + 1..=reference {
        let diff = (ring.read(tick) - midpoint).abs();
        if diff < best {
            best = diff;
            closest = tick;
        }
    }
    closest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_with(values: &[(i64, f64)], capacity: usize) -> SampleRing {
        let mut ring = SampleRing::new(capacity).unwrap();
        for &(tick, v) in values {
            ring.write(tick, v);
        }
        ring
    }

    #[test]
    fn locator_finds_half_height() {
        // 0.0, 0.25, 0.5, 0.75, 1.0 -> midpoint 0.5 at tick 12
        let ring = ring_with(
            &[(10, 0.0), (11, 0.25), (12, 0.5), (13, 0.75), (14, 1.0)],
            32,
        );
        assert_eq!(locate_mid_voltage(&ring, 5, 14), 12);
    }

    #[test]
    fn locator_tie_prefers_earlier_tick() {
        // midpoint 0.5; ticks 21 (0.25) and 23 (0.75) are equidistant
        let ring = ring_with(&[(20, 0.0), (21, 0.25), (22, 1.0), (23, 0.75)], 32);
        assert_eq!(locate_mid_voltage(&ring, 4, 23), 21);
    }

    #[test]
    fn locator_includes_reference_tick() {
        let ring = ring_with(&[(5, 1.0), (6, 1.0), (7, 0.5)], 16);
        // min 0.5, max 1.0 -> midpoint 0.75, every tick is 0.25 away; oldest wins
        assert_eq!(locate_mid_voltage(&ring, 3, 7), 5);
        // window of one is the reference itself
        assert_eq!(locate_mid_voltage(&ring, 1, 7), 7);
    }

    #[test]
    fn locator_mixes_both_sides_of_peak() {
        // Pre-peak baseline 0.0, post-peak baseline -1.0: midpoint is 0.0, not 0.5.
        let ring = ring_with(&[(0, 0.0), (1, 1.0), (2, 0.2), (3, -1.0)], 8);
        assert_eq!(locate_mid_voltage(&ring, 4, 3), 0);
    }

    #[test]
    fn locator_wraps_across_ring_end() {
        let ring = ring_with(&[(6, 0.0), (7, 0.5), (8, 1.0)], 8);
        // ticks 6, 7, 8 occupy slots 6, 7, 0
        assert_eq!(locate_mid_voltage(&ring, 3, 8), 7);
    }

    #[test]
    fn locator_zero_window_returns_reference() {
        let ring = ring_with(&[], 4);
        assert_eq!(locate_mid_voltage(&ring, 0, 9), 9);
    }
}
