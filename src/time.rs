//! Wrapping RTMP clock values.
//!
//! RTMP timestamps count milliseconds from an arbitrary epoch in 32 bits,
//! and a long-lived stream overflows the counter after roughly 49.7 days.
//! [`RtmpTimestamp`] therefore treats the clock as circular: advancing it
//! wraps, the delta between two instants is their wrapping distance, and
//! ordering follows serial-number arithmetic, so two instants compare in
//! stream order whenever they lie within 2<sup>31</sup> - 1 milliseconds
//! of each other.
//!
//! ```
//! use rtmp_transport::time::RtmpTimestamp;
//!
//! let before_wrap = RtmpTimestamp::new(u32::MAX - 500);
//! let after_wrap = before_wrap + 1000;
//!
//! assert!(after_wrap > before_wrap);
//! assert_eq!(after_wrap.delta_since(before_wrap), 1000);
//! ```

use std::cmp::Ordering;
use std::ops::Add;

/// An instant on the 32-bit circular RTMP clock.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RtmpTimestamp {
    /// Milliseconds from an unknown epoch.
    pub value: u32,
}

impl RtmpTimestamp {
    /// Creates a timestamp at the given millisecond value.
    pub fn new(value: u32) -> RtmpTimestamp {
        RtmpTimestamp { value }
    }

    /// Replaces the time value.
    pub fn set(&mut self, new_value: u32) {
        self.value = new_value;
    }

    /// The wrapping distance from `earlier` to this instant.
    ///
    /// This is the value a compressed chunk header carries as its
    /// timestamp delta. A clock that moved backwards yields the huge
    /// wrapped distance rather than an error; the codec encodes it as-is.
    pub fn delta_since(self, earlier: RtmpTimestamp) -> u32 {
        self.value.wrapping_sub(earlier.value)
    }
}

impl Add<u32> for RtmpTimestamp {
    type Output = RtmpTimestamp;

    /// Advances the clock, wrapping at the 32-bit boundary. This is how
    /// chunk-header deltas are applied to a previous timestamp.
    fn add(self, milliseconds: u32) -> RtmpTimestamp {
        RtmpTimestamp::new(self.value.wrapping_add(milliseconds))
    }
}

impl Ord for RtmpTimestamp {
    /// Serial-number ordering: the sign of the wrapping distance decides,
    /// so instants on opposite sides of a counter wrap still sort in
    /// stream order.
    fn cmp(&self, other: &Self) -> Ordering {
        match other.value.wrapping_sub(self.value) as i32 {
            0 => Ordering::Equal,
            distance if distance > 0 => Ordering::Less,
            _ => Ordering::Greater,
        }
    }
}

impl PartialOrd for RtmpTimestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::RtmpTimestamp;

    #[test]
    fn addition_advances_the_clock() {
        let time = RtmpTimestamp::new(50) + 60;

        assert_eq!(time.value, 110, "Incorrect advanced value");
    }

    #[test]
    fn addition_wraps_at_the_32_bit_boundary() {
        let time = RtmpTimestamp::new(u32::MAX) + 60;

        assert_eq!(time.value, 59, "Addition did not wrap");
    }

    #[test]
    fn delta_since_measures_forward_distance() {
        let earlier = RtmpTimestamp::new(1_000);
        let later = RtmpTimestamp::new(1_033);

        assert_eq!(later.delta_since(earlier), 33, "Incorrect delta");
    }

    #[test]
    fn delta_since_crosses_the_wrap_point() {
        let earlier = RtmpTimestamp::new(u32::MAX - 9);
        let later = earlier + 25;

        assert_eq!(later.delta_since(earlier), 25, "Incorrect wrapped delta");
    }

    #[test]
    fn applying_a_delta_recovers_the_later_instant() {
        let earlier = RtmpTimestamp::new(u32::MAX - 100);
        let later = RtmpTimestamp::new(4_000);

        assert_eq!(
            earlier + later.delta_since(earlier),
            later,
            "Delta and addition did not invert each other"
        );
    }

    #[test]
    fn backwards_time_yields_the_wrapped_distance() {
        let earlier = RtmpTimestamp::new(100);
        let later = RtmpTimestamp::new(50);

        assert_eq!(
            later.delta_since(earlier),
            u32::MAX - 49,
            "Incorrect backwards distance"
        );
    }

    #[test]
    fn nearby_instants_compare_in_stream_order() {
        let time1 = RtmpTimestamp::new(50);
        let time2 = RtmpTimestamp::new(60);

        assert!(time1 < time2, "time1 was not less than time2");
        assert!(time2 > time1, "time2 was not greater than time1");
        assert_eq!(time1, RtmpTimestamp::new(50), "Equal instants were not equal");
    }

    #[test]
    fn ordering_survives_a_counter_wrap() {
        let before_wrap = RtmpTimestamp::new(4_000_000_000);
        let after_wrap = RtmpTimestamp::new(10_000);

        assert!(
            after_wrap > before_wrap,
            "Post-wrap instant did not sort after the pre-wrap one"
        );
        assert!(
            before_wrap < after_wrap,
            "Pre-wrap instant did not sort before the post-wrap one"
        );
    }

    #[test]
    fn distant_instants_compare_by_plain_value() {
        // Less than half the clock apart in the ordinary direction.
        let time1 = RtmpTimestamp::new(10_000);
        let time2 = RtmpTimestamp::new(2_000_000_000);

        assert!(time1 < time2, "Ordinary ordering did not hold");
    }

    #[test]
    fn can_set_timestamp_value() {
        let mut time = RtmpTimestamp::new(50);
        time.set(60);

        assert_eq!(time.value, 60, "Value was not replaced");
    }
}
