use serde::{Deserialize, Serialize};

use crate::animation::values::Interpolatable;

/// Rule used to compute values between two keyframes.
///
/// Shared by all three channels of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InterpolationMode {
    #[default]
    Linear,
    Step,
}

/// A `(time, value)` control point. `time` is in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe<T> {
    pub time: f32,
    pub value: T,
}

impl<T> Keyframe<T> {
    #[inline]
    #[must_use]
    pub const fn new(time: f32, value: T) -> Self {
        Self { time, value }
    }
}

/// Time-ordered keyframes for one channel.
///
/// Keys are expected finite and sorted by non-decreasing time. Clip
/// validation enforces this for every clip that enters a cache; sampling
/// does not re-check it. A curve handed to [`sample`](Self::sample) must be
/// non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationCurve<T: Interpolatable> {
    keys: Vec<Keyframe<T>>,
}

impl<T: Interpolatable> Default for AnimationCurve<T> {
    fn default() -> Self {
        Self { keys: Vec::new() }
    }
}

impl<T: Interpolatable> AnimationCurve<T> {
    #[must_use]
    pub fn new(keys: Vec<Keyframe<T>>) -> Self {
        Self { keys }
    }

    /// Builds a curve from parallel time / value arrays.
    ///
    /// Mismatched lengths are an authoring mistake: debug builds assert,
    /// release builds log a warning and keep the shorter of the two.
    #[must_use]
    pub fn from_parts(times: &[f32], values: &[T]) -> Self {
        debug_assert_eq!(
            times.len(),
            values.len(),
            "curve times and values differ in length"
        );
        if times.len() != values.len() {
            log::warn!(
                "Curve built from {} times and {} values; extra entries dropped",
                times.len(),
                values.len()
            );
        }
        let keys = times
            .iter()
            .zip(values)
            .map(|(&time, &value)| Keyframe::new(time, value))
            .collect();
        Self { keys }
    }

    /// A single-key curve that holds `value` forever.
    #[must_use]
    pub fn constant(value: T) -> Self {
        Self {
            keys: vec![Keyframe::new(0.0, value)],
        }
    }

    #[inline]
    #[must_use]
    pub fn keys(&self) -> &[Keyframe<T>] {
        &self.keys
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn first(&self) -> Option<&Keyframe<T>> {
        self.keys.first()
    }

    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&Keyframe<T>> {
        self.keys.last()
    }

    pub fn push(&mut self, time: f32, value: T) {
        self.keys.push(Keyframe::new(time, value));
    }

    /// Index and time of the first key whose time is not finite or is
    /// earlier than the key before it.
    #[must_use]
    pub fn first_unordered_key(&self) -> Option<(usize, f32)> {
        let mut previous = f32::NEG_INFINITY;
        for (index, key) in self.keys.iter().enumerate() {
            if !key.time.is_finite() || key.time < previous {
                return Some((index, key.time));
            }
            previous = key.time;
        }
        None
    }

    /// Multiplies every key time by `factor`. Order is preserved for any
    /// positive factor.
    pub(crate) fn scale_times(&mut self, factor: f32) {
        for key in &mut self.keys {
            key.time *= factor;
        }
    }

    /// Samples the curve at `time`.
    ///
    /// - `time <= first.time` returns the first value.
    /// - `time >= last.time` returns the last value.
    /// - Otherwise the bracketing pair is the first `(i, i+1)` with
    ///   `keys[i].time <= time <= keys[i+1].time`, so a time that lands
    ///   exactly on an interior key resolves to the segment on its left.
    ///
    /// A segment whose two keys share the same time returns the left value
    /// without dividing. A non-finite `time` returns the first value.
    ///
    /// # Panics
    ///
    /// Panics if the curve is empty.
    #[must_use]
    pub fn sample(&self, time: f32, mode: InterpolationMode) -> T {
        assert!(!self.keys.is_empty(), "sampled an empty animation curve");

        let first = &self.keys[0];
        if !time.is_finite() || time <= first.time {
            return first.value;
        }
        let last = &self.keys[self.keys.len() - 1];
        if time >= last.time {
            return last.value;
        }

        // first index whose time is >= `time`; at least 1 for sorted finite
        // keys, saturated for anything else
        let next_idx = self.keys.partition_point(|k| k.time < time);
        self.sample_segment(next_idx.saturating_sub(1), time, mode)
    }

    fn sample_segment(&self, index: usize, time: f32, mode: InterpolationMode) -> T {
        // only reachable out of range when key times are corrupt
        let (Some(k0), Some(k1)) = (self.keys.get(index), self.keys.get(index + 1)) else {
            return self.keys[0].value;
        };

        match mode {
            InterpolationMode::Step => k0.value,
            InterpolationMode::Linear => {
                let dt = k1.time - k0.time;
                if !dt.is_finite() || dt <= 0.0 {
                    return k0.value;
                }
                let t = ((time - k0.time) / dt).clamp(0.0, 1.0);
                T::interpolate_linear(k0.value, k1.value, t)
            }
        }
    }
}
