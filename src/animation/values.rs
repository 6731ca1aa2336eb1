use glam::{Quat, Vec3};

/// Values that a keyframe curve can blend between.
///
/// Only linear blending is needed: `Step` never interpolates, and the
/// keyframe formats carry no tangents.
pub trait Interpolatable: Copy + Clone + Sized {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self;
}

impl Interpolatable for f32 {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start + (end - start) * t
    }
}

impl Interpolatable for Vec3 {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start.lerp(end, t)
    }
}

impl Interpolatable for Quat {
    // glam's slerp flips `end` when the dot product is negative, so this
    // always takes the shortest arc between neighbouring keys.
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start.slerp(end, t)
    }
}
