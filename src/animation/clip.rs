use std::fmt;

use glam::{Affine3A, Quat, Vec3};
use rustc_hash::FxHashMap;

use crate::animation::tracks::{AnimationCurve, InterpolationMode};
use crate::errors::AssetError;

/// Identifies one of the three transform channels of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Scale,
    Rotate,
    Translate,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Channel::Scale => "scale",
            Channel::Rotate => "rotate",
            Channel::Translate => "translate",
        })
    }
}

/// Scale / rotate / translate curves for one named node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeChannels {
    pub scale: AnimationCurve<Vec3>,
    pub rotate: AnimationCurve<Quat>,
    pub translate: AnimationCurve<Vec3>,
    pub interpolation: InterpolationMode,
}

impl NodeChannels {
    #[must_use]
    pub fn new(
        scale: AnimationCurve<Vec3>,
        rotate: AnimationCurve<Quat>,
        translate: AnimationCurve<Vec3>,
        interpolation: InterpolationMode,
    ) -> Self {
        Self {
            scale,
            rotate,
            translate,
            interpolation,
        }
    }

    /// Samples all three channels. The rotation is returned as stored,
    /// not normalized.
    #[must_use]
    pub fn sample(&self, time: f32) -> NodeSample {
        let mode = self.interpolation;
        NodeSample {
            scale: self.scale.sample(time, mode),
            rotate: self.rotate.sample(time, mode),
            translate: self.translate.sample(time, mode),
        }
    }

    /// Value of each channel at its first keyframe.
    #[must_use]
    pub fn first_frame(&self) -> NodeSample {
        NodeSample {
            scale: self.scale.first().map_or(Vec3::ONE, |k| k.value),
            rotate: self.rotate.first().map_or(Quat::IDENTITY, |k| k.value),
            translate: self.translate.first().map_or(Vec3::ZERO, |k| k.value),
        }
    }

    fn validate(&self, node: &str) -> Result<(), AssetError> {
        let empty = |channel| AssetError::EmptyCurve {
            node: node.to_string(),
            channel,
        };
        if self.scale.is_empty() {
            return Err(empty(Channel::Scale));
        }
        if self.rotate.is_empty() {
            return Err(empty(Channel::Rotate));
        }
        if self.translate.is_empty() {
            return Err(empty(Channel::Translate));
        }

        let unordered = |channel, found: Option<(usize, f32)>| match found {
            Some((index, time)) => Err(AssetError::InvalidKeyTime {
                node: node.to_string(),
                channel,
                index,
                time,
            }),
            None => Ok(()),
        };
        unordered(Channel::Scale, self.scale.first_unordered_key())?;
        unordered(Channel::Rotate, self.rotate.first_unordered_key())?;
        unordered(Channel::Translate, self.translate.first_unordered_key())
    }

    fn scale_times(&mut self, factor: f32) {
        self.scale.scale_times(factor);
        self.rotate.scale_times(factor);
        self.translate.scale_times(factor);
    }
}

/// One node's sampled channel values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeSample {
    pub scale: Vec3,
    pub rotate: Quat,
    pub translate: Vec3,
}

impl NodeSample {
    /// Rest values: unit scale, no rotation, no translation.
    pub const IDENTITY: Self = Self {
        scale: Vec3::ONE,
        rotate: Quat::IDENTITY,
        translate: Vec3::ZERO,
    };

    /// Builds the local affine, normalizing the rotation first.
    #[must_use]
    pub fn to_affine(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(
            self.scale,
            self.rotate.normalize(),
            self.translate,
        )
    }
}

impl Default for NodeSample {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Authored animation data for one named action.
///
/// Built once by a loader, validated, then shared read-only (behind an
/// `Arc`) by any number of players. [`rescale_duration`](Self::rescale_duration)
/// is the only mutating operation and is meant for authoring tools.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub nodes: FxHashMap<String, NodeChannels>,
}

impl AnimationClip {
    #[must_use]
    pub fn new(name: impl Into<String>, duration: f32) -> Self {
        Self {
            name: name.into(),
            duration,
            nodes: FxHashMap::default(),
        }
    }

    /// Builds a clip from node channels, taking the duration from the latest
    /// keyframe found on any channel.
    #[must_use]
    pub fn from_nodes(
        name: impl Into<String>,
        nodes: impl IntoIterator<Item = (String, NodeChannels)>,
    ) -> Self {
        let nodes: FxHashMap<_, _> = nodes.into_iter().collect();
        let duration = nodes
            .values()
            .flat_map(|n| {
                [
                    n.scale.last().map(|k| k.time),
                    n.rotate.last().map(|k| k.time),
                    n.translate.last().map(|k| k.time),
                ]
            })
            .flatten()
            .fold(0.0_f32, f32::max);
        Self {
            name: name.into(),
            duration,
            nodes,
        }
    }

    pub fn insert_node(&mut self, name: impl Into<String>, channels: NodeChannels) {
        self.nodes.insert(name.into(), channels);
    }

    /// Looks up a node's channels. A missing node is not an error; callers
    /// fall back to the rest transform.
    #[inline]
    #[must_use]
    pub fn node(&self, name: &str) -> Option<&NodeChannels> {
        self.nodes.get(name)
    }

    /// Samples a node at `time`, or `None` if the clip does not animate it.
    #[must_use]
    pub fn sample_node(&self, name: &str, time: f32) -> Option<NodeSample> {
        self.node(name).map(|n| n.sample(time))
    }

    /// Local matrix for `name` at `time`; identity when the node is absent.
    #[must_use]
    pub fn node_local(&self, name: &str, time: f32) -> Affine3A {
        self.sample_node(name, time)
            .map_or(Affine3A::IDENTITY, |s| s.to_affine())
    }

    /// Rejects clips that would fail at sample time. Every channel of every
    /// node must hold at least one keyframe with finite, non-decreasing
    /// times, and the duration must be finite and non-negative.
    pub fn validate(&self) -> Result<(), AssetError> {
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(AssetError::InvalidData(format!(
                "clip '{}' has invalid duration {}",
                self.name, self.duration
            )));
        }
        for (name, channels) in &self.nodes {
            channels.validate(name)?;
        }
        Ok(())
    }

    /// Remaps every keyframe time by `new_duration / duration` and adopts the
    /// new duration. Relative key order is untouched.
    ///
    /// Does nothing when either duration is not strictly positive.
    pub fn rescale_duration(&mut self, new_duration: f32) {
        if self.duration <= 0.0 || new_duration <= 0.0 {
            log::warn!(
                "Ignoring rescale of clip '{}' from {} to {}",
                self.name,
                self.duration,
                new_duration
            );
            return;
        }
        let factor = new_duration / self.duration;
        for channels in self.nodes.values_mut() {
            channels.scale_times(factor);
        }
        self.duration = new_duration;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(translate: &[(f32, f32)]) -> NodeChannels {
        let times: Vec<f32> = translate.iter().map(|(t, _)| *t).collect();
        let values: Vec<Vec3> = translate.iter().map(|(_, v)| Vec3::splat(*v)).collect();
        NodeChannels::new(
            AnimationCurve::constant(Vec3::ONE),
            AnimationCurve::constant(Quat::IDENTITY),
            AnimationCurve::from_parts(&times, &values),
            InterpolationMode::Linear,
        )
    }

    #[test]
    fn duration_is_latest_key() {
        let clip = AnimationClip::from_nodes(
            "walk",
            [
                ("hip".to_string(), node(&[(0.0, 0.0), (1.5, 1.0)])),
                ("knee".to_string(), node(&[(0.0, 0.0), (2.0, 1.0)])),
            ],
        );
        assert!((clip.duration - 2.0).abs() < 1e-6);
    }

    #[test]
    fn empty_channel_fails_validation() {
        let mut clip = AnimationClip::new("broken", 1.0);
        clip.insert_node("hip", node(&[]));
        match clip.validate() {
            Err(AssetError::EmptyCurve { node, channel }) => {
                assert_eq!(node, "hip");
                assert_eq!(channel, Channel::Translate);
            }
            other => panic!("expected EmptyCurve, got {other:?}"),
        }
    }

    #[test]
    fn nan_and_unsorted_key_times_fail_validation() {
        let mut clip = AnimationClip::new("corrupt", 1.0);
        clip.insert_node(
            "hip",
            NodeChannels::new(
                AnimationCurve::from_parts(&[f32::NAN], &[Vec3::ONE]),
                AnimationCurve::constant(Quat::IDENTITY),
                AnimationCurve::constant(Vec3::ZERO),
                InterpolationMode::Linear,
            ),
        );
        match clip.validate() {
            Err(AssetError::InvalidKeyTime { node, channel, index, time }) => {
                assert_eq!(node, "hip");
                assert_eq!(channel, Channel::Scale);
                assert_eq!(index, 0);
                assert!(time.is_nan());
            }
            other => panic!("expected InvalidKeyTime, got {other:?}"),
        }

        let mut clip = AnimationClip::new("backwards", 1.0);
        clip.insert_node("hip", node(&[(0.0, 0.0), (1.0, 1.0), (0.5, 2.0)]));
        assert!(matches!(
            clip.validate(),
            Err(AssetError::InvalidKeyTime { channel: Channel::Translate, index: 2, .. })
        ));

        // equal neighbours are allowed
        let mut clip = AnimationClip::new("ties", 1.0);
        clip.insert_node("hip", node(&[(0.0, 0.0), (0.5, 1.0), (0.5, 2.0)]));
        assert!(clip.validate().is_ok());
    }

    #[test]
    fn missing_node_is_identity() {
        let clip = AnimationClip::new("empty", 1.0);
        assert!(clip.node("ghost").is_none());
        assert_eq!(clip.node_local("ghost", 0.3), Affine3A::IDENTITY);
    }

    #[test]
    fn rescale_preserves_samples() {
        let mut clip = AnimationClip::from_nodes(
            "walk",
            [("hip".to_string(), node(&[(0.0, 0.0), (0.5, 4.0), (2.0, 10.0)]))],
        );
        let before: Vec<Vec3> = (0..=20)
            .map(|i| clip.sample_node("hip", i as f32 * 0.1).unwrap().translate)
            .collect();

        clip.rescale_duration(3.0);
        assert!((clip.duration - 3.0).abs() < 1e-6);

        for (i, old) in before.iter().enumerate() {
            let t = i as f32 * 0.1 * 1.5;
            let new = clip.sample_node("hip", t).unwrap().translate;
            assert!(new.abs_diff_eq(*old, 1e-4), "t={t}: {new} vs {old}");
        }
    }
}
