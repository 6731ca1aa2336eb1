use glam::Affine3A;
use serde::{Deserialize, Serialize};

use crate::animation::clip::{AnimationClip, NodeChannels, NodeSample};
use crate::animation::player::AnimationPlayer;
use crate::animation::tracks::{AnimationCurve, InterpolationMode, Keyframe};
use crate::assets::handle::ClipHandle;
use crate::scene::Node;

/// Shortest blend a transition will run for.
pub const MIN_BLEND_DURATION: f32 = 1.0e-4;

/// Which nodes a blend clip animates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendNodeSet {
    /// Only nodes the outgoing clip animates. Target-only nodes snap at
    /// commit time.
    #[default]
    SourceOnly,
    /// Nodes of both clips. Target-only nodes blend in from their rest pose.
    Union,
}

/// A cross-fade from a frozen source pose to a target clip's first frame.
///
/// The fade is itself a clip: each node gets 2-key linear curves
/// `(0, source pose)` → `(blend_duration, target frame 0)`, driven by a
/// non-looping player. The transition is finished once that player ends.
#[derive(Debug, Clone)]
pub struct BlendTransition {
    player: AnimationPlayer,
    blend_duration: f32,
}

impl BlendTransition {
    /// Builds the blend clip and starts playing it.
    ///
    /// `source_time` is where the outgoing clip's pose is sampled. A node
    /// the target does not animate fades toward its rest transform.
    #[must_use]
    pub fn new(
        source: &AnimationClip,
        source_time: f32,
        target: &AnimationClip,
        blend_duration: f32,
        nodes: BlendNodeSet,
    ) -> Self {
        let blend_duration = if blend_duration.is_finite() {
            blend_duration.max(MIN_BLEND_DURATION)
        } else {
            MIN_BLEND_DURATION
        };
        let clip = Self::build_clip(source, source_time, target, blend_duration, nodes);
        log::debug!(
            "Blend '{}' -> '{}' over {:.3}s ({} nodes)",
            source.name,
            target.name,
            blend_duration,
            clip.nodes.len()
        );

        let key = clip.name.clone();
        let mut player = AnimationPlayer::new(ClipHandle::ready(key, clip));
        player.set_looping(false);
        player.play_start();
        Self {
            player,
            blend_duration,
        }
    }

    fn build_clip(
        source: &AnimationClip,
        source_time: f32,
        target: &AnimationClip,
        blend_duration: f32,
        nodes: BlendNodeSet,
    ) -> AnimationClip {
        let target_frame = |name: &str| {
            target
                .node(name)
                .map_or(NodeSample::IDENTITY, NodeChannels::first_frame)
        };

        let mut clip = AnimationClip::new(
            format!("{}->{}", source.name, target.name),
            blend_duration,
        );
        for (name, channels) in &source.nodes {
            let from = channels.sample(source_time);
            clip.insert_node(name.clone(), fade(from, target_frame(name), blend_duration));
        }
        if nodes == BlendNodeSet::Union {
            for (name, channels) in &target.nodes {
                if source.node(name).is_none() {
                    clip.insert_node(
                        name.clone(),
                        fade(NodeSample::IDENTITY, channels.first_frame(), blend_duration),
                    );
                }
            }
        }
        clip
    }

    pub fn update(&mut self, dt: f32) {
        self.player.update(dt);
    }

    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.player.is_ended()
    }

    /// Time spent in the blend so far.
    #[inline]
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.player.current_time()
    }

    #[inline]
    #[must_use]
    pub fn blend_duration(&self) -> f32 {
        self.blend_duration
    }

    /// The synthetic blend clip.
    #[must_use]
    pub fn clip(&self) -> Option<&AnimationClip> {
        self.player.clip()
    }

    #[must_use]
    pub fn sample_node(&self, node: &str) -> Option<NodeSample> {
        self.player.sample_node(node)
    }

    /// Samples `node` at an arbitrary blend time.
    #[must_use]
    pub fn sample_node_at(&self, node: &str, time: f32) -> Option<NodeSample> {
        self.clip()?.sample_node(node, time)
    }

    pub fn compose_pose(&self, root: &mut Node, parent_global: Affine3A) -> bool {
        self.player.compose_pose(root, parent_global)
    }
}

fn fade(from: NodeSample, to: NodeSample, duration: f32) -> NodeChannels {
    NodeChannels::new(
        AnimationCurve::new(vec![
            Keyframe::new(0.0, from.scale),
            Keyframe::new(duration, to.scale),
        ]),
        AnimationCurve::new(vec![
            Keyframe::new(0.0, from.rotate),
            Keyframe::new(duration, to.rotate),
        ]),
        AnimationCurve::new(vec![
            Keyframe::new(0.0, from.translate),
            Keyframe::new(duration, to.translate),
        ]),
        InterpolationMode::Linear,
    )
}
