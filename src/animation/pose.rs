//! Hierarchical pose composition.
//!
//! Writes one clip's sampled pose into a [`Node`] tree in strict pre-order:
//! a node's global matrix is fully written before any of its children reads
//! it, and every node is visited exactly once per call. Matrices are
//! overwritten, so nothing from the previous frame leaks through.

use glam::Affine3A;

use crate::animation::clip::AnimationClip;
use crate::scene::Node;

/// Composes `clip` at `time` into the subtree rooted at `node`.
///
/// Nodes the clip does not animate receive an identity local matrix.
pub fn compose_pose(node: &mut Node, parent_global: Affine3A, clip: &AnimationClip, time: f32) {
    let local = clip.node_local(&node.name, time);
    let global = parent_global * local;
    node.local_matrix = local;
    node.global_matrix = global;

    for child in &mut node.children {
        compose_pose(child, global, clip, time);
    }
}

#[cfg(test)]
mod tests {
    use glam::{Quat, Vec3};

    use super::*;
    use crate::animation::clip::NodeChannels;
    use crate::animation::tracks::{AnimationCurve, InterpolationMode};

    fn translating(to: Vec3) -> NodeChannels {
        NodeChannels::new(
            AnimationCurve::constant(Vec3::ONE),
            AnimationCurve::constant(Quat::IDENTITY),
            AnimationCurve::from_parts(&[0.0, 1.0], &[Vec3::ZERO, to]),
            InterpolationMode::Linear,
        )
    }

    #[test]
    fn parent_global_feeds_children() {
        let clip = AnimationClip::from_nodes(
            "offset",
            [
                ("root".to_string(), translating(Vec3::X)),
                ("arm".to_string(), translating(Vec3::Y)),
            ],
        );
        let mut root = Node::new("root").with_child(Node::new("arm").with_child(Node::new("hand")));

        compose_pose(&mut root, Affine3A::IDENTITY, &clip, 1.0);

        let arm = &root.children[0];
        let hand = &arm.children[0];
        assert!(root.global_matrix.translation.abs_diff_eq(Vec3::X.into(), 1e-6));
        assert!(arm.global_matrix.translation.abs_diff_eq((Vec3::X + Vec3::Y).into(), 1e-6));
        // untouched by the clip: identity local, inherits parent global
        assert_eq!(hand.local_matrix, Affine3A::IDENTITY);
        assert_eq!(hand.global_matrix, arm.global_matrix);
    }

    #[test]
    fn composition_overwrites_previous_frame() {
        let clip = AnimationClip::from_nodes("offset", [("root".to_string(), translating(Vec3::X))]);
        let mut root = Node::new("root");
        compose_pose(&mut root, Affine3A::IDENTITY, &clip, 1.0);
        compose_pose(&mut root, Affine3A::IDENTITY, &clip, 1.0);
        assert!(root.global_matrix.translation.abs_diff_eq(Vec3::X.into(), 1e-6));
    }
}
