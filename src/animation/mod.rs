//! Keyframe animation
//!
//! - [`tracks`]: keyframe curves and sampling
//! - [`clip`]: named per-node channel sets
//! - [`player`]: time cursor over one clip
//! - [`pose`]: writes a sampled clip into a node hierarchy
//! - [`blend`]: synthetic cross-fade clips
//! - [`component`]: per-entity clip table with transitions

mod values;
pub mod tracks;
pub mod clip;
pub mod player;
pub mod pose;
pub mod blend;
pub mod component;

pub use values::Interpolatable;
pub use tracks::{AnimationCurve, InterpolationMode, Keyframe};
pub use clip::{AnimationClip, Channel, NodeChannels, NodeSample};
pub use player::{AnimationPlayer, PlaybackState};
pub use pose::compose_pose;
pub use blend::{BlendNodeSet, BlendTransition};
pub use component::{AnimationComponent, ClipEntry, ClipSelector};
