#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod animation;
pub mod assets;
pub mod errors;
pub mod scene;
pub mod settings;

pub use animation::{
    AnimationClip, AnimationComponent, AnimationCurve, AnimationPlayer, BlendNodeSet,
    BlendTransition, InterpolationMode, Keyframe, NodeChannels, NodeSample,
};
pub use assets::{ClipCache, ClipHandle, LoadState};
pub use errors::{AssetError, Error, Result};
pub use scene::Node;
pub use settings::AnimationSettings;
