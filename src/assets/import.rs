//! Interchange import.
//!
//! External scene importers (FBX / COLLADA / glTF front ends) produce
//! animations as tick-based key lists. This module defines that shape as a
//! serde document and converts it into an [`AnimationClip`]:
//!
//! - Key times are divided by `ticks_per_second`
//! - Vectors and quaternions are mirrored when the source handedness differs
//!   from the target
//! - The resulting clip is validated before it is returned

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::animation::clip::{AnimationClip, NodeChannels};
use crate::animation::tracks::{AnimationCurve, InterpolationMode, Keyframe};
use crate::errors::{AssetError, Result};

/// Coordinate system convention of a source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Handedness {
    #[default]
    RightHanded,
    LeftHanded,
}

/// Conversion knobs applied on import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    pub target_handedness: Handedness,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawVectorKey {
    pub time: f64,
    pub value: [f32; 3],
}

/// Quaternion key, `value` ordered `(x, y, z, w)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawQuatKey {
    pub time: f64,
    pub value: [f32; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNodeChannel {
    pub node: String,
    #[serde(default)]
    pub interpolation: InterpolationMode,
    #[serde(default)]
    pub scale_keys: Vec<RawVectorKey>,
    #[serde(default)]
    pub rotation_keys: Vec<RawQuatKey>,
    #[serde(default)]
    pub position_keys: Vec<RawVectorKey>,
}

/// One animation as delivered by an external importer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAnimation {
    #[serde(default)]
    pub name: String,
    pub duration_ticks: f64,
    pub ticks_per_second: f64,
    #[serde(default)]
    pub handedness: Handedness,
    #[serde(default)]
    pub channels: Vec<RawNodeChannel>,
}

#[inline]
fn mirror_vec3(v: Vec3) -> Vec3 {
    Vec3::new(-v.x, v.y, v.z)
}

// Reflection across the YZ plane conjugates the rotation axis.
#[inline]
fn mirror_quat(q: Quat) -> Quat {
    Quat::from_xyzw(q.x, -q.y, -q.z, q.w)
}

/// Converts an importer document into a validated clip.
pub fn import_clip(raw: &RawAnimation, options: &ImportOptions) -> Result<AnimationClip> {
    if raw.ticks_per_second.is_nan() || raw.ticks_per_second <= 0.0 {
        return Err(AssetError::Format(format!(
            "animation '{}' has non-positive ticks_per_second {}",
            raw.name, raw.ticks_per_second
        ))
        .into());
    }
    let tps = raw.ticks_per_second;
    let to_seconds = |ticks: f64| (ticks / tps) as f32;
    let mirror = raw.handedness != options.target_handedness;

    let mut clip = AnimationClip::new(raw.name.clone(), to_seconds(raw.duration_ticks));
    for channel in &raw.channels {
        let scale = AnimationCurve::new(
            channel
                .scale_keys
                .iter()
                .map(|k| Keyframe::new(to_seconds(k.time), Vec3::from_array(k.value)))
                .collect(),
        );
        let rotate = AnimationCurve::new(
            channel
                .rotation_keys
                .iter()
                .map(|k| {
                    let q = Quat::from_array(k.value);
                    Keyframe::new(to_seconds(k.time), if mirror { mirror_quat(q) } else { q })
                })
                .collect(),
        );
        let translate = AnimationCurve::new(
            channel
                .position_keys
                .iter()
                .map(|k| {
                    let v = Vec3::from_array(k.value);
                    Keyframe::new(to_seconds(k.time), if mirror { mirror_vec3(v) } else { v })
                })
                .collect(),
        );
        if clip.node(&channel.node).is_some() {
            log::warn!(
                "Animation '{}': duplicate channel for node '{}', keeping the last one",
                raw.name,
                channel.node
            );
        }
        clip.insert_node(
            channel.node.clone(),
            NodeChannels::new(scale, rotate, translate, channel.interpolation),
        );
    }

    clip.validate()?;
    Ok(clip)
}

/// Parses a JSON interchange document and imports it. An empty document
/// name is replaced by `name`.
pub fn parse_interchange(name: &str, bytes: &[u8], options: &ImportOptions) -> Result<AnimationClip> {
    let mut raw: RawAnimation = serde_json::from_slice(bytes)?;
    if raw.name.is_empty() {
        raw.name = name.to_string();
    }
    import_clip(&raw, options)
}
