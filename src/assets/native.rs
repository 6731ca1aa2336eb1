//! Engine-native `.anm` clip codec.
//!
//! Layout, host byte order, no header or version field:
//!
//! ```text
//! duration: f32
//! node_count: u64
//! node_count × {
//!     name_len: u64, name: [u8; name_len] (UTF-8)
//!     scale:     curve<[f32; 3]>
//!     rotate:    curve<[f32; 4]>   (x, y, z, w)
//!     translate: curve<[f32; 3]>
//! }
//! curve<V> = count: u64, count × { time: f32, value: V }
//! ```
//!
//! Native clips always sample with [`InterpolationMode::Linear`].

use std::path::Path;

use bytemuck::Pod;
use glam::{Quat, Vec3};

use crate::animation::clip::{AnimationClip, NodeChannels};
use crate::animation::tracks::{AnimationCurve, InterpolationMode, Keyframe};
use crate::animation::Interpolatable;
use crate::errors::{AssetError, Result};

const VEC3_KEY_SIZE: usize = 4 + 12;
const QUAT_KEY_SIZE: usize = 4 + 16;

struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn take(&mut self, len: usize, what: &str) -> std::result::Result<&'a [u8], AssetError> {
        if self.remaining() < len {
            return Err(AssetError::Format(format!(
                "truncated {what} at byte {}: need {len}, have {}",
                self.offset,
                self.remaining()
            )));
        }
        let slice = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    fn read<T: Pod>(&mut self, what: &str) -> std::result::Result<T, AssetError> {
        let slice = self.take(std::mem::size_of::<T>(), what)?;
        Ok(bytemuck::pod_read_unaligned(slice))
    }

    /// Reads a `u64` element count and checks that `count * elem_size` bytes
    /// can still follow.
    fn read_count(&mut self, elem_size: usize, what: &str) -> std::result::Result<usize, AssetError> {
        let raw: u64 = self.read(what)?;
        let count = usize::try_from(raw)
            .map_err(|_| AssetError::Format(format!("{what} {raw} does not fit in memory")))?;
        if count.saturating_mul(elem_size) > self.remaining() {
            return Err(AssetError::Format(format!(
                "{what} {count} exceeds the remaining {} bytes",
                self.remaining()
            )));
        }
        Ok(count)
    }
}

fn read_curve<T, R>(
    reader: &mut ByteReader<'_>,
    key_size: usize,
    convert: impl Fn(R) -> T,
) -> std::result::Result<AnimationCurve<T>, AssetError>
where
    T: Interpolatable,
    R: Pod,
{
    let count = reader.read_count(key_size, "keyframe count")?;
    let mut keys = Vec::with_capacity(count);
    for _ in 0..count {
        let time: f32 = reader.read("keyframe time")?;
        let raw: R = reader.read("keyframe value")?;
        keys.push(Keyframe::new(time, convert(raw)));
    }
    Ok(AnimationCurve::new(keys))
}

/// Decodes a native clip. The result is validated, so every channel of every
/// node carries at least one keyframe.
pub fn decode_native(name: &str, bytes: &[u8]) -> Result<AnimationClip> {
    let mut reader = ByteReader::new(bytes);

    let duration: f32 = reader.read("duration")?;
    // smallest possible node: name_len plus three empty curves
    let node_count = reader.read_count(4 * 8, "node count")?;

    let mut clip = AnimationClip::new(name, duration);
    for _ in 0..node_count {
        let name_len = reader.read_count(1, "node name length")?;
        let name_bytes = reader.take(name_len, "node name")?;
        let node_name = std::str::from_utf8(name_bytes)
            .map_err(|e| AssetError::Format(format!("node name is not UTF-8: {e}")))?
            .to_string();

        let scale = read_curve(&mut reader, VEC3_KEY_SIZE, Vec3::from_array)?;
        let rotate = read_curve(&mut reader, QUAT_KEY_SIZE, Quat::from_array)?;
        let translate = read_curve(&mut reader, VEC3_KEY_SIZE, Vec3::from_array)?;

        clip.insert_node(
            node_name,
            NodeChannels::new(scale, rotate, translate, InterpolationMode::Linear),
        );
    }

    if reader.remaining() != 0 {
        log::warn!(
            "Clip '{}': ignoring {} trailing bytes",
            name,
            reader.remaining()
        );
    }

    clip.validate()?;
    Ok(clip)
}

fn write_curve<T: Interpolatable, R: Pod>(
    out: &mut Vec<u8>,
    curve: &AnimationCurve<T>,
    convert: impl Fn(T) -> R,
) {
    out.extend_from_slice(bytemuck::bytes_of(&(curve.len() as u64)));
    for key in curve.keys() {
        out.extend_from_slice(bytemuck::bytes_of(&key.time));
        out.extend_from_slice(bytemuck::bytes_of(&convert(key.value)));
    }
}

/// Encodes `clip` in the native layout. Nodes are written in name order so
/// the output is deterministic. Interpolation mode is not stored.
#[must_use]
pub fn encode_native(clip: &AnimationClip) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(bytemuck::bytes_of(&clip.duration));
    out.extend_from_slice(bytemuck::bytes_of(&(clip.nodes.len() as u64)));

    let mut names: Vec<&String> = clip.nodes.keys().collect();
    names.sort();
    for name in names {
        let channels = &clip.nodes[name];
        out.extend_from_slice(bytemuck::bytes_of(&(name.len() as u64)));
        out.extend_from_slice(name.as_bytes());
        write_curve(&mut out, &channels.scale, |v: Vec3| v.to_array());
        write_curve(&mut out, &channels.rotate, |q: Quat| q.to_array());
        write_curve(&mut out, &channels.translate, |v: Vec3| v.to_array());
    }
    out
}

/// Writes `clip` to `path` in the native layout.
pub fn write_native_file(path: impl AsRef<Path>, clip: &AnimationClip) -> Result<()> {
    std::fs::write(path, encode_native(clip))?;
    Ok(())
}
