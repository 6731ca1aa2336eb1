use glam::{Affine3A, Quat, Vec3};

use crate::animation::clip::{AnimationClip, NodeSample};
use crate::animation::pose::compose_pose;
use crate::assets::handle::ClipHandle;
use crate::scene::Node;

/// Time cursor and play flags of one player.
///
/// `Stopped → Playing → Ended`. Only [`start`](Self::start) leaves `Ended`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackState {
    pub current_time: f32,
    pub playing: bool,
    pub looping: bool,
    pub ended: bool,
    pub speed: f32,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_time: 0.0,
            playing: false,
            looping: false,
            ended: false,
            speed: 1.0,
        }
    }
}

impl PlaybackState {
    pub fn start(&mut self) {
        self.current_time = 0.0;
        self.playing = true;
        self.ended = false;
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    /// Advances the cursor by `dt * speed` within `[0, duration]`.
    ///
    /// Does nothing unless playing with a positive duration. Looping wraps
    /// (in both directions); otherwise the cursor clamps at the boundary it
    /// crossed and the state becomes ended.
    pub fn advance(&mut self, dt: f32, duration: f32) {
        if !self.playing || duration <= 0.0 {
            return;
        }

        self.current_time += dt * self.speed;

        if self.current_time >= duration {
            if self.looping {
                self.current_time %= duration;
            } else {
                self.finish(duration);
            }
        } else if self.current_time < 0.0 {
            if self.looping {
                self.current_time = self.current_time.rem_euclid(duration);
                // rem_euclid can round up to `duration` for tiny negatives
                if self.current_time >= duration {
                    self.current_time = 0.0;
                }
            } else {
                self.finish(0.0);
            }
        }
    }

    fn finish(&mut self, at: f32) {
        self.current_time = at;
        self.ended = true;
        self.playing = false;
    }
}

/// Drives one clip through time.
///
/// The clip itself is shared and read-only; all mutable state lives here, so
/// any number of players can run the same handle at different times.
#[derive(Debug, Clone)]
pub struct AnimationPlayer {
    clip: ClipHandle,
    state: PlaybackState,
    duration_override: Option<f32>,
}

impl AnimationPlayer {
    #[must_use]
    pub fn new(clip: ClipHandle) -> Self {
        Self {
            clip,
            state: PlaybackState::default(),
            duration_override: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> &ClipHandle {
        &self.clip
    }

    /// The clip, once its handle is ready.
    #[inline]
    #[must_use]
    pub fn clip(&self) -> Option<&AnimationClip> {
        self.clip.get().map(|c| &**c)
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn play_start(&mut self) {
        self.state.start();
    }

    pub fn stop(&mut self) {
        self.state.stop();
    }

    /// Advances playback. A clip that is still loading (or failed) keeps the
    /// cursor where it is.
    pub fn update(&mut self, dt: f32) {
        if !self.clip.is_loaded() {
            return;
        }
        let duration = self.duration();
        self.state.advance(dt, duration);
    }

    /// Composes the current pose into `root`. Returns `false`, leaving the
    /// tree untouched, while the clip is not ready.
    pub fn compose_pose(&self, root: &mut Node, parent_global: Affine3A) -> bool {
        let Some(clip) = self.clip() else {
            return false;
        };
        compose_pose(root, parent_global, clip, self.state.current_time);
        true
    }

    #[inline]
    #[must_use]
    pub fn current_time(&self) -> f32 {
        self.state.current_time
    }

    /// Moves the cursor, clamped to `[0, duration]`. A non-finite `time` is
    /// ignored.
    pub fn set_current_time(&mut self, time: f32) {
        if !time.is_finite() {
            log::warn!(
                "Clip '{}': ignoring non-finite playback time {time}",
                self.clip.key()
            );
            return;
        }
        self.state.current_time = time.clamp(0.0, self.duration().max(0.0));
    }

    /// Effective duration: the per-instance override if set, else the
    /// clip's, else zero while the clip is unavailable.
    #[must_use]
    pub fn duration(&self) -> f32 {
        self.duration_override
            .or_else(|| self.clip().map(|c| c.duration))
            .unwrap_or(0.0)
    }

    /// Overrides the duration for this player only. The shared clip is not
    /// rescaled.
    pub fn set_duration(&mut self, duration: f32) {
        if !duration.is_finite() {
            log::warn!(
                "Clip '{}': ignoring non-finite duration {duration}",
                self.clip.key()
            );
            return;
        }
        self.duration_override = Some(duration);
    }

    #[inline]
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.state.playing
    }

    #[inline]
    #[must_use]
    pub fn is_looping(&self) -> bool {
        self.state.looping
    }

    #[inline]
    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.state.ended
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.state.looping = looping;
    }

    #[inline]
    #[must_use]
    pub fn speed(&self) -> f32 {
        self.state.speed
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.state.speed = speed;
    }

    /// Samples `node` at the current time, `None` if the clip is not ready
    /// or does not animate it.
    #[must_use]
    pub fn sample_node(&self, node: &str) -> Option<NodeSample> {
        self.clip()?.sample_node(node, self.state.current_time)
    }

    #[must_use]
    pub fn current_scale(&self, node: &str) -> Vec3 {
        self.sample_node(node).map_or(Vec3::ONE, |s| s.scale)
    }

    #[must_use]
    pub fn current_rotate(&self, node: &str) -> Quat {
        self.sample_node(node).map_or(Quat::IDENTITY, |s| s.rotate)
    }

    #[must_use]
    pub fn current_translate(&self, node: &str) -> Vec3 {
        self.sample_node(node).map_or(Vec3::ZERO, |s| s.translate)
    }
}
