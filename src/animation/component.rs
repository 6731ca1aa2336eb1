use std::time::Duration;

use glam::{Affine3A, Quat, Vec3};
use rustc_hash::FxHashMap;

use crate::animation::blend::{BlendNodeSet, BlendTransition};
use crate::animation::clip::{AnimationClip, NodeSample};
use crate::animation::player::AnimationPlayer;
use crate::assets::handle::{ClipHandle, LoadState};
use crate::scene::Node;
use crate::settings::AnimationSettings;

/// Addresses a clip in a component's table by position or by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipSelector<'a> {
    Index(usize),
    Name(&'a str),
}

impl From<usize> for ClipSelector<'_> {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl<'a> From<&'a str> for ClipSelector<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl<'a> From<&'a String> for ClipSelector<'a> {
    fn from(name: &'a String) -> Self {
        Self::Name(name.as_str())
    }
}

/// One row of the clip table: a named clip and the player running it.
#[derive(Debug, Clone)]
pub struct ClipEntry {
    name: String,
    player: AnimationPlayer,
}

impl ClipEntry {
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn player(&self) -> &AnimationPlayer {
        &self.player
    }

    #[inline]
    pub fn player_mut(&mut self) -> &mut AnimationPlayer {
        &mut self.player
    }
}

#[derive(Debug, Clone)]
struct TransitionState {
    target_index: usize,
    blend_duration: f32,
    /// `None` until both clips are ready.
    blend: Option<BlendTransition>,
}

/// Per-entity animation state: a table of clips, the clip currently shown,
/// and at most one blend toward the next clip.
///
/// All operations are frame-safe: an unknown name or index is logged and
/// ignored, and a clip that is still loading simply holds the pose.
#[derive(Debug, Clone)]
pub struct AnimationComponent {
    entries: Vec<ClipEntry>,
    index_by_name: FxHashMap<String, usize>,
    current_index: Option<usize>,
    transition: Option<TransitionState>,
    blend_nodes: BlendNodeSet,
    default_blend_time: f32,
    load_timeout: Duration,
}

impl Default for AnimationComponent {
    fn default() -> Self {
        Self::with_settings(&AnimationSettings::default())
    }
}

impl AnimationComponent {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_settings(settings: &AnimationSettings) -> Self {
        Self {
            entries: Vec::new(),
            index_by_name: FxHashMap::default(),
            current_index: None,
            transition: None,
            blend_nodes: settings.blend_nodes,
            default_blend_time: settings.default_blend_time,
            load_timeout: settings.load_timeout(),
        }
    }

    // ========================================================================
    // Clip table
    // ========================================================================

    /// Appends a clip under `name` and returns its index. A name already in
    /// the table is rejected.
    pub fn add_clip(&mut self, name: impl Into<String>, clip: ClipHandle) -> Option<usize> {
        let name = name.into();
        if self.index_by_name.contains_key(&name) {
            log::warn!("Animation component already has a clip named '{name}'");
            return None;
        }
        let index = self.entries.len();
        self.index_by_name.insert(name.clone(), index);
        self.entries.push(ClipEntry {
            name,
            player: AnimationPlayer::new(clip),
        });
        Some(index)
    }

    #[must_use]
    pub fn clip_index(&self, name: &str) -> Option<usize> {
        self.index_by_name.get(name).copied()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn resolve<'a>(&self, selector: impl Into<ClipSelector<'a>>) -> Option<usize> {
        match selector.into() {
            ClipSelector::Index(index) if index < self.entries.len() => Some(index),
            ClipSelector::Index(index) => {
                log::warn!(
                    "Animation index {index} out of range ({} clips)",
                    self.entries.len()
                );
                None
            }
            ClipSelector::Name(name) => {
                let index = self.clip_index(name);
                if index.is_none() {
                    log::warn!("Animation '{name}' not found");
                }
                index
            }
        }
    }

    #[must_use]
    pub fn entry<'a>(&self, selector: impl Into<ClipSelector<'a>>) -> Option<&ClipEntry> {
        let index = self.resolve(selector)?;
        self.entries.get(index)
    }

    pub fn entry_mut<'a>(&mut self, selector: impl Into<ClipSelector<'a>>) -> Option<&mut ClipEntry> {
        let index = self.resolve(selector)?;
        self.entries.get_mut(index)
    }

    /// The loaded clip behind a table entry.
    #[must_use]
    pub fn animation_data<'a>(&self, selector: impl Into<ClipSelector<'a>>) -> Option<&AnimationClip> {
        self.entry(selector)?.player.clip()
    }

    /// Blocks until the entry's clip leaves the loading state or the
    /// configured timeout passes.
    pub fn wait_loaded<'a>(&self, selector: impl Into<ClipSelector<'a>>) -> Option<LoadState> {
        let entry = self.entry(selector)?;
        Some(entry.player.handle().wait_timeout(self.load_timeout))
    }

    // ========================================================================
    // Playback control
    // ========================================================================

    /// Cuts to the clip immediately, restarting it from time zero and
    /// dropping any pending transition.
    pub fn play<'a>(&mut self, selector: impl Into<ClipSelector<'a>>) {
        let Some(index) = self.resolve(selector) else {
            return;
        };
        self.entries[index].player.play_start();
        self.current_index = Some(index);
        self.transition = None;
    }

    /// Starts a blend toward the clip, replacing any blend in flight. The
    /// current clip keeps playing underneath until the blend commits.
    ///
    /// A blend time of zero or less cuts like [`play`](Self::play). A target
    /// that is still loading is blended once it becomes ready; a target
    /// that failed to load is ignored.
    pub fn play_next<'a>(&mut self, selector: impl Into<ClipSelector<'a>>, blend_time: f32) {
        let Some(index) = self.resolve(selector) else {
            return;
        };
        if blend_time <= 0.0 || self.current_index.is_none() {
            self.play(index);
            return;
        }
        let entry = &self.entries[index];
        if entry.player.handle().is_failed() {
            log::warn!(
                "Animation '{}' failed to load; ignoring transition",
                entry.name
            );
            return;
        }

        self.transition = Some(TransitionState {
            target_index: index,
            blend_duration: blend_time,
            blend: None,
        });
        self.try_build_blend();
    }

    /// [`play_next`](Self::play_next) with the configured default blend time.
    pub fn play_next_default<'a>(&mut self, selector: impl Into<ClipSelector<'a>>) {
        self.play_next(selector, self.default_blend_time);
    }

    /// Stops the current clip. A transition in flight is left alone.
    pub fn stop(&mut self) {
        if let Some(player) = self.current_player_mut() {
            player.stop();
        }
    }

    /// Commits the pending transition now: the target becomes the current
    /// clip and restarts from zero.
    pub fn end_transition(&mut self) {
        let Some(transition) = self.transition.take() else {
            log::warn!("end_transition called without a transition in flight");
            return;
        };
        let target = transition.target_index;
        log::debug!(
            "Transition to '{}' committed",
            self.entries[target].name
        );
        self.entries[target].player.play_start();
        self.current_index = Some(target);
    }

    /// Advances the current clip and any blend. Call once per frame before
    /// [`compose_pose`](Self::compose_pose).
    pub fn update(&mut self, dt: f32) {
        if let Some(player) = self.current_player_mut() {
            player.update(dt);
        }

        let Some(transition) = &mut self.transition else {
            return;
        };
        match &mut transition.blend {
            Some(blend) => {
                blend.update(dt);
                if blend.is_finished() {
                    self.end_transition();
                }
            }
            None => {
                let target = &self.entries[transition.target_index];
                if target.player.handle().is_failed() {
                    log::warn!(
                        "Animation '{}' failed to load; dropping transition",
                        target.name
                    );
                    self.transition = None;
                } else {
                    self.try_build_blend();
                }
            }
        }
    }

    /// Writes the pose of the blend in flight, or of the current clip, into
    /// `root`. Returns `false` when nothing was ready to compose.
    pub fn compose_pose(&self, root: &mut Node, parent_global: Affine3A) -> bool {
        if let Some(blend) = self.active_blend() {
            return blend.compose_pose(root, parent_global);
        }
        self.current_player()
            .is_some_and(|p| p.compose_pose(root, parent_global))
    }

    fn try_build_blend(&mut self) {
        let Some(current) = self.current_index else {
            return;
        };
        let Some(transition) = &mut self.transition else {
            return;
        };
        if transition.blend.is_some() {
            return;
        }

        let source = &self.entries[current].player;
        let target = &self.entries[transition.target_index].player;
        let Some(target_clip) = target.clip() else {
            return;
        };
        let empty = AnimationClip::default();
        let source_clip = match source.clip() {
            Some(clip) => clip,
            // nothing to fade from: blend in from rest
            None if source.handle().is_failed() => &empty,
            None => return,
        };

        transition.blend = Some(BlendTransition::new(
            source_clip,
            source.current_time(),
            target_clip,
            transition.blend_duration,
            self.blend_nodes,
        ));
    }

    // ========================================================================
    // Queries
    // ========================================================================

    fn active_blend(&self) -> Option<&BlendTransition> {
        self.transition.as_ref()?.blend.as_ref()
    }

    fn current_player(&self) -> Option<&AnimationPlayer> {
        self.entries.get(self.current_index?).map(|e| &e.player)
    }

    fn current_player_mut(&mut self) -> Option<&mut AnimationPlayer> {
        self.entries.get_mut(self.current_index?).map(|e| &mut e.player)
    }

    #[inline]
    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    #[must_use]
    pub fn current_name(&self) -> Option<&str> {
        self.entries.get(self.current_index?).map(ClipEntry::name)
    }

    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    /// Target of the transition in flight.
    #[must_use]
    pub fn next_clip_index(&self) -> Option<usize> {
        self.transition.as_ref().map(|t| t.target_index)
    }

    /// Requested duration of the transition in flight.
    #[must_use]
    pub fn blend_time(&self) -> Option<f32> {
        self.transition.as_ref().map(|t| t.blend_duration)
    }

    /// Time spent blending; zero while the blend waits for its clips.
    #[must_use]
    pub fn blend_elapsed(&self) -> Option<f32> {
        self.transition
            .as_ref()
            .map(|t| t.blend.as_ref().map_or(0.0, BlendTransition::elapsed))
    }

    #[must_use]
    pub fn current_time(&self) -> f32 {
        self.current_player().map_or(0.0, AnimationPlayer::current_time)
    }

    pub fn set_current_time(&mut self, time: f32) {
        if let Some(player) = self.current_player_mut() {
            player.set_current_time(time);
        }
    }

    #[must_use]
    pub fn current_duration(&self) -> f32 {
        self.current_player().map_or(0.0, AnimationPlayer::duration)
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.current_player().is_some_and(AnimationPlayer::is_playing)
    }

    #[must_use]
    pub fn is_looping(&self) -> bool {
        self.current_player().is_some_and(AnimationPlayer::is_looping)
    }

    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.current_player().is_some_and(AnimationPlayer::is_ended)
    }

    pub fn speed<'a>(&self, selector: impl Into<ClipSelector<'a>>) -> Option<f32> {
        self.entry(selector).map(|e| e.player.speed())
    }

    pub fn set_speed<'a>(&mut self, selector: impl Into<ClipSelector<'a>>, speed: f32) {
        if let Some(entry) = self.entry_mut(selector) {
            entry.player.set_speed(speed);
        }
    }

    pub fn looping<'a>(&self, selector: impl Into<ClipSelector<'a>>) -> Option<bool> {
        self.entry(selector).map(|e| e.player.is_looping())
    }

    pub fn set_looping<'a>(&mut self, selector: impl Into<ClipSelector<'a>>, looping: bool) {
        if let Some(entry) = self.entry_mut(selector) {
            entry.player.set_looping(looping);
        }
    }

    pub fn duration<'a>(&self, selector: impl Into<ClipSelector<'a>>) -> Option<f32> {
        self.entry(selector).map(|e| e.player.duration())
    }

    /// Overrides one entry's duration without touching the shared clip.
    pub fn set_duration<'a>(&mut self, selector: impl Into<ClipSelector<'a>>, duration: f32) {
        if let Some(entry) = self.entry_mut(selector) {
            entry.player.set_duration(duration);
        }
    }

    /// Sampled pose of `node` as currently shown: the blend while one is
    /// running, else the current clip.
    #[must_use]
    pub fn sample_node(&self, node: &str) -> Option<NodeSample> {
        match self.active_blend() {
            Some(blend) => blend.sample_node(node),
            None => self.current_player()?.sample_node(node),
        }
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
