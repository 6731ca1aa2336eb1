//! Clip Handle System
//!
//! A [`ClipHandle`] is the shared, reference-counted slot a clip lives in.
//! The cache hands out the same slot to every caller asking for the same
//! key, possibly before the clip has finished loading.
//!
//! # Publication
//!
//! - The payload is written exactly once into a `OnceLock`
//! - The [`LoadState`] flag is stored with `Release` after the payload is set
//!   and read with `Acquire`, so a reader that observes `Ready` also observes
//!   the fully built clip
//! - Waiters park on a condvar instead of polling the slot

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::animation::clip::AnimationClip;

/// Lifecycle of a clip slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LoadState {
    /// Inserted into the cache, payload not yet published.
    Loading = 0,
    /// Payload published and immutable from here on.
    Ready = 1,
    /// Loading gave up. The slot never becomes ready.
    Failed = 2,
}

impl LoadState {
    #[inline]
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Ready,
            2 => Self::Failed,
            _ => Self::Loading,
        }
    }
}

#[derive(Debug)]
struct ClipSlot {
    key: String,
    state: AtomicU8,
    payload: OnceLock<Arc<AnimationClip>>,
    signal_lock: Mutex<()>,
    signal: Condvar,
}

/// Shared handle to a (possibly still loading) clip.
///
/// Cloning is cheap and every clone observes the same slot.
#[derive(Debug, Clone)]
pub struct ClipHandle {
    slot: Arc<ClipSlot>,
}

impl ClipHandle {
    /// Creates an empty placeholder in the [`LoadState::Loading`] state.
    #[must_use]
    pub fn pending(key: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(ClipSlot {
                key: key.into(),
                state: AtomicU8::new(LoadState::Loading as u8),
                payload: OnceLock::new(),
                signal_lock: Mutex::new(()),
                signal: Condvar::new(),
            }),
        }
    }

    /// Wraps an already built clip.
    ///
    /// The clip is validated first. A valid clip is ready immediately; an
    /// invalid one is logged and the handle starts in [`LoadState::Failed`],
    /// so nothing can ever sample it.
    #[must_use]
    pub fn ready(key: impl Into<String>, clip: impl Into<Arc<AnimationClip>>) -> Self {
        let handle = Self::pending(key);
        let clip = clip.into();
        match clip.validate() {
            Ok(()) => {
                handle.publish(clip);
            }
            Err(e) => {
                log::error!("Clip '{}': rejected: {e}", handle.key());
                handle.fail();
            }
        }
        handle
    }

    /// The cache key this slot was created for.
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.slot.key
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> LoadState {
        LoadState::from_u8(self.slot.state.load(Ordering::Acquire))
    }

    #[inline]
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.state() == LoadState::Ready
    }

    #[inline]
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.state() == LoadState::Failed
    }

    /// The clip, once published. `None` while loading and after a failure.
    #[inline]
    #[must_use]
    pub fn get(&self) -> Option<&Arc<AnimationClip>> {
        if self.is_loaded() {
            self.slot.payload.get()
        } else {
            None
        }
    }

    /// Returns `true` when both handles point at the same slot.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }

    /// Blocks until the slot leaves `Loading` or `timeout` elapses, and
    /// returns the state observed last.
    pub fn wait_timeout(&self, timeout: Duration) -> LoadState {
        let deadline = Instant::now() + timeout;
        let mut guard = self.slot.signal_lock.lock();
        loop {
            let state = self.state();
            if state != LoadState::Loading {
                return state;
            }
            if self.slot.signal.wait_until(&mut guard, deadline).timed_out() {
                return self.state();
            }
        }
    }

    /// Publishes the payload. Only the first publish or fail wins.
    pub(crate) fn publish(&self, clip: Arc<AnimationClip>) -> bool {
        if self.slot.payload.set(clip).is_err() {
            return false;
        }
        self.finish(LoadState::Ready)
    }

    /// Marks the slot as permanently failed, unless it already finished.
    pub(crate) fn fail(&self) -> bool {
        self.finish(LoadState::Failed)
    }

    fn finish(&self, state: LoadState) -> bool {
        let swapped = self
            .slot
            .state
            .compare_exchange(
                LoadState::Loading as u8,
                state as u8,
                Ordering::Release,
                Ordering::Relaxed,
            )
            .is_ok();
        if swapped {
            // taking the lock orders the store before any waiter's re-check
            let _guard = self.slot.signal_lock.lock();
            self.slot.signal.notify_all();
        }
        swapped
    }
}
