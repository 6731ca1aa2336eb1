use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::animation::blend::BlendNodeSet;
use crate::assets::import::{Handedness, ImportOptions};
use crate::errors::Result;

/// Tunables shared by components and the clip cache.
///
/// Every field has a default, so a settings document only needs to name the
/// values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSettings {
    /// Blend time used by `play_next_default`, in seconds.
    pub default_blend_time: f32,
    pub blend_nodes: BlendNodeSet,
    /// Handedness imported clips are converted to.
    pub import_handedness: Handedness,
    /// Upper bound for blocking waits on a loading clip.
    pub load_timeout_ms: u64,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            default_blend_time: 0.1,
            blend_nodes: BlendNodeSet::SourceOnly,
            import_handedness: Handedness::RightHanded,
            load_timeout_ms: 5_000,
        }
    }
}

impl AnimationSettings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    #[must_use]
    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    /// Import options for a [`ClipCache`](crate::assets::ClipCache) built
    /// from these settings.
    #[must_use]
    pub fn import_options(&self) -> ImportOptions {
        ImportOptions {
            target_handedness: self.import_handedness,
        }
    }
}
