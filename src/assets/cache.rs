use std::path::Path;
use std::sync::Arc;

use crate::animation::clip::AnimationClip;
use crate::assets::handle::ClipHandle;
use crate::assets::import::{ImportOptions, parse_interchange};
use crate::assets::io::ClipReaderVariant;
use crate::assets::native::{decode_native, write_native_file};
use crate::assets::storage::ClipStorage;
use crate::errors::{AssetError, Result};
use crate::settings::AnimationSettings;

/// Process-wide clip cache, keyed by the string a clip was requested with.
///
/// The cache is an ordinary value: construct one, clone it freely (clones
/// share storage), and pass it to whoever loads clips.
///
/// # Loading
///
/// Every load path first inserts a [`ClipHandle`] placeholder under the key
/// and only then reads and decodes the bytes. A second request for the same
/// key, from any thread, finds the placeholder and shares it; no key is
/// ever decoded twice.
///
/// Decoding is chosen by extension: `.anm` is the native binary layout,
/// `.json` an interchange document. Failures are logged and leave the handle
/// in [`LoadState::Failed`](crate::assets::LoadState::Failed).
#[derive(Clone)]
pub struct ClipCache {
    storage: Arc<ClipStorage>,
    reader: ClipReaderVariant,
    import: ImportOptions,
}

impl ClipCache {
    #[must_use]
    pub fn new(reader: impl Into<ClipReaderVariant>) -> Self {
        Self {
            storage: Arc::new(ClipStorage::new()),
            reader: reader.into(),
            import: ImportOptions::default(),
        }
    }

    /// Cache whose interchange imports follow `settings.import_handedness`.
    #[must_use]
    pub fn with_settings(
        reader: impl Into<ClipReaderVariant>,
        settings: &AnimationSettings,
    ) -> Self {
        Self::new(reader).with_import_options(settings.import_options())
    }

    #[must_use]
    pub fn with_import_options(mut self, options: ImportOptions) -> Self {
        self.import = options;
        self
    }

    #[must_use]
    pub fn storage(&self) -> &ClipStorage {
        &self.storage
    }

    /// Loads `key` on the calling thread.
    ///
    /// A cache hit returns immediately, possibly with a handle another thread
    /// is still populating.
    pub fn load(&self, key: &str) -> ClipHandle {
        let (handle, inserted) = self.reserve(key);
        if inserted {
            self.populate(&handle);
        }
        handle
    }

    /// Inserts the placeholder now and populates it on the runtime's blocking
    /// pool. Returns without waiting for the decode.
    pub fn load_background(&self, key: &str, runtime: &tokio::runtime::Handle) -> ClipHandle {
        let (handle, inserted) = self.reserve(key);
        if inserted {
            let cache = self.clone();
            let slot = handle.clone();
            runtime.spawn_blocking(move || cache.populate(&slot));
        }
        handle
    }

    /// Async variant of [`load`](Self::load): the decode runs on the blocking
    /// pool and the returned handle has left the loading state, unless
    /// another caller owns the population.
    pub async fn load_async(&self, key: &str) -> ClipHandle {
        let (handle, inserted) = self.reserve(key);
        if inserted {
            let cache = self.clone();
            let slot = handle.clone();
            if let Err(e) = tokio::task::spawn_blocking(move || cache.populate(&slot)).await {
                log::error!("Clip '{key}': load task failed: {e}");
                handle.fail();
            }
        }
        handle
    }

    /// Handle for `key` if it has been requested before.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<ClipHandle> {
        self.storage.get(key)
    }

    /// Registers a clip built in memory. If `key` is already present, the
    /// existing handle is kept and returned.
    ///
    /// The clip goes through the same validation as a decoded file; one that
    /// fails is stored as [`LoadState::Failed`](crate::assets::LoadState::Failed).
    pub fn insert(&self, key: &str, clip: impl Into<Arc<AnimationClip>>) -> ClipHandle {
        self.storage.insert(key, ClipHandle::ready(key, clip))
    }

    /// Writes the ready clip stored under `key` to `path` in the native
    /// layout.
    pub fn save_native(&self, key: &str, path: impl AsRef<Path>) -> Result<()> {
        let clip = self
            .get(key)
            .and_then(|h| h.get().cloned())
            .ok_or_else(|| AssetError::NotFound(key.to_string()))?;
        write_native_file(path, &clip)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.storage.contains(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    fn reserve(&self, key: &str) -> (ClipHandle, bool) {
        let (handle, inserted) = self
            .storage
            .get_or_insert_with(key, || ClipHandle::pending(key));
        if !inserted {
            log::debug!("Clip '{key}': cache hit ({:?})", handle.state());
        }
        (handle, inserted)
    }

    fn populate(&self, handle: &ClipHandle) {
        let key = handle.key();
        match self.read_and_decode(key) {
            Ok(clip) => {
                log::debug!(
                    "Clip '{key}': loaded {} nodes, {:.3}s",
                    clip.nodes.len(),
                    clip.duration
                );
                handle.publish(Arc::new(clip));
            }
            Err(e) => {
                log::error!("Clip '{key}': {e}");
                handle.fail();
            }
        }
    }

    fn read_and_decode(&self, key: &str) -> Result<AnimationClip> {
        let extension = Path::new(key)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let name = Path::new(key)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(key);

        match extension.as_deref() {
            Some("anm") => {
                let bytes = self.reader.read_bytes(key)?;
                decode_native(name, &bytes)
            }
            Some("json") => {
                let bytes = self.reader.read_bytes(key)?;
                parse_interchange(name, &bytes, &self.import)
            }
            _ => Err(AssetError::UnsupportedFormat(key.to_string()).into()),
        }
    }
}
