use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::errors::{AssetError, Error, Result};

/// Source of raw clip bytes.
///
/// Reads are blocking; the cache runs them on a blocking worker when loading
/// in the background.
pub trait ClipReader: Send + Sync {
    fn read_bytes(&self, key: &str) -> Result<Vec<u8>>;
}

/// Reads clips from files below a root directory.
#[derive(Debug)]
pub struct FileClipReader {
    root_path: PathBuf,
}

impl FileClipReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let root_path = if path.is_file() {
            path.parent().unwrap_or(Path::new(".")).to_path_buf()
        } else {
            path.to_path_buf()
        };
        Self { root_path }
    }

    #[inline]
    #[must_use]
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }
}

impl ClipReader for FileClipReader {
    fn read_bytes(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.root_path.join(key);
        match std::fs::read(&path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(AssetError::NotFound(path.display().to_string()).into())
            }
            Err(e) => Err(Error::Io(e)),
        }
    }
}

/// In-memory clip source, keyed by the same strings the cache uses.
#[derive(Debug, Default)]
pub struct MemoryClipReader {
    files: RwLock<FxHashMap<String, Arc<[u8]>>>,
}

impl MemoryClipReader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        self.files.write().insert(key.into(), bytes.into());
    }
}

impl ClipReader for MemoryClipReader {
    fn read_bytes(&self, key: &str) -> Result<Vec<u8>> {
        self.files
            .read()
            .get(key)
            .map(|bytes| bytes.to_vec())
            .ok_or_else(|| AssetError::NotFound(key.to_string()).into())
    }
}

/// Reader variants the cache can hold without a trait object.
#[derive(Debug, Clone)]
pub enum ClipReaderVariant {
    File(Arc<FileClipReader>),
    Memory(Arc<MemoryClipReader>),
}

impl ClipReaderVariant {
    pub fn read_bytes(&self, key: &str) -> Result<Vec<u8>> {
        match self {
            Self::File(r) => r.read_bytes(key),
            Self::Memory(r) => r.read_bytes(key),
        }
    }
}

impl From<FileClipReader> for ClipReaderVariant {
    fn from(reader: FileClipReader) -> Self {
        Self::File(Arc::new(reader))
    }
}

impl From<Arc<MemoryClipReader>> for ClipReaderVariant {
    fn from(reader: Arc<MemoryClipReader>) -> Self {
        Self::Memory(reader)
    }
}
