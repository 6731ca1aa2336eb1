pub mod cache;
pub mod handle;
pub mod import;
pub mod io;
pub mod native;
pub mod storage;

pub use cache::ClipCache;
pub use handle::{ClipHandle, LoadState};
pub use import::{Handedness, ImportOptions, RawAnimation, import_clip, parse_interchange};
pub use io::{ClipReader, ClipReaderVariant, FileClipReader, MemoryClipReader};
pub use native::{decode_native, encode_native, write_native_file};
pub use storage::{ClipKey, ClipStorage};
