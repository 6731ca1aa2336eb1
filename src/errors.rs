//! Error Types
//!
//! This module defines the error types produced by the animation core.
//!
//! # Overview
//!
//! Errors only ever surface at the load / import boundary:
//! - Clip file I/O failures
//! - Native `.anm` and interchange document decoding errors
//! - Structural validation (e.g. a channel with zero keyframes)
//!
//! The per-frame path (sampling, playback, pose composition) never returns
//! [`Result`]. A clip that fails to load is parked in the
//! [`LoadState::Failed`](crate::assets::LoadState::Failed) state instead, and
//! the entity holding it keeps its rest pose.
//!
//! ```rust,ignore
//! use rigmotion::errors::{Error, Result};
//!
//! fn decode(bytes: &[u8]) -> Result<AnimationClip> {
//!     rigmotion::assets::native::decode_native("walk", bytes)
//! }
//! ```

use thiserror::Error;

use crate::animation::clip::Channel;

/// The main error type for the animation core.
#[derive(Error, Debug)]
pub enum Error {
    /// Clip asset could not be resolved or decoded.
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parse error (interchange documents and settings).
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A background load task did not complete.
    #[error("Task join error: {0}")]
    TaskJoin(String),
}

/// Structural and content errors for clip assets.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssetError {
    /// The requested clip key does not exist in the backing reader.
    #[error("Clip not found: {0}")]
    NotFound(String),

    /// The key's extension maps to no known clip format.
    #[error("Unsupported clip format: {0}")]
    UnsupportedFormat(String),

    /// The bytes do not follow the expected layout.
    #[error("Format error: {0}")]
    Format(String),

    /// A channel is present but carries no keyframes.
    #[error("Empty curve: node '{node}' has no {channel} keyframes")]
    EmptyCurve {
        /// Node owning the empty channel
        node: String,
        /// Which channel is empty
        channel: Channel,
    },

    /// A channel's key times are not finite or not sorted.
    #[error("Invalid key times: node '{node}' {channel} key {index} at {time}")]
    InvalidKeyTime {
        /// Node owning the channel
        node: String,
        /// Which channel holds the bad key
        channel: Channel,
        /// Index of the first offending key
        index: usize,
        /// Time stored at that key
        time: f32,
    },

    /// Values are structurally readable but semantically invalid.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::TaskJoin(err.to_string())
    }
}

/// Alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
