//! Error types for the controller and the file catalog.

use std::path::PathBuf;
use thiserror::Error;

/// Failures reported by [`crate::controller::PlaybackController`].
///
/// None of these are fatal. State is left untouched for every variant except
/// `Media`, where the selection has already moved before the media source
/// refused the command.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("playlist is empty")]
    EmptyPlaylist,

    #[error("track index {index} out of range (playlist has {len} tracks)")]
    OutOfRange { index: usize, len: usize },

    #[error("track duration is not known yet")]
    UnknownDuration,

    #[error("media source error: {0:#}")]
    Media(#[from] anyhow::Error),
}

/// Failures reported by [`crate::library::FileCatalog`].
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unsupported audio format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, PlayerError>;
