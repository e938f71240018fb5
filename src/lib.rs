//! Playlist and playback control for a small audio player.
//!
//! [`controller::PlaybackController`] owns the playlist and the
//! play/pause, shuffle and repeat flags. Actual decoding is delegated to a
//! [`media::MediaSource`]; tracks come from a [`library::FileCatalog`].

pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod library;
pub mod media;
pub mod model;
pub mod progress;

pub use controller::PlaybackController;
pub use error::{CatalogError, PlayerError};
pub use events::{MediaEvent, PlayerCommand};
pub use library::FileCatalog;
pub use media::{MediaSource, NullMediaSource, RodioMediaSource};
pub use model::{PlaybackState, Playlist, Track, TrackOrigin};
pub use progress::{Progress, format_time, progress};
