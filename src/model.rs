use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackOrigin {
    Uploaded,
    Discovered,
    Downloaded,
}

/// One playable item. The path is the identifier; uploads are written to
/// disk by the catalog before a `Track` is handed out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Track {
    pub path: PathBuf,
    pub name: String,
    pub origin: TrackOrigin,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
}

impl Track {
    pub fn new(path: impl Into<PathBuf>, origin: TrackOrigin) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path,
            name,
            origin,
            duration_seconds: None,
        }
    }

    pub fn with_duration(mut self, seconds: Option<u32>) -> Self {
        self.duration_seconds = seconds;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackState {
    pub current: Option<usize>,
    pub playing: bool,
    pub shuffle: bool,
    pub repeat: bool,
}

/// Ordered tracks, unique by normalized path. Each key is computed once when
/// the track is pushed.
#[derive(Debug, Clone, Default)]
pub struct Playlist {
    tracks: Vec<Track>,
    keys: Vec<String>,
    lookup: HashMap<String, usize>,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.position(path).is_some()
    }

    pub fn position(&self, path: &Path) -> Option<usize> {
        self.lookup.get(&normalized_path_key(path)).copied()
    }

    /// Appends unless a track with the same identifier is already present.
    pub fn push(&mut self, track: Track) -> bool {
        let key = normalized_path_key(&track.path);
        if self.lookup.contains_key(&key) {
            return false;
        }
        self.lookup.insert(key.clone(), self.tracks.len());
        self.keys.push(key);
        self.tracks.push(track);
        true
    }

    pub fn remove(&mut self, index: usize) -> Option<Track> {
        if index >= self.tracks.len() {
            return None;
        }
        let removed = self.tracks.remove(index);
        let key = self.keys.remove(index);
        self.lookup.remove(&key);
        for position in self.lookup.values_mut() {
            if *position > index {
                *position -= 1;
            }
        }
        Some(removed)
    }
}

pub(crate) fn normalized_path_key(path: &Path) -> String {
    let normalized = crate::config::normalize_path(path);
    let value = normalized.to_string_lossy();
    if cfg!(windows) {
        value.to_ascii_lowercase()
    } else {
        value.to_string()
    }
}
