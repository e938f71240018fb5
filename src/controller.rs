use crate::error::{PlayerError, Result};
use crate::events::{MediaEvent, PlayerCommand};
use crate::media::MediaSource;
use crate::model::{PlaybackState, Playlist, Track};
use crate::progress::{self, Progress};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;

/// Owns the playlist and transport flags, and tells the media source what to
/// do. Every mutation is a single synchronous call for one event.
pub struct PlaybackController<M: MediaSource> {
    playlist: Playlist,
    state: PlaybackState,
    media: M,
    last_position: f64,
    last_duration: Option<f64>,
    status: String,
    rng: SmallRng,
}

impl<M: MediaSource> PlaybackController<M> {
    pub fn new(media: M) -> Self {
        Self::with_rng(media, SmallRng::from_os_rng())
    }

    /// Deterministic shuffle order, for reproducible sessions and tests.
    pub fn with_seed(media: M, seed: u64) -> Self {
        Self::with_rng(media, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(media: M, rng: SmallRng) -> Self {
        Self {
            playlist: Playlist::new(),
            state: PlaybackState::default(),
            media,
            last_position: 0.0,
            last_duration: None,
            status: String::from("Ready"),
            rng,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.playlist.get(self.state.current?)
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }

    /// Appends tracks not already present and returns how many were added.
    /// The current index only moves when the playlist was empty.
    pub fn add_tracks<I>(&mut self, tracks: I) -> usize
    where
        I: IntoIterator<Item = Track>,
    {
        let was_empty = self.playlist.is_empty();
        let mut added = 0;
        for track in tracks {
            if self.playlist.push(track) {
                added += 1;
            }
        }

        if was_empty && !self.playlist.is_empty() {
            self.state.current = Some(0);
            self.reset_clock();
        }

        tracing::debug!(added, total = self.playlist.len(), "tracks added");
        self.set_status(&format!("Added {added} tracks"));
        added
    }

    pub fn remove_track(&mut self, index: usize) -> Result<Track> {
        let previous_path = self.current_path();
        let Some(removed) = self.playlist.remove(index) else {
            return Err(self.out_of_range(index));
        };

        let was_loaded = self.media.loaded_track() == Some(removed.path.as_path());
        self.state.current = match self.state.current {
            _ if self.playlist.is_empty() => None,
            Some(current) if current > index => Some(current - 1),
            Some(current) => Some(current.min(self.playlist.len() - 1)),
            None => Some(0),
        };

        tracing::debug!(index, track = %removed.name, "track removed");
        self.set_status(&format!("Removed {}", removed.name));

        if self.playlist.is_empty() {
            self.state.playing = false;
        }
        if self.current_path() != previous_path {
            self.reset_clock();
        }
        if was_loaded {
            self.media.unload();
            self.reset_clock();
            if self.state.playing {
                self.start_current()?;
            }
        }
        Ok(removed)
    }

    pub fn select_track(&mut self, index: usize) -> Result<()> {
        if index >= self.playlist.len() {
            return Err(self.out_of_range(index));
        }

        self.move_to(index);
        tracing::debug!(index, "track selected");
        self.set_status("Selected track");
        if self.state.playing {
            self.start_current()?;
        }
        Ok(())
    }

    /// Flips play/pause and returns the new playing flag.
    pub fn toggle_play(&mut self) -> Result<bool> {
        if self.playlist.is_empty() {
            return Err(self.empty_playlist("toggle play"));
        }

        if self.state.playing {
            self.media.pause();
            self.state.playing = false;
            self.set_status("Paused");
        } else {
            self.ensure_loaded()?;
            self.media.play()?;
            self.state.playing = true;
            self.set_status("Playing");
        }
        tracing::debug!(playing = self.state.playing, "play toggled");
        Ok(self.state.playing)
    }

    pub fn next(&mut self) -> Result<usize> {
        let (current, len) = self.position_and_len("next")?;
        self.step_to((current + 1) % len)
    }

    pub fn previous(&mut self) -> Result<usize> {
        let (current, len) = self.position_and_len("previous")?;
        self.step_to((current + len - 1) % len)
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        self.state.shuffle = !self.state.shuffle;
        self.set_status(if self.state.shuffle {
            "Shuffle on"
        } else {
            "Shuffle off"
        });
        self.state.shuffle
    }

    pub fn toggle_repeat(&mut self) -> bool {
        self.state.repeat = !self.state.repeat;
        self.set_status(if self.state.repeat {
            "Repeat on"
        } else {
            "Repeat off"
        });
        self.state.repeat
    }

    /// Chooses what plays after the current track finishes: the same track
    /// when repeat is on, a uniformly random one when shuffle is on (the
    /// current track included), otherwise the next one with wrap-around.
    pub fn on_track_ended(&mut self) -> Result<usize> {
        let (current, len) = self.position_and_len("track ended")?;

        let index = if self.state.repeat {
            current
        } else if self.state.shuffle {
            self.rng.random_range(0..len)
        } else {
            (current + 1) % len
        };

        self.state.current = Some(index);
        tracing::debug!(
            from = current,
            to = index,
            repeat = self.state.repeat,
            shuffle = self.state.shuffle,
            "track ended"
        );
        self.start_current()?;
        Ok(index)
    }

    pub fn on_time_update(&mut self, current: f64, duration: Option<f64>) -> Progress {
        self.last_position = current;
        if duration.is_some() {
            self.last_duration = duration;
        }
        progress::progress(self.last_position, self.last_duration)
    }

    pub fn progress(&self) -> Progress {
        progress::progress(self.last_position, self.last_duration)
    }

    pub fn seek(&mut self, seconds: f64) -> Result<()> {
        if self.playlist.is_empty() {
            return Err(self.empty_playlist("seek"));
        }

        self.ensure_loaded()?;
        self.media.seek(seconds)?;
        self.last_position = if seconds.is_finite() {
            seconds.max(0.0)
        } else {
            0.0
        };
        self.set_status(&format!("Seeked to {}", progress::format_time(seconds)));
        Ok(())
    }

    /// Seeks to `fraction` of the known duration and returns the target in
    /// seconds.
    pub fn seek_to_fraction(&mut self, fraction: f64) -> Result<f64> {
        if self.playlist.is_empty() {
            return Err(self.empty_playlist("seek"));
        }

        let duration = self
            .last_duration
            .or_else(|| {
                self.current_track()
                    .and_then(|track| track.duration_seconds)
                    .map(f64::from)
            })
            .filter(|duration| duration.is_finite() && *duration > 0.0)
            .ok_or(PlayerError::UnknownDuration)?;

        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let target = fraction * duration;
        self.seek(target)?;
        Ok(target)
    }

    /// Dispatches one media notification. Time updates yield the progress to
    /// display.
    pub fn handle_event(&mut self, event: MediaEvent) -> Result<Option<Progress>> {
        match event {
            MediaEvent::TimeUpdate { current, duration } => {
                Ok(Some(self.on_time_update(current, duration)))
            }
            MediaEvent::Ended => self.on_track_ended().map(|_| None),
        }
    }

    pub fn apply(&mut self, command: PlayerCommand) -> Result<()> {
        match command {
            PlayerCommand::Select(index) => self.select_track(index),
            PlayerCommand::Remove(index) => self.remove_track(index).map(|_| ()),
            PlayerCommand::TogglePlay => self.toggle_play().map(|_| ()),
            PlayerCommand::Next => self.next().map(|_| ()),
            PlayerCommand::Previous => self.previous().map(|_| ()),
            PlayerCommand::ToggleShuffle => {
                self.toggle_shuffle();
                Ok(())
            }
            PlayerCommand::ToggleRepeat => {
                self.toggle_repeat();
                Ok(())
            }
            PlayerCommand::Seek(seconds) => self.seek(seconds),
            PlayerCommand::SeekFraction(fraction) => self.seek_to_fraction(fraction).map(|_| ()),
        }
    }

    /// Polls the media source once and turns what it reports into an event.
    /// For backends that cannot call back on their own.
    pub fn tick(&mut self) -> Result<Option<Progress>> {
        let Some(path) = self.current_path() else {
            return Ok(None);
        };
        if self.media.loaded_track() != Some(path.as_path()) {
            return Ok(None);
        }

        if self.state.playing && self.media.is_finished() {
            return self.handle_event(MediaEvent::Ended);
        }

        let Some(position) = self.media.position() else {
            return Ok(None);
        };
        let duration = self.media.duration().map(|duration| duration.as_secs_f64());
        self.handle_event(MediaEvent::TimeUpdate {
            current: position.as_secs_f64(),
            duration,
        })
    }

    fn step_to(&mut self, index: usize) -> Result<usize> {
        self.move_to(index);
        self.set_status("Changed track");
        if self.state.playing {
            self.start_current()?;
        }
        Ok(index)
    }

    /// The clock belongs to the current track, so it restarts whenever the
    /// index changes, loaded or not.
    fn move_to(&mut self, index: usize) {
        if self.state.current != Some(index) {
            self.state.current = Some(index);
            self.reset_clock();
        }
    }

    fn position_and_len(&mut self, action: &str) -> Result<(usize, usize)> {
        match self.state.current {
            Some(current) if !self.playlist.is_empty() => Ok((current, self.playlist.len())),
            _ => Err(self.empty_playlist(action)),
        }
    }

    fn current_path(&self) -> Option<PathBuf> {
        self.current_track().map(|track| track.path.clone())
    }

    /// Loads the current track from position zero and plays it when the
    /// playing flag is set. A failure stops playback.
    fn start_current(&mut self) -> Result<()> {
        let Some(path) = self.current_path() else {
            return Ok(());
        };

        let started = match self.media.load(&path) {
            Ok(()) if self.state.playing => self.media.play(),
            other => other,
        };
        self.reset_clock();
        if let Err(err) = started {
            self.state.playing = false;
            tracing::warn!(track = %path.display(), "playback stopped: {err:#}");
            self.set_status("Playback stopped: track failed to load");
            return Err(err.into());
        }
        Ok(())
    }

    fn ensure_loaded(&mut self) -> Result<()> {
        let Some(path) = self.current_path() else {
            return Ok(());
        };

        if self.media.loaded_track() != Some(path.as_path()) {
            self.media.load(&path)?;
            self.reset_clock();
        }
        Ok(())
    }

    fn reset_clock(&mut self) {
        self.last_position = 0.0;
        self.last_duration = self
            .current_track()
            .and_then(|track| track.duration_seconds)
            .filter(|seconds| *seconds > 0)
            .map(f64::from);
    }

    fn out_of_range(&mut self, index: usize) -> PlayerError {
        let len = self.playlist.len();
        tracing::warn!(index, len, "track index out of range");
        self.set_status(&format!("No track at position {index}"));
        PlayerError::OutOfRange { index, len }
    }

    fn empty_playlist(&mut self, action: &str) -> PlayerError {
        tracing::warn!(action, "ignored: playlist is empty");
        self.set_status("Playlist is empty");
        PlayerError::EmptyPlaylist
    }

    fn set_status(&mut self, message: &str) {
        self.status = message.to_string();
    }
}
