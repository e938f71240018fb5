use anyhow::{Context, Result, anyhow, bail};
use rodio::Source;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// The component that actually decodes and plays audio.
///
/// The controller only issues commands and polls for position and
/// completion; it never touches samples.
pub trait MediaSource {
    /// Replaces whatever is loaded with `path`, paused at position zero.
    fn load(&mut self, path: &Path) -> Result<()>;
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
    fn seek(&mut self, seconds: f64) -> Result<()>;
    fn unload(&mut self);
    fn loaded_track(&self) -> Option<&Path>;
    fn is_paused(&self) -> bool;
    fn position(&self) -> Option<Duration>;
    fn duration(&self) -> Option<Duration>;
    /// True once the loaded track played through to its end.
    fn is_finished(&self) -> bool;
}

impl<M: MediaSource + ?Sized> MediaSource for Box<M> {
    fn load(&mut self, path: &Path) -> Result<()> {
        (**self).load(path)
    }

    fn play(&mut self) -> Result<()> {
        (**self).play()
    }

    fn pause(&mut self) {
        (**self).pause();
    }

    fn seek(&mut self, seconds: f64) -> Result<()> {
        (**self).seek(seconds)
    }

    fn unload(&mut self) {
        (**self).unload();
    }

    fn loaded_track(&self) -> Option<&Path> {
        (**self).loaded_track()
    }

    fn is_paused(&self) -> bool {
        (**self).is_paused()
    }

    fn position(&self) -> Option<Duration> {
        (**self).position()
    }

    fn duration(&self) -> Option<Duration> {
        (**self).duration()
    }

    fn is_finished(&self) -> bool {
        (**self).is_finished()
    }
}

/// Opens the system output, falling back to [`NullMediaSource`] when no
/// audio device can be started.
pub fn open_default() -> Box<dyn MediaSource> {
    open_or_null(RodioMediaSource::new)
}

fn open_or_null<M, F>(open: F) -> Box<dyn MediaSource>
where
    M: MediaSource + 'static,
    F: FnOnce() -> Result<M>,
{
    match open() {
        Ok(source) => Box::new(source),
        Err(err) => {
            tracing::warn!("audio output unavailable, using null media source: {err:#}");
            Box::new(NullMediaSource::new())
        }
    }
}

fn seek_position(seconds: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds.max(0.0))
        .map_err(|err| anyhow!("invalid seek position {seconds}: {err}"))
}

pub struct RodioMediaSource {
    stream: OutputStream,
    sink: Sink,
    current: Option<PathBuf>,
    track_duration: Option<Duration>,
}

impl RodioMediaSource {
    pub fn new() -> Result<Self> {
        let mut stream = OutputStreamBuilder::from_default_device()
            .context("failed to open default system output stream")?
            .with_error_callback(|err| tracing::warn!("audio stream error: {err}"))
            .open_stream_or_fallback()
            .context("failed to start default output stream")?;
        stream.log_on_drop(false);
        let sink = Sink::connect_new(stream.mixer());

        Ok(Self {
            stream,
            sink,
            current: None,
            track_duration: None,
        })
    }
}

impl MediaSource for RodioMediaSource {
    fn load(&mut self, path: &Path) -> Result<()> {
        self.sink.stop();
        self.current = None;
        self.track_duration = None;

        let sink = Sink::connect_new(self.stream.mixer());
        sink.pause();

        let file =
            File::open(path).with_context(|| format!("failed to open track {}", path.display()))?;
        let source = Decoder::try_from(file)
            .with_context(|| format!("failed to decode {}", path.display()))?;
        self.track_duration = source
            .total_duration()
            .filter(|duration| !duration.is_zero());
        sink.append(source);

        self.sink = sink;
        self.current = Some(path.to_path_buf());
        tracing::debug!(track = %path.display(), "loaded into output sink");
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        if self.current.is_none() {
            bail!("no track loaded");
        }
        self.sink.play();
        Ok(())
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn seek(&mut self, seconds: f64) -> Result<()> {
        if self.current.is_none() {
            bail!("no track loaded");
        }
        let position = seek_position(seconds)?;
        self.sink
            .try_seek(position)
            .map_err(|err| anyhow!("failed to seek current track: {err:?}"))
    }

    fn unload(&mut self) {
        self.sink.stop();
        self.current = None;
        self.track_duration = None;
    }

    fn loaded_track(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    fn is_paused(&self) -> bool {
        self.sink.is_paused()
    }

    fn position(&self) -> Option<Duration> {
        self.current.as_ref()?;
        Some(self.sink.get_pos())
    }

    fn duration(&self) -> Option<Duration> {
        self.track_duration
    }

    fn is_finished(&self) -> bool {
        self.current.is_some() && !self.sink.is_paused() && self.sink.empty()
    }
}

/// A media source with no audio output: a logical clock that advances while
/// "playing". Used when no output device exists.
pub struct NullMediaSource {
    paused: bool,
    current: Option<PathBuf>,
    started_at: Option<Instant>,
    position_offset: Duration,
    track_duration: Option<Duration>,
    fixed_duration: Option<Duration>,
}

impl NullMediaSource {
    pub fn new() -> Self {
        Self {
            paused: true,
            current: None,
            started_at: None,
            position_offset: Duration::ZERO,
            track_duration: None,
            fixed_duration: None,
        }
    }

    /// Every loaded track reports `duration` instead of a probed one.
    pub fn with_fixed_duration(duration: Duration) -> Self {
        Self {
            fixed_duration: Some(duration),
            ..Self::new()
        }
    }

    fn current_position(&self) -> Duration {
        let mut position = self.position_offset;
        if !self.paused
            && self.current.is_some()
            && let Some(started_at) = self.started_at
        {
            position = position.saturating_add(started_at.elapsed());
        }
        match self.track_duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }
}

impl Default for NullMediaSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaSource for NullMediaSource {
    fn load(&mut self, path: &Path) -> Result<()> {
        self.paused = true;
        self.current = Some(path.to_path_buf());
        self.started_at = None;
        self.position_offset = Duration::ZERO;
        self.track_duration = self.fixed_duration.or_else(|| {
            crate::library::probe_duration_seconds(path)
                .filter(|seconds| *seconds > 0)
                .map(|seconds| Duration::from_secs(u64::from(seconds)))
        });
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        if self.current.is_none() {
            bail!("no track loaded");
        }
        if self.paused {
            self.started_at = Some(Instant::now());
        }
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.position_offset = self.current_position();
        self.started_at = None;
        self.paused = true;
    }

    fn seek(&mut self, seconds: f64) -> Result<()> {
        if self.current.is_none() {
            bail!("no track loaded");
        }
        let position = seek_position(seconds)?;
        self.position_offset = self
            .track_duration
            .map_or(position, |duration| position.min(duration));
        self.started_at = if self.paused {
            None
        } else {
            Some(Instant::now())
        };
        Ok(())
    }

    fn unload(&mut self) {
        self.current = None;
        self.paused = true;
        self.started_at = None;
        self.position_offset = Duration::ZERO;
        self.track_duration = None;
    }

    fn loaded_track(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn position(&self) -> Option<Duration> {
        self.current.as_ref()?;
        Some(self.current_position())
    }

    fn duration(&self) -> Option<Duration> {
        self.track_duration
    }

    fn is_finished(&self) -> bool {
        let Some(duration) = self.track_duration else {
            return false;
        };
        self.current.is_some() && !self.paused && self.current_position() >= duration
    }
}

#[cfg(test)]
mod tests {
    use super::{MediaSource, NullMediaSource, open_or_null};
    use std::path::Path;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn load_leaves_source_paused_at_zero() {
        let mut source = NullMediaSource::new();
        source
            .load(Path::new("nonexistent-track.mp3"))
            .expect("load should work in null mode");
        assert!(source.is_paused());
        assert_eq!(source.position(), Some(Duration::ZERO));
        assert_eq!(source.duration(), None);
    }

    #[test]
    fn play_without_track_is_an_error() {
        let mut source = NullMediaSource::new();
        let err = source.play().expect_err("nothing loaded");
        assert!(err.to_string().contains("no track loaded"));
    }

    #[test]
    fn pause_freezes_position() {
        let mut source = NullMediaSource::new();
        source.load(Path::new("a.mp3")).expect("load");
        source.play().expect("play");
        thread::sleep(Duration::from_millis(20));

        source.pause();
        let paused = source.position().expect("position");
        thread::sleep(Duration::from_millis(20));
        assert_eq!(source.position(), Some(paused));
        assert!(paused > Duration::ZERO);
    }

    #[test]
    fn seek_moves_position_and_clamps_to_duration() {
        let mut source = NullMediaSource::with_fixed_duration(Duration::from_secs(30));
        source.load(Path::new("a.mp3")).expect("load");

        source.seek(12.0).expect("seek");
        assert_eq!(source.position(), Some(Duration::from_secs(12)));

        source.seek(90.0).expect("seek");
        assert_eq!(source.position(), Some(Duration::from_secs(30)));

        source.seek(-4.0).expect("negative seek clamps");
        assert_eq!(source.position(), Some(Duration::ZERO));
    }

    #[test]
    fn finishes_when_duration_elapses() {
        let mut source = NullMediaSource::with_fixed_duration(Duration::from_millis(30));
        source.load(Path::new("a.mp3")).expect("load");
        source.play().expect("play");
        assert!(!source.is_finished());

        thread::sleep(Duration::from_millis(60));
        assert!(source.is_finished());
    }

    #[test]
    fn unknown_duration_never_finishes() {
        let mut source = NullMediaSource::new();
        source.load(Path::new("a.mp3")).expect("load");
        source.play().expect("play");
        thread::sleep(Duration::from_millis(30));
        assert!(!source.is_finished());
    }

    #[test]
    fn boxed_source_forwards_calls() {
        let mut boxed: Box<dyn MediaSource> = Box::new(NullMediaSource::new());
        boxed.load(Path::new("a.mp3")).expect("load");
        assert_eq!(boxed.loaded_track(), Some(Path::new("a.mp3")));
        boxed.unload();
        assert_eq!(boxed.loaded_track(), None);
    }

    #[test]
    fn failed_output_falls_back_to_null_source() {
        let mut source = open_or_null(|| -> anyhow::Result<NullMediaSource> {
            anyhow::bail!("no output device")
        });
        source
            .load(Path::new("missing-on-disk.ogg"))
            .expect("null source loads any path");
        source.play().expect("play");
        assert!(!source.is_paused());
        assert_eq!(source.loaded_track(), Some(Path::new("missing-on-disk.ogg")));
    }

    #[test]
    fn working_output_is_used_as_is() {
        let source = open_or_null(|| {
            Ok(NullMediaSource::with_fixed_duration(Duration::from_secs(7)))
        });
        assert_eq!(source.loaded_track(), None);
        assert!(source.is_paused());
    }
}
