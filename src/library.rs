use crate::config::{self, Settings};
use crate::error::CatalogError;
use crate::model::{Track, TrackOrigin};
use sha2::{Digest, Sha256};
use std::ffi::OsStr;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::get_probe;
use walkdir::WalkDir;

const HASH_PREFIX_LEN: usize = 12;

/// Supplies tracks to the controller: directory scans, persisted uploads and
/// files produced by an external downloader.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    upload_dir: PathBuf,
    extensions: Vec<String>,
    folders: Vec<PathBuf>,
}

impl FileCatalog {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            extensions: config::DEFAULT_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            folders: Vec::new(),
        }
    }

    /// Upload directory, extensions and library folders from saved settings.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let mut catalog = Self::new(settings.resolved_upload_dir()?)
            .with_extensions(settings.extensions.as_slice());
        catalog.folders = settings.folders.clone();
        Ok(catalog)
    }

    pub fn with_extensions<S: AsRef<str>>(mut self, extensions: &[S]) -> Self {
        self.extensions = extensions
            .iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        self
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn folders(&self) -> &[PathBuf] {
        &self.folders
    }

    pub fn is_supported(&self, path: &Path) -> bool {
        let ext = path.extension().and_then(OsStr::to_str).unwrap_or_default();
        self.extensions
            .iter()
            .any(|supported| ext.eq_ignore_ascii_case(supported))
    }

    pub fn scan_folder(&self, root: &Path) -> Vec<Track> {
        let mut tracks = Vec::new();

        for entry in WalkDir::new(root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!("skipping unreadable entry under {}: {err}", root.display());
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file() || !self.is_supported(path) {
                continue;
            }

            let cleaned = config::strip_windows_verbatim_prefix(path);
            let duration = probe_duration_seconds(&cleaned);
            tracks.push(Track::new(cleaned, TrackOrigin::Discovered).with_duration(duration));
        }

        tracks.sort_by(|a, b| a.path.cmp(&b.path));
        tracing::info!(root = %root.display(), count = tracks.len(), "scanned folder");
        tracks
    }

    pub fn scan_many(&self, roots: &[PathBuf]) -> Vec<Track> {
        let mut tracks: Vec<Track> = roots
            .iter()
            .flat_map(|root| self.scan_folder(root))
            .collect();
        tracks.sort_by(|a, b| a.path.cmp(&b.path));
        tracks.dedup_by(|a, b| a.path == b.path);
        tracks
    }

    /// Scans every configured library folder.
    pub fn scan_folders(&self) -> Vec<Track> {
        self.scan_many(&self.folders)
    }

    /// Persists uploaded bytes under the upload directory and returns the
    /// stored track. The stored file name carries a content-hash prefix, so
    /// re-uploading identical bytes maps to the same identifier.
    pub fn import_upload(&self, file_name: &str, bytes: &[u8]) -> Result<Track, CatalogError> {
        let display_name = Path::new(file_name)
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| CatalogError::UnsupportedFormat(PathBuf::from(file_name)))?;

        if !self.is_supported(Path::new(&display_name)) {
            tracing::warn!(file = %display_name, "rejected upload with unsupported format");
            return Err(CatalogError::UnsupportedFormat(PathBuf::from(display_name)));
        }

        fs::create_dir_all(&self.upload_dir).map_err(|source| CatalogError::Io {
            path: self.upload_dir.clone(),
            source,
        })?;

        let stored = self
            .upload_dir
            .join(format!("{}-{display_name}", content_hash_prefix(bytes)));
        let complete = fs::metadata(&stored)
            .is_ok_and(|meta| meta.is_file() && meta.len() == bytes.len() as u64);
        if !complete {
            write_then_rename(&stored, bytes)?;
        }

        tracing::info!(file = %display_name, stored = %stored.display(), "imported upload");
        let duration = probe_duration_seconds(&stored);
        Ok(Track {
            path: stored,
            name: display_name,
            origin: TrackOrigin::Uploaded,
            duration_seconds: duration,
        })
    }

    /// Wraps a file written by an external downloader as a track.
    pub fn register_download(&self, path: &Path) -> Result<Track, CatalogError> {
        if !self.is_supported(path) {
            tracing::warn!(file = %path.display(), "rejected download with unsupported format");
            return Err(CatalogError::UnsupportedFormat(path.to_path_buf()));
        }

        let metadata = fs::metadata(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if !metadata.is_file() {
            return Err(CatalogError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a file"),
            });
        }

        let cleaned = config::strip_windows_verbatim_prefix(path);
        let duration = probe_duration_seconds(&cleaned);
        Ok(Track::new(cleaned, TrackOrigin::Downloaded).with_duration(duration))
    }
}

/// Writes next to `dest` and renames into place, so `dest` never holds a
/// partial upload.
fn write_then_rename(dest: &Path, bytes: &[u8]) -> Result<(), CatalogError> {
    let mut partial_name = dest.as_os_str().to_os_string();
    partial_name.push(".part");
    let partial = PathBuf::from(partial_name);

    fs::write(&partial, bytes).map_err(|source| CatalogError::Io {
        path: partial.clone(),
        source,
    })?;
    fs::rename(&partial, dest).map_err(|source| {
        let _ = fs::remove_file(&partial);
        CatalogError::Io {
            path: dest.to_path_buf(),
            source,
        }
    })
}

fn content_hash_prefix(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let hex: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
    hex[..HASH_PREFIX_LEN].to_string()
}

/// Container-reported duration, rounded to whole seconds.
pub fn probe_duration_seconds(path: &Path) -> Option<u32> {
    let file = File::open(path).ok()?;
    let source = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(OsStr::to_str) {
        hint.with_extension(extension);
    }

    let probed = get_probe()
        .format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .ok()?;

    let params = &probed.format.default_track()?.codec_params;
    if let (Some(time_base), Some(frames)) = (params.time_base, params.n_frames) {
        let time = time_base.calc_time(frames);
        let mut seconds = time.seconds as u32;
        if time.frac >= 0.5 {
            seconds = seconds.saturating_add(1);
        }
        return Some(seconds);
    }

    let (frames, sample_rate) = params
        .n_frames
        .zip(params.sample_rate)
        .filter(|(_, rate)| *rate > 0)?;
    Some((frames as f64 / f64::from(sample_rate)).round() as u32)
}
