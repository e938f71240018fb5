use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "tunedeck";
const SETTINGS_FILE: &str = "settings.json";
const UPLOAD_DIR: &str = "uploads";
const CONFIG_DIR_ENV: &str = "TUNEDECK_CONFIG_DIR";

pub const DEFAULT_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub folders: Vec<PathBuf>,
    #[serde(default)]
    pub upload_dir: Option<PathBuf>,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            folders: Vec::new(),
            upload_dir: None,
            extensions: default_extensions(),
        }
    }
}

impl Settings {
    /// Upload directory from the settings, or `<config root>/uploads`.
    pub fn resolved_upload_dir(&self) -> Result<PathBuf> {
        match &self.upload_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(config_root()?.join(UPLOAD_DIR)),
        }
    }
}

pub fn config_root() -> Result<PathBuf> {
    if let Ok(override_dir) = env::var(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(override_dir));
    }

    let base = dirs::config_dir().context("no platform config directory available")?;
    Ok(base.join(APP_DIR))
}

pub fn settings_path() -> Result<PathBuf> {
    Ok(config_root()?.join(SETTINGS_FILE))
}

pub fn load_settings() -> Result<Settings> {
    load_settings_from(&settings_path()?)
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(&settings_path()?, settings)
}

pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no settings file, using defaults");
        return Ok(Settings::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file {}", path.display()))?;
    let settings: Settings = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse settings file {}", path.display()))?;
    Ok(settings)
}

pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::debug!(path = %path.display(), "settings saved");
    Ok(())
}

pub fn normalize_path(path: &Path) -> PathBuf {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    strip_windows_verbatim_prefix(&canonical)
}

pub fn strip_windows_verbatim_prefix(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();

    if let Some(trimmed) = raw.strip_prefix(r"\\?\UNC\") {
        return PathBuf::from(format!(r"\\{trimmed}"));
    }

    if let Some(trimmed) = raw.strip_prefix(r"\\?\") {
        return PathBuf::from(trimmed);
    }

    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join(SETTINGS_FILE);

        let settings = Settings {
            folders: vec![PathBuf::from("/music")],
            upload_dir: Some(PathBuf::from("/tmp/uploads")),
            ..Settings::default()
        };
        save_settings_to(&path, &settings).expect("save");
        let loaded = load_settings_from(&path).expect("load");
        assert_eq!(loaded, settings);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().expect("tempdir");
        let loaded = load_settings_from(&dir.path().join("absent.json")).expect("load");
        assert_eq!(loaded.extensions, vec!["mp3", "wav", "ogg"]);
        assert!(loaded.folders.is_empty());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, r#"{ "folders": ["/srv/music"] }"#).expect("write");

        let loaded = load_settings_from(&path).expect("load");
        assert_eq!(loaded.folders, vec![PathBuf::from("/srv/music")]);
        assert_eq!(loaded.upload_dir, None);
        assert_eq!(loaded.extensions.len(), 3);
    }

    #[test]
    fn corrupt_file_reports_path() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "{ not json").expect("write");

        let err = load_settings_from(&path).expect_err("error");
        assert!(
            err.to_string().contains("failed to parse settings file"),
            "unexpected error: {err:#}"
        );
    }

    #[test]
    fn strips_windows_verbatim_prefix() {
        let cleaned = strip_windows_verbatim_prefix(Path::new(r"\\?\E:\LOCALMUSIC\a.mp3"));
        assert_eq!(cleaned, PathBuf::from(r"E:\LOCALMUSIC\a.mp3"));
    }
}
