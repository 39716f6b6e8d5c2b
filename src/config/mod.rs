// Configuration management for midibox
// Handles loading/saving settings, with sensible defaults when config is missing

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine the home directory for the default library root")]
    NoHomeDir,
    #[error("could not determine a data directory for logs")]
    NoDataDir,
    #[error("could not find config directory")]
    NoConfigDir,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Library root; `~/music/midi` when unset.
    pub library_root: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub synth: SynthConfig,
    pub playback: PlaybackConfig,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    pub command: String,
    pub audio_driver: String,
    pub midi_driver: String,
    pub soundfont: PathBuf,
    pub extra_args: Vec<String>,
    /// How long to wait for a stopped track to report completion.
    pub stop_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub autoplay: bool,
    pub start_paused: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub desktop: bool,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            command: "fluidsynth".to_string(),
            audio_driver: "alsa".to_string(),
            midi_driver: "alsa_seq".to_string(),
            soundfont: PathBuf::from("/usr/share/soundfonts/default.sf2"),
            extra_args: Vec::new(),
            stop_timeout_ms: 5000,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            autoplay: true,
            start_paused: false,
        }
    }
}

impl Config {
    /// Load from the default location, writing defaults there if missing.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = fs::read_to_string(config_path)
                .with_context(|| format!("reading {}", config_path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("parsing {}", config_path.display()))?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(config_path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(config_path, content)
            .with_context(|| format!("writing {}", config_path.display()))?;

        Ok(())
    }

    pub fn library_root(&self) -> Result<PathBuf, ConfigError> {
        match &self.library_root {
            Some(root) => Ok(root.clone()),
            None => dirs::home_dir()
                .map(|home| home.join("music").join("midi"))
                .ok_or(ConfigError::NoHomeDir),
        }
    }

    pub fn log_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.log_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_local_dir()
                .map(|dir| dir.join("midibox").join("logs"))
                .ok_or(ConfigError::NoDataDir),
        }
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = config_dir().ok_or(ConfigError::NoConfigDir)?.join("midibox");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config, Config::default());
        assert!(path.exists());
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "library_root = \"/srv/midi\"\n\n[synth]\naudio_driver = \"pulseaudio\"\n\n[playback]\nautoplay = false\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.library_root().unwrap(), PathBuf::from("/srv/midi"));
        assert_eq!(config.synth.audio_driver, "pulseaudio");
        assert_eq!(config.synth.command, "fluidsynth");
        assert_eq!(config.synth.stop_timeout_ms, 5000);
        assert!(!config.playback.autoplay);
        assert!(!config.playback.start_paused);
        assert!(!config.notifications.desktop);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "library_root = [not toml").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_default_root_under_home() {
        let config = Config::default();
        if let Some(home) = dirs::home_dir() {
            assert_eq!(config.library_root().unwrap(), home.join("music").join("midi"));
        }
    }
}
