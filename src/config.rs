use std::path::Path;
use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::{
    composition::Pacing,
    error::{ConfigError, Result},
    overlay::OverlayConfig,
    video::{Container, VideoParams},
};

/// Main configuration for the clip compositor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Decoding and frame rate settings
    pub video: VideoConfig,

    /// Output artifact settings
    pub capture: CaptureConfig,

    /// Playback loop settings
    pub playback: PlaybackConfig,

    /// Text overlay settings
    pub overlay: OverlayConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.video.validate()?;
        self.capture.validate()?;
        self.playback.validate()?;
        self.overlay.validate()?;
        Ok(())
    }
}

/// Video decoding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Frame rate and quality targets
    pub params: VideoParams,

    /// How long a still image plays when queued as a clip (seconds)
    pub still_clip_duration: f64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            params: VideoParams::default(),
            still_clip_duration: 3.0,
        }
    }
}

impl VideoConfig {
    /// Time between two captured frames
    pub fn frame_period(&self) -> Result<Duration> {
        let fps = self.params.fps;
        match Duration::try_from_secs_f64(1.0 / fps) {
            Ok(period) if fps.is_finite() && fps > 0.0 && !period.is_zero() => Ok(period),
            _ => Err(ConfigError::InvalidValue {
                key: "video.params.fps".to_string(),
                value: fps.to_string()
            }.into()),
        }
    }

    fn validate(&self) -> Result<()> {
        self.frame_period()?;

        if self.params.quality > 100 {
            return Err(ConfigError::InvalidValue {
                key: "video.params.quality".to_string(),
                value: self.params.quality.to_string()
            }.into());
        }

        if self.still_clip_duration.is_nan() || self.still_clip_duration <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "video.still_clip_duration".to_string(),
                value: self.still_clip_duration.to_string()
            }.into());
        }

        Ok(())
    }
}

/// Output artifact configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Container the capture session encodes into
    pub container: Container,

    /// Suggested file name without extension
    pub file_stem: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            container: Container::Webm,
            file_stem: "ultimate_video".to_string(),
        }
    }
}

impl CaptureConfig {
    /// Suggested file name including the container extension
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.file_stem, self.container.extension())
    }

    fn validate(&self) -> Result<()> {
        if self.file_stem.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "capture.file_stem".to_string(),
                value: self.file_stem.clone()
            }.into());
        }

        Ok(())
    }
}

/// Playback loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// How frames are paced
    pub pacing: Pacing,

    /// Wait and preload the next clip before advancing
    pub crossfade: bool,

    /// Crossfade wait (seconds)
    pub crossfade_delay: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            pacing: Pacing::Realtime,
            crossfade: false,
            crossfade_delay: 1.0,
        }
    }
}

impl PlaybackConfig {
    /// Wait between clips when crossfade is on
    pub fn crossfade_wait(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.crossfade_delay).map_err(|_| {
            ConfigError::InvalidValue {
                key: "playback.crossfade_delay".to_string(),
                value: self.crossfade_delay.to_string()
            }.into()
        })
    }

    fn validate(&self) -> Result<()> {
        self.crossfade_wait()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.video.params.fps, 30.0);
        assert_eq!(config.capture.file_name(), "ultimate_video.webm");
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test_config.toml");

        let mut original_config = Config::default();
        original_config.capture.container = Container::Gif;
        original_config.playback.crossfade = true;

        original_config.save_to_file(&file_path).unwrap();
        let loaded_config = Config::from_file(&file_path).unwrap();

        assert_eq!(loaded_config.capture.container, Container::Gif);
        assert!(loaded_config.playback.crossfade);
        assert_eq!(original_config.video.params.fps, loaded_config.video.params.fps);
        assert_eq!(original_config.overlay.fade_frames, loaded_config.overlay.fade_frames);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("partial.toml");
        std::fs::write(&file_path, "[playback]\npacing = \"unpaced\"\n").unwrap();

        let config = Config::from_file(&file_path).unwrap();
        assert_eq!(config.playback.pacing, Pacing::Unpaced);
        assert_eq!(config.playback.crossfade_delay, 1.0);
        assert_eq!(config.capture.container, Container::Webm);
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(
            err,
            crate::error::CompositorError::Config(ConfigError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_invalid_fps() {
        let mut config = Config::default();
        config.video.params.fps = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unrepresentable_fps() {
        let mut config = Config::default();
        config.video.params.fps = f64::INFINITY;
        assert!(config.validate().is_err());

        config.video.params.fps = 1e-30;
        assert!(config.validate().is_err());

        config.video.params.fps = 24.0;
        assert_eq!(
            config.video.frame_period().unwrap(),
            Duration::from_secs_f64(1.0 / 24.0)
        );
    }

    #[test]
    fn test_invalid_crossfade_delay() {
        let mut config = Config::default();
        config.playback.crossfade_delay = -1.0;
        assert!(config.validate().is_err());

        config.playback.crossfade_delay = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_huge_crossfade_delay_rejected_on_load() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("huge.toml");
        std::fs::write(&file_path, "[playback]\ncrossfade = true\ncrossfade_delay = 1e20\n").unwrap();

        let err = Config::from_file(&file_path).unwrap_err();
        assert!(matches!(
            err,
            crate::error::CompositorError::Config(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_empty_file_stem() {
        let mut config = Config::default();
        config.capture.file_stem = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
