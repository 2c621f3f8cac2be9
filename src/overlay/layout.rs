use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ConfigError, Result};

/// Text overlay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Font size at full scale (pixels)
    pub base_font_size: f32,

    /// Frames the fade-in takes
    pub fade_frames: u32,

    /// Left end of the text baseline once fully faded in (pixels)
    pub anchor_x: f32,
    pub anchor_y: f32,

    /// How far below the anchor the text starts (pixels)
    pub slide_distance: f32,

    /// Fill color
    pub color: [u8; 3],

    /// TrueType/OpenType font; common system fonts are probed when unset
    pub font_path: Option<PathBuf>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            base_font_size: 50.0,
            fade_frames: 60,
            anchor_x: 50.0,
            anchor_y: 50.0,
            slide_distance: 50.0,
            color: [255, 255, 255],
            font_path: None,
        }
    }
}

impl OverlayConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.base_font_size.is_nan() || self.base_font_size <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "overlay.base_font_size".to_string(),
                value: self.base_font_size.to_string(),
            }
            .into());
        }

        if self.fade_frames == 0 {
            return Err(ConfigError::InvalidValue {
                key: "overlay.fade_frames".to_string(),
                value: self.fade_frames.to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// Where and how the overlay text is drawn on one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayLayout {
    /// Opacity in `[0, 1]`
    pub alpha: f32,
    /// `0.5` at the start of a clip, `1.0` once faded in
    pub scale: f32,
    pub x: f32,
    /// Baseline position
    pub y: f32,
    pub font_size: f32,
}

impl OverlayLayout {
    /// Layout for the given frame of the current clip
    pub fn at_frame(config: &OverlayConfig, frame_counter: u64) -> Self {
        let fade = config.fade_frames.max(1) as f64;
        let alpha = (frame_counter as f64 / fade).clamp(0.0, 1.0) as f32;
        let scale = 0.5 + 0.5 * alpha;

        Self {
            alpha,
            scale,
            x: config.anchor_x,
            y: config.anchor_y + config.slide_distance * (1.0 - alpha),
            font_size: config.base_font_size * scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fade_in_endpoints() {
        let config = OverlayConfig::default();

        let start = OverlayLayout::at_frame(&config, 0);
        assert_eq!(start.alpha, 0.0);
        assert_eq!(start.scale, 0.5);
        assert_eq!(start.y, 100.0);
        assert_eq!(start.x, 50.0);
        assert_eq!(start.font_size, 25.0);

        let done = OverlayLayout::at_frame(&config, 60);
        assert_eq!(done.alpha, 1.0);
        assert_eq!(done.scale, 1.0);
        assert_eq!(done.y, 50.0);
        assert_eq!(done.font_size, 50.0);

        let later = OverlayLayout::at_frame(&config, 120);
        assert_eq!(later, done);
    }

    #[test]
    fn test_fade_midpoint() {
        let layout = OverlayLayout::at_frame(&OverlayConfig::default(), 30);
        assert!((layout.alpha - 0.5).abs() < 1e-6);
        assert!((layout.scale - 0.75).abs() < 1e-6);
        assert!((layout.y - 75.0).abs() < 1e-4);
        assert!((layout.font_size - 37.5).abs() < 1e-4);
    }

    #[test]
    fn test_alpha_never_decreases() {
        let config = OverlayConfig::default();
        let mut previous = 0.0;
        for frame in 0..200 {
            let alpha = OverlayLayout::at_frame(&config, frame).alpha;
            assert!(alpha >= previous);
            assert!(alpha <= 1.0);
            previous = alpha;
        }
    }

    #[test]
    fn test_invalid_overlay_config() {
        let mut config = OverlayConfig::default();
        config.fade_frames = 0;
        assert!(config.validate().is_err());

        let mut config = OverlayConfig::default();
        config.base_font_size = 0.0;
        assert!(config.validate().is_err());
    }
}
