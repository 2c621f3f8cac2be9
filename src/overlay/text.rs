use std::path::{Path, PathBuf};

use fontdue::{Font, FontSettings};
use tracing::{debug, warn};

use crate::{
    error::{OverlayError, Result},
    overlay::layout::{OverlayConfig, OverlayLayout},
    video::types::Frame,
};

/// Fonts tried in order when the config names none
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Load a font file for glyph rasterization
pub fn load_font<P: AsRef<Path>>(path: P) -> Result<Font> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| OverlayError::FontLoadFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    Font::from_bytes(bytes, FontSettings::default()).map_err(|e| {
        OverlayError::FontLoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// The configured font, or the first loadable system font
pub fn discover_font(config: &OverlayConfig) -> Option<Font> {
    let candidates = config
        .font_path
        .iter()
        .cloned()
        .chain(SYSTEM_FONT_CANDIDATES.iter().map(PathBuf::from));

    for path in candidates {
        if !path.exists() {
            continue;
        }
        match load_font(&path) {
            Ok(font) => {
                debug!("Overlay font: {}", path.display());
                return Some(font);
            }
            Err(e) => warn!("{}", e),
        }
    }
    None
}

/// Source-over blend of a solid color onto one RGBA pixel
pub(crate) fn blend_over(dst: &mut [u8], color: [u8; 3], src_alpha: f32) {
    let sa = src_alpha.clamp(0.0, 1.0);
    if sa <= 0.0 {
        return;
    }

    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return;
    }

    for channel in 0..3 {
        let src = color[channel] as f32;
        let below = dst[channel] as f32;
        let value = (src * sa + below * da * (1.0 - sa)) / out_a;
        dst[channel] = value.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Animated text drawn on top of each transformed frame
///
/// The text fades in, grows from half size and slides up into place over
/// the first `fade_frames` frames of every clip.
pub struct TextOverlay {
    text: String,
    config: OverlayConfig,
    font: Option<Font>,
}

impl TextOverlay {
    /// Create an overlay, probing for a font when the text is not empty
    pub fn new<S: Into<String>>(text: S, config: OverlayConfig) -> Self {
        let text = text.into();
        let font = if text.is_empty() {
            None
        } else {
            let font = discover_font(&config);
            if font.is_none() {
                warn!("No overlay font could be loaded, text '{}' will not be drawn", text);
            }
            font
        };
        Self { text, config, font }
    }

    pub fn with_font<S: Into<String>>(text: S, config: OverlayConfig, font: Font) -> Self {
        Self {
            text: text.into(),
            config,
            font: Some(font),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Layout for this frame, `None` when there is nothing to draw
    pub fn layout(&self, frame_counter: u64) -> Option<OverlayLayout> {
        if self.text.is_empty() {
            return None;
        }
        Some(OverlayLayout::at_frame(&self.config, frame_counter))
    }

    /// Draw the text onto the frame
    pub fn render(&self, frame: &mut Frame, frame_counter: u64) -> Result<()> {
        let Some(layout) = self.layout(frame_counter) else {
            return Ok(());
        };
        let Some(font) = self.font.as_ref() else {
            return Ok(());
        };
        if layout.alpha <= 0.0 {
            return Ok(());
        }

        let (width, height) = (frame.width() as i64, frame.height() as i64);
        let baseline = layout.y.round() as i64;
        let mut pen_x = layout.x;

        for ch in self.text.chars() {
            let (metrics, bitmap) = font.rasterize(ch, layout.font_size);
            let glyph_left = (pen_x.round() as i64) + metrics.xmin as i64;
            let glyph_top = baseline - (metrics.height as i64 + metrics.ymin as i64);

            for gy in 0..metrics.height {
                let py = glyph_top + gy as i64;
                if py < 0 || py >= height {
                    continue;
                }
                for gx in 0..metrics.width {
                    let coverage = bitmap[gy * metrics.width + gx];
                    if coverage == 0 {
                        continue;
                    }
                    let px = glyph_left + gx as i64;
                    if px < 0 || px >= width {
                        continue;
                    }
                    let src_alpha = (coverage as f32 / 255.0) * layout.alpha;
                    blend_over(
                        frame.get_pixel_mut(px as u32, py as u32),
                        self.config.color,
                        src_alpha,
                    );
                }
            }

            pen_x += metrics.advance_width;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_over_opaque_destination() {
        let mut px = [0u8, 0, 0, 255];
        blend_over(&mut px, [255, 255, 255], 0.5);
        assert_eq!(px, [128, 128, 128, 255]);

        let mut px = [10u8, 20, 30, 255];
        blend_over(&mut px, [255, 255, 255], 0.0);
        assert_eq!(px, [10, 20, 30, 255]);

        let mut px = [10u8, 20, 30, 255];
        blend_over(&mut px, [200, 100, 50], 1.0);
        assert_eq!(px, [200, 100, 50, 255]);
    }

    #[test]
    fn test_blend_over_transparent_destination() {
        let mut px = [0u8, 0, 0, 0];
        blend_over(&mut px, [255, 0, 0], 0.5);
        assert_eq!(px, [255, 0, 0, 128]);
    }

    #[test]
    fn test_empty_text_draws_nothing() {
        let overlay = TextOverlay::new("", OverlayConfig::default());
        assert!(overlay.is_empty());
        assert!(overlay.layout(30).is_none());

        let mut frame = Frame::new_filled(120, 120, [5, 6, 7, 255]);
        let before = frame.clone();
        overlay.render(&mut frame, 60).unwrap();
        assert_eq!(frame, before);
    }

    #[test]
    fn test_missing_font_path_is_an_error() {
        let err = load_font("/no/such/font.ttf").err().unwrap();
        assert!(matches!(
            err,
            crate::error::CompositorError::Overlay(OverlayError::FontLoadFailed { .. })
        ));
    }

    #[test]
    fn test_render_with_system_font() {
        let config = OverlayConfig::default();
        let Some(font) = discover_font(&config) else {
            // no font on this machine; layout is covered separately
            return;
        };
        let overlay = TextOverlay::with_font("Hi", config, font);

        let mut frame = Frame::new_black(200, 120);
        let before = frame.clone();

        overlay.render(&mut frame, 0).unwrap();
        assert_eq!(frame, before, "fully transparent at frame 0");

        overlay.render(&mut frame, 60).unwrap();
        assert_ne!(frame, before);
        // far corner stays untouched
        assert_eq!(frame.get_pixel(199, 119), [0, 0, 0, 255]);
    }
}
