use image::{imageops::FilterType, ImageBuffer, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Store a computed channel value into an 8-bit channel.
///
/// NaN becomes 0, values are clamped to `[0, 255]` and rounded half to even,
/// the same conversion a clamped byte array applies on assignment.
pub fn store_channel(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, 255.0).round_ties_even() as u8
}

/// A single RGBA video frame
///
/// Thin wrapper around an RGBA image buffer with the pixel accessors used by
/// presets, the drawing surface and the text overlay.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    buffer: RgbaImage,
}

impl Frame {
    /// Create a new frame from an RGBA image buffer
    pub fn new(buffer: RgbaImage) -> Self {
        Self { buffer }
    }

    /// Create an opaque black frame with the given dimensions
    pub fn new_black(width: u32, height: u32) -> Self {
        Self::new_filled(width, height, [0, 0, 0, 255])
    }

    /// Create a new frame with the given dimensions filled with the specified color
    pub fn new_filled(width: u32, height: u32, color: [u8; 4]) -> Self {
        let buffer = ImageBuffer::from_pixel(width, height, Rgba(color));
        Self { buffer }
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    /// Get a pixel at the given coordinates as `[r, g, b, a]`
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.buffer.get_pixel(x, y).0
    }

    /// Get a mutable reference to a pixel at the given coordinates
    pub fn get_pixel_mut(&mut self, x: u32, y: u32) -> &mut [u8] {
        &mut self.buffer.get_pixel_mut(x, y).0
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 4]) {
        self.buffer.put_pixel(x, y, Rgba(color));
    }

    /// Rewrite the color channels of every pixel through `f`.
    ///
    /// `f` receives the pre-transform red, green and blue values and returns the
    /// new ones; results go through [`store_channel`]. Alpha is never passed to
    /// `f` and never written.
    pub fn map_rgb<F>(&mut self, mut f: F)
    where
        F: FnMut([f64; 3]) -> [f64; 3],
    {
        for pixel in self.buffer.pixels_mut() {
            let [r, g, b, _] = pixel.0;
            let [nr, ng, nb] = f([r as f64, g as f64, b as f64]);
            pixel.0[0] = store_channel(nr);
            pixel.0[1] = store_channel(ng);
            pixel.0[2] = store_channel(nb);
        }
    }

    /// Resample to the given size with a Lanczos3 filter
    pub fn resized(&self, width: u32, height: u32) -> Frame {
        if self.dimensions() == (width, height) {
            return self.clone();
        }
        let resized = image::imageops::resize(&self.buffer, width, height, FilterType::Lanczos3);
        Frame::new(resized)
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.buffer
    }

    pub fn as_image_mut(&mut self) -> &mut RgbaImage {
        &mut self.buffer
    }

    pub fn into_image(self) -> RgbaImage {
        self.buffer
    }

    /// Raw interleaved RGBA bytes
    pub fn as_rgba_bytes(&self) -> &[u8] {
        self.buffer.as_raw()
    }

    /// Create a frame from raw RGBA bytes, `None` if the length does not match
    pub fn from_rgba_bytes(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        ImageBuffer::from_raw(width, height, data).map(|buffer| Self { buffer })
    }

    /// Save the frame as a PNG file
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> std::result::Result<(), image::ImageError> {
        self.buffer.save(path)
    }
}

/// One queued input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clip {
    /// Path to the video or image file
    pub path: PathBuf,

    /// Position in the queue (0-based)
    pub index: usize,

    /// Display name, the file stem
    pub name: String,
}

impl Clip {
    pub fn new<P: Into<PathBuf>>(path: P, index: usize) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("clip")
            .to_string();
        Self { path, index, name }
    }

    /// Lowercased file extension
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }

    pub fn is_image(&self) -> bool {
        matches!(
            self.extension().as_deref(),
            Some("jpg" | "jpeg" | "png" | "bmp" | "gif")
        )
    }

    pub fn is_video(&self) -> bool {
        matches!(
            self.extension().as_deref(),
            Some("mp4" | "webm" | "mov" | "mkv" | "avi" | "m4v")
        )
    }

    /// Check if this is a supported clip format
    pub fn is_supported(&self) -> bool {
        self.is_image() || self.is_video()
    }
}

/// Ordered, read-only queue of clips for one export
#[derive(Debug, Clone, Default)]
pub struct ClipQueue {
    clips: Vec<Clip>,
}

impl ClipQueue {
    /// Build a queue from paths in playback order
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        paths.into_iter().collect()
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn get(&self, index: usize) -> Option<&Clip> {
        self.clips.get(index)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Clip> {
        self.clips.iter()
    }
}

impl<P: Into<PathBuf>> FromIterator<P> for ClipQueue {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        let clips = iter
            .into_iter()
            .enumerate()
            .map(|(index, path)| Clip::new(path, index))
            .collect();
        Self { clips }
    }
}

/// Frame rate and quality targets shared by decoding and capture
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoParams {
    /// Capture frame rate
    pub fps: f64,

    /// Quality setting (0-100, higher is better)
    pub quality: u8,
}

impl Default for VideoParams {
    fn default() -> Self {
        Self {
            fps: 30.0,
            quality: 85,
        }
    }
}

impl VideoParams {
    /// Map quality (0-100) onto an encoder CRF value (51 worst, 0 best)
    pub fn crf(&self) -> u8 {
        (51 - ((self.quality.min(100) as f32 / 100.0) * 51.0) as u8).clamp(0, 51)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_channel_clamps_and_rounds_half_even() {
        assert_eq!(store_channel(259.5), 255);
        assert_eq!(store_channel(-12.0), 0);
        assert_eq!(store_channel(f64::NAN), 0);
        assert_eq!(store_channel(1.5), 2);
        assert_eq!(store_channel(2.5), 2);
        assert_eq!(store_channel(204.4), 204);
    }

    #[test]
    fn test_map_rgb_leaves_alpha() {
        let mut frame = Frame::new_filled(3, 2, [10, 20, 30, 77]);
        frame.map_rgb(|[r, g, b]| [r + 1.0, g + 2.0, b + 3.0]);
        for pixel in frame.as_image().pixels() {
            assert_eq!(pixel.0, [11, 22, 33, 77]);
        }
    }

    #[test]
    fn test_clip_queue_keeps_order() {
        let queue = ClipQueue::from_paths(["b.mp4", "a.png", "c.webm"]);
        let names: Vec<_> = queue.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["b", "a", "c"]);
        assert_eq!(queue.get(1).map(|c| c.index), Some(1));
        assert!(queue.get(1).is_some_and(Clip::is_image));
        assert!(queue.get(2).is_some_and(Clip::is_video));
    }

    #[test]
    fn test_unsupported_clip() {
        let clip = Clip::new("notes.txt", 0);
        assert!(!clip.is_supported());
    }

    #[test]
    fn test_resized_keeps_requested_size() {
        let frame = Frame::new_filled(8, 6, [200, 100, 50, 255]);
        let resized = frame.resized(4, 3);
        assert_eq!(resized.dimensions(), (4, 3));
    }

    #[test]
    fn test_crf_mapping() {
        let mut params = VideoParams::default();
        params.quality = 100;
        assert_eq!(params.crf(), 0);
        params.quality = 0;
        assert_eq!(params.crf(), 51);
    }
}
