use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::VideoConfig;
use crate::error::{Result, VideoError};
use crate::video::ffmpeg::StderrLog;
use crate::video::types::{Clip, Frame};

/// Opens queued clips for playback
pub trait ClipDecoder: Send {
    /// Open a clip and return once it can produce frames
    fn open(&mut self, clip: &Clip) -> Result<Box<dyn ClipPlayback>>;
}

/// One clip being played, frame by frame
pub trait ClipPlayback: Send {
    /// Native resolution of the clip
    fn resolution(&self) -> (u32, u32);

    /// Next frame in display order, `None` once the clip has ended
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Video stream metadata reported by ffprobe
#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    /// Displayed width, after applying the rotation
    pub width: u32,
    /// Displayed height, after applying the rotation
    pub height: u32,
    /// Display rotation in degrees, normalized to `0..360`
    pub rotation: u32,
}

/// Decoder for still images and video files
///
/// Images play as a clip of fixed length. Video files are decoded by an
/// `ffmpeg` child process streaming raw RGBA frames at the capture rate, so
/// only one frame is held in memory at a time.
pub struct MediaDecoder {
    fps: f64,
    still_clip_duration: f64,
    metadata_cache: HashMap<PathBuf, VideoMetadata>,
}

impl MediaDecoder {
    pub fn new(fps: f64, still_clip_duration: f64) -> Self {
        Self {
            fps,
            still_clip_duration,
            metadata_cache: HashMap::new(),
        }
    }

    pub fn from_config(config: &VideoConfig) -> Self {
        Self::new(config.params.fps, config.still_clip_duration)
    }

    /// Number of frames a still image plays for
    pub fn still_frame_count(&self) -> u64 {
        (self.still_clip_duration * self.fps).round().max(1.0) as u64
    }

    /// Probe a video file, cached per path
    pub fn load_metadata(&mut self, path: &Path) -> Result<VideoMetadata> {
        if let Some(metadata) = self.metadata_cache.get(path) {
            return Ok(metadata.clone());
        }

        let metadata = probe_video(path)?;
        info!(
            "Video metadata: {}x{} (rotation {}°)",
            metadata.width, metadata.height, metadata.rotation
        );
        self.metadata_cache.insert(path.to_path_buf(), metadata.clone());
        Ok(metadata)
    }

    fn open_image(&self, clip: &Clip) -> Result<Box<dyn ClipPlayback>> {
        let image = image::open(&clip.path).map_err(|e| {
            warn!("Could not decode image {:?}: {}", clip.path, e);
            VideoError::LoadFailed {
                path: clip.path.display().to_string(),
            }
        })?;

        let frame = Frame::new(image.to_rgba8());
        let frames = self.still_frame_count();
        debug!(
            "Still clip '{}' {}x{} for {} frames",
            clip.name,
            frame.width(),
            frame.height(),
            frames
        );

        Ok(Box::new(StillPlayback {
            frame,
            remaining: frames,
        }))
    }

    fn open_video(&mut self, clip: &Clip) -> Result<Box<dyn ClipPlayback>> {
        let metadata = self.load_metadata(&clip.path)?;
        let playback = FfmpegPlayback::spawn(&clip.path, &metadata, self.fps)?;
        Ok(Box::new(playback))
    }
}

impl ClipDecoder for MediaDecoder {
    fn open(&mut self, clip: &Clip) -> Result<Box<dyn ClipPlayback>> {
        if !clip.is_supported() {
            return Err(VideoError::UnsupportedFormat {
                format: clip.extension().unwrap_or_else(|| "unknown".to_string()),
            }
            .into());
        }

        if clip.is_image() {
            self.open_image(clip)
        } else {
            self.open_video(clip)
        }
    }
}

/// A still image repeated for a fixed number of frames
pub struct StillPlayback {
    frame: Frame,
    remaining: u64,
}

impl StillPlayback {
    pub fn new(frame: Frame, frames: u64) -> Self {
        Self {
            frame,
            remaining: frames,
        }
    }
}

impl ClipPlayback for StillPlayback {
    fn resolution(&self) -> (u32, u32) {
        self.frame.dimensions()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        Ok(Some(self.frame.clone()))
    }
}

/// Raw RGBA frames streamed out of an `ffmpeg` child process
pub struct FfmpegPlayback {
    path: PathBuf,
    child: Child,
    stdout: ChildStdout,
    stderr: StderrLog,
    width: u32,
    height: u32,
    scratch: Vec<u8>,
    finished: bool,
}

impl FfmpegPlayback {
    fn spawn(path: &Path, metadata: &VideoMetadata, fps: f64) -> Result<Self> {
        let frame_len = metadata.width as usize * metadata.height as usize * 4;
        if frame_len == 0 {
            return Err(VideoError::InvalidParameters {
                details: format!("{} has zero-sized frames", path.display()),
            }
            .into());
        }

        let stderr = StderrLog::new()?;
        // pin the output size so autorotation can never change the row width
        let filter = format!(
            "fps={},scale={}:{}",
            fps, metadata.width, metadata.height
        );

        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(path)
            .args([
                "-an", "-vf", &filter, "-f", "rawvideo", "-pix_fmt", "rgba", "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(stderr.stdio()?)
            .spawn()
            .map_err(|e| VideoError::DecodingFailed {
                reason: format!("failed to spawn ffmpeg (is it installed and on PATH?): {}", e),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| VideoError::DecodingFailed {
            reason: "failed to open ffmpeg stdout".to_string(),
        })?;

        debug!("Streaming {:?} through ffmpeg at {} fps", path, fps);

        Ok(Self {
            path: path.to_path_buf(),
            child,
            stdout,
            stderr,
            width: metadata.width,
            height: metadata.height,
            scratch: vec![0u8; frame_len],
            finished: false,
        })
    }

    /// Fill the scratch buffer; returns the number of bytes read before EOF
    fn fill_scratch(&mut self) -> std::io::Result<usize> {
        let mut filled = 0;
        while filled < self.scratch.len() {
            match self.stdout.read(&mut self.scratch[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        let status = self.child.wait()?;
        if status.success() {
            return Ok(());
        }

        Err(VideoError::DecodingFailed {
            reason: format!(
                "ffmpeg failed for '{}': {}",
                self.path.display(),
                self.stderr.tail()
            ),
        }
        .into())
    }
}

impl ClipPlayback for FfmpegPlayback {
    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.finished {
            return Ok(None);
        }

        let filled = self.fill_scratch().map_err(|e| VideoError::DecodingFailed {
            reason: format!("reading frames from ffmpeg failed: {}", e),
        })?;

        if filled == 0 {
            self.finish()?;
            return Ok(None);
        }
        if filled < self.scratch.len() {
            self.finish()?;
            return Err(VideoError::DecodingFailed {
                reason: format!(
                    "truncated frame from '{}': got {} of {} bytes",
                    self.path.display(),
                    filled,
                    self.scratch.len()
                ),
            }
            .into());
        }

        Frame::from_rgba_bytes(self.width, self.height, self.scratch.clone())
            .map(Some)
            .ok_or_else(|| {
                VideoError::FrameProcessingFailed {
                    reason: "decoded frame size mismatch".to_string(),
                }
                .into()
            })
    }
}

impl Drop for FfmpegPlayback {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

#[derive(Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

#[derive(Deserialize, Default)]
struct ProbeTags {
    rotate: Option<String>,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
    #[serde(default)]
    tags: ProbeTags,
}

#[derive(Deserialize)]
struct ProbeOutput {
    streams: Vec<ProbeStream>,
}

impl ProbeStream {
    /// Display rotation from the display matrix, or the legacy `rotate` tag
    fn rotation(&self) -> u32 {
        let degrees = self
            .side_data_list
            .iter()
            .find_map(|side| side.rotation)
            .or_else(|| self.tags.rotate.as_deref().and_then(|r| r.trim().parse().ok()))
            .unwrap_or(0.0);
        (degrees.round() as i64).rem_euclid(360) as u32
    }
}

fn probe_video(path: &Path) -> Result<VideoMetadata> {
    if !path.exists() {
        return Err(VideoError::LoadFailed {
            path: path.display().to_string(),
        }
        .into());
    }

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .map_err(|e| VideoError::LoadFailed {
            path: format!("{}: ffprobe could not run: {}", path.display(), e),
        })?;

    if !output.status.success() {
        return Err(VideoError::LoadFailed {
            path: format!(
                "{}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        }
        .into());
    }

    parse_probe_output(&output.stdout, path)
}

fn parse_probe_output(json: &[u8], path: &Path) -> Result<VideoMetadata> {
    let parsed: ProbeOutput = serde_json::from_slice(json).map_err(|e| VideoError::DecodingFailed {
        reason: format!("ffprobe output for '{}' is not valid JSON: {}", path.display(), e),
    })?;

    let stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| VideoError::UnsupportedFormat {
            format: format!("{} has no video stream", path.display()),
        })?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(VideoError::InvalidParameters {
                details: format!("{} reports no frame size", path.display()),
            }
            .into())
        }
    };

    let rotation = stream.rotation();
    // ffmpeg autorotates, so quarter turns swap the decoded frame size
    let (width, height) = if rotation % 180 == 90 {
        (height, width)
    } else {
        (width, height)
    };

    Ok(VideoMetadata {
        width,
        height,
        rotation,
    })
}
