use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use image::codecs::gif::{GifEncoder, Repeat};
use image::Delay;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::CaptureConfig;
use crate::error::{ExportError, Result, VideoError};
use crate::video::ffmpeg::{check_ffmpeg_available, StderrLog};
use crate::video::types::{Frame, VideoParams};

/// Output container of a capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    /// VP9 in WebM, encoded by ffmpeg
    Webm,
    /// H.264 in MP4, encoded by ffmpeg
    Mp4,
    /// Animated GIF, encoded in-process
    Gif,
    /// Concatenated RGBA frames, no header
    Raw,
}

impl Container {
    pub fn extension(&self) -> &'static str {
        match self {
            Container::Webm => "webm",
            Container::Mp4 => "mp4",
            Container::Gif => "gif",
            Container::Raw => "rgba",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Container::Webm => "video/webm",
            Container::Mp4 => "video/mp4",
            Container::Gif => "image/gif",
            Container::Raw => "application/octet-stream",
        }
    }

    /// Whether encoding needs the external ffmpeg binary
    pub fn needs_ffmpeg(&self) -> bool {
        matches!(self, Container::Webm | Container::Mp4)
    }
}

impl FromStr for Container {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "webm" => Ok(Container::Webm),
            "mp4" => Ok(Container::Mp4),
            "gif" => Ok(Container::Gif),
            "raw" | "rgba" => Ok(Container::Raw),
            other => Err(format!(
                "unknown container '{}', expected webm, mp4, gif or raw",
                other
            )),
        }
    }
}

/// A run of consecutive captured frames sharing one surface size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSpan {
    pub width: u32,
    pub height: u32,
    pub frames: u64,
}

/// Running list of surface spans for one session
#[derive(Debug, Default)]
struct SpanLog {
    spans: Vec<SurfaceSpan>,
}

impl SpanLog {
    fn record(&mut self, width: u32, height: u32) {
        match self.spans.last_mut() {
            Some(span) if span.width == width && span.height == height => span.frames += 1,
            _ => self.spans.push(SurfaceSpan {
                width,
                height,
                frames: 1,
            }),
        }
    }

    fn first_size(&self) -> Option<(u32, u32)> {
        self.spans.first().map(|s| (s.width, s.height))
    }

    fn frame_count(&self) -> u64 {
        self.spans.iter().map(|s| s.frames).sum()
    }

    fn take(&mut self) -> Vec<SurfaceSpan> {
        std::mem::take(&mut self.spans)
    }
}

/// Finished recording of one export session
#[derive(Debug, Clone)]
pub struct OutputArtifact {
    pub bytes: Vec<u8>,
    pub container: Container,
    /// Suggested download name
    pub file_name: String,
    pub frame_count: u64,
    /// Surface sizes in capture order
    pub spans: Vec<SurfaceSpan>,
    /// Fixed frame size every span was scaled to, if the container has one
    pub canvas: Option<(u32, u32)>,
}

impl OutputArtifact {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Write the artifact into `dir` under its suggested name
    pub fn save_to<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)?;
        info!(
            "Saved {} ({} bytes, {} frames) to {}",
            self.container.mime(),
            self.bytes.len(),
            self.frame_count,
            path.display()
        );
        Ok(path)
    }
}

/// Records every frame drawn on the surface into one artifact
pub trait CaptureSink: Send {
    /// Start a session at the given frame rate
    fn begin(&mut self, fps: f64) -> Result<()>;

    /// Append the current surface contents
    fn push_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Stop the session and hand back everything recorded
    fn finalize(&mut self) -> Result<OutputArtifact>;

    fn is_recording(&self) -> bool;
}

/// Build the sink for the configured container
pub fn capture_for(config: &CaptureConfig, params: &VideoParams) -> Box<dyn CaptureSink> {
    let file_name = config.file_name();
    match config.container {
        Container::Webm | Container::Mp4 => Box::new(FfmpegCapture::new(
            config.container,
            file_name,
            params.clone(),
        )),
        Container::Gif => Box::new(GifCapture::new(file_name)),
        Container::Raw => Box::new(RawCapture::new(file_name)),
    }
}

/// Concatenated RGBA frames at their native sizes
pub struct RawCapture {
    file_name: String,
    recording: bool,
    bytes: Vec<u8>,
    spans: SpanLog,
}

impl RawCapture {
    pub fn new<S: Into<String>>(file_name: S) -> Self {
        Self {
            file_name: file_name.into(),
            recording: false,
            bytes: Vec::new(),
            spans: SpanLog::default(),
        }
    }
}

impl CaptureSink for RawCapture {
    fn begin(&mut self, _fps: f64) -> Result<()> {
        if self.recording {
            return Err(ExportError::AlreadyRecording.into());
        }
        self.bytes.clear();
        self.spans = SpanLog::default();
        self.recording = true;
        Ok(())
    }

    fn push_frame(&mut self, frame: &Frame) -> Result<()> {
        if !self.recording {
            return Err(ExportError::NotRecording.into());
        }
        self.spans.record(frame.width(), frame.height());
        self.bytes.extend_from_slice(frame.as_rgba_bytes());
        Ok(())
    }

    fn finalize(&mut self) -> Result<OutputArtifact> {
        if !self.recording {
            return Err(ExportError::NotRecording.into());
        }
        self.recording = false;

        let frame_count = self.spans.frame_count();
        Ok(OutputArtifact {
            bytes: std::mem::take(&mut self.bytes),
            container: Container::Raw,
            file_name: self.file_name.clone(),
            frame_count,
            spans: self.spans.take(),
            canvas: None,
        })
    }

    fn is_recording(&self) -> bool {
        self.recording
    }
}

/// In-memory byte buffer the GIF encoder writes through
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn take(&self) -> Vec<u8> {
        match self.0.lock() {
            Ok(mut bytes) => std::mem::take(&mut *bytes),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut bytes = self
            .0
            .lock()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "gif buffer poisoned"))?;
        bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Animated GIF encoded in-process
///
/// A GIF has one logical screen, which takes the size of the first frame.
/// Frames captured at another size are resampled to it and the artifact
/// reports that size as its `canvas`.
pub struct GifCapture {
    file_name: String,
    delay: Delay,
    buffer: SharedBuffer,
    encoder: Option<GifEncoder<SharedBuffer>>,
    spans: SpanLog,
}

impl GifCapture {
    pub fn new<S: Into<String>>(file_name: S) -> Self {
        Self {
            file_name: file_name.into(),
            delay: Delay::from_numer_denom_ms(1000, 30),
            buffer: SharedBuffer::default(),
            encoder: None,
            spans: SpanLog::default(),
        }
    }
}

impl CaptureSink for GifCapture {
    fn begin(&mut self, fps: f64) -> Result<()> {
        if self.encoder.is_some() {
            return Err(ExportError::AlreadyRecording.into());
        }

        let fps = fps.round().max(1.0) as u32;
        self.delay = Delay::from_numer_denom_ms(1000, fps);
        self.buffer = SharedBuffer::default();
        self.spans = SpanLog::default();

        let mut encoder = GifEncoder::new_with_speed(self.buffer.clone(), 10);
        encoder
            .set_repeat(Repeat::Infinite)
            .map_err(|e| VideoError::EncodingFailed {
                reason: format!("GIF setup failed: {}", e),
            })?;
        self.encoder = Some(encoder);
        Ok(())
    }

    fn push_frame(&mut self, frame: &Frame) -> Result<()> {
        let encoder = self.encoder.as_mut().ok_or(ExportError::NotRecording)?;

        self.spans.record(frame.width(), frame.height());
        let image = match self.spans.first_size() {
            Some((w, h)) if (w, h) != frame.dimensions() => frame.resized(w, h).into_image(),
            _ => frame.as_image().clone(),
        };

        encoder
            .encode_frame(image::Frame::from_parts(image, 0, 0, self.delay))
            .map_err(|e| VideoError::EncodingFailed {
                reason: format!("GIF frame failed: {}", e),
            })?;
        Ok(())
    }

    fn finalize(&mut self) -> Result<OutputArtifact> {
        let encoder = self.encoder.take().ok_or(ExportError::NotRecording)?;
        // the trailer is written on drop
        drop(encoder);

        let frame_count = self.spans.frame_count();
        let canvas = self.spans.first_size();
        Ok(OutputArtifact {
            bytes: self.buffer.take(),
            container: Container::Gif,
            file_name: self.file_name.clone(),
            frame_count,
            spans: self.spans.take(),
            canvas,
        })
    }

    fn is_recording(&self) -> bool {
        self.encoder.is_some()
    }
}

/// One ffmpeg encoder run covering a single surface span
struct FfmpegSegment {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr: StderrLog,
    output: tempfile::NamedTempFile,
    width: u32,
    height: u32,
}

impl FfmpegSegment {
    /// Close stdin and wait for the encoder to flush its output file
    fn finish(mut self) -> Result<tempfile::NamedTempFile> {
        drop(self.stdin.take());
        let status = self.child.wait()?;
        if !status.success() {
            return Err(VideoError::EncodingFailed {
                reason: format!("ffmpeg failed: {}", self.stderr.tail()),
            }
            .into());
        }
        Ok(self.output)
    }
}

/// WebM or MP4 encoded by an external ffmpeg process
///
/// Every surface span is encoded at its own size by a fresh ffmpeg run into a
/// temporary file. On finalize the segments are joined with the concat demuxer
/// without re-encoding, so the stream changes resolution where the surface did.
pub struct FfmpegCapture {
    container: Container,
    file_name: String,
    params: VideoParams,
    fps: f64,
    recording: bool,
    segment: Option<FfmpegSegment>,
    finished: Vec<tempfile::NamedTempFile>,
    spans: SpanLog,
}

impl FfmpegCapture {
    pub fn new<S: Into<String>>(container: Container, file_name: S, params: VideoParams) -> Self {
        Self {
            container,
            file_name: file_name.into(),
            fps: params.fps,
            params,
            recording: false,
            segment: None,
            finished: Vec::new(),
            spans: SpanLog::default(),
        }
    }

    fn codec_args(&self) -> Vec<String> {
        let crf = self.params.crf().to_string();
        let mut args: Vec<String> = match self.container {
            // in-band SPS/PPS so joined segments can switch resolution
            Container::Mp4 => vec![
                "-c:v", "libx264", "-crf", crf.as_str(), "-preset", "medium",
                "-x264-params", "repeat-headers=1", "-movflags", "+faststart",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            _ => vec!["-c:v", "libvpx-vp9", "-crf", crf.as_str(), "-b:v", "0"]
                .into_iter()
                .map(String::from)
                .collect(),
        };
        // yuv420p needs even dimensions
        args.extend(
            ["-vf", "scale=trunc(iw/2)*2:trunc(ih/2)*2", "-pix_fmt", "yuv420p"]
                .into_iter()
                .map(String::from),
        );
        args
    }

    fn scratch_file(&self, suffix: &str) -> Result<tempfile::NamedTempFile> {
        Ok(tempfile::Builder::new()
            .prefix("clip_compositor_")
            .suffix(suffix)
            .tempfile()?)
    }

    fn spawn(&self, width: u32, height: u32) -> Result<FfmpegSegment> {
        let output = self.scratch_file(&format!(".{}", self.container.extension()))?;
        let stderr = StderrLog::new()?;

        let mut child = Command::new("ffmpeg")
            .args(["-y", "-loglevel", "error", "-f", "rawvideo", "-pix_fmt", "rgba"])
            .args(["-s", &format!("{}x{}", width, height)])
            .args(["-r", &self.fps.to_string(), "-i", "pipe:0", "-an"])
            .args(self.codec_args())
            .args(["-f", self.container.extension()])
            .arg(output.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(stderr.stdio()?)
            .spawn()
            .map_err(|e| VideoError::EncodingFailed {
                reason: format!("failed to spawn ffmpeg (is it installed and on PATH?): {}", e),
            })?;

        let stdin = child.stdin.take().ok_or_else(|| VideoError::EncodingFailed {
            reason: "failed to open ffmpeg stdin".to_string(),
        })?;

        debug!(
            "ffmpeg {} segment {} started at {}x{} @ {} fps",
            self.container.extension(),
            self.finished.len(),
            width,
            height,
            self.fps
        );

        Ok(FfmpegSegment {
            child,
            stdin: Some(stdin),
            stderr,
            output,
            width,
            height,
        })
    }

    fn close_segment(&mut self) -> Result<()> {
        if let Some(segment) = self.segment.take() {
            let output = segment.finish()?;
            self.finished.push(output);
        }
        Ok(())
    }

    /// Join the finished segments into one file of the container format
    fn join_segments(&self) -> Result<Vec<u8>> {
        match self.finished.as_slice() {
            [] => Ok(Vec::new()),
            [only] => Ok(std::fs::read(only.path())?),
            segments => {
                let mut list = self.scratch_file(".txt")?;
                let paths: Vec<&Path> = segments.iter().map(|f| f.path()).collect();
                list.write_all(concat_list(&paths).as_bytes())?;
                list.flush()?;

                let joined = self.scratch_file(&format!(".{}", self.container.extension()))?;
                let output = Command::new("ffmpeg")
                    .args(["-y", "-loglevel", "error", "-f", "concat", "-safe", "0", "-i"])
                    .arg(list.path())
                    .args(["-c", "copy", "-f", self.container.extension()])
                    .arg(joined.path())
                    .stdin(Stdio::null())
                    .output()
                    .map_err(|e| VideoError::EncodingFailed {
                        reason: format!("failed to spawn ffmpeg for concat: {}", e),
                    })?;

                if !output.status.success() {
                    return Err(VideoError::EncodingFailed {
                        reason: format!(
                            "joining {} segments failed: {}",
                            segments.len(),
                            String::from_utf8_lossy(&output.stderr).trim()
                        ),
                    }
                    .into());
                }

                info!("Joined {} encoder segments", segments.len());
                Ok(std::fs::read(joined.path())?)
            }
        }
    }
}

/// Input list for ffmpeg's concat demuxer
fn concat_list(paths: &[&Path]) -> String {
    paths
        .iter()
        .map(|path| {
            let quoted = path.display().to_string().replace('\'', "'\\''");
            format!("file '{}'\n", quoted)
        })
        .collect()
}

impl CaptureSink for FfmpegCapture {
    fn begin(&mut self, fps: f64) -> Result<()> {
        if self.recording {
            return Err(ExportError::AlreadyRecording.into());
        }
        if !check_ffmpeg_available() {
            return Err(VideoError::EncodingFailed {
                reason: "FFmpeg not found. Please install FFmpeg.".to_string(),
            }
            .into());
        }

        self.fps = fps;
        self.finished.clear();
        self.spans = SpanLog::default();
        self.recording = true;
        Ok(())
    }

    fn push_frame(&mut self, frame: &Frame) -> Result<()> {
        if !self.recording {
            return Err(ExportError::NotRecording.into());
        }

        let (width, height) = frame.dimensions();
        let same_size = self
            .segment
            .as_ref()
            .map_or(false, |s| (s.width, s.height) == (width, height));
        if !same_size {
            self.close_segment()?;
            self.segment = Some(self.spawn(width, height)?);
        }
        self.spans.record(width, height);

        let segment = self.segment.as_mut().ok_or(ExportError::NotRecording)?;
        let stdin = segment.stdin.as_mut().ok_or(ExportError::NotRecording)?;
        stdin
            .write_all(frame.as_rgba_bytes())
            .map_err(|e| VideoError::EncodingFailed {
                reason: format!("failed to write frame to ffmpeg stdin: {}", e),
            })?;
        Ok(())
    }

    fn finalize(&mut self) -> Result<OutputArtifact> {
        if !self.recording {
            return Err(ExportError::NotRecording.into());
        }
        self.recording = false;

        let frame_count = self.spans.frame_count();
        let spans = self.spans.take();
        self.close_segment()?;
        let bytes = self.join_segments();
        self.finished.clear();
        let bytes = bytes?;
        if bytes.is_empty() {
            warn!("Capture finished without any encoded data");
        }

        Ok(OutputArtifact {
            bytes,
            container: self.container,
            file_name: self.file_name.clone(),
            frame_count,
            spans,
            canvas: None,
        })
    }

    fn is_recording(&self) -> bool {
        self.recording
    }
}

impl Drop for FfmpegCapture {
    fn drop(&mut self) {
        if let Some(mut segment) = self.segment.take() {
            drop(segment.stdin.take());
            let _ = segment.child.kill();
            let _ = segment.child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_container_names() {
        assert_eq!(Container::Webm.mime(), "video/webm");
        assert_eq!(Container::Gif.extension(), "gif");
        assert_eq!("MP4".parse::<Container>(), Ok(Container::Mp4));
        assert!("avi".parse::<Container>().is_err());
        assert!(Container::Webm.needs_ffmpeg());
        assert!(!Container::Raw.needs_ffmpeg());
    }

    #[test]
    fn test_span_log_merges_runs() {
        let mut log = SpanLog::default();
        log.record(4, 4);
        log.record(4, 4);
        log.record(2, 2);
        log.record(4, 4);
        assert_eq!(log.frame_count(), 4);
        assert_eq!(
            log.take(),
            vec![
                SurfaceSpan { width: 4, height: 4, frames: 2 },
                SurfaceSpan { width: 2, height: 2, frames: 1 },
                SurfaceSpan { width: 4, height: 4, frames: 1 },
            ]
        );
    }

    #[test]
    fn test_raw_capture_keeps_native_sizes() {
        let mut sink = RawCapture::new("out.rgba");
        sink.begin(30.0).unwrap();
        sink.push_frame(&Frame::new_black(4, 2)).unwrap();
        sink.push_frame(&Frame::new_black(2, 2)).unwrap();

        let artifact = sink.finalize().unwrap();
        assert_eq!(artifact.size(), (4 * 2 + 2 * 2) * 4);
        assert_eq!(artifact.frame_count, 2);
        assert_eq!(artifact.spans.len(), 2);
        assert!(!sink.is_recording());
    }

    #[test]
    fn test_session_state_errors() {
        let mut sink = RawCapture::new("out.rgba");
        assert!(sink.push_frame(&Frame::new_black(1, 1)).is_err());
        assert!(sink.finalize().is_err());

        sink.begin(30.0).unwrap();
        assert!(sink.begin(30.0).is_err());
    }

    #[test]
    fn test_gif_capture_produces_gif() {
        let mut sink = GifCapture::new("out.gif");
        sink.begin(30.0).unwrap();
        assert!(sink.is_recording());

        sink.push_frame(&Frame::new_filled(8, 8, [255, 0, 0, 255])).unwrap();
        sink.push_frame(&Frame::new_filled(4, 4, [0, 255, 0, 255])).unwrap();

        let artifact = sink.finalize().unwrap();
        assert!(artifact.bytes.starts_with(b"GIF89a"));
        assert_eq!(artifact.bytes.last(), Some(&0x3b));
        assert_eq!(artifact.frame_count, 2);
        assert_eq!(artifact.spans[1], SurfaceSpan { width: 4, height: 4, frames: 1 });
        assert_eq!(artifact.canvas, Some((8, 8)));
    }

    #[test]
    fn test_gif_reports_canvas_for_resized_spans() {
        use image::AnimationDecoder;

        let mut sink = GifCapture::new("out.gif");
        sink.begin(30.0).unwrap();
        for _ in 0..3 {
            sink.push_frame(&Frame::new_filled(64, 48, [200, 0, 0, 255])).unwrap();
        }
        for _ in 0..3 {
            sink.push_frame(&Frame::new_filled(32, 24, [0, 0, 200, 255])).unwrap();
        }
        let artifact = sink.finalize().unwrap();

        assert_eq!(
            artifact.spans,
            vec![
                SurfaceSpan { width: 64, height: 48, frames: 3 },
                SurfaceSpan { width: 32, height: 24, frames: 3 },
            ]
        );
        assert_eq!(artifact.canvas, Some((64, 48)));

        let decoder =
            image::codecs::gif::GifDecoder::new(std::io::Cursor::new(&artifact.bytes)).unwrap();
        let frames = decoder.into_frames().collect_frames().unwrap();
        assert_eq!(frames.len(), 6);
        for frame in &frames {
            assert_eq!(frame.buffer().dimensions(), (64, 48));
        }
        // the second span is scaled up, not cropped
        let last = frames[5].buffer().get_pixel(63, 47).0;
        assert!(last[2] > 150 && last[0] < 50, "{last:?}");
    }

    #[test]
    fn test_concat_list_quotes_paths() {
        let list = concat_list(&[Path::new("/tmp/a.webm"), Path::new("/tmp/it's.webm")]);
        assert_eq!(list, "file '/tmp/a.webm'\nfile '/tmp/it'\\''s.webm'\n");
    }

    #[test]
    fn test_artifact_save_to() {
        let dir = tempdir().unwrap();
        let artifact = OutputArtifact {
            bytes: vec![1, 2, 3],
            container: Container::Raw,
            file_name: "ultimate_video.rgba".to_string(),
            frame_count: 0,
            spans: Vec::new(),
            canvas: None,
        };
        let path = artifact.save_to(dir.path().join("nested")).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_ffmpeg_capture_webm() {
        if !check_ffmpeg_available() {
            return;
        }

        let mut sink = FfmpegCapture::new(Container::Webm, "out.webm", VideoParams::default());
        if sink.begin(30.0).is_err() {
            return;
        }
        for _ in 0..5 {
            sink.push_frame(&Frame::new_filled(32, 24, [10, 200, 30, 255])).unwrap();
        }
        sink.push_frame(&Frame::new_filled(16, 12, [10, 200, 30, 255])).unwrap();

        let Ok(artifact) = sink.finalize() else {
            // ffmpeg built without libvpx
            return;
        };
        assert!(!artifact.is_empty());
        // EBML magic
        assert!(artifact.bytes.starts_with(&[0x1a, 0x45, 0xdf, 0xa3]));
        assert_eq!(artifact.frame_count, 6);
        assert_eq!(artifact.canvas, None);

        // the decoded stream changes size where the surface did
        let dir = tempdir().unwrap();
        let path = artifact.save_to(dir.path()).unwrap();
        let output = Command::new("ffprobe")
            .args([
                "-v", "error", "-select_streams", "v:0", "-show_entries", "frame=width,height",
                "-of", "csv=p=0",
            ])
            .arg(&path)
            .output()
            .unwrap();
        let sizes: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|l| l.trim().trim_end_matches(',').to_string())
            .filter(|l| !l.is_empty())
            .collect();
        assert_eq!(sizes.len(), 6, "{sizes:?}");
        assert_eq!(sizes[0], "32,24");
        assert_eq!(sizes[5], "16,12");
    }
}
