//! # Video Module
//!
//! Frames and clips, clip decoding and the capture sinks that record the
//! drawing surface into an output artifact.

pub mod capture;
pub mod decoder;
pub mod ffmpeg;
pub mod types;

pub use capture::{
    capture_for, CaptureSink, Container, FfmpegCapture, GifCapture, OutputArtifact, RawCapture,
    SurfaceSpan,
};
pub use decoder::{ClipDecoder, ClipPlayback, MediaDecoder, StillPlayback, VideoMetadata};
pub use ffmpeg::check_ffmpeg_available;
pub use types::{store_channel, Clip, ClipQueue, Frame, VideoParams};
