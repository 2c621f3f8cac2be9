use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::{
    composition::{
        state::{ExportEvent, ExportState},
        surface::DrawingSurface,
    },
    config::Config,
    error::{CompositorError, ExportError, Result},
    overlay::TextOverlay,
    presets::{Preset, PresetRegistry},
    video::{
        capture_for, CaptureSink, Clip, ClipDecoder, ClipPlayback, ClipQueue, MediaDecoder,
        OutputArtifact,
    },
};

/// How the playback loop paces frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pacing {
    /// One frame per tick of a clock running at the capture frame rate
    #[default]
    Realtime,
    /// As fast as decoding allows, yielding to the runtime between frames
    Unpaced,
}

/// Shared flag that stops a running export at its next suspension point
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Inputs staged for one export
#[derive(Debug, Clone, Default)]
pub struct ExportRequest {
    /// Clip files in playback order
    pub clips: Vec<PathBuf>,

    /// Soundtrack; accepted but never mixed into the output
    pub audio: Option<PathBuf>,

    /// Preset identifier, unknown names mean no effect
    pub preset: String,

    /// Overlay text, empty for none
    pub overlay_text: String,
}

impl ExportRequest {
    pub fn new<I, P>(clips: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            clips: clips.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_preset<S: Into<String>>(mut self, preset: S) -> Self {
        self.preset = preset.into();
        self
    }

    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.overlay_text = text.into();
        self
    }

    pub fn with_audio<P: Into<PathBuf>>(mut self, audio: P) -> Self {
        self.audio = Some(audio.into());
        self
    }
}

/// Everything one export run reads, fixed when the run starts
pub struct RunConfig {
    pub queue: ClipQueue,
    pub preset: Arc<dyn Preset>,
    pub overlay_text: String,
    pub audio: Option<PathBuf>,
    pub fps: f64,
    /// Time between two frames, `1 / fps`
    pub frame_period: Duration,
    pub pacing: Pacing,
    /// Delay before advancing to the next clip, `None` when crossfade is off
    pub crossfade: Option<Duration>,
}

impl RunConfig {
    /// Snapshot the request and configuration, refusing an empty queue or a
    /// configuration that does not validate
    pub fn build(request: ExportRequest, config: &Config, registry: &PresetRegistry) -> Result<Self> {
        if request.clips.is_empty() {
            return Err(ExportError::MissingInput.into());
        }
        config.validate()?;

        let playback = &config.playback;
        let crossfade = if playback.crossfade {
            Some(playback.crossfade_wait()?)
        } else {
            None
        };

        Ok(Self {
            queue: ClipQueue::from_paths(request.clips),
            preset: registry.resolve(&request.preset),
            overlay_text: request.overlay_text,
            audio: request.audio,
            fps: config.video.params.fps,
            frame_period: config.video.frame_period()?,
            pacing: playback.pacing,
            crossfade,
        })
    }
}

/// Result of a run that got as far as starting capture
#[derive(Debug)]
pub enum ExportOutcome {
    /// Every clip played to the end
    Completed(OutputArtifact),
    /// The run stopped early; holds whatever was captured before it did
    Aborted {
        artifact: OutputArtifact,
        error: CompositorError,
    },
}

impl ExportOutcome {
    pub fn artifact(&self) -> &OutputArtifact {
        match self {
            ExportOutcome::Completed(artifact) => artifact,
            ExportOutcome::Aborted { artifact, .. } => artifact,
        }
    }

    pub fn into_artifact(self) -> OutputArtifact {
        match self {
            ExportOutcome::Completed(artifact) => artifact,
            ExportOutcome::Aborted { artifact, .. } => artifact,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, ExportOutcome::Completed(_))
    }

    pub fn error(&self) -> Option<&CompositorError> {
        match self {
            ExportOutcome::Completed(_) => None,
            ExportOutcome::Aborted { error, .. } => Some(error),
        }
    }
}

/// Plays every queued clip in order through the preset and overlay into one
/// capture session
///
/// Per frame the loop draws the decoded frame onto the surface, applies the
/// preset, draws the overlay and hands the surface to the capture sink. The
/// frame counter restarts at 0 for each clip.
///
/// Decoding and capture talk to ffmpeg over blocking pipes. On a multi-thread
/// runtime those calls run under `block_in_place` so the worker's other tasks
/// move elsewhere; on a current-thread runtime they run inline.
pub struct ExportEngine {
    config: Config,
    registry: PresetRegistry,
    decoder: Box<dyn ClipDecoder>,
    sink: Box<dyn CaptureSink>,
    state: ExportState,
    cancel: CancelFlag,
}

impl ExportEngine {
    pub fn new(
        config: Config,
        registry: PresetRegistry,
        decoder: Box<dyn ClipDecoder>,
        sink: Box<dyn CaptureSink>,
    ) -> Self {
        Self {
            config,
            registry,
            decoder,
            sink,
            state: ExportState::Idle,
            cancel: CancelFlag::new(),
        }
    }

    /// Engine with the media decoder and the sink for the configured container
    pub fn from_config(config: Config) -> Self {
        let decoder = Box::new(MediaDecoder::from_config(&config.video));
        let sink = capture_for(&config.capture, &config.video.params);
        Self::new(config, PresetRegistry::new(), decoder, sink)
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn state(&self) -> ExportState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &PresetRegistry {
        &self.registry
    }

    /// Registry to add custom presets to before exporting
    pub fn registry_mut(&mut self) -> &mut PresetRegistry {
        &mut self.registry
    }

    /// Run one export
    ///
    /// An empty clip list is refused with [`ExportError::MissingInput`] before
    /// any capture session starts. Once capture has started, a failing clip,
    /// preset, overlay or cancellation stops the loop and the partial
    /// recording comes back as [`ExportOutcome::Aborted`]. Only a failure to
    /// start or finalize capture is returned as an error.
    pub async fn export(&mut self, request: ExportRequest) -> Result<ExportOutcome> {
        if !self.state.is_idle() {
            return Err(ExportError::AlreadyRecording.into());
        }

        let run = RunConfig::build(request, &self.config, &self.registry)?;
        let clip_count = run.queue.len();

        info!("🎬 Starting export");
        info!("   Clips: {}", clip_count);
        info!("   Preset: {}", run.preset.name());
        info!("   Pacing: {:?} @ {} fps", run.pacing, run.fps);
        if !run.overlay_text.is_empty() {
            info!("   Overlay: {:?}", run.overlay_text);
        }
        if let Some(audio) = &run.audio {
            warn!("Audio track {:?} is accepted but not mixed into the output", audio);
        }

        let overlay = TextOverlay::new(run.overlay_text.clone(), self.config.overlay.clone());

        run_blocking(|| self.sink.begin(run.fps))?;
        self.apply(ExportEvent::CaptureStarted, clip_count)?;

        let played = self.play_queue(&run, &overlay).await;
        if played.is_err() {
            self.apply(ExportEvent::Abort, clip_count)?;
        }

        info!("📼 Finalizing capture...");
        let finalized = run_blocking(|| self.sink.finalize());
        self.apply(ExportEvent::Finalized, clip_count)?;
        let artifact = finalized?;

        match played {
            Ok(()) => {
                info!(
                    "🎉 Export complete: {} frames, {} bytes",
                    artifact.frame_count,
                    artifact.size()
                );
                Ok(ExportOutcome::Completed(artifact))
            }
            Err(error) => {
                warn!(
                    "Export aborted after {} frames: {}",
                    artifact.frame_count, error
                );
                Ok(ExportOutcome::Aborted { artifact, error })
            }
        }
    }

    fn apply(&mut self, event: ExportEvent, clip_count: usize) -> Result<()> {
        let next = self.state.transition(event, clip_count).ok_or_else(|| {
            CompositorError::generic(format!("invalid export step {:?} while {}", event, self.state))
        })?;
        debug!("Export state: {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(ExportError::Cancelled.into());
        }
        Ok(())
    }

    fn open_clip(&mut self, clip: &Clip) -> Result<Box<dyn ClipPlayback>> {
        run_blocking(|| self.decoder.open(clip)).map_err(|e| clip_failed(clip, &e))
    }

    async fn play_queue(&mut self, run: &RunConfig, overlay: &TextOverlay) -> Result<()> {
        let clip_count = run.queue.len();
        let mut clock = frame_clock(run.pacing, run.frame_period);
        let mut surface = DrawingSurface::default();

        let clips = run.queue.clips();
        let mut playback = self.open_clip(&clips[0])?;
        self.apply(ExportEvent::PlaybackStarted, clip_count)?;

        for (index, clip) in clips.iter().enumerate() {
            let (width, height) = playback.resolution();
            surface.resize(width, height);
            info!(
                "▶️  Clip {}/{}: {} ({}x{})",
                index + 1,
                clip_count,
                clip.name,
                width,
                height
            );

            let frames = self
                .play_clip(run, clip, playback.as_mut(), &mut surface, overlay, &mut clock)
                .await?;
            debug!("   Clip '{}' ended after {} frames", clip.name, frames);

            let Some(next) = clips.get(index + 1) else {
                self.apply(ExportEvent::ClipEnded, clip_count)?;
                break;
            };

            // release the finished clip before opening the next one
            drop(playback);
            playback = self.open_clip(next)?;
            if let Some(delay) = run.crossfade {
                debug!("   Crossfade: '{}' preloaded, waiting {:?}", next.name, delay);
                tokio::time::sleep(delay).await;
                self.check_cancelled()?;
            }
            self.apply(ExportEvent::ClipEnded, clip_count)?;
        }

        Ok(())
    }

    async fn play_clip(
        &mut self,
        run: &RunConfig,
        clip: &Clip,
        playback: &mut dyn ClipPlayback,
        surface: &mut DrawingSurface,
        overlay: &TextOverlay,
        clock: &mut Option<Interval>,
    ) -> Result<u64> {
        let mut frame_counter: u64 = 0;

        loop {
            self.check_cancelled()?;

            let next = run_blocking(|| playback.next_frame());
            let Some(frame) = next.map_err(|e| clip_failed(clip, &e))? else {
                return Ok(frame_counter);
            };

            surface.draw(frame);
            run.preset.apply(surface.frame_mut(), frame_counter)?;
            overlay.render(surface.frame_mut(), frame_counter)?;
            run_blocking(|| self.sink.push_frame(surface.frame()))?;
            frame_counter += 1;

            match clock.as_mut() {
                Some(interval) => {
                    interval.tick().await;
                }
                None => tokio::task::yield_now().await,
            }
            self.check_cancelled()?;
        }
    }
}

fn frame_clock(pacing: Pacing, period: Duration) -> Option<Interval> {
    match pacing {
        Pacing::Realtime => {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            Some(interval)
        }
        Pacing::Unpaced => None,
    }
}

/// Run a blocking pipe read or write without stalling a runtime worker
fn run_blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

fn clip_failed(clip: &Clip, error: &CompositorError) -> CompositorError {
    warn!("Clip {} ({:?}) failed: {}", clip.index, clip.path, error);
    ExportError::ClipFailed {
        index: clip.index,
        path: clip.path.display().to_string(),
        reason: error.to_string(),
    }
    .into()
}
