//! # Clip Compositor
//!
//! Play a queue of video clips back to back through a color preset and an
//! animated text overlay, recording everything into one video file.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clip_compositor::{
//!     composition::{ExportEngine, ExportRequest},
//!     config::Config,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let mut engine = ExportEngine::from_config(Config::default());
//!
//! let request = ExportRequest::new(["intro.mp4", "title.png"])
//!     .with_preset("sepia")
//!     .with_text("Summer 2024");
//!
//! let outcome = engine.export(request).await?;
//! outcome.artifact().save_to(".")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`video`] - Frames, clip decoding and capture sinks
//! - [`presets`] - Per-pixel color presets and their registry
//! - [`overlay`] - Fading text overlay
//! - [`composition`] - The sequential playback and capture loop
//! - [`config`] - Configuration management
//!
//! ## Custom Presets
//!
//! Anything implementing [`Preset`](presets::Preset) can be registered:
//!
//! ```rust,no_run
//! use clip_compositor::presets::{Preset, PresetRegistry};
//! use clip_compositor::video::Frame;
//! use clip_compositor::Result;
//!
//! struct RedOnly;
//!
//! impl Preset for RedOnly {
//!     fn name(&self) -> &str {
//!         "red_only"
//!     }
//!
//!     fn description(&self) -> &str {
//!         "Drops green and blue"
//!     }
//!
//!     fn apply(&self, frame: &mut Frame, _frame_counter: u64) -> Result<()> {
//!         frame.map_rgb(|[r, _, _]| [r, 0.0, 0.0]);
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = PresetRegistry::new();
//! registry.register(RedOnly);
//! ```

pub mod composition;
pub mod config;
pub mod error;
pub mod overlay;
pub mod presets;
pub mod video;

pub use crate::{
    composition::{ExportEngine, ExportOutcome, ExportRequest},
    config::Config,
    error::{CompositorError, Result},
    presets::{Preset, PresetRegistry},
};
