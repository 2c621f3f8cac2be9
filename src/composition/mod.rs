//! # Export Loop
//!
//! Plays the clip queue in order, one frame at a time, through the selected
//! preset and the text overlay into a single capture session.

pub mod engine;
pub mod state;
pub mod surface;

pub use engine::{CancelFlag, ExportEngine, ExportOutcome, ExportRequest, Pacing, RunConfig};
pub use state::{ExportEvent, ExportState};
pub use surface::DrawingSurface;
