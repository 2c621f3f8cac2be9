use crate::{
    error::Result,
    presets::traits::{Preset, PresetMetadata},
    video::types::Frame,
};

/// Per-pixel formula: pre-transform `[r, g, b]` and frame counter in, formula value out
pub type ChannelFormula = fn([f64; 3], u64) -> [f64; 3];

/// A preset defined by a single per-pixel formula
///
/// A preset without a formula is the identity and leaves the buffer alone.
#[derive(Clone, Copy)]
pub struct PixelPreset {
    name: &'static str,
    description: &'static str,
    formula: Option<ChannelFormula>,
    metadata: PresetMetadata,
}

impl PixelPreset {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        formula: ChannelFormula,
        metadata: PresetMetadata,
    ) -> Self {
        Self {
            name,
            description,
            formula: Some(formula),
            metadata,
        }
    }

    pub const fn identity(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            formula: None,
            metadata: PresetMetadata::plain(),
        }
    }

    /// Formula value for one pixel, before 8-bit storage
    pub fn evaluate(&self, rgb: [f64; 3], frame_counter: u64) -> [f64; 3] {
        match self.formula {
            Some(formula) => formula(rgb, frame_counter),
            None => rgb,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.formula.is_none()
    }
}

impl std::fmt::Debug for PixelPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelPreset")
            .field("name", &self.name)
            .field("identity", &self.is_identity())
            .field("metadata", &self.metadata)
            .finish()
    }
}

impl Preset for PixelPreset {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn apply(&self, frame: &mut Frame, frame_counter: u64) -> Result<()> {
        if let Some(formula) = self.formula {
            frame.map_rgb(|rgb| formula(rgb, frame_counter));
        }
        Ok(())
    }

    fn metadata(&self) -> PresetMetadata {
        self.metadata
    }
}
