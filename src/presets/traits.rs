use crate::{error::Result, video::types::Frame};

/// Core trait every pixel preset implements
pub trait Preset: Send + Sync {
    /// Returns the identifier this preset is selected by
    fn name(&self) -> &str;

    /// Returns a human-readable description of this preset
    fn description(&self) -> &str;

    /// Apply the preset to a frame in place
    ///
    /// # Arguments
    ///
    /// * `frame` - The frame to modify; only red, green and blue may change
    /// * `frame_counter` - Index of the frame within the current clip, starting at 0
    ///
    /// Implementations must depend on nothing but these two inputs.
    fn apply(&self, frame: &mut Frame, frame_counter: u64) -> Result<()>;

    /// Get preset metadata
    fn metadata(&self) -> PresetMetadata {
        PresetMetadata::default()
    }
}

/// What a preset's formula does with its inputs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresetMetadata {
    /// The formula caps its result at 255 before storage
    pub clamped: bool,

    /// The formula reads the frame counter
    pub frame_dependent: bool,

    /// Name of the preset with the identical formula, if this one is an alias
    pub alias_of: Option<&'static str>,
}

impl PresetMetadata {
    pub const fn plain() -> Self {
        Self {
            clamped: false,
            frame_dependent: false,
            alias_of: None,
        }
    }

    pub const fn clamped() -> Self {
        Self {
            clamped: true,
            ..Self::plain()
        }
    }

    pub const fn frame_dependent() -> Self {
        Self {
            frame_dependent: true,
            ..Self::plain()
        }
    }

    pub const fn alias_of(self, name: &'static str) -> Self {
        Self {
            alias_of: Some(name),
            ..self
        }
    }
}
