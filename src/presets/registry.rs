use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{PresetError, Result};

use crate::presets::{
    color, temporal,
    pixel::PixelPreset,
    traits::{Preset, PresetMetadata},
};

/// Name of the identity preset, also the fallback for unknown names
pub const IDENTITY_PRESET: &str = "none";

/// Built-in preset table
pub const BUILTIN_PRESETS: &[PixelPreset] = &[
    PixelPreset::identity(IDENTITY_PRESET, "No effect"),
    PixelPreset::new(
        "grayscale",
        "Average of the three channels",
        color::grayscale,
        PresetMetadata::plain(),
    ),
    PixelPreset::new(
        "invert",
        "Photographic negative",
        color::invert,
        PresetMetadata::plain(),
    ),
    PixelPreset::new(
        "brightness",
        "Adds 50 to every channel",
        color::brightness,
        PresetMetadata::clamped(),
    ),
    PixelPreset::new(
        "cinematic",
        "Slightly darkened grayscale",
        color::cinematic,
        PresetMetadata::plain(),
    ),
    PixelPreset::new(
        "bright",
        "Scales every channel by 1.2",
        color::bright,
        PresetMetadata::clamped(),
    ),
    PixelPreset::new(
        "dramatic",
        "Photographic negative",
        color::invert,
        PresetMetadata::plain().alias_of("invert"),
    ),
    PixelPreset::new(
        "classic",
        "Sepia tone",
        color::sepia,
        PresetMetadata::clamped().alias_of("sepia"),
    ),
    PixelPreset::new(
        "sepia",
        "Sepia tone",
        color::sepia,
        PresetMetadata::clamped(),
    ),
    PixelPreset::new(
        "vintage",
        "Faded warm tint",
        color::vintage,
        PresetMetadata::plain(),
    ),
    PixelPreset::new(
        "neon",
        "Inverts red and blue, keeps green",
        color::neon,
        PresetMetadata::plain(),
    ),
    PixelPreset::new(
        "pixelate",
        "Darkens every other frame",
        temporal::pixelate,
        PresetMetadata::frame_dependent(),
    ),
    PixelPreset::new(
        "blur",
        "Luminance flatten (no spatial blur)",
        color::grayscale,
        PresetMetadata::plain().alias_of("grayscale"),
    ),
    PixelPreset::new(
        "saturate",
        "Scales every channel by 1.5",
        color::saturate,
        PresetMetadata::clamped(),
    ),
    PixelPreset::new(
        "hue",
        "Rotates the color channels",
        color::hue,
        PresetMetadata::plain(),
    ),
    PixelPreset::new(
        "glitch",
        "Rotates the color channels every fifth frame",
        temporal::glitch,
        PresetMetadata::frame_dependent(),
    ),
    PixelPreset::new(
        "vhs",
        "Tape color cast: less red, more blue",
        color::vhs,
        PresetMetadata::plain(),
    ),
];

/// Lookup table from preset identifier to transform
///
/// Unknown identifiers never fail: [`PresetRegistry::resolve`] hands back the
/// identity preset for them.
pub struct PresetRegistry {
    presets: HashMap<String, Arc<dyn Preset>>,
}

impl PresetRegistry {
    /// Create a new preset registry with all built-in presets
    pub fn new() -> Self {
        let mut registry = Self {
            presets: HashMap::new(),
        };

        registry.register_builtin_presets();
        registry
    }

    fn register_builtin_presets(&mut self) {
        for preset in BUILTIN_PRESETS {
            self.register(*preset);
        }
    }

    /// Register a preset under its own name, replacing any existing entry
    pub fn register<P: Preset + 'static>(&mut self, preset: P) {
        self.presets
            .insert(preset.name().to_string(), Arc::new(preset));
    }

    /// Get a preset by name
    pub fn get_preset(&self, name: &str) -> Option<Arc<dyn Preset>> {
        self.presets.get(name).cloned()
    }

    /// Get a preset by name, failing for unknown names
    pub fn require(&self, name: &str) -> Result<Arc<dyn Preset>> {
        self.get_preset(name).ok_or_else(|| {
            PresetError::NotFound {
                name: name.to_string(),
            }
            .into()
        })
    }

    /// Get a preset by name, falling back to the identity preset
    pub fn resolve(&self, name: &str) -> Arc<dyn Preset> {
        if let Some(preset) = self.get_preset(name) {
            return preset;
        }
        debug!("Unknown preset '{}', using identity", name);
        self.get_preset(IDENTITY_PRESET).unwrap_or_else(|| {
            let identity: Arc<dyn Preset> =
                Arc::new(PixelPreset::identity(IDENTITY_PRESET, "No effect"));
            identity
        })
    }

    /// All registered preset names, sorted
    pub fn available_presets(&self) -> Vec<String> {
        let mut names: Vec<String> = self.presets.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn has_preset(&self, name: &str) -> bool {
        self.presets.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

impl Default for PresetRegistry {
    fn default() -> Self {
        Self::new()
    }
}
