//! # Pixel Presets
//!
//! Named per-frame color transforms. Every preset rewrites the red, green and
//! blue channels of a frame in place and never touches alpha.
//!
//! ## Built-in Presets
//!
//! - **Tone**: grayscale, cinematic, sepia / classic, vintage, vhs
//! - **Level**: brightness, bright, saturate
//! - **Channel**: invert / dramatic, neon, hue
//! - **Time-varying**: pixelate (even frames), glitch (every fifth frame)
//! - **blur**: a luminance flatten, same formula as grayscale
//!
//! ## Usage
//!
//! ```rust,no_run
//! use clip_compositor::presets::PresetRegistry;
//! use clip_compositor::video::Frame;
//!
//! let registry = PresetRegistry::new();
//! let sepia = registry.resolve("sepia");
//!
//! let mut frame = Frame::new_filled(64, 64, [120, 80, 40, 255]);
//! sepia.apply(&mut frame, 0).unwrap();
//! ```

pub mod color;
pub mod pixel;
pub mod registry;
pub mod temporal;
pub mod traits;

pub use pixel::{ChannelFormula, PixelPreset};
pub use registry::{PresetRegistry, BUILTIN_PRESETS, IDENTITY_PRESET};
pub use traits::{Preset, PresetMetadata};
