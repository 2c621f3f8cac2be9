//! # Text Overlay
//!
//! Animated caption drawn after the preset has run. Layout math lives in
//! [`layout`]; glyph rasterization and blending in [`text`].

pub mod layout;
pub mod text;

pub use layout::{OverlayConfig, OverlayLayout};
pub use text::{discover_font, load_font, TextOverlay};
