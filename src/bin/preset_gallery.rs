// Renders a test pattern through every preset so they can be compared side by side

use std::path::PathBuf;

use clip_compositor::{
    presets::PresetRegistry,
    video::Frame,
};

/// Hue sweep left to right, brightness top to bottom
fn test_pattern(width: u32, height: u32) -> Frame {
    let mut frame = Frame::new_black(width, height);
    for y in 0..height {
        let level = 1.0 - y as f32 / height as f32;
        for x in 0..width {
            let t = x as f32 / width as f32;
            let r = (1.0 - t) * 255.0 * level;
            let g = (1.0 - (2.0 * t - 1.0).abs()) * 255.0 * level;
            let b = t * 255.0 * level;
            frame.set_pixel(x, y, [r as u8, g as u8, b as u8, 255]);
        }
    }
    frame
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("preset_gallery"));
    std::fs::create_dir_all(&out_dir)?;

    println!("🎨 Rendering preset gallery into {}", out_dir.display());

    let registry = PresetRegistry::new();
    let pattern = test_pattern(256, 128);
    pattern.save_png(out_dir.join("_source.png"))?;

    for name in registry.available_presets() {
        let preset = registry.require(&name)?;

        // frame-dependent presets show both phases
        let counters: &[u64] = if preset.metadata().frame_dependent {
            &[0, 1]
        } else {
            &[0]
        };

        for &counter in counters {
            let mut frame = pattern.clone();
            preset.apply(&mut frame, counter)?;

            let file = if counters.len() > 1 {
                format!("{}_{}.png", name, counter)
            } else {
                format!("{}.png", name)
            };
            frame.save_png(out_dir.join(&file))?;
            println!("   {:<12} -> {}", name, file);
        }
    }

    println!("✅ {} presets rendered", registry.len());
    Ok(())
}
