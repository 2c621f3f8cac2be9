//! Formulas that switch on the frame counter.

use super::color;

/// Darken by 20% on even frames, untouched on odd ones
pub fn pixelate([r, g, b]: [f64; 3], frame: u64) -> [f64; 3] {
    if frame % 2 == 0 {
        [r * 0.8, g * 0.8, b * 0.8]
    } else {
        [r, g, b]
    }
}

/// Hue rotation on every fifth frame (0, 5, 10, ...)
pub fn glitch(rgb: [f64; 3], frame: u64) -> [f64; 3] {
    if frame % 5 == 0 {
        color::hue(rgb, frame)
    } else {
        rgb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixelate_even_odd() {
        let px = [100.0, 50.0, 200.0];
        assert_eq!(pixelate(px, 0), [80.0, 40.0, 160.0]);
        assert_eq!(pixelate(px, 1), px);
        assert_eq!(pixelate(px, 2), pixelate(px, 0));
    }

    #[test]
    fn test_glitch_every_fifth_frame() {
        let px = [1.0, 2.0, 3.0];
        assert_eq!(glitch(px, 0), [3.0, 1.0, 2.0]);
        assert_eq!(glitch(px, 5), glitch(px, 0));
        for frame in 1..5 {
            assert_eq!(glitch(px, frame), px);
        }
    }
}
