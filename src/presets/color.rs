//! Per-pixel color formulas that ignore the frame counter.
//!
//! Each takes the pre-transform `[r, g, b]` and returns the formula value.
//! Only the formulas that cap with `min(255)` are clamped here; everything
//! else is left as computed and saturates when stored.

pub fn identity(rgb: [f64; 3], _frame: u64) -> [f64; 3] {
    rgb
}

pub fn grayscale([r, g, b]: [f64; 3], _frame: u64) -> [f64; 3] {
    let avg = (r + g + b) / 3.0;
    [avg, avg, avg]
}

pub fn invert([r, g, b]: [f64; 3], _frame: u64) -> [f64; 3] {
    [255.0 - r, 255.0 - g, 255.0 - b]
}

pub fn brightness([r, g, b]: [f64; 3], _frame: u64) -> [f64; 3] {
    [
        (r + 50.0).min(255.0),
        (g + 50.0).min(255.0),
        (b + 50.0).min(255.0),
    ]
}

pub fn cinematic([r, g, b]: [f64; 3], _frame: u64) -> [f64; 3] {
    let gray = ((r + g + b) / 3.0) * 0.9;
    [gray, gray, gray]
}

pub fn bright([r, g, b]: [f64; 3], _frame: u64) -> [f64; 3] {
    [
        (r * 1.2).min(255.0),
        (g * 1.2).min(255.0),
        (b * 1.2).min(255.0),
    ]
}

/// Sepia matrix, capped above only
pub fn sepia([r, g, b]: [f64; 3], _frame: u64) -> [f64; 3] {
    [
        (0.393 * r + 0.769 * g + 0.189 * b).min(255.0),
        (0.349 * r + 0.686 * g + 0.168 * b).min(255.0),
        (0.272 * r + 0.534 * g + 0.131 * b).min(255.0),
    ]
}

pub fn vintage([r, g, b]: [f64; 3], _frame: u64) -> [f64; 3] {
    [0.9 * r + 30.0, 0.85 * g + 20.0, 0.8 * b + 10.0]
}

pub fn neon([r, g, b]: [f64; 3], _frame: u64) -> [f64; 3] {
    [255.0 - r, g, 255.0 - b]
}

pub fn saturate([r, g, b]: [f64; 3], _frame: u64) -> [f64; 3] {
    [
        (r * 1.5).min(255.0),
        (g * 1.5).min(255.0),
        (b * 1.5).min(255.0),
    ]
}

/// Channel rotation: red takes blue, green takes red, blue takes green
pub fn hue([r, g, b]: [f64; 3], _frame: u64) -> [f64; 3] {
    [b, r, g]
}

pub fn vhs([r, g, b]: [f64; 3], _frame: u64) -> [f64; 3] {
    [r * 0.8, g * 0.9, b * 1.2]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: [f64; 3], expected: [f64; 3]) {
        for (a, e) in actual.iter().zip(expected.iter()) {
            assert!((a - e).abs() < 1e-9, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn test_grayscale_average() {
        assert_close(grayscale([30.0, 60.0, 90.0], 0), [60.0, 60.0, 60.0]);
        assert_close(grayscale([1.0, 1.0, 2.0], 0), [4.0 / 3.0; 3]);
    }

    #[test]
    fn test_invert() {
        assert_close(invert([0.0, 128.0, 255.0], 0), [255.0, 127.0, 0.0]);
    }

    #[test]
    fn test_brightness_caps_at_255() {
        assert_close(brightness([10.0, 205.0, 250.0], 0), [60.0, 255.0, 255.0]);
    }

    #[test]
    fn test_cinematic_darkens_gray() {
        assert_close(cinematic([100.0, 100.0, 100.0], 0), [90.0, 90.0, 90.0]);
    }

    #[test]
    fn test_bright_caps_at_255() {
        assert_close(bright([100.0, 212.5, 250.0], 0), [120.0, 255.0, 255.0]);
    }

    #[test]
    fn test_sepia_matrix() {
        assert_close(
            sepia([100.0, 50.0, 20.0], 0),
            [
                0.393 * 100.0 + 0.769 * 50.0 + 0.189 * 20.0,
                0.349 * 100.0 + 0.686 * 50.0 + 0.168 * 20.0,
                0.272 * 100.0 + 0.534 * 50.0 + 0.131 * 20.0,
            ],
        );
        // white overflows the red and green rows and gets capped
        let white = sepia([255.0; 3], 0);
        assert_eq!(white[0], 255.0);
        assert_eq!(white[1], 255.0);
        assert!(white[2] < 255.0);
    }

    #[test]
    fn test_vintage_is_not_clamped() {
        let out = vintage([255.0, 255.0, 255.0], 0);
        assert_close(out, [0.9 * 255.0 + 30.0, 0.85 * 255.0 + 20.0, 0.8 * 255.0 + 10.0]);
        assert!(out[0] > 255.0);
    }

    #[test]
    fn test_neon_keeps_green() {
        assert_close(neon([10.0, 20.0, 30.0], 0), [245.0, 20.0, 225.0]);
    }

    #[test]
    fn test_saturate_caps_at_255() {
        assert_close(saturate([100.0, 170.0, 200.0], 0), [150.0, 255.0, 255.0]);
    }

    #[test]
    fn test_hue_rotates_channels() {
        assert_close(hue([1.0, 2.0, 3.0], 0), [3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_vhs_blue_is_not_clamped() {
        let out = vhs([100.0, 100.0, 250.0], 0);
        assert_close(out, [80.0, 90.0, 300.0]);
    }
}
