//! Binary mask creation and morphology

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::{distance_transform::Norm, map::map_colors, morphology};

use super::ColourThreshold;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Mask value of a line pixel.
pub const FOREGROUND: u8 = 255;

/// Mask value of a background pixel.
pub const BACKGROUND: u8 = 0;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Threshold a colour image into a binary mask.
pub fn threshold(img: &RgbImage, policy: &ColourThreshold) -> GrayImage {
    map_colors(img, |px: Rgb<u8>| match accept(px.0, policy) {
        true => Luma([FOREGROUND]),
        false => Luma([BACKGROUND]),
    })
}

/// Convert an RGB pixel to HSV.
///
/// Hue is in `[0, 179]` (degrees halved so it fits in a byte), saturation and value in
/// `[0, 255]`.
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let r = rgb[0] as f64;
    let g = rgb[1] as f64;
    let b = rgb[2] as f64;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let s = if max > 0.0 { 255.0 * delta / max } else { 0.0 };

    let mut h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }

    // 360 degrees rounds back to 0
    let h = ((h / 2.0).round() as u32 % 180) as u8;

    [h, s.round() as u8, max as u8]
}

/// Dilate the mask with a square kernel of side `size`.
///
/// Even sizes are rounded up to the next odd size. Sizes of 0 or 1 leave the mask unchanged.
pub fn dilate(mask: &GrayImage, size: u32) -> GrayImage {
    match radius(size) {
        0 => mask.clone(),
        k => morphology::dilate(mask, Norm::LInf, k),
    }
}

/// Erode the mask with a square kernel of side `size`, sized as for [`dilate`].
///
/// Pixels outside the image count as foreground, so the mask doesn't shrink away from the border.
pub fn erode(mask: &GrayImage, size: u32) -> GrayImage {
    match radius(size) {
        0 => mask.clone(),
        k => morphology::erode(mask, Norm::LInf, k),
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn accept(rgb: [u8; 3], policy: &ColourThreshold) -> bool {
    match *policy {
        ColourThreshold::Hsv {
            h_min,
            h_max,
            s_min,
            s_max,
            v_min,
            v_max,
        } => {
            let [h, s, v] = rgb_to_hsv(rgb);

            let h_ok = if h_min <= h_max {
                h >= h_min && h <= h_max
            } else {
                h >= h_min || h <= h_max
            };

            h_ok && s >= s_min && s <= s_max && v >= v_min && v <= v_max
        }
        ColourThreshold::Rgb { target, tolerance } => rgb
            .iter()
            .zip(target.iter())
            .all(|(c, t)| (*c as i16 - *t as i16).abs() <= tolerance as i16),
    }
}

/// Chessboard radius of a square kernel of side `size`.
fn radius(size: u32) -> u8 {
    (size / 2).min(u8::MAX as u32) as u8
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
