//! Harris corner detection on the line mask
//!
//! A straight stretch of line only has edges, while a sharp turn gives strong corner responses
//! at its inner and outer bends.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use image::GrayImage;
use imageproc::{
    corners::Corner,
    gradients::{horizontal_sobel, vertical_sobel},
    suppress::local_maxima,
};

use super::CornerParams;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Count the corners in the mask.
///
/// A corner is a pixel whose Harris response is above the threshold and is a local maximum in
/// its 3x3 neighbourhood. Equal neighbouring responses are counted once, ties resolved by
/// coordinates.
pub fn count_corners(mask: &GrayImage, params: &CornerParams) -> usize {
    let (w, h) = mask.dimensions();
    if w == 0 || h == 0 {
        return 0;
    }

    let resp = harris_response(mask, params.harris_k);

    let candidates: Vec<Corner> = resp
        .iter()
        .enumerate()
        .filter(|(_, &r)| r > params.response_threshold)
        .map(|(i, &r)| Corner::new(i as u32 % w, i as u32 / w, r as f32))
        .collect();

    local_maxima(&candidates, 1).len()
}

/// Compute the Harris response `det(M) - k trace(M)^2` of every pixel, in raster order.
///
/// The mask is scaled to `[0, 1]`. Gradients use the 3x3 Sobel operator and `M` is summed over
/// a 3x3 window, both with replicated borders.
pub fn harris_response(mask: &GrayImage, k: f64) -> Vec<f64> {
    let (w, h) = mask.dimensions();
    let (wi, hi) = (w as i64, h as i64);

    let gx = horizontal_sobel(mask);
    let gy = vertical_sobel(mask);

    let n = (w as usize) * (h as usize);
    let mut ixx = Vec::with_capacity(n);
    let mut iyy = Vec::with_capacity(n);
    let mut ixy = Vec::with_capacity(n);

    for (dx, dy) in gx.pixels().zip(gy.pixels()) {
        let dx = dx.0[0] as f64 / 255.0;
        let dy = dy.0[0] as f64 / 255.0;
        ixx.push(dx * dx);
        iyy.push(dy * dy);
        ixy.push(dx * dy);
    }

    let idx = |x: i64, y: i64| {
        (y.max(0).min(hi - 1) as usize) * (w as usize) + x.max(0).min(wi - 1) as usize
    };

    let mut resp = vec![0f64; n];

    for y in 0..hi {
        for x in 0..wi {
            let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let i = idx(x + dx, y + dy);
                    sxx += ixx[i];
                    syy += iyy[i];
                    sxy += ixy[i];
                }
            }

            let det = sxx * syy - sxy * sxy;
            let trace = sxx + syy;
            resp[idx(x, y)] = det - k * trace * trace;
        }
    }

    resp
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use image::Luma;

    fn fill(mask: &mut GrayImage, x0: u32, y0: u32, x1: u32, y1: u32) {
        for y in y0..y1 {
            for x in x0..x1 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
    }

    #[test]
    fn test_straight_line_has_no_corners() {
        let mut mask = GrayImage::new(80, 60);
        fill(&mut mask, 20, 0, 40, 60);

        assert_eq!(count_corners(&mask, &CornerParams::default()), 0);
    }

    #[test]
    fn test_turn_has_corners() {
        // Line coming up from the bottom and turning right
        let mut mask = GrayImage::new(80, 60);
        fill(&mut mask, 20, 30, 40, 60);
        fill(&mut mask, 20, 30, 80, 50);

        let count = count_corners(&mask, &CornerParams::default());
        assert!(count >= 2, "found {} corners", count);
    }

    #[test]
    fn test_quadrant_response() {
        let mut mask = GrayImage::new(20, 20);
        fill(&mut mask, 10, 10, 20, 20);

        let resp = harris_response(&mask, 0.04);

        // At the corner the structure tensor sums to [[52, 16], [16, 52]]
        let r = resp[10 * 20 + 10];
        assert!((r - (52.0 * 52.0 - 16.0 * 16.0 - 0.04 * 104.0 * 104.0)).abs() < 1e-9);

        // Along an edge the response is negative
        assert!(resp[15 * 20 + 10] < 0.0);
    }

    #[test]
    fn test_flat_plateau_counted_once() {
        // A lone square has four corners, each counted once
        let mut mask = GrayImage::new(40, 40);
        fill(&mut mask, 10, 10, 30, 30);

        let params = CornerParams {
            min_count: 1,
            ..CornerParams::default()
        };
        assert_eq!(count_corners(&mask, &params), 4);
    }
}
