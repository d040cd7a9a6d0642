//! Connected component labelling

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::f64::consts::{FRAC_PI_2, PI};

use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};
use nalgebra::{Matrix2, Point2, SymmetricEigen};

use super::mask::BACKGROUND;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Relative eigenvalue difference below which a component has no dominant direction.
const ISOTROPY_TOL: f64 = 1e-6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A connected region of foreground pixels.
///
/// Only the pixel moments are kept, which is all that's needed for the centroid and
/// orientation.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    /// Label of the component, starting at 1 in the order components are first met in a raster
    /// scan.
    pub label: u32,

    /// Number of pixels.
    pub area: usize,

    sum_x: f64,
    sum_y: f64,
    sum_xx: f64,
    sum_yy: f64,
    sum_xy: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Component {
    fn new(label: u32) -> Self {
        Self {
            label,
            area: 0,
            sum_x: 0.0,
            sum_y: 0.0,
            sum_xx: 0.0,
            sum_yy: 0.0,
            sum_xy: 0.0,
        }
    }

    fn add(&mut self, x: u32, y: u32) {
        let (x, y) = (x as f64, y as f64);
        self.area += 1;
        self.sum_x += x;
        self.sum_y += y;
        self.sum_xx += x * x;
        self.sum_yy += y * y;
        self.sum_xy += x * y;
    }

    /// Mean pixel position.
    pub fn centroid(&self) -> Point2<f64> {
        let n = self.area.max(1) as f64;
        Point2::new(self.sum_x / n, self.sum_y / n)
    }

    /// Angle of the component's principal axis from the image vertical, in `(-pi/2, pi/2]`.
    ///
    /// Positive angles mean the top of the component leans to the right. `None` if the
    /// component has no dominant direction (a single pixel, a disc or a square).
    pub fn orientation(&self) -> Option<f64> {
        let n = self.area.max(1) as f64;
        let c = self.centroid();

        let cov_xx = self.sum_xx / n - c.x * c.x;
        let cov_yy = self.sum_yy / n - c.y * c.y;
        let cov_xy = self.sum_xy / n - c.x * c.y;

        let eigen = SymmetricEigen::new(Matrix2::new(cov_xx, cov_xy, cov_xy, cov_yy));
        let (l0, l1) = (eigen.eigenvalues[0], eigen.eigenvalues[1]);

        if (l0 - l1).abs() <= ISOTROPY_TOL * (l0.abs() + l1.abs()).max(1.0) {
            return None;
        }

        let major = if l0 > l1 { 0 } else { 1 };
        let mut vx = eigen.eigenvectors[(0, major)];
        let mut vy = eigen.eigenvectors[(1, major)];

        // Point the axis up the image (negative y)
        if vy > 0.0 || (vy == 0.0 && vx < 0.0) {
            vx = -vx;
            vy = -vy;
        }

        let mut angle = vx.atan2(-vy);
        if angle > FRAC_PI_2 {
            angle -= PI;
        } else if angle <= -FRAC_PI_2 {
            angle += PI;
        }

        Some(angle)
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Find the 8-connected components of the mask's foreground.
///
/// Components are returned in label order.
pub fn label(mask: &GrayImage) -> Vec<Component> {
    let labels = connected_components(mask, Connectivity::Eight, Luma([BACKGROUND]));
    let mut components: Vec<Component> = Vec::new();

    // Labels are consecutive from 1, in the order they are first met in a raster scan
    for (x, y, l) in labels.enumerate_pixels() {
        let l = l.0[0] as usize;
        if l == 0 {
            continue;
        }

        while components.len() < l {
            components.push(Component::new(components.len() as u32 + 1));
        }
        components[l - 1].add(x, y);
    }

    components
}

/// Select the component with the largest area which is at least `min_area`.
///
/// Equal areas are resolved in favour of the lowest label.
pub fn largest(components: &[Component], min_area: usize) -> Option<&Component> {
    let mut best: Option<&Component> = None;

    for c in components.iter().filter(|c| c.area >= min_area) {
        match best {
            Some(b) if c.area <= b.area => (),
            _ => best = Some(c),
        }
    }

    best
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use super::super::mask::FOREGROUND;
    use image::Luma;

    fn fill(mask: &mut GrayImage, x0: u32, y0: u32, x1: u32, y1: u32) {
        for y in y0..y1 {
            for x in x0..x1 {
                mask.put_pixel(x, y, Luma([FOREGROUND]));
            }
        }
    }

    #[test]
    fn test_label() {
        let mut mask = GrayImage::new(20, 10);
        fill(&mut mask, 1, 1, 4, 4);
        fill(&mut mask, 10, 0, 12, 10);
        // Joins the first block through a diagonal neighbour
        fill(&mut mask, 4, 4, 5, 5);

        let comps = label(&mask);
        assert_eq!(comps.len(), 2);

        // The bar starts on the first row so is labelled first
        assert_eq!(comps[0].label, 1);
        assert_eq!(comps[0].area, 20);
        assert_eq!(comps[0].centroid(), Point2::new(10.5, 4.5));
        assert_eq!(comps[1].label, 2);
        assert_eq!(comps[1].area, 10);

        assert_eq!(largest(&comps, 1).map(|c| c.label), Some(1));
        assert_eq!(largest(&comps, 15).map(|c| c.label), Some(1));
        assert_eq!(largest(&comps, 21), None);
    }

    #[test]
    fn test_largest_tie_break() {
        let mut mask = GrayImage::new(20, 10);
        fill(&mut mask, 12, 0, 14, 5);
        fill(&mut mask, 2, 5, 4, 10);

        let comps = label(&mask);
        assert_eq!(comps.len(), 2);
        assert_eq!(comps[0].area, comps[1].area);

        // The block met first in the raster scan (top right) wins
        let best = largest(&comps, 1).unwrap();
        assert_eq!(best.label, 1);
        assert_eq!(best.centroid(), Point2::new(12.5, 2.0));
    }

    #[test]
    fn test_orientation() {
        // Vertical bar
        let mut mask = GrayImage::new(20, 20);
        fill(&mut mask, 9, 0, 11, 20);
        let a = label(&mask)[0].orientation().unwrap();
        assert!(a.abs() < 1e-9);

        // Horizontal bar
        let mut mask = GrayImage::new(20, 20);
        fill(&mut mask, 0, 9, 20, 11);
        let a = label(&mask)[0].orientation().unwrap();
        assert!((a.abs() - std::f64::consts::FRAC_PI_2).abs() < 1e-9);

        // Diagonal leaning right towards the top
        let mut mask = GrayImage::new(20, 20);
        for i in 0..20 {
            mask.put_pixel(i, 19 - i, Luma([FOREGROUND]));
        }
        let a = label(&mask)[0].orientation().unwrap();
        assert!((a - std::f64::consts::FRAC_PI_4).abs() < 1e-9);

        // Square block has no direction
        let mut mask = GrayImage::new(20, 20);
        fill(&mut mask, 5, 5, 10, 10);
        assert_eq!(label(&mask)[0].orientation(), None);
    }
}
