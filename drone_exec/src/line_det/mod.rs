//! # Line detection module
//!
//! Finds the line to follow in a camera frame. Processing goes:
//!
//! 1. Resize to the working resolution and crop the look-ahead band near the bottom of the
//!    frame.
//! 2. Threshold into a binary mask using the configured colour policy.
//! 3. Clean up the mask with erosion and dilation.
//! 4. Label the connected components and keep the largest one.
//! 5. Report its centroid and direction, and optionally whether the band contains a sharp turn.
//!
//! Detection is a pure function of the frame and the parameters.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod components;
mod corners;
mod mask;
mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use image::{imageops, RgbImage};
use log::trace;
use nalgebra::Point2;
use serde::Serialize;

pub use components::{label, largest, Component};
pub use corners::count_corners;
pub use mask::{dilate, erode, rgb_to_hsv, threshold};
pub use params::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The line detector.
#[derive(Debug, Clone)]
pub struct LineDetector {
    params: LineDetParams,
}

/// The result of detection on a single frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineObservation {
    /// True if a line was found.
    pub found: bool,

    /// Centroid of the line in the working frame.
    ///
    /// Units: pixels
    pub center: Option<Point2<f64>>,

    /// Angle of the line from the image vertical, positive when the line leans right towards
    /// the top of the frame. `None` if the line blob has no dominant direction.
    ///
    /// Units: radians
    pub angle_rad: Option<f64>,

    /// True if the line makes a sharp turn inside the look-ahead band.
    pub corner: bool,

    /// Area of the line blob.
    ///
    /// Units: pixels
    pub area: usize,

    /// Width of the working frame, which the center is measured against.
    ///
    /// Units: pixels
    pub frame_width: u32,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LineDetError {
    #[error("The working frame must not be empty, found {0}x{1}")]
    EmptyWorkFrame(u32, u32),

    #[error(
        "The look-ahead band must satisfy roi_top < roi_bottom <= work_height, found {0}..{1} \
        for a height of {2}"
    )]
    InvalidRoi(u32, u32, u32),

    #[error("The Harris parameter must be positive, found {0}")]
    InvalidHarrisK(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LineDetector {
    /// Create a new detector, checking the parameters.
    pub fn new(params: LineDetParams) -> Result<Self, LineDetError> {
        if params.work_width == 0 || params.work_height == 0 {
            return Err(LineDetError::EmptyWorkFrame(params.work_width, params.work_height));
        }

        if params.roi_top >= params.roi_bottom || params.roi_bottom > params.work_height {
            return Err(LineDetError::InvalidRoi(
                params.roi_top,
                params.roi_bottom,
                params.work_height,
            ));
        }

        if params.corner.enabled && !(params.corner.harris_k > 0.0) {
            return Err(LineDetError::InvalidHarrisK(params.corner.harris_k));
        }

        Ok(Self { params })
    }

    pub fn params(&self) -> &LineDetParams {
        &self.params
    }

    /// Detect the line in a frame.
    pub fn detect(&self, frame: &RgbImage) -> LineObservation {
        let p = &self.params;

        let mut obs = LineObservation::not_found(p.work_width);

        if frame.width() == 0 || frame.height() == 0 {
            return obs;
        }

        // Resize and crop
        let band = {
            let band_height = p.roi_bottom - p.roi_top;
            if frame.dimensions() == (p.work_width, p.work_height) {
                imageops::crop_imm(frame, 0, p.roi_top, p.work_width, band_height).to_image()
            } else {
                let resized = imageops::resize(
                    frame,
                    p.work_width,
                    p.work_height,
                    imageops::FilterType::Nearest,
                );
                imageops::crop_imm(&resized, 0, p.roi_top, p.work_width, band_height).to_image()
            }
        };

        // Segment
        let mut mask = threshold(&band, &p.threshold);
        mask = erode(&mask, p.erode_kernel);
        mask = dilate(&mask, p.dilate_kernel);

        let comps = label(&mask);
        let line = match largest(&comps, p.min_area.max(1)) {
            Some(c) => c,
            None => {
                trace!("No line found ({} components)", comps.len());
                return obs;
            }
        };

        let c = line.centroid();
        obs.found = true;
        obs.center = Some(Point2::new(c.x, c.y + p.roi_top as f64));
        obs.angle_rad = line.orientation();
        obs.area = line.area;

        if p.corner.enabled {
            obs.corner = count_corners(&mask, &p.corner) >= p.corner.min_count;
        }

        trace!(
            "Line found at {:?}, angle {:?}, area {}, corner {}",
            obs.center,
            obs.angle_rad,
            obs.area,
            obs.corner
        );

        obs
    }
}

impl LineObservation {
    /// An observation where no line was seen.
    pub fn not_found(frame_width: u32) -> Self {
        Self {
            found: false,
            center: None,
            angle_rad: None,
            corner: false,
            area: 0,
            frame_width,
        }
    }

    /// An observation of a line centred at `center`.
    pub fn at(center: Point2<f64>, frame_width: u32) -> Self {
        Self {
            found: true,
            center: Some(center),
            angle_rad: None,
            corner: false,
            area: 0,
            frame_width,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
