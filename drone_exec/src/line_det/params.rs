//! Parameters structure for the line detector

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for line detection.
#[derive(Debug, Clone, Deserialize)]
pub struct LineDetParams {

    // ---- WORKING FRAME ----

    /// Width frames are resized to before processing.
    ///
    /// Units: pixels
    pub work_width: u32,

    /// Height frames are resized to before processing.
    ///
    /// Units: pixels
    pub work_height: u32,

    /// First row of the look-ahead band (inclusive) in the working frame.
    ///
    /// Units: pixels
    pub roi_top: u32,

    /// Last row of the look-ahead band (exclusive) in the working frame.
    ///
    /// Units: pixels
    pub roi_bottom: u32,

    // ---- SEGMENTATION ----

    /// Colour threshold used to separate the line from the background. Defaults to a dark line.
    pub threshold: ColourThreshold,

    /// Side length of the square erosion kernel, 0 disables erosion. Even sizes are rounded up
    /// to the next odd size.
    ///
    /// Units: pixels
    pub erode_kernel: u32,

    /// Side length of the square dilation kernel, 0 disables dilation.
    ///
    /// Units: pixels
    pub dilate_kernel: u32,

    /// Components smaller than this are ignored.
    ///
    /// Units: pixels
    pub min_area: usize,

    // ---- CORNERS ----

    pub corner: CornerParams,
}

/// Parameters of the corner (sharp turn) detector.
#[derive(Debug, Clone, Deserialize)]
pub struct CornerParams {
    /// Run the corner detector.
    pub enabled: bool,

    /// Harris detector free parameter, usually between 0.04 and 0.06.
    pub harris_k: f64,

    /// Minimum Harris response of a corner. Responses are computed on the mask scaled to
    /// `[0, 1]`.
    pub response_threshold: f64,

    /// Number of corners needed to flag the observation.
    pub min_count: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Colour threshold policy.
///
/// All bounds are inclusive.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ColourThreshold {
    /// Threshold in HSV space. Hue is in `[0, 179]` (degrees halved), saturation and value in
    /// `[0, 255]`. If `h_min > h_max` the hue band wraps around through 0, which is needed for
    /// red lines.
    Hsv {
        h_min: u8,
        h_max: u8,
        s_min: u8,
        s_max: u8,
        v_min: u8,
        v_max: u8,
    },

    /// Accept pixels whose every channel is within `tolerance` of `target`.
    Rgb {
        target: [u8; 3],
        tolerance: u8,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for LineDetParams {
    fn default() -> Self {
        Self {
            work_width: 480,
            work_height: 360,
            roi_top: 250,
            roi_bottom: 360,
            threshold: ColourThreshold::Hsv {
                h_min: 0,
                h_max: 179,
                s_min: 0,
                s_max: 255,
                v_min: 0,
                v_max: 80,
            },
            erode_kernel: 0,
            dilate_kernel: 15,
            min_area: 50,
            corner: CornerParams::default(),
        }
    }
}

impl Default for CornerParams {
    fn default() -> Self {
        Self {
            enabled: true,
            harris_k: 0.04,
            response_threshold: 100.0,
            min_count: 2,
        }
    }
}
