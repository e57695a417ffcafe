//! Angle-of-view conversion between the horizontal and vertical axis.
//!
//! All angles are in degrees. Conversions go through radians internally:
//!
//! ```text
//! h = 2 * atan(tan(v / 2) * ratio)
//! v = 2 * atan(tan(h / 2) / ratio)
//! ```
//!
//! `ratio` is width / height and must be > 0. Callers substitute the viewport
//! ratio for an unset (0) camera ratio before converting.

use serde::{Deserialize, Serialize};

/// Default tolerance for comparing ratios and angles.
///
/// Every value passes through trigonometry and the host camera, so exact
/// comparison is never meaningful.
pub const FLOAT_TOLERANCE: f64 = 1.0e-3;

/// `a == b` within [`FLOAT_TOLERANCE`].
#[inline]
pub fn float_equal(a: f64, b: f64) -> bool {
    float_equal_tol(a, b, FLOAT_TOLERANCE)
}

/// `a == b` within `tolerance`.
#[inline]
pub fn float_equal_tol(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() < tolerance
}

/// Vertical angle of view to horizontal, for a frame of the given ratio.
pub fn vertical_to_horizontal(v_deg: f64, ratio: f64) -> f64 {
    debug_assert!(ratio > 0.0, "ratio must be positive, got {ratio}");
    let half = (v_deg.to_radians() / 2.0).tan() * ratio;
    (2.0 * half.atan()).to_degrees()
}

/// Horizontal angle of view to vertical, for a frame of the given ratio.
pub fn horizontal_to_vertical(h_deg: f64, ratio: f64) -> f64 {
    debug_assert!(ratio > 0.0, "ratio must be positive, got {ratio}");
    let half = (h_deg.to_radians() / 2.0).tan() / ratio;
    (2.0 * half.atan()).to_degrees()
}

/// Axis an angle of view is measured along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    /// Axis of the host's single `field_of_view` number.
    ///
    /// Vertical while the camera ratio is unset (0), horizontal once a ratio
    /// is pinned.
    pub fn of_camera_ratio(aspect_ratio: f64) -> Self {
        if float_equal(aspect_ratio, 0.0) {
            Axis::Vertical
        } else {
            Axis::Horizontal
        }
    }

    pub fn other(self) -> Self {
        match self {
            Axis::Horizontal => Axis::Vertical,
            Axis::Vertical => Axis::Horizontal,
        }
    }
}

/// Angle of view tagged with the axis it is measured along.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Angle {
    pub axis: Axis,
    pub degrees: f64,
}

impl Angle {
    pub fn horizontal(degrees: f64) -> Self {
        Self { axis: Axis::Horizontal, degrees }
    }

    pub fn vertical(degrees: f64) -> Self {
        Self { axis: Axis::Vertical, degrees }
    }

    /// Re-express this angle along `axis` for a frame of width / height `ratio`.
    ///
    /// Returns `self` unchanged if it is already along `axis`.
    pub fn to_axis(self, axis: Axis, ratio: f64) -> Self {
        if self.axis == axis {
            return self;
        }
        let degrees = match axis {
            Axis::Horizontal => vertical_to_horizontal(self.degrees, ratio),
            Axis::Vertical => horizontal_to_vertical(self.degrees, ratio),
        };
        Self { axis, degrees }
    }
}
