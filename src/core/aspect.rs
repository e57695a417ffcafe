//! Aspect ratio controller - applies camera ratios without visual zoom jumps.
//!
//! The host re-reads its stored fov along the *new* axis after a ratio change
//! without converting it. Applying a ratio is therefore done in two phases:
//!
//! ```text
//! 1. normalize: ratio set -> clear it, fov(h) -> fov(v) via min(old, viewport)
//! 2. apply:     target > 0 -> write it, fov(v) -> fov(h) via min(target, viewport)
//! ```
//!
//! The vertical extent visible in the safe frame is preserved across the change.

use log::{debug, trace, warn};

use super::angles::{Angle, Axis, float_equal};
use crate::entities::camera::{CameraAdapter, MIN_ASPECT_RATIO};

/// Viewport width / height, `None` for a degenerate (zero-sized) viewport.
pub fn viewport_ratio<C: CameraAdapter + ?Sized>(camera: &C) -> Option<f64> {
    let (width, height) = camera.viewport_size();
    if width == 0 || height == 0 {
        return None;
    }
    Some(width as f64 / height as f64)
}

/// Snap a requested ratio the way the host does: below 0.1 means unset.
pub fn snap_ratio(ratio: f64) -> f64 {
    if ratio >= MIN_ASPECT_RATIO { ratio } else { 0.0 }
}

/// Ratio of the letterboxed safe frame inside the viewport.
///
/// `camera_ratio` must be > 0. Without a usable viewport the camera ratio
/// alone governs.
pub fn safe_frame_ratio(camera_ratio: f64, viewport_ratio: Option<f64>) -> f64 {
    match viewport_ratio {
        Some(viewport) => camera_ratio.min(viewport),
        None => camera_ratio,
    }
}

/// Ratio the stored fov converts through: the viewport ratio while unset,
/// the camera ratio once pinned.
pub fn governing_ratio<C: CameraAdapter + ?Sized>(camera: &C) -> Option<f64> {
    let ratio = camera.aspect_ratio();
    if float_equal(ratio, 0.0) {
        viewport_ratio(camera)
    } else {
        Some(ratio)
    }
}

/// The host's fov, tagged with the axis it currently means.
pub fn stored_angle<C: CameraAdapter + ?Sized>(camera: &C) -> Angle {
    Angle {
        axis: Axis::of_camera_ratio(camera.aspect_ratio()),
        degrees: camera.field_of_view(),
    }
}

/// Apply a new camera aspect ratio. Returns `false` if nothing changed.
///
/// `compensate_zoom == false` writes the ratio alone; the picture will shift.
pub fn set_aspect_ratio<C: CameraAdapter + ?Sized>(
    camera: &mut C,
    target: f64,
    compensate_zoom: bool,
) -> bool {
    let target = snap_ratio(target);
    let current = camera.aspect_ratio();
    if float_equal(current, target) {
        trace!("set_aspect_ratio: {:.3} unchanged", target);
        return false;
    }

    if !compensate_zoom {
        camera.set_aspect_ratio(target);
        debug!("set_aspect_ratio: {:.3} -> {:.3} (no zoom fix)", current, target);
        return true;
    }

    let viewport = viewport_ratio(camera);
    if viewport.is_none() {
        warn!("set_aspect_ratio: degenerate viewport, correcting with camera ratio only");
    }

    // Phase 1: back to the vertical convention.
    if !float_equal(current, 0.0) {
        camera.set_aspect_ratio(0.0);
        let safe = safe_frame_ratio(current, viewport);
        let vertical = Angle::horizontal(camera.field_of_view()).to_axis(Axis::Vertical, safe);
        camera.set_field_of_view(vertical.degrees);
    }

    if float_equal(target, 0.0) {
        debug!("set_aspect_ratio: {:.3} -> unset, fov(v)={:.3}", current, camera.field_of_view());
        return true;
    }

    // Phase 2: pin the ratio, re-project the vertical angle onto the horizontal axis.
    camera.set_aspect_ratio(target);
    let safe = safe_frame_ratio(target, viewport);
    let horizontal = Angle::vertical(camera.field_of_view()).to_axis(Axis::Horizontal, safe);
    camera.set_field_of_view(horizontal.degrees);

    debug!(
        "set_aspect_ratio: {:.3} -> {:.3}, safe frame {:.3}, fov(h)={:.3}",
        current,
        target,
        safe,
        camera.field_of_view()
    );
    true
}

/// Current (horizontal, vertical) angles of view in degrees.
///
/// `None` when the camera ratio is unset and the viewport is degenerate.
pub fn angles_of_view<C: CameraAdapter + ?Sized>(camera: &C) -> Option<(f64, f64)> {
    let stored = stored_angle(camera);
    let ratio = governing_ratio(camera)?;
    let derived = stored.to_axis(stored.axis.other(), ratio);
    Some(match stored.axis {
        Axis::Horizontal => (stored.degrees, derived.degrees),
        Axis::Vertical => (derived.degrees, stored.degrees),
    })
}

/// Write an angle of view along either axis. Returns `false` if the
/// governing ratio is unavailable and nothing was written.
pub fn set_angle<C: CameraAdapter + ?Sized>(camera: &mut C, angle: Angle) -> bool {
    let axis = Axis::of_camera_ratio(camera.aspect_ratio());
    if angle.axis == axis {
        camera.set_field_of_view(angle.degrees);
        return true;
    }
    let Some(ratio) = governing_ratio(camera) else {
        warn!("set_angle: degenerate viewport, {:?} angle ignored", angle.axis);
        return false;
    };
    camera.set_field_of_view(angle.to_axis(axis, ratio).degrees);
    true
}

pub fn set_horizontal_angle<C: CameraAdapter + ?Sized>(camera: &mut C, degrees: f64) -> bool {
    set_angle(camera, Angle::horizontal(degrees))
}

pub fn set_vertical_angle<C: CameraAdapter + ?Sized>(camera: &mut C, degrees: f64) -> bool {
    set_angle(camera, Angle::vertical(degrees))
}
