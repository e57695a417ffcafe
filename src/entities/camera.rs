//! Host camera contract and the reference in-memory camera.
//!
//! The host camera stores a single, axis-ambiguous `field_of_view`:
//! - `aspect_ratio == 0`: fov is the **vertical** angle of view
//! - `aspect_ratio > 0`:  fov is the **horizontal** angle of view
//!
//! Toggling the ratio does not touch the stored number, so the picture jumps
//! unless the caller re-projects the angle (see `core::aspect`).

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// Ratios below this are forced to "unset" by the host.
pub const MIN_ASPECT_RATIO: f64 = 0.1;

/// Host clamps the stored angle of view into this range (degrees).
pub const FOV_MIN: f64 = 1.0;
pub const FOV_MAX: f64 = 179.0;

/// Narrow read/write contract over the host camera and its live viewport.
///
/// Writes are synchronous: a subsequent read returns the written value (or
/// the value the host snapped it to).
pub trait CameraAdapter {
    fn aspect_ratio(&self) -> f64;
    fn set_aspect_ratio(&mut self, ratio: f64);
    fn field_of_view(&self) -> f64;
    fn set_field_of_view(&mut self, degrees: f64);
    /// Live viewport size in pixels (width, height). Not the export size.
    fn viewport_size(&self) -> (u32, u32);
}

/// Camera framing as the host keeps it.
///
/// Also the reference host camera: applies the host's snapping rules on write.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraFraming {
    pub aspect_ratio: f64,
    pub field_of_view: f64,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for CameraFraming {
    fn default() -> Self {
        Self {
            aspect_ratio: 0.0,
            field_of_view: 35.0,
            viewport_width: 1920,
            viewport_height: 1080,
        }
    }
}

impl CameraFraming {
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            viewport_width,
            viewport_height,
            ..Self::default()
        }
    }

    /// Builder-style fov (applies host clamping).
    pub fn with_field_of_view(mut self, degrees: f64) -> Self {
        CameraAdapter::set_field_of_view(&mut self, degrees);
        self
    }

    /// Builder-style ratio (applies host snapping, no angle correction).
    pub fn with_aspect_ratio(mut self, ratio: f64) -> Self {
        CameraAdapter::set_aspect_ratio(&mut self, ratio);
        self
    }

    /// Resize the live viewport (host window resize).
    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        self.viewport_width = width;
        self.viewport_height = height;
    }

    /// Copy of the current state of any camera.
    pub fn snapshot<C: CameraAdapter + ?Sized>(camera: &C) -> Self {
        let (viewport_width, viewport_height) = camera.viewport_size();
        Self {
            aspect_ratio: camera.aspect_ratio(),
            field_of_view: camera.field_of_view(),
            viewport_width,
            viewport_height,
        }
    }
}

impl CameraAdapter for CameraFraming {
    fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }

    fn set_aspect_ratio(&mut self, ratio: f64) {
        // NaN fails the comparison and lands on unset as well
        self.aspect_ratio = if ratio >= MIN_ASPECT_RATIO { ratio } else { 0.0 };
    }

    fn field_of_view(&self) -> f64 {
        self.field_of_view
    }

    fn set_field_of_view(&mut self, degrees: f64) {
        if degrees.is_finite() {
            self.field_of_view = degrees.clamp(FOV_MIN, FOV_MAX);
        }
    }

    fn viewport_size(&self) -> (u32, u32) {
        (self.viewport_width, self.viewport_height)
    }
}

impl<T: CameraAdapter + ?Sized> CameraAdapter for &mut T {
    fn aspect_ratio(&self) -> f64 {
        (**self).aspect_ratio()
    }

    fn set_aspect_ratio(&mut self, ratio: f64) {
        (**self).set_aspect_ratio(ratio)
    }

    fn field_of_view(&self) -> f64 {
        (**self).field_of_view()
    }

    fn set_field_of_view(&mut self, degrees: f64) {
        (**self).set_field_of_view(degrees)
    }

    fn viewport_size(&self) -> (u32, u32) {
        (**self).viewport_size()
    }
}

/// Camera shared between the panel and the viewport preview.
///
/// Only ever locked from the UI thread; a poisoned lock is recovered.
impl<T: CameraAdapter> CameraAdapter for Arc<Mutex<T>> {
    fn aspect_ratio(&self) -> f64 {
        self.lock().unwrap_or_else(|e| e.into_inner()).aspect_ratio()
    }

    fn set_aspect_ratio(&mut self, ratio: f64) {
        self.lock().unwrap_or_else(|e| e.into_inner()).set_aspect_ratio(ratio)
    }

    fn field_of_view(&self) -> f64 {
        self.lock().unwrap_or_else(|e| e.into_inner()).field_of_view()
    }

    fn set_field_of_view(&mut self, degrees: f64) {
        self.lock().unwrap_or_else(|e| e.into_inner()).set_field_of_view(degrees)
    }

    fn viewport_size(&self) -> (u32, u32) {
        self.lock().unwrap_or_else(|e| e.into_inner()).viewport_size()
    }
}

pub type SharedCamera = Arc<Mutex<CameraFraming>>;
