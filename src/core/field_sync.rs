//! Field synchronization - keeps the five panel fields consistent.
//!
//! Fields and what an edit to each one recomputes:
//!
//! ```text
//! Width        -> Height
//! Height       -> Width
//! AspectRatio  -> camera (zoom-compensated), Height, AovX, AovY
//! AovX         -> camera fov, AovY
//! AovY         -> camera fov, AovX
//! ```
//!
//! Pixel fields depend on the camera ratio only; angle fields depend on the
//! ratio and the fov. The edited field itself is never re-derived, so the
//! operator's exact entry stays on screen.
//!
//! Width and Height each recompute the *other* field with truncation, so
//! alternating edits can drift by a pixel. That is the expected behavior.

use log::debug;
use serde::{Deserialize, Serialize};

use super::angles::float_equal;
use super::aspect;
use crate::entities::camera::CameraAdapter;

/// Default export width when nothing is persisted.
pub const DEFAULT_EXPORT_WIDTH: u32 = 800;

/// Editable panel field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Width,
    Height,
    AspectRatio,
    AovX,
    AovY,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Width,
        Field::Height,
        Field::AspectRatio,
        Field::AovX,
        Field::AovY,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Field::Width => "Width:",
            Field::Height => "Height:",
            Field::AspectRatio => "Aspect Ratio:",
            Field::AovX => "AOV X:",
            Field::AovY => "AOV Y:",
        }
    }

    /// Position in [`Field::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Angle and ratio fields show decimals, pixel fields don't.
    pub fn is_pixels(&self) -> bool {
        matches!(self, Field::Width | Field::Height)
    }
}

/// A parsed edit to one field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldEdit {
    Width(u32),
    Height(u32),
    AspectRatio(f64),
    AovX(f64),
    AovY(f64),
}

impl FieldEdit {
    pub fn field(&self) -> Field {
        match self {
            FieldEdit::Width(_) => Field::Width,
            FieldEdit::Height(_) => Field::Height,
            FieldEdit::AspectRatio(_) => Field::AspectRatio,
            FieldEdit::AovX(_) => Field::AovX,
            FieldEdit::AovY(_) => Field::AovY,
        }
    }
}

/// Export raster settings owned by the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportFraming {
    pub width: u32,
    pub height: u32,
    pub antialias: bool,
    pub transparent: bool,
}

impl Default for ExportFraming {
    fn default() -> Self {
        Self {
            width: DEFAULT_EXPORT_WIDTH,
            height: DEFAULT_EXPORT_WIDTH * 9 / 16,
            antialias: false,
            transparent: false,
        }
    }
}

/// Display values to push back into the panel after a dispatch.
/// `None` leaves the field's text alone.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SyncOutcome {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub aspect_ratio: Option<f64>,
    pub aov_x: Option<f64>,
    pub aov_y: Option<f64>,
    /// Host camera was written
    pub camera_changed: bool,
}

impl SyncOutcome {
    pub fn is_empty(&self) -> bool {
        self.width.is_none()
            && self.height.is_none()
            && self.aspect_ratio.is_none()
            && self.aov_x.is_none()
            && self.aov_y.is_none()
    }
}

/// Export height for `width` at the camera's governing ratio.
///
/// `None` if the ratio is unset and the viewport is degenerate.
pub fn height_for_width<C: CameraAdapter + ?Sized>(camera: &C, width: u32) -> Option<u32> {
    let ratio = camera.aspect_ratio();
    let height = if float_equal(ratio, 0.0) {
        let (vw, vh) = camera.viewport_size();
        if vw == 0 || vh == 0 {
            return None;
        }
        width as f64 * vh as f64 / vw as f64
    } else {
        width as f64 / ratio
    };
    Some(truncate_pixels(height))
}

/// Export width for `height` at the camera's governing ratio.
pub fn width_for_height<C: CameraAdapter + ?Sized>(camera: &C, height: u32) -> Option<u32> {
    let ratio = camera.aspect_ratio();
    let width = if float_equal(ratio, 0.0) {
        let (vw, vh) = camera.viewport_size();
        if vw == 0 || vh == 0 {
            return None;
        }
        height as f64 * vw as f64 / vh as f64
    } else {
        height as f64 * ratio
    };
    Some(truncate_pixels(width))
}

/// Truncate toward zero, never below one pixel.
fn truncate_pixels(value: f64) -> u32 {
    (value.trunc() as u32).max(1)
}

/// Dispatches field edits into camera writes and dependent display values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSync {
    /// Re-project the fov on ratio changes (see `core::aspect`)
    pub compensate_zoom: bool,
}

impl Default for FieldSync {
    fn default() -> Self {
        Self { compensate_zoom: true }
    }
}

impl FieldSync {
    pub fn new(compensate_zoom: bool) -> Self {
        Self { compensate_zoom }
    }

    /// Apply one settled edit.
    pub fn on_field_changed<C: CameraAdapter + ?Sized>(
        &self,
        camera: &mut C,
        export: &mut ExportFraming,
        edit: FieldEdit,
    ) -> SyncOutcome {
        debug!("on_field_changed: {:?}", edit);
        let mut out = SyncOutcome::default();

        match edit {
            FieldEdit::Width(width) => {
                export.width = width;
                if let Some(height) = height_for_width(camera, width) {
                    export.height = height;
                    out.height = Some(height);
                }
            }
            FieldEdit::Height(height) => {
                export.height = height;
                if let Some(width) = width_for_height(camera, height) {
                    export.width = width;
                    out.width = Some(width);
                }
            }
            FieldEdit::AspectRatio(ratio) => {
                out.camera_changed = aspect::set_aspect_ratio(camera, ratio, self.compensate_zoom);

                // Show the ratio the host actually kept (sub-threshold snaps to 0)
                let stored = camera.aspect_ratio();
                if !float_equal(stored, ratio) {
                    out.aspect_ratio = Some(stored);
                }
                if let Some(height) = height_for_width(camera, export.width) {
                    export.height = height;
                    out.height = Some(height);
                }
                if let Some((x, y)) = aspect::angles_of_view(camera) {
                    out.aov_x = Some(x);
                    out.aov_y = Some(y);
                }
            }
            FieldEdit::AovX(degrees) => {
                out.camera_changed = aspect::set_horizontal_angle(camera, degrees);
                out.aov_y = aspect::angles_of_view(camera).map(|(_, y)| y);
            }
            FieldEdit::AovY(degrees) => {
                out.camera_changed = aspect::set_vertical_angle(camera, degrees);
                out.aov_x = aspect::angles_of_view(camera).map(|(x, _)| x);
            }
        }
        out
    }

    /// Clear the camera ratio; every field is refreshed, including the ratio.
    pub fn reset_aspect_ratio<C: CameraAdapter + ?Sized>(
        &self,
        camera: &mut C,
        export: &mut ExportFraming,
    ) -> SyncOutcome {
        let mut out = self.on_field_changed(camera, export, FieldEdit::AspectRatio(0.0));
        out.aspect_ratio = Some(camera.aspect_ratio());
        out
    }

    /// Display values for every field, derived from the camera and the
    /// current export width (panel open, viewport resize).
    pub fn full_outcome<C: CameraAdapter + ?Sized>(
        &self,
        camera: &C,
        export: &mut ExportFraming,
    ) -> SyncOutcome {
        if let Some(height) = height_for_width(camera, export.width) {
            export.height = height;
        }
        let angles = aspect::angles_of_view(camera);
        SyncOutcome {
            width: Some(export.width),
            height: Some(export.height),
            aspect_ratio: Some(camera.aspect_ratio()),
            aov_x: angles.map(|(x, _)| x),
            aov_y: angles.map(|(_, y)| y),
            camera_changed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::angles::{float_equal_tol, horizontal_to_vertical, vertical_to_horizontal};
    use crate::entities::camera::CameraFraming;

    fn hd() -> CameraFraming {
        CameraFraming::new(1920, 1080).with_field_of_view(37.8)
    }

    #[test]
    fn test_width_sets_height_unset_ratio() {
        let mut cam = hd();
        let mut export = ExportFraming::default();
        let out = FieldSync::default().on_field_changed(&mut cam, &mut export, FieldEdit::Width(800));
        assert_eq!(out.height, Some(450));
        assert_eq!(export.height, 450);
        assert_eq!(out.width, None);
        assert_eq!(out.aov_x, None);
        assert!(!out.camera_changed);
    }

    #[test]
    fn test_width_sets_height_pinned_ratio() {
        let mut cam = hd().with_aspect_ratio(2.0);
        let mut export = ExportFraming::default();
        let out = FieldSync::default().on_field_changed(&mut cam, &mut export, FieldEdit::Width(800));
        assert_eq!(out.height, Some(400));
    }

    #[test]
    fn test_height_sets_width() {
        let mut cam = hd().with_aspect_ratio(1.5);
        let mut export = ExportFraming::default();
        let out = FieldSync::default().on_field_changed(&mut cam, &mut export, FieldEdit::Height(401));
        assert_eq!(out.width, Some(601)); // 601.5 truncated
        assert_eq!(export.width, 601);
        assert_eq!(export.height, 401);
    }

    #[test]
    fn test_width_height_drift_is_preserved() {
        let mut cam = hd();
        let mut export = ExportFraming::default();
        let sync = FieldSync::default();

        sync.on_field_changed(&mut cam, &mut export, FieldEdit::Width(801));
        assert_eq!(export.height, 450); // 450.56
        sync.on_field_changed(&mut cam, &mut export, FieldEdit::Height(450));
        assert_eq!(export.width, 800); // not 801
    }

    #[test]
    fn test_pixels_never_zero() {
        let mut cam = hd();
        let mut export = ExportFraming::default();
        FieldSync::default().on_field_changed(&mut cam, &mut export, FieldEdit::Width(1));
        assert_eq!(export.height, 1);
    }

    #[test]
    fn test_aspect_ratio_edit_end_to_end() {
        let mut cam = hd();
        let mut export = ExportFraming::default();
        let out = FieldSync::default().on_field_changed(&mut cam, &mut export, FieldEdit::AspectRatio(1.0));

        assert!(out.camera_changed);
        assert_eq!(cam.aspect_ratio, 1.0);
        assert!(float_equal_tol(cam.field_of_view, 37.8, 1e-9));
        assert_eq!(out.aspect_ratio, None); // kept as typed
        assert_eq!(out.height, Some(800));
        assert!(float_equal(out.aov_x.unwrap(), 37.8));
        assert!(float_equal(out.aov_y.unwrap(), 37.8));
    }

    #[test]
    fn test_aspect_ratio_snapped_value_displayed() {
        let mut cam = hd().with_aspect_ratio(1.5);
        let mut export = ExportFraming::default();
        let out = FieldSync::default().on_field_changed(&mut cam, &mut export, FieldEdit::AspectRatio(0.05));
        assert_eq!(cam.aspect_ratio, 0.0);
        assert_eq!(out.aspect_ratio, Some(0.0));
        assert_eq!(out.height, Some(450));
    }

    #[test]
    fn test_aov_x_edit_updates_only_aov_y() {
        let mut cam = hd();
        let mut export = ExportFraming::default();
        let out = FieldSync::default().on_field_changed(&mut cam, &mut export, FieldEdit::AovX(60.0));

        assert!(out.camera_changed);
        assert_eq!(out.aov_x, None);
        assert_eq!(out.height, None);
        let v = out.aov_y.unwrap();
        assert!(float_equal(v, horizontal_to_vertical(60.0, 1920.0 / 1080.0)));
        assert!(float_equal(cam.field_of_view, v));
    }

    #[test]
    fn test_aov_y_edit_updates_only_aov_x() {
        let mut cam = hd().with_aspect_ratio(1.5);
        let mut export = ExportFraming::default();
        let out = FieldSync::default().on_field_changed(&mut cam, &mut export, FieldEdit::AovY(30.0));

        assert_eq!(out.aov_y, None);
        let h = out.aov_x.unwrap();
        assert!(float_equal(h, vertical_to_horizontal(30.0, 1.5)));
        assert!(float_equal(cam.field_of_view, h));
    }

    #[test]
    fn test_reset_refreshes_everything() {
        let mut cam = hd();
        let mut export = ExportFraming::default();
        let sync = FieldSync::default();
        sync.on_field_changed(&mut cam, &mut export, FieldEdit::AspectRatio(2.0));
        assert_eq!(export.height, 400);

        let out = sync.reset_aspect_ratio(&mut cam, &mut export);
        assert_eq!(out.aspect_ratio, Some(0.0));
        assert_eq!(out.height, Some(450));
        assert!(out.aov_x.is_some() && out.aov_y.is_some());
    }

    #[test]
    fn test_full_outcome_is_consistent() {
        let cam = hd().with_aspect_ratio(1.25);
        let mut export = ExportFraming { width: 1000, ..ExportFraming::default() };
        let out = FieldSync::default().full_outcome(&cam, &mut export);

        assert_eq!(out.width, Some(1000));
        assert_eq!(out.height, Some(800));
        assert_eq!(out.aspect_ratio, Some(1.25));
        let (x, y) = (out.aov_x.unwrap(), out.aov_y.unwrap());
        assert!(float_equal(y, horizontal_to_vertical(x, 1.25)));
        assert!(!out.is_empty());
    }

    #[test]
    fn test_degenerate_viewport_leaves_fields() {
        let mut cam = CameraFraming::new(1920, 0);
        let mut export = ExportFraming::default();
        let out = FieldSync::default().on_field_changed(&mut cam, &mut export, FieldEdit::Width(640));
        assert_eq!(export.width, 640);
        assert!(out.is_empty());
    }
}
