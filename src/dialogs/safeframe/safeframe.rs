//! Safe frame panel: five linked fields, export options, per-field debouncing.
//!
//! [`PanelState`] is what every field handler works on: the host camera,
//! the export framing and the text shown in each field. It exists from
//! [`SafeFramePanel::open`] to [`SafeFramePanel::close`]; nothing about the
//! panel lives in globals.
//!
//! Each field has its own [`Debouncer`]. Typing calls [`SafeFramePanel::edit`];
//! the UI loop calls [`SafeFramePanel::tick`], which dispatches settled edits
//! into [`FieldSync`] and writes the recomputed values back into the other
//! fields.

use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, error, info};

use crate::core::debounce::{CancelToken, Debouncer};
use crate::core::field_sync::{ExportFraming, Field, FieldEdit, FieldSync, SyncOutcome};
use crate::dialogs::prefs::AppSettings;
use crate::entities::camera::{CameraAdapter, CameraFraming};
use crate::export::{DEFAULT_COMPRESSION, ExportRequest, ImageWriter};
use crate::utils::numeric::NumberFormat;

/// Text currently shown in each field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTexts {
    pub width: String,
    pub height: String,
    pub aspect_ratio: String,
    pub aov_x: String,
    pub aov_y: String,
}

impl FieldTexts {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Width => &self.width,
            Field::Height => &self.height,
            Field::AspectRatio => &self.aspect_ratio,
            Field::AovX => &self.aov_x,
            Field::AovY => &self.aov_y,
        }
    }

    pub fn get_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Width => &mut self.width,
            Field::Height => &mut self.height,
            Field::AspectRatio => &mut self.aspect_ratio,
            Field::AovX => &mut self.aov_x,
            Field::AovY => &mut self.aov_y,
        }
    }
}

/// One-line message shown to the operator after an export
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Saved(PathBuf),
    Failed(String),
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Notice::Saved(path) => format!("Image saved to: {}", path.display()),
            Notice::Failed(_) => "Failed to save image.".to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notice::Failed(_))
    }
}

/// Everything a field handler needs, passed explicitly on dispatch.
pub struct PanelState<C> {
    pub camera: C,
    pub export: ExportFraming,
    pub texts: FieldTexts,
    pub notice: Option<Notice>,
    sync: FieldSync,
    format: NumberFormat,
    /// Field texts written by the last dispatch, not yet synced into debouncers
    pushed: Vec<(Field, String)>,
}

impl<C: CameraAdapter> PanelState<C> {
    fn new(camera: C, export: ExportFraming, sync: FieldSync, format: NumberFormat) -> Self {
        Self {
            camera,
            export,
            texts: FieldTexts::default(),
            notice: None,
            sync,
            format,
            pushed: Vec::new(),
        }
    }

    /// Parse a field's text and apply it. Unparsable text is ignored.
    pub fn apply_text(&mut self, field: Field, text: &str) {
        let edit = match field {
            Field::Width => self.format.parse_pixels(text).map(FieldEdit::Width),
            Field::Height => self.format.parse_pixels(text).map(FieldEdit::Height),
            Field::AspectRatio => self.format.parse_decimal(text).map(FieldEdit::AspectRatio),
            Field::AovX => self.format.parse_decimal(text).map(FieldEdit::AovX),
            Field::AovY => self.format.parse_decimal(text).map(FieldEdit::AovY),
        };
        match edit {
            Some(edit) => self.apply_edit(edit),
            None => debug!("Ignoring unparsable {:?} input '{}'", field, text),
        }
    }

    pub fn apply_edit(&mut self, edit: FieldEdit) {
        let outcome = self.sync.on_field_changed(&mut self.camera, &mut self.export, edit);
        self.push(outcome);
    }

    /// Clear the camera ratio and refresh every field.
    pub fn reset_aspect_ratio(&mut self) {
        let outcome = self.sync.reset_aspect_ratio(&mut self.camera, &mut self.export);
        self.push(outcome);
    }

    /// Re-derive Height and both angles from the camera (viewport resized,
    /// camera changed elsewhere). Width keeps the operator's value.
    pub fn refresh(&mut self) {
        let mut outcome = self.sync.full_outcome(&self.camera, &mut self.export);
        outcome.width = None;
        self.push(outcome);
    }

    fn push(&mut self, outcome: SyncOutcome) {
        let SyncOutcome {
            width,
            height,
            aspect_ratio,
            aov_x,
            aov_y,
            ..
        } = outcome;
        let fmt = self.format;
        let values = [
            (Field::Width, width.map(|v| fmt.format_pixels(v))),
            (Field::Height, height.map(|v| fmt.format_pixels(v))),
            (Field::AspectRatio, aspect_ratio.map(|v| fmt.format_decimal(v))),
            (Field::AovX, aov_x.map(|v| fmt.format_decimal(v))),
            (Field::AovY, aov_y.map(|v| fmt.format_decimal(v))),
        ];
        for (field, text) in values {
            if let Some(text) = text {
                self.texts.get_mut(field).clone_from(&text);
                self.pushed.push((field, text));
            }
        }
    }

    /// Export request for the current framing.
    pub fn export_request(&self, path: &Path) -> ExportRequest {
        ExportRequest {
            path: path.to_path_buf(),
            width: self.export.width,
            height: self.export.height,
            antialias: self.export.antialias,
            transparent: self.export.transparent,
            compression: DEFAULT_COMPRESSION,
            view: CameraFraming::snapshot(&self.camera),
        }
    }
}

/// Safe frame tools panel.
pub struct SafeFramePanel<C: CameraAdapter + 'static> {
    state: PanelState<C>,
    /// One per field, indexed in `Field::ALL` order
    debouncers: Vec<(Field, Debouncer<String, PanelState<C>>)>,
}

impl<C: CameraAdapter + 'static> SafeFramePanel<C> {
    /// Open the panel on `camera`, seeded from persisted settings.
    pub fn open(camera: C, settings: &AppSettings) -> Self {
        let sync = FieldSync::new(settings.compensate_zoom);
        let state = PanelState::new(camera, settings.export_framing(), sync, settings.number_format());

        let debouncers = Field::ALL
            .into_iter()
            .map(|field| {
                let debouncer = Debouncer::new(settings.debounce_ms, move |state: &mut PanelState<C>, text: String| {
                    state.apply_text(field, &text)
                });
                (field, debouncer)
            })
            .collect();

        let mut panel = Self { state, debouncers };
        let outcome = panel.state.sync.full_outcome(&panel.state.camera, &mut panel.state.export);
        panel.state.push(outcome);
        panel.sync_pushed();

        info!(
            "Safe frame panel opened: {}x{}, ratio {}, aov {} x {}",
            panel.state.texts.width,
            panel.state.texts.height,
            panel.state.texts.aspect_ratio,
            panel.state.texts.aov_x,
            panel.state.texts.aov_y
        );
        panel
    }

    pub fn state(&self) -> &PanelState<C> {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut PanelState<C> {
        &mut self.state
    }

    pub fn texts(&self) -> &FieldTexts {
        &self.state.texts
    }

    pub fn camera(&self) -> &C {
        &self.state.camera
    }

    /// Operator typed into `field`. Returns `true` if a dispatch was armed.
    pub fn edit(&mut self, field: Field, text: String) -> bool {
        self.edit_at(field, text, Instant::now())
    }

    pub fn edit_at(&mut self, field: Field, text: String, now: Instant) -> bool {
        self.state.texts.get_mut(field).clone_from(&text);
        self.debouncer_mut(field).notify_at(text, now)
    }

    /// Dispatch settled edits. Returns `true` if any field was applied.
    pub fn tick(&mut self) -> bool {
        self.tick_at(Instant::now())
    }

    /// Settled edits are applied oldest deadline first, so a later edit on
    /// one field lands after the recompute triggered by an earlier one.
    pub fn tick_at(&mut self, now: Instant) -> bool {
        let mut due: Vec<(Instant, usize)> = self
            .debouncers
            .iter()
            .enumerate()
            .filter_map(|(i, (_, d))| d.deadline().filter(|t| *t <= now).map(|t| (t, i)))
            .collect();
        due.sort();

        let mut fired = false;
        for (_, i) in due {
            if self.debouncers[i].1.tick_at(now, &mut self.state) {
                fired = true;
                self.sync_pushed();
            }
        }
        fired
    }

    /// Apply every pending edit now, regardless of its deadline.
    pub fn flush(&mut self) {
        if let Some(latest) = self.debouncers.iter().filter_map(|(_, d)| d.deadline()).max() {
            self.tick_at(latest);
        }
    }

    /// Earliest pending deadline, for scheduling the next repaint.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncers.iter().filter_map(|(_, d)| d.deadline()).min()
    }

    pub fn is_pending(&self) -> bool {
        self.debouncers.iter().any(|(_, d)| d.is_pending())
    }

    /// Tokens of every armed timer.
    pub fn pending_tokens(&self) -> Vec<CancelToken> {
        self.debouncers.iter().filter_map(|(_, d)| d.pending_token()).collect()
    }

    /// Reset button: drop any pending ratio edit, clear the camera ratio.
    pub fn reset_aspect_ratio(&mut self) {
        self.debouncer_mut(Field::AspectRatio).cancel();
        self.state.reset_aspect_ratio();
        self.sync_pushed();
    }

    /// Camera or viewport changed outside the panel.
    pub fn refresh(&mut self) {
        self.state.refresh();
        self.sync_pushed();
    }

    /// Apply pending edits, then write the image. Returns `true` on success;
    /// the outcome is also left in the panel's notice.
    pub fn export_with<W: ImageWriter + ?Sized>(&mut self, writer: &mut W, path: &Path) -> bool {
        self.flush();
        let request = self.state.export_request(path);
        match writer.write_image(&request) {
            Ok(()) => {
                self.state.notice = Some(Notice::Saved(request.path));
                true
            }
            Err(e) => {
                error!("Export to {} failed: {}", path.display(), e);
                self.state.notice = Some(Notice::Failed(e.to_string()));
                false
            }
        }
    }

    /// Close the panel: cancel every pending edit and remember the export
    /// settings as next session's defaults.
    pub fn close(mut self, settings: &mut AppSettings) {
        self.cancel_all();
        settings.store_export_defaults(&self.state.export);
        info!(
            "Safe frame panel closed: export {}x{} (aa={}, transparent={})",
            self.state.export.width, self.state.export.height, self.state.export.antialias, self.state.export.transparent
        );
    }

    fn cancel_all(&mut self) {
        for (_, debouncer) in &mut self.debouncers {
            debouncer.cancel();
        }
    }

    fn debouncer_mut(&mut self, field: Field) -> &mut Debouncer<String, PanelState<C>> {
        &mut self.debouncers[field.index()].1
    }

    /// Programmatic writes count as dispatched for their field. A field
    /// with its own edit still pending keeps showing the operator's text.
    fn sync_pushed(&mut self) {
        for (field, text) in std::mem::take(&mut self.state.pushed) {
            let debouncer = &mut self.debouncers[field.index()].1;
            debouncer.sync(text);
            if let Some(pending) = debouncer.pending_value() {
                self.state.texts.get_mut(field).clone_from(pending);
            }
        }
    }
}

impl<C: CameraAdapter + 'static> Drop for SafeFramePanel<C> {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::angles::{float_equal, vertical_to_horizontal};
    use crate::export::ExportError;
    use std::time::Duration;

    const DELAY: Duration = Duration::from_millis(200);

    fn hd_camera() -> CameraFraming {
        CameraFraming::new(1920, 1080).with_field_of_view(37.8)
    }

    fn open(camera: CameraFraming) -> SafeFramePanel<CameraFraming> {
        SafeFramePanel::open(camera, &AppSettings::default())
    }

    /// Records requests, fails on demand.
    #[derive(Default)]
    struct FakeWriter {
        requests: Vec<ExportRequest>,
        fail: bool,
    }

    impl ImageWriter for FakeWriter {
        fn write_image(&mut self, request: &ExportRequest) -> Result<(), ExportError> {
            self.requests.push(request.clone());
            if self.fail {
                Err(ExportError::Encode("disk full".into()))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_open_shows_consistent_fields() {
        let panel = open(hd_camera());
        let t = panel.texts();
        assert_eq!(t.width, "800");
        assert_eq!(t.height, "450");
        assert_eq!(t.aspect_ratio, "0.00");
        assert_eq!(t.aov_y, "37.80");
        assert_eq!(t.aov_x, format!("{:.2}", vertical_to_horizontal(37.8, 1920.0 / 1080.0)));
        assert!(!panel.is_pending());
    }

    #[test]
    fn test_width_edit_debounced_then_height() {
        let mut panel = open(hd_camera());
        let t0 = Instant::now();

        assert!(panel.edit_at(Field::Width, "1".into(), t0));
        assert!(panel.edit_at(Field::Width, "12".into(), t0 + DELAY / 2));
        assert!(panel.edit_at(Field::Width, "1280".into(), t0 + DELAY));
        assert!(!panel.tick_at(t0 + DELAY + DELAY / 2));
        assert_eq!(panel.texts().height, "450");

        assert!(panel.tick_at(t0 + DELAY * 2));
        assert_eq!(panel.texts().height, "720");
        assert_eq!(panel.state().export.width, 1280);
        assert_eq!(panel.state().export.height, 720);
    }

    #[test]
    fn test_aspect_edit_updates_all_fields() {
        let mut panel = open(hd_camera());
        let t0 = Instant::now();

        panel.edit_at(Field::AspectRatio, "1.0".into(), t0);
        panel.tick_at(t0 + DELAY);

        assert_eq!(panel.camera().aspect_ratio, 1.0);
        assert!(float_equal(panel.camera().field_of_view, 37.8));
        let t = panel.texts();
        assert_eq!(t.aspect_ratio, "1.0"); // operator's text kept
        assert_eq!(t.height, "800");
        assert_eq!(t.aov_x, "37.80");
        assert_eq!(t.aov_y, "37.80");
    }

    #[test]
    fn test_comma_input_is_accepted() {
        let mut panel = open(hd_camera());
        let t0 = Instant::now();
        panel.edit_at(Field::AspectRatio, "2,0".into(), t0);
        panel.tick_at(t0 + DELAY);
        assert_eq!(panel.camera().aspect_ratio, 2.0);
        assert_eq!(panel.texts().height, "400");
    }

    #[test]
    fn test_garbage_input_keeps_state() {
        let mut panel = open(hd_camera());
        let before = *panel.camera();
        let t0 = Instant::now();

        panel.edit_at(Field::AspectRatio, "abc".into(), t0);
        panel.edit_at(Field::Width, "".into(), t0);
        panel.tick_at(t0 + DELAY);

        assert_eq!(*panel.camera(), before);
        assert_eq!(panel.state().export.width, 800);
        assert_eq!(panel.texts().height, "450");
    }

    #[test]
    fn test_pushed_value_does_not_echo() {
        let mut panel = open(hd_camera());
        let t0 = Instant::now();

        panel.edit_at(Field::Width, "1600".into(), t0);
        panel.tick_at(t0 + DELAY);
        assert_eq!(panel.texts().height, "900");

        // The widget reports the programmatic change back as an edit
        assert!(!panel.edit_at(Field::Height, "900".into(), t0 + DELAY));
        assert!(!panel.is_pending());
    }

    #[test]
    fn test_aov_edits() {
        let mut panel = open(hd_camera().with_aspect_ratio(1.5));
        let t0 = Instant::now();

        panel.edit_at(Field::AovY, "30".into(), t0);
        panel.tick_at(t0 + DELAY);
        assert_eq!(panel.texts().aov_y, "30");
        assert_eq!(panel.texts().aov_x, format!("{:.2}", vertical_to_horizontal(30.0, 1.5)));

        panel.edit_at(Field::AovX, "50".into(), t0 + DELAY);
        panel.tick_at(t0 + DELAY * 2);
        assert_eq!(panel.texts().aov_x, "50");
        assert_eq!(panel.camera().field_of_view, 50.0);
    }

    #[test]
    fn test_reset_aspect_ratio() {
        let mut panel = open(hd_camera().with_aspect_ratio(2.0));
        let t0 = Instant::now();
        panel.edit_at(Field::AspectRatio, "3".into(), t0);

        panel.reset_aspect_ratio();
        assert!(!panel.is_pending());
        assert_eq!(panel.camera().aspect_ratio, 0.0);
        assert_eq!(panel.texts().aspect_ratio, "0.00");
        assert_eq!(panel.texts().height, "450");

        // Cancelled edit never lands
        panel.tick_at(t0 + DELAY * 4);
        assert_eq!(panel.camera().aspect_ratio, 0.0);
    }

    #[test]
    fn test_refresh_after_viewport_resize() {
        let mut panel = open(hd_camera());
        panel.state_mut().camera.set_viewport_size(1000, 1000);
        panel.refresh();
        assert_eq!(panel.texts().width, "800");
        assert_eq!(panel.texts().height, "800");
        assert_eq!(panel.texts().aov_x, "37.80");
    }

    #[test]
    fn test_export_flushes_pending_and_reports() {
        let mut panel = open(hd_camera());
        let t0 = Instant::now();
        panel.edit_at(Field::Width, "640".into(), t0);

        let mut writer = FakeWriter::default();
        assert!(panel.export_with(&mut writer, Path::new("/tmp/frame.png")));

        let req = &writer.requests[0];
        assert_eq!((req.width, req.height), (640, 360));
        assert_eq!(req.compression, DEFAULT_COMPRESSION);
        assert_eq!(req.view, *panel.camera());
        assert_eq!(
            panel.state().notice.as_ref().map(Notice::message),
            Some("Image saved to: /tmp/frame.png".to_string())
        );
    }

    #[test]
    fn test_export_failure_single_notice() {
        let mut panel = open(hd_camera());
        let mut writer = FakeWriter { fail: true, ..FakeWriter::default() };
        let before = panel.texts().clone();

        assert!(!panel.export_with(&mut writer, Path::new("out.png")));
        assert_eq!(writer.requests.len(), 1); // no retry
        let notice = panel.state().notice.clone().unwrap();
        assert!(notice.is_error());
        assert_eq!(notice.message(), "Failed to save image.");
        assert_eq!(*panel.texts(), before);
    }

    #[test]
    fn test_oversized_export_reports_notice() {
        let mut panel = open(hd_camera().with_aspect_ratio(0.1));
        let t0 = Instant::now();
        panel.edit_at(Field::Width, "16384".into(), t0);
        panel.tick_at(t0 + DELAY);
        assert!(panel.state().export.height > crate::utils::numeric::MAX_PIXELS);

        let path = std::env::temp_dir().join("safeframe_oversized.png");
        assert!(!panel.export_with(&mut crate::export::ImageExporter, &path));
        assert_eq!(
            panel.state().notice.as_ref().map(Notice::message),
            Some("Failed to save image.".to_string())
        );
        assert!(!path.exists());
    }

    #[test]
    fn test_close_cancels_and_persists() {
        let mut panel = open(hd_camera());
        let t0 = Instant::now();
        panel.state_mut().export.antialias = true;
        panel.edit_at(Field::AspectRatio, "1.5".into(), t0);
        let tokens = panel.pending_tokens();
        assert_eq!(tokens.len(), 1);

        let mut settings = AppSettings::default();
        panel.close(&mut settings);

        assert!(tokens[0].is_cancelled());
        assert_eq!(settings.export_width, 800);
        assert!(settings.export_antialias);
    }

    #[test]
    fn test_drop_cancels_pending() {
        let mut panel = open(hd_camera());
        panel.edit(Field::Height, "300".into());
        let tokens = panel.pending_tokens();
        drop(panel);
        assert!(tokens.iter().all(CancelToken::is_cancelled));
    }

    #[test]
    fn test_height_typed_during_width_dispatch_lands() {
        let mut panel = open(hd_camera());
        let t0 = Instant::now();

        panel.edit_at(Field::Width, "1000".into(), t0);
        panel.edit_at(Field::Height, "300".into(), t0 + DELAY / 2);

        // Width settles first; the Height being typed is left alone
        assert!(panel.tick_at(t0 + DELAY));
        assert_eq!(panel.texts().height, "300");
        assert!(panel.is_pending());

        assert!(panel.tick_at(t0 + DELAY * 2));
        assert_eq!(panel.state().export.height, 300);
        assert_eq!(panel.state().export.width, 533);
        assert_eq!(panel.texts().width, "533");
        assert_eq!(panel.texts().height, "300");
    }

    #[test]
    fn test_aov_typed_during_ratio_dispatch_lands() {
        let mut panel = open(hd_camera());
        let t0 = Instant::now();

        panel.edit_at(Field::AspectRatio, "1.5".into(), t0);
        panel.edit_at(Field::AovY, "30".into(), t0 + DELAY / 2);

        panel.tick_at(t0 + DELAY);
        assert_eq!(panel.camera().aspect_ratio, 1.5);
        assert_eq!(panel.texts().aov_y, "30");

        panel.tick_at(t0 + DELAY * 2);
        assert!(float_equal(panel.camera().field_of_view, vertical_to_horizontal(30.0, 1.5)));
        assert_eq!(panel.texts().aov_y, "30");
        assert_eq!(panel.texts().aov_x, format!("{:.2}", vertical_to_horizontal(30.0, 1.5)));
    }

    #[test]
    fn test_settled_edits_apply_in_deadline_order() {
        let mut panel = open(hd_camera());
        let t0 = Instant::now();

        // Height is armed first but sits later in field order
        panel.edit_at(Field::Height, "300".into(), t0);
        panel.edit_at(Field::Width, "1000".into(), t0 + DELAY / 2);

        // Both settled by the same tick: Width, the later edit, wins
        panel.tick_at(t0 + DELAY * 2);
        assert_eq!(panel.state().export.width, 1000);
        assert_eq!(panel.state().export.height, 562);
        assert_eq!(panel.texts().height, "562");
        assert!(!panel.is_pending());
    }

    #[test]
    fn test_next_deadline() {
        let mut panel = open(hd_camera());
        assert_eq!(panel.next_deadline(), None);
        let t0 = Instant::now();
        panel.edit_at(Field::AovX, "40".into(), t0 + DELAY);
        panel.edit_at(Field::Width, "500".into(), t0);
        assert_eq!(panel.next_deadline(), Some(t0 + DELAY));
    }
}
