//! Safe frame panel window
//!
//! Viewport, Camera and Export 2D groups. Field edits go straight into the
//! panel's debouncers; buttons come back as [`SafeFrameEvent`]s.

use eframe::egui;

use crate::core::field_sync::Field;
use crate::dialogs::safeframe::{SafeFrameEvent, SafeFramePanel};
use crate::entities::camera::CameraAdapter;
use crate::export::EXPORT_EXTENSIONS;

const LABEL_WIDTH: f32 = 90.0;
const FIELD_WIDTH: f32 = 80.0;

/// Save dialog for the exported image
fn create_export_dialog() -> rfd::FileDialog {
    rfd::FileDialog::new()
        .add_filter("Images", EXPORT_EXTENSIONS)
        .set_title("Export Image")
        .set_file_name("safeframe.png")
}

/// One labelled text field wired to the panel.
fn field_row<C: CameraAdapter + 'static>(ui: &mut egui::Ui, panel: &mut SafeFramePanel<C>, field: Field) {
    ui.horizontal(|ui| {
        ui.add_sized([LABEL_WIDTH, 18.0], egui::Label::new(field.label()));
        let mut text = panel.texts().get(field).to_string();
        let response = ui.add(egui::TextEdit::singleline(&mut text).desired_width(FIELD_WIDTH));
        if response.changed() {
            panel.edit(field, text);
        }
        if field.is_pixels() {
            ui.label("px");
        }
    });
}

/// Render the panel window. `open` goes false when the title bar close is used.
pub fn render_safe_frame_window<C: CameraAdapter + 'static>(
    ctx: &egui::Context,
    panel: &mut SafeFramePanel<C>,
    open: &mut bool,
) -> Vec<SafeFrameEvent> {
    let mut events = Vec::new();

    egui::Window::new("Safe Frame")
        .id(egui::Id::new("safe_frame_window"))
        .open(open)
        .resizable(false)
        .collapsible(false)
        .show(ctx, |ui| {
            // === Viewport ===
            ui.group(|ui| {
                ui.heading("Viewport");
                ui.horizontal(|ui| {
                    field_row(ui, panel, Field::AspectRatio);
                    if ui
                        .button("Reset")
                        .on_hover_text("Clear the camera aspect ratio (follow the viewport)")
                        .clicked()
                    {
                        events.push(SafeFrameEvent::ResetAspectRatio);
                    }
                });
            });

            // === Camera ===
            ui.group(|ui| {
                ui.heading("Camera");
                field_row(ui, panel, Field::AovX);
                field_row(ui, panel, Field::AovY);
            });

            // === Export 2D ===
            ui.group(|ui| {
                ui.heading("Export 2D");
                field_row(ui, panel, Field::Width);
                field_row(ui, panel, Field::Height);

                let export = &mut panel.state_mut().export;
                ui.checkbox(&mut export.transparent, "Transparency");
                ui.checkbox(&mut export.antialias, "Anti-aliasing");

                if ui.button("Export").clicked()
                    && let Some(path) = create_export_dialog().save_file()
                {
                    events.push(SafeFrameEvent::Export(path));
                }
            });

            ui.add_space(8.0);
            ui.horizontal(|ui| {
                if ui.button("Close").clicked() {
                    events.push(SafeFrameEvent::Close);
                }
                if let Some(notice) = &panel.state().notice {
                    let color = if notice.is_error() {
                        ui.visuals().error_fg_color
                    } else {
                        ui.visuals().text_color()
                    };
                    ui.colored_label(color, notice.message());
                }
            });
        });

    events
}
