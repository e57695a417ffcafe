use std::path::Path;

use anyhow::{Context, Result};
use eframe::egui;
use log::{debug, warn};

use crate::core::debounce::DEFAULT_DELAY_MS;
use crate::core::field_sync::{DEFAULT_EXPORT_WIDTH, ExportFraming};
use crate::utils::numeric::{DecimalSeparator, MAX_PIXELS, NumberFormat};

/// Settings categories
#[derive(Debug, Clone, Copy, PartialEq)]
enum SettingsCategory {
    Panel,
    Export,
    UI,
}

impl SettingsCategory {
    const ALL: [SettingsCategory; 3] = [
        SettingsCategory::Panel,
        SettingsCategory::Export,
        SettingsCategory::UI,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            SettingsCategory::Panel => "Panel",
            SettingsCategory::Export => "Export",
            SettingsCategory::UI => "UI",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "Panel" => Some(SettingsCategory::Panel),
            "Export" => Some(SettingsCategory::Export),
            "UI" => Some(SettingsCategory::UI),
            _ => None,
        }
    }
}

/// Application settings, persisted as JSON between sessions
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct AppSettings {
    // Export defaults (written back when the panel closes)
    pub export_width: u32,
    pub export_transparency: bool,
    pub export_antialias: bool,

    // Panel behavior
    pub debounce_ms: u64,     // Quiet interval before an edit is applied (default 200ms)
    pub compensate_zoom: bool, // Preserve vertical extent across ratio changes
    pub decimal_separator: DecimalSeparator,

    // UI
    pub dark_mode: bool,
    pub font_size: f32,
    pub show_safe_frame: bool, // Outline the safe frame in the viewport

    // Internal
    pub selected_settings_category: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            export_width: DEFAULT_EXPORT_WIDTH,
            export_transparency: false,
            export_antialias: false,
            debounce_ms: DEFAULT_DELAY_MS,
            compensate_zoom: true,
            decimal_separator: DecimalSeparator::default(),
            dark_mode: true,
            font_size: 13.0,
            show_safe_frame: true,
            selected_settings_category: Some("Panel".to_string()),
        }
    }
}

impl AppSettings {
    /// Load settings; a missing or unreadable file yields defaults.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(settings) => {
                debug!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                if path.exists() {
                    warn!("Using default settings: {:#}", e);
                } else {
                    debug!("No settings at {}, using defaults", path.display());
                }
                Self::default()
            }
        }
    }

    fn try_load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse settings: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write settings: {}", path.display()))?;
        debug!("Saved settings to {}", path.display());
        Ok(())
    }

    pub fn number_format(&self) -> NumberFormat {
        NumberFormat::new(self.decimal_separator)
    }

    /// Export framing seeded from the persisted defaults. Height is derived
    /// from the camera when the panel opens.
    pub fn export_framing(&self) -> ExportFraming {
        ExportFraming {
            width: self.export_width.clamp(1, MAX_PIXELS),
            antialias: self.export_antialias,
            transparent: self.export_transparency,
            ..ExportFraming::default()
        }
    }

    /// Remember the panel's export settings as next session's defaults.
    pub fn store_export_defaults(&mut self, framing: &ExportFraming) {
        self.export_width = framing.width;
        self.export_antialias = framing.antialias;
        self.export_transparency = framing.transparent;
    }
}

/// Render Panel settings category
fn render_panel_settings(ui: &mut egui::Ui, settings: &mut AppSettings) {
    ui.heading("Field Editing");
    ui.add_space(8.0);

    ui.label("Edit Delay (ms):");
    ui.add(
        egui::Slider::new(&mut settings.debounce_ms, 0..=1000)
            .suffix(" ms")
            .step_by(10.0),
    );
    ui.label("Quiet time after typing before a field is applied. Takes effect when the panel reopens.");
    ui.add_space(8.0);

    ui.label("Decimal Separator:");
    ui.horizontal(|ui| {
        for sep in [DecimalSeparator::Dot, DecimalSeparator::Comma] {
            ui.radio_value(&mut settings.decimal_separator, sep, sep.as_str());
        }
    });
    ui.label("Input accepts either separator.");

    ui.add_space(16.0);
    ui.heading("Camera");
    ui.add_space(8.0);
    ui.checkbox(&mut settings.compensate_zoom, "Compensate zoom on aspect ratio change");
    ui.label("Keeps the visible vertical extent when the ratio changes.");
}

/// Render Export settings category
fn render_export_settings(ui: &mut egui::Ui, settings: &mut AppSettings) {
    ui.heading("Defaults");
    ui.add_space(8.0);

    ui.horizontal(|ui| {
        ui.label("Width:");
        ui.add(egui::DragValue::new(&mut settings.export_width).range(1..=MAX_PIXELS).suffix(" px"));
    });
    ui.checkbox(&mut settings.export_transparency, "Transparency");
    ui.checkbox(&mut settings.export_antialias, "Anti-aliasing");
    ui.label("Also updated from the panel when it is closed.");
}

/// Render UI settings category
fn render_ui_settings(ui: &mut egui::Ui, settings: &mut AppSettings) {
    ui.heading("Appearance");
    ui.add_space(8.0);

    ui.label("Font Size:");
    ui.add(
        egui::Slider::new(&mut settings.font_size, 10.0..=18.0)
            .suffix(" px")
            .step_by(0.5),
    );
    ui.add_space(16.0);

    ui.checkbox(&mut settings.dark_mode, "Dark Mode");
    ui.checkbox(&mut settings.show_safe_frame, "Outline safe frame in viewport");
}

/// Render settings window
pub fn render_settings_window(ctx: &egui::Context, show_settings: &mut bool, settings: &mut AppSettings) {
    // Get selected category from settings or use default
    let mut selected = settings
        .selected_settings_category
        .as_ref()
        .and_then(|s| SettingsCategory::from_str(s))
        .unwrap_or(SettingsCategory::Panel);

    egui::Window::new("Settings")
        .id(egui::Id::new("settings_window"))
        .open(show_settings)
        .default_size([520.0, 360.0])
        .resizable(true)
        .collapsible(false)
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                // Left panel: category list
                ui.vertical(|ui| {
                    ui.set_width(120.0);
                    ui.add_space(4.0);
                    for category in SettingsCategory::ALL {
                        if ui.selectable_label(selected == category, category.as_str()).clicked() {
                            selected = category;
                        }
                    }
                });

                ui.separator();

                // Right panel: content for selected category
                ui.vertical(|ui| {
                    ui.add_space(8.0);
                    match selected {
                        SettingsCategory::Panel => render_panel_settings(ui, settings),
                        SettingsCategory::Export => render_export_settings(ui, settings),
                        SettingsCategory::UI => render_ui_settings(ui, settings),
                    }
                });
            });
        });

    // Save selected category
    settings.selected_settings_category = Some(selected.as_str().to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join("safeframe_prefs_test").join(name)
    }

    #[test]
    fn test_defaults() {
        let s = AppSettings::default();
        assert_eq!(s.export_width, 800);
        assert!(!s.export_transparency);
        assert!(!s.export_antialias);
        assert_eq!(s.debounce_ms, 200);
        assert!(s.compensate_zoom);
    }

    #[test]
    fn test_save_load_round_trip() {
        let path = temp_path("round_trip.json");
        let mut s = AppSettings::default();
        s.export_width = 1280;
        s.export_antialias = true;
        s.decimal_separator = DecimalSeparator::Comma;
        s.save(&path).unwrap();

        assert_eq!(AppSettings::load(&path), s);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_and_corrupt_fall_back() {
        assert_eq!(AppSettings::load(&temp_path("nope.json")), AppSettings::default());

        let path = temp_path("corrupt.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(AppSettings::load(&path), AppSettings::default());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let path = temp_path("partial.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{ "export_width": 640 }"#).unwrap();
        let s = AppSettings::load(&path);
        assert_eq!(s.export_width, 640);
        assert_eq!(s.debounce_ms, 200);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_export_defaults_round_trip() {
        let mut s = AppSettings::default();
        let framing = ExportFraming {
            width: 1024,
            height: 576,
            antialias: true,
            transparent: true,
        };
        s.store_export_defaults(&framing);
        let seeded = s.export_framing();
        assert_eq!(seeded.width, 1024);
        assert!(seeded.antialias && seeded.transparent);
    }
}
