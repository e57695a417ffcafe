use safeframe::cli::Args;
use safeframe::config::{self, PathConfig};
use safeframe::core::field_sync::{ExportFraming, FieldSync};
use safeframe::dialogs::prefs::{AppSettings, render_settings_window};
use safeframe::dialogs::safeframe::{SafeFrameEvent, SafeFramePanel, render_safe_frame_window};
use safeframe::entities::camera::{CameraFraming, SharedCamera};
use safeframe::export::{DEFAULT_COMPRESSION, ExportRequest, ImageExporter, ImageWriter};
use safeframe::render::{RenderOptions, render_view, safe_frame_rect};

use anyhow::Context;
use clap::Parser;
use eframe::{egui, glow};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Longest edge of the preview render, in pixels
const PREVIEW_MAX_EDGE: f32 = 640.0;

/// Main application state
struct SafeFrameApp {
    camera: SharedCamera,
    panel: Option<SafeFramePanel<SharedCamera>>,
    settings: AppSettings,
    settings_path: PathBuf,
    show_settings: bool,
    preview: Option<egui::TextureHandle>,
    /// Camera and render size the preview texture was made for
    preview_key: Option<(CameraFraming, [usize; 2])>,
}

impl SafeFrameApp {
    fn new(camera: CameraFraming, settings: AppSettings, path_config: &PathConfig) -> Self {
        Self {
            camera: Arc::new(Mutex::new(camera)),
            panel: None,
            settings,
            settings_path: config::config_file(config::SETTINGS_FILE, path_config),
            show_settings: false,
            preview: None,
            preview_key: None,
        }
    }

    fn camera_snapshot(&self) -> CameraFraming {
        *self.camera.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn save_settings(&self) {
        if let Err(e) = self.settings.save(&self.settings_path) {
            warn!("Failed to save settings: {:#}", e);
        }
    }

    fn open_panel(&mut self) {
        if self.panel.is_none() {
            self.panel = Some(SafeFramePanel::open(Arc::clone(&self.camera), &self.settings));
        }
    }

    fn close_panel(&mut self) {
        if let Some(panel) = self.panel.take() {
            panel.close(&mut self.settings);
            self.save_settings();
        }
    }

    /// Reset command; works with or without the panel.
    fn reset_aspect_ratio(&mut self) {
        match &mut self.panel {
            Some(panel) => panel.reset_aspect_ratio(),
            None => {
                let mut camera = Arc::clone(&self.camera);
                let mut scratch = ExportFraming::default();
                FieldSync::new(self.settings.compensate_zoom).reset_aspect_ratio(&mut camera, &mut scratch);
            }
        }
        info!("Camera aspect ratio reset");
    }

    fn handle_panel_events(&mut self, events: Vec<SafeFrameEvent>) {
        for event in events {
            match event {
                SafeFrameEvent::Export(path) => {
                    if let Some(panel) = &mut self.panel {
                        panel.export_with(&mut ImageExporter, &path);
                    }
                }
                SafeFrameEvent::ResetAspectRatio => self.reset_aspect_ratio(),
                SafeFrameEvent::Close => self.close_panel(),
            }
        }
    }

    /// Track the live viewport; fields depending on it are refreshed.
    fn update_viewport_size(&mut self, size: egui::Vec2) {
        let (w, h) = (size.x.round().max(0.0) as u32, size.y.round().max(0.0) as u32);
        let changed = {
            let mut camera = self.camera.lock().unwrap_or_else(|e| e.into_inner());
            let changed = (camera.viewport_width, camera.viewport_height) != (w, h);
            if changed {
                camera.set_viewport_size(w, h);
            }
            changed
        };
        if changed {
            debug!("Viewport resized to {}x{}", w, h);
            if let Some(panel) = &mut self.panel {
                panel.refresh();
            }
        }
    }

    fn render_viewport(&mut self, ui: &mut egui::Ui) {
        let rect = ui.available_rect_before_wrap();
        ui.allocate_rect(rect, egui::Sense::hover());
        self.update_viewport_size(rect.size());

        let camera = self.camera_snapshot();
        let (x, y, w, h) = safe_frame_rect(rect.width(), rect.height(), camera.aspect_ratio);
        let frame = egui::Rect::from_min_size(rect.min + egui::vec2(x, y), egui::vec2(w, h));
        if frame.width() < 1.0 || frame.height() < 1.0 {
            return;
        }

        let scale = (PREVIEW_MAX_EDGE / frame.width().max(frame.height())).min(1.0);
        let size = [
            (frame.width() * scale).round().max(1.0) as usize,
            (frame.height() * scale).round().max(1.0) as usize,
        ];
        let key = (camera, size);
        if self.preview_key != Some(key) {
            let img = render_view(&camera, size[0] as u32, size[1] as u32, RenderOptions::default());
            let color = egui::ColorImage::from_rgba_unmultiplied(size, img.as_raw());
            if let Some(texture) = &mut self.preview {
                texture.set(color, egui::TextureOptions::LINEAR);
            } else {
                self.preview = Some(ui.ctx().load_texture("preview", color, egui::TextureOptions::LINEAR));
            }
            self.preview_key = Some(key);
        }

        let painter = ui.painter();
        painter.rect_filled(rect, 0.0, egui::Color32::from_gray(24));
        if let Some(texture) = &self.preview {
            let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
            painter.image(texture.id(), frame, uv, egui::Color32::WHITE);
        }
        if self.settings.show_safe_frame && camera.aspect_ratio > 0.0 {
            painter.rect_stroke(
                frame,
                0.0,
                egui::Stroke::new(1.0, egui::Color32::YELLOW),
                egui::StrokeKind::Inside,
            );
        }
    }
}

impl eframe::App for SafeFrameApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Apply theme based on settings
        if self.settings.dark_mode {
            ctx.set_visuals(egui::Visuals::dark());
        } else {
            ctx.set_visuals(egui::Visuals::light());
        }

        // Apply font size from settings
        let mut style = (*ctx.style()).clone();
        for (_, font_id) in style.text_styles.iter_mut() {
            font_id.size = self.settings.font_size;
        }
        ctx.set_style(style);

        egui::TopBottomPanel::top("menu").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.selectable_label(self.panel.is_some(), "Camera Tools").clicked() {
                    if self.panel.is_some() {
                        self.close_panel();
                    } else {
                        self.open_panel();
                    }
                }
                if ui.button("Reset Camera Aspect Ratio").clicked() {
                    self.reset_aspect_ratio();
                }
                if ui.button("Settings").clicked() {
                    self.show_settings = !self.show_settings;
                }
            });
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.render_viewport(ui));

        let events = match &mut self.panel {
            Some(panel) => {
                let mut open = true;
                let mut events = render_safe_frame_window(ctx, panel, &mut open);
                if !open {
                    events.push(SafeFrameEvent::Close);
                }
                events
            }
            None => Vec::new(),
        };
        self.handle_panel_events(events);

        // Dispatch settled field edits, wake up for the next one
        if let Some(panel) = &mut self.panel {
            if panel.tick() {
                ctx.request_repaint();
            }
            if let Some(deadline) = panel.next_deadline() {
                ctx.request_repaint_after(deadline.saturating_duration_since(Instant::now()));
            }
        }

        if self.show_settings {
            render_settings_window(ctx, &mut self.show_settings, &mut self.settings);
        }
    }

    fn save(&mut self, _storage: &mut dyn eframe::Storage) {
        self.save_settings();
    }

    fn on_exit(&mut self, _gl: Option<&glow::Context>) {
        self.close_panel();
        self.save_settings();
        debug!("Settings saved on exit");
    }
}

/// Write the framing without opening a window.
fn run_headless(args: &Args, settings: &AppSettings, path: &Path) -> anyhow::Result<()> {
    let mut camera = args.initial_camera();
    let export = args.export_framing(&mut camera, settings);
    let request = ExportRequest {
        path: path.to_path_buf(),
        width: export.width,
        height: export.height,
        antialias: export.antialias,
        transparent: export.transparent,
        compression: DEFAULT_COMPRESSION,
        view: camera,
    };
    ImageExporter
        .write_image(&request)
        .with_context(|| format!("Failed to save image: {}", path.display()))?;
    println!("Image saved to: {}", path.display());
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments first (needed for log setup)
    let args = Args::parse();

    // Create path configuration from CLI args and environment
    let path_config = PathConfig::from_env_and_cli(args.config_dir.clone());

    // Ensure directories exist
    if let Err(e) = config::ensure_dirs(&path_config) {
        eprintln!("Warning: Failed to create application directories: {}", e);
    }

    // Determine log level based on verbosity flags
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    // Initialize logger based on --log flag
    if let Some(log_path_opt) = &args.log_file {
        // File logging with specified verbosity level
        let log_path = log_path_opt
            .as_ref()
            .cloned()
            .unwrap_or_else(|| config::data_file(config::LOG_FILE, &path_config));

        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;

        env_logger::Builder::new()
            .filter_level(log_level)
            .filter_module("egui", log::LevelFilter::Info) // Suppress egui DEBUG spam
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!("Logging to file: {} (level: {:?})", log_path.display(), log_level);
    } else {
        // Console logging with specified verbosity level (respects RUST_LOG if set)
        let default_level = match args.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .filter_module("egui", log::LevelFilter::Info) // Suppress egui DEBUG spam
            .format_timestamp_millis()
            .init();
    }

    info!("SafeFrame starting...");
    debug!("Command-line args: {:?}", args);

    let settings_path = config::config_file(config::SETTINGS_FILE, &path_config);
    info!("Config path: {}", settings_path.display());

    let mut settings = AppSettings::load(&settings_path);
    args.apply_to_settings(&mut settings);

    if let Some(path) = &args.export {
        if let Err(e) = run_headless(&args, &settings, path) {
            error!("{:#}", e);
            eprintln!("Failed to save image.");
            return Err(e.into());
        }
        return Ok(());
    }

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(format!("SafeFrame v{}", env!("CARGO_PKG_VERSION")))
            .with_inner_size([args.viewport.0 as f32, args.viewport.1 as f32])
            .with_resizable(true),
        persist_window: true,
        #[cfg(not(target_arch = "wasm32"))]
        persistence_path: Some(config::config_file("safeframe_window.ron", &path_config)),
        ..Default::default()
    };

    let camera = args.initial_camera();
    eframe::run_native(
        "SafeFrame",
        native_options,
        Box::new(move |_cc| Ok(Box::new(SafeFrameApp::new(camera, settings, &path_config)))),
    )?;

    Ok(())
}
