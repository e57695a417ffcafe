use clap::Parser;
use std::path::PathBuf;

use crate::core::field_sync::{ExportFraming, FieldEdit, FieldSync};
use crate::dialogs::prefs::AppSettings;
use crate::entities::camera::{CameraAdapter, CameraFraming};

// Build version with target info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Export: image 0.25 (png, jpeg, bmp, tiff)\n",
    "Target: ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Camera safe frame tools: linked export size, aspect ratio and angles of view
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    /// Initial viewport size
    #[arg(long = "viewport", value_name = "WxH", value_parser = parse_viewport, default_value = "1920x1080")]
    pub viewport: (u32, u32),

    /// Initial camera aspect ratio (0 = follow the viewport)
    #[arg(long = "aspect", value_name = "RATIO")]
    pub aspect: Option<f64>,

    /// Initial camera field of view in degrees
    #[arg(long = "fov", value_name = "DEG")]
    pub fov: Option<f64>,

    /// Field edit delay in milliseconds (overrides settings)
    #[arg(long = "delay-ms", value_name = "MS")]
    pub delay_ms: Option<u64>,

    /// Keep the stored fov on aspect ratio changes instead of preserving the vertical extent
    #[arg(long = "no-zoom-fix")]
    pub no_zoom_fix: bool,

    /// Export the framing to FILE and exit without opening a window
    #[arg(long = "export", value_name = "FILE")]
    pub export: Option<PathBuf>,

    /// Export width in pixels (height follows the safe frame)
    #[arg(long = "width", value_name = "PX")]
    pub width: Option<u32>,

    /// Export height in pixels (width follows the safe frame)
    #[arg(long = "height", value_name = "PX")]
    pub height: Option<u32>,

    /// Supersample the exported image
    #[arg(long = "antialias")]
    pub antialias: bool,

    /// Transparent background in the exported image
    #[arg(long = "transparent")]
    pub transparent: bool,

    /// Enable debug logging to file (default: safeframe.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}

/// Parse `WxH` (also accepts `X` and `*`)
pub fn parse_viewport(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X', '*'])
        .ok_or_else(|| format!("expected WxH, got '{}'", s))?;
    let w: u32 = w.trim().parse().map_err(|_| format!("invalid width in '{}'", s))?;
    let h: u32 = h.trim().parse().map_err(|_| format!("invalid height in '{}'", s))?;
    if w == 0 || h == 0 {
        return Err(format!("viewport must be non-zero, got '{}'", s));
    }
    Ok((w, h))
}

impl Args {
    /// Host camera as requested on the command line. Goes through the
    /// host's write rules, so out-of-range values are snapped.
    pub fn initial_camera(&self) -> CameraFraming {
        let (w, h) = self.viewport;
        let mut camera = CameraFraming::new(w, h);
        if let Some(fov) = self.fov {
            camera.set_field_of_view(fov);
        }
        if let Some(aspect) = self.aspect {
            camera.set_aspect_ratio(aspect);
        }
        camera
    }

    /// Apply CLI overrides to loaded settings.
    pub fn apply_to_settings(&self, settings: &mut AppSettings) {
        if let Some(delay) = self.delay_ms {
            settings.debounce_ms = delay;
        }
        if self.no_zoom_fix {
            settings.compensate_zoom = false;
        }
        if let Some(width) = self.width {
            settings.export_width = width.max(1);
        }
        settings.export_antialias |= self.antialias;
        settings.export_transparency |= self.transparent;
    }

    /// Export size for headless mode, linked through the safe frame the
    /// same way the panel links Width and Height.
    pub fn export_framing(&self, camera: &mut CameraFraming, settings: &AppSettings) -> ExportFraming {
        let sync = FieldSync::new(settings.compensate_zoom);
        let mut export = settings.export_framing();
        sync.full_outcome(&*camera, &mut export);
        if let Some(width) = self.width.filter(|w| *w > 0) {
            sync.on_field_changed(camera, &mut export, FieldEdit::Width(width));
        }
        if let Some(height) = self.height.filter(|h| *h > 0) {
            sync.on_field_changed(camera, &mut export, FieldEdit::Height(height));
        }
        export
    }
}
