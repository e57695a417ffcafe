//! Image export of the current framing.
//!
//! The panel builds an [`ExportRequest`] and hands it to an [`ImageWriter`].
//! [`ImageExporter`] is the reference writer: renders the view and encodes it
//! with the `image` crate, format picked from the file extension.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use log::{debug, info};

use crate::entities::camera::CameraFraming;
use crate::render::{RenderOptions, render_view};
use crate::utils::numeric::MAX_PIXELS;

/// JPEG quality factor used for every export (0..1).
pub const DEFAULT_COMPRESSION: f32 = 0.9;

/// Extensions offered in the save dialog.
pub const EXPORT_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// Everything the writer needs for one export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub antialias: bool,
    pub transparent: bool,
    /// Compression quality 0..1 (lossy formats only)
    pub compression: f32,
    /// Camera state at the time of the request
    pub view: CameraFraming,
}

/// Export errors
#[derive(Debug)]
pub enum ExportError {
    InvalidSize { width: u32, height: u32 },
    UnsupportedFormat(String),
    Io(std::io::Error),
    Encode(String),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::InvalidSize { width, height } => {
                write!(f, "Invalid export size: {}x{}", width, height)
            }
            ExportError::UnsupportedFormat(ext) => {
                write!(f, "Unsupported image format: '{}'", ext)
            }
            ExportError::Io(e) => write!(f, "Failed to write file: {}", e),
            ExportError::Encode(msg) => write!(f, "Image encoding failed: {}", msg),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ExportError {
    fn from(e: std::io::Error) -> Self {
        ExportError::Io(e)
    }
}

impl From<image::ImageError> for ExportError {
    fn from(e: image::ImageError) -> Self {
        match e {
            image::ImageError::IoError(io) => ExportError::Io(io),
            other => ExportError::Encode(other.to_string()),
        }
    }
}

/// Host export call. One attempt; failures are reported, not retried.
pub trait ImageWriter {
    fn write_image(&mut self, request: &ExportRequest) -> Result<(), ExportError>;
}

/// Renders the view and writes it to disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageExporter;

impl ImageWriter for ImageExporter {
    fn write_image(&mut self, request: &ExportRequest) -> Result<(), ExportError> {
        let (width, height) = (request.width, request.height);
        let buffer_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4));
        if width == 0 || height == 0 || width > MAX_PIXELS || height > MAX_PIXELS || buffer_len.is_none() {
            return Err(ExportError::InvalidSize { width, height });
        }
        let ext = extension(&request.path);
        if !EXPORT_EXTENSIONS.contains(&ext.as_str()) {
            return Err(ExportError::UnsupportedFormat(ext));
        }

        debug!(
            "Rendering {}x{} (aa={}, transparent={}) for {}",
            request.width,
            request.height,
            request.antialias,
            request.transparent,
            request.path.display()
        );
        let opts = RenderOptions {
            antialias: request.antialias,
            transparent: request.transparent,
        };
        let img = DynamicImage::ImageRgba8(render_view(&request.view, request.width, request.height, opts));

        match ext.as_str() {
            "jpg" | "jpeg" => {
                let quality = (request.compression * 100.0).round().clamp(1.0, 100.0) as u8;
                let writer = BufWriter::new(File::create(&request.path)?);
                let mut encoder = JpegEncoder::new_with_quality(writer, quality);
                encoder.encode_image(&img.to_rgb8())?;
            }
            "bmp" if !request.transparent => {
                img.to_rgb8().save_with_format(&request.path, ImageFormat::Bmp)?;
            }
            "bmp" => img.save_with_format(&request.path, ImageFormat::Bmp)?,
            "tif" | "tiff" => img.save_with_format(&request.path, ImageFormat::Tiff)?,
            _ => img.save_with_format(&request.path, ImageFormat::Png)?,
        }

        info!("Exported {}x{} to {}", request.width, request.height, request.path.display());
        Ok(())
    }
}

/// Lowercase file extension, empty if none
fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(path: PathBuf) -> ExportRequest {
        ExportRequest {
            path,
            width: 48,
            height: 27,
            antialias: false,
            transparent: false,
            compression: DEFAULT_COMPRESSION,
            view: CameraFraming::new(1920, 1080).with_field_of_view(37.8),
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("safeframe_export_test");
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn test_export_png() {
        let path = temp_path("frame.png");
        let mut req = request(path.clone());
        req.transparent = true;
        ImageExporter.write_image(&req).unwrap();

        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (48, 27));
        assert!(img.color().has_alpha());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_export_jpeg_is_opaque() {
        let path = temp_path("frame.JPG");
        let mut req = request(path.clone());
        req.antialias = true;
        ImageExporter.write_image(&req).unwrap();

        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (48, 27));
        assert!(!img.color().has_alpha());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_unsupported_format() {
        let err = ImageExporter.write_image(&request(temp_path("frame.pdf"))).unwrap_err();
        assert!(matches!(err, ExportError::UnsupportedFormat(ref e) if e == "pdf"));
        assert_eq!(err.to_string(), "Unsupported image format: 'pdf'");
    }

    #[test]
    fn test_invalid_size() {
        let mut req = request(temp_path("empty.png"));
        req.height = 0;
        let err = ImageExporter.write_image(&req).unwrap_err();
        assert!(matches!(err, ExportError::InvalidSize { width: 48, height: 0 }));
    }

    #[test]
    fn test_oversized_is_invalid_size() {
        let mut req = request(temp_path("huge.png"));
        req.width = u32::MAX;
        req.height = 2_415_919_103;
        let err = ImageExporter.write_image(&req).unwrap_err();
        assert!(matches!(err, ExportError::InvalidSize { width: u32::MAX, .. }));

        req.width = MAX_PIXELS + 1;
        req.height = 10;
        assert!(matches!(
            ImageExporter.write_image(&req),
            Err(ExportError::InvalidSize { .. })
        ));
        assert!(!req.path.exists());
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let path = std::env::temp_dir()
            .join("safeframe_no_such_dir")
            .join("deeper")
            .join("frame.jpg");
        let err = ImageExporter.write_image(&request(path)).unwrap_err();
        assert!(matches!(err, ExportError::Io(_)));
    }
}
