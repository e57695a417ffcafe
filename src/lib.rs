//! SafeFrame - camera safe frame tools
//!
//! Keeps export size, camera aspect ratio and both angles of view consistent
//! while the operator edits any one of them. Re-exports all modules for the
//! binary target.

// Framing engine (angles, aspect ratio, field sync, debounce)
pub mod core;

// App modules
pub mod cli;
pub mod config;
pub mod dialogs;
pub mod entities;
pub mod export;
pub mod render;
pub mod utils;

// Re-export commonly used types
pub use core::debounce::Debouncer;
pub use core::field_sync::{ExportFraming, Field, FieldEdit, FieldSync, SyncOutcome};
pub use entities::camera::{CameraAdapter, CameraFraming, SharedCamera};
pub use export::{ExportError, ExportRequest, ImageExporter, ImageWriter};
