//! Entities module - host-facing types
//!
//! The camera the panel edits, behind the `CameraAdapter` seam.

pub mod camera;

pub use camera::{CameraAdapter, CameraFraming, SharedCamera};
