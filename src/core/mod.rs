//! Core framing modules - angle math, aspect ratio control, field sync, debounce
//!
//! These modules form the framing engine, independent of UI.

pub mod angles;
pub mod aspect;
pub mod debounce;
pub mod field_sync;

// Re-exports for convenience
pub use angles::{Angle, Axis, float_equal};
pub use debounce::{CancelToken, Debouncer};
pub use field_sync::{Field, FieldEdit, FieldSync};
