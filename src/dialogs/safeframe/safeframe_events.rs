//! Safe frame panel events.

use std::path::PathBuf;

/// Button actions reported by the panel window, handled by the app.
#[derive(Clone, Debug, PartialEq)]
pub enum SafeFrameEvent {
    /// Export to the path picked in the save dialog
    Export(PathBuf),
    ResetAspectRatio,
    Close,
}
