pub mod safeframe;
pub mod safeframe_events;
pub mod safeframe_ui;

pub use safeframe::{FieldTexts, Notice, PanelState, SafeFramePanel};
pub use safeframe_events::SafeFrameEvent;
pub use safeframe_ui::render_safe_frame_window;
