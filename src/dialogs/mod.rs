pub mod prefs;
pub mod safeframe;
