pub mod config;
pub mod event;
pub mod heatmap;
pub mod optimize;
pub mod prefs;
