pub mod accompany;
pub mod chorus;
pub mod config;
pub mod midi;
pub mod note;
pub mod pipeline;
pub mod segment;
pub mod select;

/// MIDI file extensions we support
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mid", "midi", "smf"];

/// Application name for XDG paths
pub const APP_NAME: &str = "refrain";
