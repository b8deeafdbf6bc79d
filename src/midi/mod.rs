pub mod parse;
pub mod write;

pub use parse::{Song, load_song};
pub use write::write_arrangement;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MidiError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed MIDI file: {0}")]
    Malformed(#[from] midly::Error),
}
