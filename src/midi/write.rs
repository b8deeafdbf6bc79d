// Standard MIDI File output: the arrangement as a two-hand piano SMF.
//
// Format 1, one track per hand, fixed 480-tpq grid at 120 BPM so the
// pipeline's second-based note times map directly onto ticks.

use std::path::Path;

use midly::num::{u4, u7, u15, u24, u28};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};

use crate::note::Note;

use super::MidiError;

/// Ticks per quarter note in MIDI output.
const TICKS_PER_QUARTER: u16 = 480;

/// Microseconds per beat (120 BPM).
const USEC_PER_BEAT: u32 = 500_000;

/// Acoustic Grand Piano.
const PIANO_PROGRAM: u8 = 0;

/// Write the arrangement to a MIDI file: melody as "Right Hand",
/// accompaniment (when present) as "Left Hand".
pub fn write_arrangement(
    melody: &[Note],
    accompaniment: Option<&[Note]>,
    path: &Path,
) -> Result<(), MidiError> {
    let smf = arrangement_to_smf(melody, accompaniment);
    smf.save(path)?;
    Ok(())
}

/// Build the in-memory SMF for an arrangement.
pub fn arrangement_to_smf<'a>(melody: &[Note], accompaniment: Option<&[Note]>) -> Smf<'a> {
    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));

    // Track 0: tempo track
    smf.tracks.push(vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(USEC_PER_BEAT))),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        },
    ]);

    smf.tracks.push(notes_to_track(melody, b"Right Hand", u4::new(0)));
    if let Some(left_hand) = accompaniment {
        smf.tracks.push(notes_to_track(left_hand, b"Left Hand", u4::new(1)));
    }

    smf
}

/// Seconds to ticks on the fixed 120 BPM grid.
fn seconds_to_ticks(seconds: f64) -> u32 {
    let beats = seconds * 1e6 / f64::from(USEC_PER_BEAT);
    (beats * f64::from(TICKS_PER_QUARTER)).round() as u32
}

/// Convert one hand's notes into a delta-encoded MIDI track.
fn notes_to_track<'a>(notes: &[Note], name: &'static [u8], channel: u4) -> Vec<TrackEvent<'a>> {
    let mut track: Vec<TrackEvent> = vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::TrackName(name)),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::ProgramChange {
                    program: u7::new(PIANO_PROGRAM),
                },
            },
        },
    ];

    // (tick, is_note_on, pitch, velocity); offs sort before ons at the
    // same tick so repeated pitches never collide
    let mut events: Vec<(u32, bool, u8, u8)> = Vec::with_capacity(notes.len() * 2);
    for n in notes {
        let on_tick = seconds_to_ticks(n.start);
        let off_tick = seconds_to_ticks(n.end).max(on_tick + 1);
        events.push((on_tick, true, n.pitch.min(127), n.velocity.min(127)));
        events.push((off_tick, false, n.pitch.min(127), 0));
    }
    events.sort_by_key(|&(tick, is_on, pitch, _)| (tick, is_on, pitch));

    let mut last_tick = 0u32;
    for (tick, is_on, pitch, velocity) in events {
        let message = if is_on {
            MidiMessage::NoteOn {
                key: u7::new(pitch),
                vel: u7::new(velocity),
            }
        } else {
            MidiMessage::NoteOff {
                key: u7::new(pitch),
                vel: u7::new(0),
            }
        };
        track.push(TrackEvent {
            delta: u28::new(tick - last_tick),
            kind: TrackEventKind::Midi { channel, message },
        });
        last_tick = tick;
    }

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    track
}
