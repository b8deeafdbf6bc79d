// Standard MIDI File reading: note extraction with tempo-map timing.

use std::collections::HashMap;
use std::path::Path;

use crate::note::{Note, Track};

use super::MidiError;

/// Microseconds per beat at the 120 BPM fallback tempo.
const DEFAULT_USEC_PER_BEAT: u32 = 500_000;

/// A parsed song: one Track per (SMF track, channel) pair that carries
/// notes, plus the initial tempo for display.
#[derive(Debug, Clone)]
pub struct Song {
    pub tracks: Vec<Track>,
    /// First tempo event of the file, in beats per minute
    pub tempo_bpm: f64,
}

impl Song {
    pub fn total_notes(&self) -> usize {
        self.tracks.iter().map(|t| t.notes.len()).sum()
    }

    pub fn duration(&self) -> f64 {
        self.tracks
            .iter()
            .flat_map(|t| t.notes.iter())
            .fold(0.0, |acc, n| acc.max(n.end))
    }
}

#[derive(Debug, Clone, Copy)]
struct TempoChange {
    tick: u64,
    usec_per_beat: u32,
}

/// A note still in ticks, before tempo-map conversion.
struct RawNote {
    pitch: u8,
    velocity: u8,
    start_tick: u64,
    end_tick: u64,
    channel: u8,
}

/// Read and parse a MIDI file into analyzable tracks.
pub fn load_song(path: &Path) -> Result<Song, MidiError> {
    let data = std::fs::read(path)?;
    let smf = midly::Smf::parse(&data)?;
    Ok(song_from_smf(&smf))
}

/// Extract tracks from an in-memory SMF.
///
/// Notes are grouped per (SMF track, channel); channel 10 (index 9) marks a
/// group percussive. Velocity-0 note-ons count as note-offs, a re-struck key
/// finalizes the previous note, and notes still sounding at end of track are
/// closed there. Tick positions become seconds via the file's tempo map.
pub fn song_from_smf(smf: &midly::Smf) -> Song {
    // Tempo events apply file-wide in format 1, so gather them first
    let mut tempo_map: Vec<TempoChange> = Vec::new();
    for track in &smf.tracks {
        let mut tick: u64 = 0;
        for event in track {
            tick += u64::from(event.delta.as_int());
            if let midly::TrackEventKind::Meta(midly::MetaMessage::Tempo(t)) = event.kind {
                tempo_map.push(TempoChange {
                    tick,
                    usec_per_beat: t.as_int(),
                });
            }
        }
    }
    tempo_map.sort_by_key(|t| t.tick);
    tempo_map.dedup_by_key(|t| t.tick);

    let tempo_bpm = 60_000_000.0
        / f64::from(
            tempo_map
                .first()
                .map(|t| t.usec_per_beat)
                .unwrap_or(DEFAULT_USEC_PER_BEAT),
        );

    let clock = Clock::new(smf.header.timing, tempo_map);

    let mut tracks: Vec<Track> = Vec::new();
    for smf_track in &smf.tracks {
        let (raw_notes, name) = extract_raw_notes(smf_track);
        if raw_notes.is_empty() {
            continue;
        }

        // Split one SMF track into per-channel instrument tracks
        let mut channels: Vec<u8> = raw_notes.iter().map(|n| n.channel).collect();
        channels.sort_unstable();
        channels.dedup();

        for channel in channels {
            let id = tracks.len();
            let mut notes: Vec<Note> = raw_notes
                .iter()
                .filter(|n| n.channel == channel)
                .map(|n| Note {
                    pitch: n.pitch,
                    start: clock.seconds_at(n.start_tick),
                    end: clock.seconds_at(n.end_tick),
                    velocity: n.velocity,
                    track_id: id,
                })
                .collect();
            notes.sort_by(|a, b| {
                a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal)
            });

            tracks.push(Track {
                id,
                name: name.clone(),
                channel,
                is_percussive: channel == 9,
                notes,
            });
        }
    }

    Song { tracks, tempo_bpm }
}

/// Walk one SMF track and pair note-ons with note-offs.
fn extract_raw_notes(track: &[midly::TrackEvent]) -> (Vec<RawNote>, Option<String>) {
    let mut notes: Vec<RawNote> = Vec::new();
    let mut name: Option<String> = None;
    // Sounding notes: (key, channel) -> (velocity, onset tick)
    let mut active: HashMap<(u8, u8), (u8, u64)> = HashMap::new();
    let mut tick: u64 = 0;

    for event in track {
        tick += u64::from(event.delta.as_int());

        match event.kind {
            midly::TrackEventKind::Meta(midly::MetaMessage::TrackName(bytes)) => {
                if name.is_none() && !bytes.is_empty() {
                    name = Some(String::from_utf8_lossy(bytes).into_owned());
                }
            }
            midly::TrackEventKind::Midi { channel, message } => {
                let ch = channel.as_int();
                match message {
                    midly::MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                        // A re-struck key ends the previous note here
                        if let Some((velocity, start_tick)) = active.remove(&(key.as_int(), ch)) {
                            notes.push(RawNote {
                                pitch: key.as_int(),
                                velocity,
                                start_tick,
                                end_tick: tick,
                                channel: ch,
                            });
                        }
                        active.insert((key.as_int(), ch), (vel.as_int(), tick));
                    }
                    midly::MidiMessage::NoteOn { key, .. }
                    | midly::MidiMessage::NoteOff { key, .. } => {
                        if let Some((velocity, start_tick)) = active.remove(&(key.as_int(), ch)) {
                            notes.push(RawNote {
                                pitch: key.as_int(),
                                velocity,
                                start_tick,
                                end_tick: tick,
                                channel: ch,
                            });
                        }
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    // Close anything still sounding at end of track
    for ((pitch, channel), (velocity, start_tick)) in active.drain() {
        if tick > start_tick {
            notes.push(RawNote {
                pitch,
                velocity,
                start_tick,
                end_tick: tick,
                channel,
            });
        }
    }

    (notes, name)
}

/// Converts tick positions to wall-clock seconds.
enum Clock {
    Metrical {
        ticks_per_beat: u16,
        tempo_map: Vec<TempoChange>,
    },
    Timecode {
        ticks_per_second: f64,
    },
}

impl Clock {
    fn new(timing: midly::Timing, tempo_map: Vec<TempoChange>) -> Self {
        match timing {
            midly::Timing::Metrical(tpb) => Clock::Metrical {
                ticks_per_beat: tpb.as_int().max(1),
                tempo_map,
            },
            midly::Timing::Timecode(fps, subframe) => Clock::Timecode {
                ticks_per_second: f64::from(fps.as_f32()) * f64::from(subframe),
            },
        }
    }

    /// Seconds elapsed at `tick`, accumulating across tempo changes.
    fn seconds_at(&self, tick: u64) -> f64 {
        match self {
            Clock::Timecode { ticks_per_second } => tick as f64 / ticks_per_second,
            Clock::Metrical {
                ticks_per_beat,
                tempo_map,
            } => {
                let tpb = f64::from(*ticks_per_beat);
                let mut seconds = 0.0;
                let mut last_tick = 0u64;
                let mut usec_per_beat = f64::from(DEFAULT_USEC_PER_BEAT);

                for change in tempo_map {
                    if change.tick >= tick {
                        break;
                    }
                    seconds += ((change.tick - last_tick) as f64 / tpb) * (usec_per_beat / 1e6);
                    last_tick = change.tick;
                    usec_per_beat = f64::from(change.usec_per_beat);
                }

                seconds + ((tick - last_tick) as f64 / tpb) * (usec_per_beat / 1e6)
            }
        }
    }
}
