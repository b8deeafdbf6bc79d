use crate::config::PipelineConfig;
use crate::note::{self, Note};

/// Per-measure chord guess derived from the melody's pitch-class content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChordEstimate {
    /// Root pitch class, 0-11
    pub root_pc: u8,
    pub is_major: bool,
}

impl ChordEstimate {
    /// Semitone offsets of the triad voices above the root.
    pub fn intervals(&self) -> [u8; 3] {
        if self.is_major { [0, 4, 7] } else { [0, 3, 7] }
    }
}

/// Onset-counted pitch-class histogram over a group of notes.
fn pitch_class_histogram<'a>(notes: impl Iterator<Item = &'a Note>) -> [usize; 12] {
    let mut histogram = [0usize; 12];
    for n in notes {
        histogram[n.pitch_class() as usize] += 1;
    }
    histogram
}

/// Estimate a chord from a pitch-class histogram, or None if it is empty.
///
/// Root = most frequent pitch class, ties to the lowest class. Quality is
/// minor only when the minor third is present and the major third absent;
/// when both or neither are present, `ambiguous_third_major` decides.
pub fn estimate_chord(histogram: &[usize; 12], ambiguous_third_major: bool) -> Option<ChordEstimate> {
    let mut root_pc = 0usize;
    let mut best = 0usize;
    for (pc, &count) in histogram.iter().enumerate() {
        if count > best {
            root_pc = pc;
            best = count;
        }
    }
    if best == 0 {
        return None;
    }

    let has_major_third = histogram[(root_pc + 4) % 12] > 0;
    let has_minor_third = histogram[(root_pc + 3) % 12] > 0;
    let is_major = match (has_major_third, has_minor_third) {
        (true, false) => true,
        (false, true) => false,
        _ => ambiguous_third_major,
    };

    Some(ChordEstimate {
        root_pc: root_pc as u8,
        is_major,
    })
}

/// Synthesize the left-hand part: one block triad per measure, estimated
/// from the melody notes sounding in that measure and voiced in a fixed
/// lower register. Measures with no melody notes stay silent.
pub fn generate_accompaniment(melody: &[Note], config: &PipelineConfig) -> Vec<Note> {
    let duration = note::duration(melody);
    if duration <= 0.0 {
        return Vec::new();
    }

    let track_id = melody.first().map(|n| n.track_id).unwrap_or(0);
    let measure_count = (duration / config.measure_seconds).ceil() as usize;
    let mut accompaniment = Vec::new();

    for index in 0..measure_count {
        let measure_start = index as f64 * config.measure_seconds;
        let measure_end = (index + 1) as f64 * config.measure_seconds;

        let histogram = pitch_class_histogram(
            melody.iter().filter(|n| n.overlaps(measure_start, measure_end)),
        );
        let Some(chord) = estimate_chord(&histogram, config.ambiguous_third_major) else {
            continue;
        };

        let root = config.register_base + chord.root_pc;
        for offset in chord.intervals() {
            accompaniment.push(Note {
                pitch: root + offset,
                start: measure_start,
                end: measure_end,
                velocity: config.chord_velocity,
                track_id,
            });
        }
    }

    accompaniment
}
