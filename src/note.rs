/// A single transcribed note. Produced by the MIDI loader (or any upstream
/// transcription) and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// MIDI pitch, 0-127
    pub pitch: u8,
    /// Onset in seconds from the start of the song
    pub start: f64,
    /// Release in seconds, always > start
    pub end: f64,
    /// MIDI velocity, 0-127
    pub velocity: u8,
    /// Index of the source track this note came from
    pub track_id: usize,
}

impl Note {
    /// Pitch reduced modulo 12, ignoring octave.
    pub fn pitch_class(&self) -> u8 {
        self.pitch % 12
    }

    /// True if the note sounds at any point inside [window_start, window_end).
    pub fn overlaps(&self, window_start: f64, window_end: f64) -> bool {
        self.start < window_end && self.end > window_start
    }
}

/// One instrument line from the source file, notes ordered by onset.
#[derive(Debug, Clone)]
pub struct Track {
    pub id: usize,
    /// Track name from the MIDI meta event, if any
    pub name: Option<String>,
    /// MIDI channel the notes were found on
    pub channel: u8,
    /// Channel-10 (drum kit) tracks never carry the melody
    pub is_percussive: bool,
    pub notes: Vec<Note>,
}

impl Track {
    /// Mean pitch across all notes, or 0.0 for an empty track.
    pub fn average_pitch(&self) -> f64 {
        if self.notes.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.notes.iter().map(|n| n.pitch as f64).sum();
        sum / self.notes.len() as f64
    }

    /// Display label: the MIDI track name, or a positional fallback.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("track {}", self.id),
        }
    }
}

/// Latest note release across a collection, i.e. the song duration.
/// Returns 0.0 for an empty collection.
pub fn duration(notes: &[Note]) -> f64 {
    notes.iter().fold(0.0, |acc, n| acc.max(n.end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_note(pitch: u8, start: f64, end: f64) -> Note {
        Note {
            pitch,
            start,
            end,
            velocity: 90,
            track_id: 0,
        }
    }

    #[test]
    fn test_pitch_class() {
        assert_eq!(make_note(60, 0.0, 1.0).pitch_class(), 0); // C4
        assert_eq!(make_note(69, 0.0, 1.0).pitch_class(), 9); // A4
        assert_eq!(make_note(127, 0.0, 1.0).pitch_class(), 7);
    }

    #[test]
    fn test_overlaps() {
        let n = make_note(60, 1.0, 3.0);
        assert!(n.overlaps(0.0, 2.0)); // spans window end
        assert!(n.overlaps(2.0, 4.0)); // spans window start
        assert!(n.overlaps(0.0, 10.0)); // contained
        assert!(!n.overlaps(3.0, 5.0)); // starts exactly at release
        assert!(!n.overlaps(0.0, 1.0)); // ends exactly at onset
    }

    #[test]
    fn test_duration() {
        assert_eq!(duration(&[]), 0.0);
        let notes = vec![make_note(60, 0.0, 2.0), make_note(62, 1.0, 1.5)];
        assert_eq!(duration(&notes), 2.0);
    }

    #[test]
    fn test_average_pitch() {
        let track = Track {
            id: 0,
            name: None,
            channel: 0,
            is_percussive: false,
            notes: vec![make_note(60, 0.0, 1.0), make_note(72, 1.0, 2.0)],
        };
        assert_eq!(track.average_pitch(), 66.0);
    }
}
