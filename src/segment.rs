use crate::note::{self, Note};

/// A fixed-length time window over the song, holding the notes whose onset
/// falls inside it. Notes may ring past the window end; they are not split.
#[derive(Debug, Clone)]
pub struct Segment {
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub notes: Vec<Note>,
}

/// Comparable signature of a segment's melodic shape.
///
/// Built from the consecutive pitch differences of the segment's notes in
/// onset order, so a phrase repeated an octave up or down still matches.
/// Segments with fewer than two notes get the `Empty` sentinel, which is
/// excluded from the chorus tally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fingerprint {
    Empty,
    Shape(Vec<i16>),
}

impl Fingerprint {
    pub fn is_empty(&self) -> bool {
        matches!(self, Fingerprint::Empty)
    }
}

/// Partition notes into consecutive windows of `segment_seconds`.
/// Window count = ceil(duration / length); every note lands in exactly one
/// window, chosen by its onset. No notes means no segments.
pub fn segment_notes(notes: &[Note], segment_seconds: f64) -> Vec<Segment> {
    let duration = note::duration(notes);
    if duration <= 0.0 {
        return Vec::new();
    }

    let count = (duration / segment_seconds).ceil() as usize;
    let mut segments: Vec<Segment> = (0..count)
        .map(|index| Segment {
            index,
            start: index as f64 * segment_seconds,
            end: (index + 1) as f64 * segment_seconds,
            notes: Vec::new(),
        })
        .collect();

    for n in notes {
        // Onsets sit strictly before the song end, but guard the float edge
        let index = ((n.start / segment_seconds) as usize).min(count - 1);
        segments[index].notes.push(n.clone());
    }

    for seg in &mut segments {
        seg.notes
            .sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));
    }

    segments
}

/// Compute the melodic-shape signature of a segment.
pub fn fingerprint(segment: &Segment) -> Fingerprint {
    if segment.notes.len() < 2 {
        return Fingerprint::Empty;
    }

    let diffs: Vec<i16> = segment
        .notes
        .windows(2)
        .map(|pair| pair[1].pitch as i16 - pair[0].pitch as i16)
        .collect();

    Fingerprint::Shape(diffs)
}
