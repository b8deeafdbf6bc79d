use crate::note::Note;
use crate::segment::{self, Fingerprint, Segment};
use std::collections::HashMap;

/// Outcome of chorus detection. `fallback` is set when no repeated segment
/// group held enough of the song and the full melody was returned instead.
#[derive(Debug, Clone)]
pub struct ChorusResult {
    /// Chorus notes in chronological order (possibly the whole melody)
    pub notes: Vec<Note>,
    /// Number of segments that matched the winning fingerprint
    pub matched_segments: usize,
    pub fallback: bool,
}

/// Find the most repeated melodic shape across the song's segments and
/// return its member notes as the chorus.
///
/// Sentinel fingerprints (sparse segments) never enter the tally. The
/// winning fingerprint is the most frequent one, ties broken by first
/// occurrence in segment order. Guardrail: if the winning group holds fewer
/// than `min_fraction` of the melody's notes, the whole melody is returned
/// so a weakly-repetitive song is not cut down to a sliver.
pub fn detect_chorus(segments: &[Segment], min_fraction: f64) -> ChorusResult {
    let fingerprints: Vec<Fingerprint> = segments.iter().map(segment::fingerprint).collect();

    let mut counts: HashMap<&Fingerprint, usize> = HashMap::new();
    for fp in fingerprints.iter().filter(|fp| !fp.is_empty()) {
        *counts.entry(fp).or_insert(0) += 1;
    }

    // Walk in segment order so the first of equally-frequent shapes wins
    let mut winner: Option<&Fingerprint> = None;
    let mut winner_count = 0usize;
    for fp in &fingerprints {
        if fp.is_empty() {
            continue;
        }
        let count = counts[fp];
        if count > winner_count {
            winner = Some(fp);
            winner_count = count;
        }
    }

    let total_notes: usize = segments.iter().map(|s| s.notes.len()).sum();

    let Some(winner) = winner else {
        log::debug!("no repeated segment shapes; keeping full melody");
        return full_melody(segments);
    };

    let mut notes = Vec::new();
    let mut matched_segments = 0usize;
    for (seg, fp) in segments.iter().zip(&fingerprints) {
        if fp == winner {
            notes.extend(seg.notes.iter().cloned());
            matched_segments += 1;
        }
    }

    if (notes.len() as f64) < total_notes as f64 * min_fraction {
        log::debug!(
            "chorus too small ({} of {} notes); keeping full melody",
            notes.len(),
            total_notes
        );
        return full_melody(segments);
    }

    log::debug!(
        "chorus: {} segments, {} of {} notes",
        matched_segments,
        notes.len(),
        total_notes
    );

    ChorusResult {
        notes,
        matched_segments,
        fallback: false,
    }
}

fn full_melody(segments: &[Segment]) -> ChorusResult {
    let notes: Vec<Note> = segments.iter().flat_map(|s| s.notes.iter().cloned()).collect();
    ChorusResult {
        notes,
        matched_segments: 0,
        fallback: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::segment_notes;

    fn make_note(pitch: u8, start: f64) -> Note {
        Note {
            pitch,
            start,
            end: start + 0.4,
            velocity: 90,
            track_id: 0,
        }
    }

    /// A phrase of `pitches` with one note every half second from `at`.
    fn phrase(pitches: &[u8], at: f64) -> Vec<Note> {
        pitches
            .iter()
            .enumerate()
            .map(|(i, &p)| make_note(p, at + i as f64 * 0.5))
            .collect()
    }

    #[test]
    fn test_repeated_halves_yield_majority_chorus() {
        // Same phrase in segment 0 and segment 1: both belong to the chorus
        let mut notes = phrase(&[60, 62, 64, 65, 67], 0.0);
        notes.extend(phrase(&[60, 62, 64, 65, 67], 4.0));

        let segments = segment_notes(&notes, 4.0);
        let result = detect_chorus(&segments, 0.2);

        assert!(!result.fallback);
        assert_eq!(result.matched_segments, 2);
        assert!(result.notes.len() * 2 >= notes.len());
    }

    #[test]
    fn test_transposed_repeat_still_matches() {
        // Second half is the same shape an octave up
        let mut notes = phrase(&[60, 62, 64], 0.0);
        notes.extend(phrase(&[72, 74, 76], 4.0));

        let segments = segment_notes(&notes, 4.0);
        let result = detect_chorus(&segments, 0.2);

        assert!(!result.fallback);
        assert_eq!(result.matched_segments, 2);
        assert_eq!(result.notes.len(), notes.len());
    }

    #[test]
    fn test_guardrail_keeps_full_melody() {
        // The only repeated shape covers 4 of 44 notes, under a 20% floor
        let mut notes = phrase(&[60, 62], 0.0);
        notes.extend(phrase(&[60, 62], 4.0));
        // Two dense segments of unique, non-repeating shapes
        let dense_a: Vec<u8> = (0..20).map(|i| 40 + (i * 3 % 30) as u8).collect();
        let dense_b: Vec<u8> = (0..20).map(|i| 90 - (i * 5 % 40) as u8).collect();
        notes.extend(phrase(&dense_a, 8.0));
        notes.extend(phrase(&dense_b, 20.0));

        let segments = segment_notes(&notes, 4.0);
        let result = detect_chorus(&segments, 0.2);

        assert!(result.fallback);
        assert_eq!(result.notes.len(), notes.len());
    }

    #[test]
    fn test_no_repeats_falls_back() {
        // Every segment has a unique shape; the "winner" is the first one
        // with count 1, which covers well under the floor for this song
        let mut notes = phrase(&[60, 62, 64, 65], 0.0);
        notes.extend(phrase(&[70, 65, 71, 64], 4.0));
        notes.extend(phrase(&[50, 60, 49, 61], 8.0));
        notes.extend(phrase(&[80, 70, 81, 69], 12.0));
        notes.extend(phrase(&[55, 66, 54, 67], 16.0));
        notes.extend(phrase(&[61, 59, 68, 52], 20.0));

        let segments = segment_notes(&notes, 4.0);
        let result = detect_chorus(&segments, 0.2);

        assert!(result.fallback);
        assert_eq!(result.notes.len(), notes.len());
    }

    #[test]
    fn test_sparse_segments_never_win() {
        // Segments 0 and 1 hold one note each (sentinel); segment 2 repeats
        // nothing but is the only real shape
        let mut notes = vec![make_note(60, 0.0), make_note(72, 4.0)];
        notes.extend(phrase(&[60, 62, 64, 65, 67, 69, 71, 72], 8.0));

        let segments = segment_notes(&notes, 4.0);
        let result = detect_chorus(&segments, 0.2);

        // The single real segment wins the tally and passes the floor
        assert!(!result.fallback);
        assert_eq!(result.matched_segments, 1);
        assert_eq!(result.notes.len(), 8);
    }

    #[test]
    fn test_tie_broken_by_first_occurrence() {
        // Shape A at segments 0 and 2, shape B at segments 1 and 3: A wins
        let mut notes = phrase(&[60, 62, 64], 0.0);
        notes.extend(phrase(&[70, 65, 71], 4.0));
        notes.extend(phrase(&[60, 62, 64], 8.0));
        notes.extend(phrase(&[70, 65, 71], 12.0));

        let segments = segment_notes(&notes, 4.0);
        let result = detect_chorus(&segments, 0.2);

        assert!(!result.fallback);
        assert_eq!(result.matched_segments, 2);
        // Winner is the ascending shape from segments 0 and 2
        assert_eq!(result.notes[0].pitch, 60);
        assert_eq!(result.notes[3].pitch, 60);
        assert!((result.notes[3].start - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_chorus_notes_chronological() {
        let mut notes = phrase(&[60, 62, 64], 0.0);
        notes.extend(phrase(&[70, 65, 71], 4.0));
        notes.extend(phrase(&[60, 62, 64], 8.0));

        let segments = segment_notes(&notes, 4.0);
        let result = detect_chorus(&segments, 0.2);

        for pair in result.notes.windows(2) {
            assert!(pair[0].start <= pair[1].start);
        }
    }

    #[test]
    fn test_empty_input() {
        let result = detect_chorus(&[], 0.2);
        assert!(result.notes.is_empty());
        assert!(result.fallback);
    }
}
