use crate::note::Track;

/// Scoring strategy for melody track selection. Higher score = more likely
/// to be the lead line. Swappable without touching pipeline control flow.
pub type ScoreFn = fn(&Track) -> f64;

/// Default heuristic: note density times register height. Lead lines in
/// these transcriptions tend to be both denser and higher-pitched than
/// bass or pad tracks.
pub fn density_register_score(track: &Track) -> f64 {
    track.notes.len() as f64 * (track.average_pitch() / 127.0)
}

/// Pick the track most likely to carry the melody.
/// Percussive and empty tracks are ineligible. Ties go to the first track
/// in input order (stable selection). Returns None if nothing is eligible.
pub fn select_melody_track<'a>(tracks: &'a [Track], score: ScoreFn) -> Option<&'a Track> {
    let mut best: Option<(&Track, f64)> = None;

    for track in tracks {
        if track.is_percussive || track.notes.is_empty() {
            continue;
        }

        let s = score(track);
        log::debug!("melody candidate {}: score {:.1}", track.label(), s);

        match best {
            Some((_, best_score)) if s <= best_score => {}
            _ => best = Some((track, s)),
        }
    }

    best.map(|(track, _)| track)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::Note;

    fn make_track(id: usize, is_percussive: bool, pitches: &[u8]) -> Track {
        let notes = pitches
            .iter()
            .enumerate()
            .map(|(i, &pitch)| Note {
                pitch,
                start: i as f64 * 0.5,
                end: i as f64 * 0.5 + 0.4,
                velocity: 90,
                track_id: id,
            })
            .collect();
        Track {
            id,
            name: None,
            channel: if is_percussive { 9 } else { 0 },
            is_percussive,
            notes,
        }
    }

    #[test]
    fn test_prefers_dense_high_track() {
        let bass = make_track(0, false, &[36, 38, 40]);
        let lead = make_track(1, false, &[72, 74, 76, 77, 79]);
        let tracks = vec![bass, lead];

        let selected = select_melody_track(&tracks, density_register_score).unwrap();
        assert_eq!(selected.id, 1);
    }

    #[test]
    fn test_excludes_percussive_tracks() {
        let drums = make_track(0, true, &[35; 200]);
        let lead = make_track(1, false, &[60, 62, 64]);
        let tracks = vec![drums, lead];

        let selected = select_melody_track(&tracks, density_register_score).unwrap();
        assert_eq!(selected.id, 1);
    }

    #[test]
    fn test_all_percussive_returns_none() {
        let tracks = vec![make_track(0, true, &[35, 38]), make_track(1, true, &[42])];
        assert!(select_melody_track(&tracks, density_register_score).is_none());
    }

    #[test]
    fn test_empty_tracks_ineligible() {
        let tracks = vec![make_track(0, false, &[]), make_track(1, false, &[])];
        assert!(select_melody_track(&tracks, density_register_score).is_none());
        assert!(select_melody_track(&[], density_register_score).is_none());
    }

    #[test]
    fn test_tie_goes_to_first_track() {
        let a = make_track(0, false, &[60, 62]);
        let b = make_track(1, false, &[60, 62]);
        let tracks = vec![a, b];

        let selected = select_melody_track(&tracks, density_register_score).unwrap();
        assert_eq!(selected.id, 0);
    }

    #[test]
    fn test_custom_scoring_strategy() {
        // A strategy that prefers the lowest register instead
        fn low_register(track: &Track) -> f64 {
            127.0 - track.average_pitch()
        }

        let bass = make_track(0, false, &[36, 38, 40]);
        let lead = make_track(1, false, &[72, 74, 76]);
        let tracks = vec![bass, lead];

        let selected = select_melody_track(&tracks, low_register).unwrap();
        assert_eq!(selected.id, 0);
    }
}
