use crate::accompany;
use crate::chorus;
use crate::config::{ConfigError, PipelineConfig};
use crate::note::{self, Note, Track};
use crate::segment;
use crate::select::{self, ScoreFn};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("no notes to analyze")]
    EmptyInput,
    #[error("no suitable melody track among {tracks} tracks")]
    NoMelodyTrack { tracks: usize },
    #[error("invalid pipeline config: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// Summary metadata for one arrangement run, shaped for the CLI's
/// table and JSON output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrangementSummary {
    /// Label of the track the melody was taken from
    pub source_track: String,
    pub source_track_id: usize,
    /// Note count of the selected track before chorus filtering
    pub total_notes: usize,
    /// Note count after chorus filtering
    pub chorus_notes: usize,
    /// Segments that matched the winning fingerprint (0 on fallback)
    pub chorus_segments: usize,
    /// True when no clear chorus emerged and the full melody was kept
    pub chorus_is_full_melody: bool,
    pub accompaniment_notes: usize,
    /// End time of the emitted arrangement in seconds
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult {
    /// Right hand: the chorus-filtered melody, chronological
    pub melody: Vec<Note>,
    /// Left hand: block chords, present when accompaniment was requested
    pub accompaniment: Option<Vec<Note>>,
    pub summary: ArrangementSummary,
}

/// Run the full analysis with the default melody heuristic:
/// select track -> detect chorus -> (optionally) synthesize accompaniment.
pub fn run(
    tracks: &[Track],
    config: &PipelineConfig,
    with_accompaniment: bool,
) -> Result<PipelineResult, PipelineError> {
    run_with_scorer(tracks, config, with_accompaniment, select::density_register_score)
}

/// Same as [`run`] but with a caller-supplied track scoring strategy.
/// Every stage reads its input and allocates fresh output; the caller's
/// tracks are never touched.
pub fn run_with_scorer(
    tracks: &[Track],
    config: &PipelineConfig,
    with_accompaniment: bool,
    score: ScoreFn,
) -> Result<PipelineResult, PipelineError> {
    config.validate()?;

    if tracks.iter().all(|t| t.notes.is_empty()) {
        return Err(PipelineError::EmptyInput);
    }

    let melody_track = select::select_melody_track(tracks, score)
        .ok_or(PipelineError::NoMelodyTrack { tracks: tracks.len() })?;
    log::info!(
        "melody track: {} ({} notes)",
        melody_track.label(),
        melody_track.notes.len()
    );

    let segments = segment::segment_notes(&melody_track.notes, config.segment_seconds);
    if segments.is_empty() {
        // Eligible track with no playable duration
        return Err(PipelineError::EmptyInput);
    }

    let chorus = chorus::detect_chorus(&segments, config.min_chorus_fraction);

    let accompaniment = with_accompaniment
        .then(|| accompany::generate_accompaniment(&chorus.notes, config));

    let duration = accompaniment
        .as_deref()
        .map(note::duration)
        .unwrap_or(0.0)
        .max(note::duration(&chorus.notes));

    let summary = ArrangementSummary {
        source_track: melody_track.label(),
        source_track_id: melody_track.id,
        total_notes: melody_track.notes.len(),
        chorus_notes: chorus.notes.len(),
        chorus_segments: chorus.matched_segments,
        chorus_is_full_melody: chorus.fallback,
        accompaniment_notes: accompaniment.as_ref().map_or(0, Vec::len),
        duration,
    };

    Ok(PipelineResult {
        melody: chorus.notes,
        accompaniment,
        summary,
    })
}
