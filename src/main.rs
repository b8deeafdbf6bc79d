use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use refrain::config::{AppConfig, PipelineConfig};
use refrain::midi::{self, Song};
use refrain::pipeline::{self, ArrangementSummary};
use refrain::select;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "refrain", version, about = "Piano chorus arranger for MIDI transcriptions")]
struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the chorus melody and synthesize a two-hand arrangement
    Arrange {
        /// MIDI files or directories to arrange
        inputs: Vec<PathBuf>,

        /// Output file (single input only; default: <stem>_arrangement.mid)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory for output files (default: next to each input)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Write the chorus melody alone, without the left hand
        #[arg(long)]
        melody_only: bool,

        /// Print machine-readable JSON summaries
        #[arg(long)]
        json: bool,

        /// Number of parallel workers (0 = auto-detect from config)
        #[arg(short = 'j', long, default_value = "0")]
        jobs: usize,

        /// Override the repetition-detection window length in seconds
        #[arg(long)]
        segment_seconds: Option<f64>,

        /// Override the chord-estimation measure length in seconds
        #[arg(long)]
        measure_seconds: Option<f64>,
    },

    /// Inspect a MIDI file: tracks, note counts, and melody scores
    Info {
        /// MIDI file to inspect
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let config = AppConfig::load();

    match cli.command {
        Commands::Arrange {
            inputs,
            output,
            out_dir,
            melody_only,
            json,
            jobs,
            segment_seconds,
            measure_seconds,
        } => {
            let mut pipeline_config = config.pipeline.clone();
            if let Some(s) = segment_seconds {
                pipeline_config.segment_seconds = s;
            }
            if let Some(m) = measure_seconds {
                pipeline_config.measure_seconds = m;
            }
            pipeline_config.validate().context("Invalid pipeline config")?;

            let files = collect_inputs(&inputs)?;
            let out_dir = out_dir.or(config.out_dir.clone());

            if let Some(output) = output {
                if files.len() != 1 {
                    anyhow::bail!("--output requires exactly one input file");
                }
                let summary =
                    arrange_file(&files[0], &output, &pipeline_config, melody_only)?;
                report(&files[0], &output, &summary, json)?;
                return Ok(());
            }

            if files.len() == 1 {
                let out_path = output_path(&files[0], out_dir.as_deref(), melody_only);
                let summary =
                    arrange_file(&files[0], &out_path, &pipeline_config, melody_only)?;
                report(&files[0], &out_path, &summary, json)?;
                return Ok(());
            }

            let workers = if jobs > 0 { jobs } else { config.resolve_workers() };
            arrange_batch(&files, out_dir.as_deref(), &pipeline_config, melody_only, json, workers)?;
        }

        Commands::Info { input } => {
            let song = midi::load_song(&input)
                .with_context(|| format!("Failed to load {}", input.display()))?;
            print_song_info(&input, &song);
        }
    }

    Ok(())
}

/// Expand files and directories into a flat list of MIDI files.
fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    if inputs.is_empty() {
        anyhow::bail!("No inputs. Pass MIDI files or directories to scan.");
    }

    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if entry.file_type().is_file() && is_midi(entry.path()) {
                    files.push(entry.path().to_path_buf());
                }
            }
        } else {
            files.push(input.clone());
        }
    }

    if files.is_empty() {
        anyhow::bail!("No MIDI files found under the given inputs.");
    }
    files.sort();
    Ok(files)
}

fn is_midi(path: &Path) -> bool {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    refrain::SUPPORTED_EXTENSIONS.contains(&ext.as_str())
}

/// Where an arrangement for `input` goes.
fn output_path(input: &Path, out_dir: Option<&Path>, melody_only: bool) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("arrangement");
    let suffix = if melody_only { "melody" } else { "arrangement" };
    let file_name = format!("{}_{}.mid", stem, suffix);

    match out_dir {
        Some(dir) => dir.join(file_name),
        None => input.with_file_name(file_name),
    }
}

/// Load, run the pipeline, and write the result for one file.
fn arrange_file(
    input: &Path,
    output: &Path,
    config: &PipelineConfig,
    melody_only: bool,
) -> Result<ArrangementSummary> {
    let song = midi::load_song(input)
        .with_context(|| format!("Failed to load {}", input.display()))?;

    let result = pipeline::run(&song.tracks, config, !melody_only)
        .with_context(|| format!("Arrangement failed for {}", input.display()))?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    midi::write_arrangement(&result.melody, result.accompaniment.as_deref(), output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    Ok(result.summary)
}

/// Arrange many files in parallel: a rayon pool sized to the worker
/// count with a progress bar on top.
fn arrange_batch(
    files: &[PathBuf],
    out_dir: Option<&Path>,
    config: &PipelineConfig,
    melody_only: bool,
    json: bool,
    workers: usize,
) -> Result<()> {
    log::info!("Arranging {} files with {} workers", files.len(), workers);

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        )
        .unwrap()
        .progress_chars("#>-"),
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .unwrap();

    let results: Vec<(PathBuf, PathBuf, Result<ArrangementSummary>)> = pool.install(|| {
        files
            .par_iter()
            .map(|input| {
                let out_path = output_path(input, out_dir, melody_only);
                let result = arrange_file(input, &out_path, config, melody_only);
                pb.inc(1);
                (input.clone(), out_path, result)
            })
            .collect()
    });

    let mut arranged = 0u64;
    let mut failed = 0u64;
    let mut reports = Vec::new();

    for (input, out_path, result) in results {
        match result {
            Ok(summary) => {
                arranged += 1;
                if json {
                    reports.push(json_report(&input, &out_path, &summary)?);
                }
            }
            Err(e) => {
                log::warn!("{:#}", e);
                failed += 1;
            }
        }
    }

    pb.finish_with_message(format!("Done: {} arranged, {} failed", arranged, failed));

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        println!("Arrange complete: {} arranged, {} failed", arranged, failed);
    }

    Ok(())
}

fn json_report(
    input: &Path,
    output: &Path,
    summary: &ArrangementSummary,
) -> Result<serde_json::Value> {
    let mut value = serde_json::to_value(summary)?;
    value["input"] = serde_json::json!(input.display().to_string());
    value["output"] = serde_json::json!(output.display().to_string());
    Ok(value)
}

/// Print one arrangement summary.
fn report(input: &Path, output: &Path, summary: &ArrangementSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&json_report(input, output, summary)?)?);
        return Ok(());
    }

    println!("Input:        {}", input.display());
    println!(
        "Melody track: {} (id {})",
        summary.source_track, summary.source_track_id
    );
    if summary.chorus_is_full_melody {
        println!(
            "Chorus:       no clear repeat; kept all {} notes",
            summary.total_notes
        );
    } else {
        println!(
            "Chorus:       {} of {} notes across {} repeated segments",
            summary.chorus_notes, summary.total_notes, summary.chorus_segments
        );
    }
    if summary.accompaniment_notes > 0 {
        println!("Left hand:    {} chord notes", summary.accompaniment_notes);
    }
    println!("Duration:     {:.1} s", summary.duration);
    println!("Output:       {}", output.display());
    Ok(())
}

/// Print the per-track table for `info`.
fn print_song_info(input: &Path, song: &Song) {
    println!("File:     {}", input.display());
    println!("Tempo:    {:.0} BPM", song.tempo_bpm);
    println!("Duration: {:.1} s", song.duration());
    println!("Notes:    {}", song.total_notes());
    println!();

    if song.tracks.is_empty() {
        println!("No note-carrying tracks.");
        return;
    }

    println!(
        "{:<4} {:<20} {:>3} {:>7} {:>10} {:>9}",
        "Id", "Track", "Ch", "Notes", "Avg pitch", "Score"
    );
    println!("{}", "-".repeat(60));

    for track in &song.tracks {
        let label: String = if track.label().len() > 20 {
            format!("{}...", &track.label()[..17])
        } else {
            track.label()
        };
        let marker = if track.is_percussive { "  drums" } else { "" };

        println!(
            "{:<4} {:<20} {:>3} {:>7} {:>10.1} {:>9.1}{}",
            track.id,
            label,
            track.channel,
            track.notes.len(),
            track.average_pitch(),
            select::density_register_score(track),
            marker,
        );
    }

    println!();
    println!("Score = note count x (avg pitch / 127); the melody pick ignores drum tracks");
}
