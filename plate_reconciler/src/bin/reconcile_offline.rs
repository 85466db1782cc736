use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info};

use plate_reconciler::plate_reconciliation::annotation_io::{
    discover_frames, load_history, reconciled_annotations_path, write_frame,
};
use plate_reconciler::plate_reconciliation::metrics;
use plate_reconciler::plate_reconciliation::reconciler::Reconciler;
use plate_reconciler::{init_tracing, ConfigOverrides, ReconcileError};

/// Reconciles every frame of a sequence of raw annotation files.
#[derive(Parser, Debug)]
struct Cli {
    /// Folder containing frameNNNNN_annotations.json files
    input_dir: PathBuf,

    /// Where frameNNNNN_annotations_unique.json files are written (defaults to the input folder)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    #[arg(long)]
    start_frame: Option<usize>,

    /// Defaults to the last frame found in the input folder
    #[arg(long)]
    end_frame: Option<usize>,

    /// Also reconcile the first and last `window` frames, whose window is incomplete
    #[arg(long)]
    include_edges: bool,

    /// Write the reconciliation counters to this file
    #[arg(long)]
    metrics_file: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = cli.overrides.resolve()?;
    let reconciler = Reconciler::new(&config)?;
    let output_dir = cli.output_dir.clone().unwrap_or_else(|| cli.input_dir.clone());
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Cannot create {}", output_dir.display()))?;

    let discovered = discover_frames(&cli.input_dir)?;
    let (first, last) = match (discovered.first(), discovered.last()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => return Err(ReconcileError::NoFrames(cli.input_dir.clone()).into()),
    };
    let start = cli.start_frame.unwrap_or(first);
    let end = cli.end_frame.unwrap_or(last);

    let (start, end) = if cli.include_edges {
        (start, end)
    } else {
        (start + config.window, end.saturating_sub(config.window))
    };
    if start > end {
        bail!(
            "No frame in {}..={} has a full window of {} frames",
            start,
            end,
            config.window
        );
    }

    info!(
        "Reconciling frames {}..={} (window {}, {} workers)",
        start, end, config.window, config.workers
    );

    let (history, missing) = load_history(
        &cli.input_dir,
        start.saturating_sub(config.window)..=end + config.window,
        &*reconciler.format(),
    );
    if !missing.is_empty() {
        info!("{} frames had no readable annotations", missing.len());
    }

    let written = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    reconciler.reconcile_each(&history, start..=end, config.workers, |index, frame| {
        let path = reconciled_annotations_path(&output_dir, index);
        match write_frame(&path, &frame) {
            Ok(()) => {
                written.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                error!("Frame {} not written: {}", index, e);
                failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    });

    info!(
        "Done: {} frames written, {} failed, {} plates corrected, {} synthesized",
        written.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        metrics::PLATES_CORRECTED.get(),
        metrics::PLATES_SYNTHESIZED.get()
    );

    if let Some(path) = &cli.metrics_file {
        fs::write(path, metrics::render())
            .with_context(|| format!("Cannot write metrics to {}", path.display()))?;
    }

    let failed = failed.load(Ordering::Relaxed);
    if failed > 0 {
        bail!("{} frames could not be written", failed);
    }
    Ok(())
}
