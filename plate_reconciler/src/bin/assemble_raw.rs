use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use plate_reconciler::plate_reconciliation::annotation_io::{raw_annotations_path, write_frame};
use plate_reconciler::plate_reconciliation::raw_annotations::RawAnnotationSource;
use plate_reconciler::{init_tracing, ConfigOverrides};

/// Turns the detector and OCR text outputs of each frame into annotation files.
#[derive(Parser, Debug)]
struct Cli {
    /// Folder with the frameNNNNN_cars.txt, _lp.txt and _lp_str.txt files
    aux_dir: PathBuf,

    /// Width of the original frames in pixels
    #[arg(long)]
    width: u32,

    /// Height of the original frames in pixels
    #[arg(long)]
    height: u32,

    #[arg(long, default_value_t = 1)]
    start_frame: usize,

    #[arg(long)]
    end_frame: usize,

    /// Defaults to the auxiliary folder
    #[arg(long)]
    output_dir: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = cli.overrides.resolve()?;
    let format = config.plate_format()?;
    let source = RawAnnotationSource::new(&cli.aux_dir, cli.width, cli.height);
    let output_dir = cli.output_dir.clone().unwrap_or_else(|| cli.aux_dir.clone());
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Cannot create {}", output_dir.display()))?;

    let mut written = 0;
    for index in cli.start_frame..=cli.end_frame {
        let frame = match source.assemble_frame(index, &format) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Frame {} skipped: {}", index, e);
                continue;
            }
        };
        write_frame(&raw_annotations_path(&output_dir, index), &frame)?;
        written += 1;
    }

    info!("Assembled {} frames into {}", written, output_dir.display());
    Ok(())
}
