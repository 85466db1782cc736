use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use crossbeam::channel::Receiver;
use tracing::{info, warn};

use plate_reconciler::plate_reconciliation::annotation_reader::AnnotationReader;
use plate_reconciler::plate_reconciliation::annotation_writer::{AnnotationWriter, WriteReport};
use plate_reconciler::plate_reconciliation::frame_reconciler::FrameReconciler;
use plate_reconciler::plate_reconciliation::reconciler::Reconciler;
use plate_reconciler::{init_tracing, ConfigOverrides};
use rusted_pipe::graph::metrics::Metrics;
use rusted_pipe::{
    buffers::synchronizers::timestamp::TimestampSynchronizer,
    graph::{
        build::{link, Graph},
        processor::{Node, SourceNode, TerminalNode},
    },
};

/// Reconciles annotation files as a stream, one frame behind by `window` frames.
#[derive(Parser, Debug)]
struct Cli {
    input_dir: PathBuf,

    output_dir: PathBuf,

    #[arg(long, default_value_t = 1)]
    start_frame: usize,

    #[arg(long)]
    end_frame: usize,

    #[command(flatten)]
    overrides: ConfigOverrides,
}

/// What `main` waits on before stopping the graph.
enum Completion {
    /// The writer reports once the last reconcilable frame is written.
    Writer(Receiver<WriteReport>),
    /// The range is too short for any frame to be reconciled.
    Reader(Receiver<bool>),
}

fn setup_graph(cli: &Cli) -> Result<(Graph, Completion)> {
    let config = cli.overrides.resolve()?;
    let reconciler = Reconciler::new(&config)?;

    let reader = AnnotationReader::new(
        &cli.input_dir,
        cli.start_frame,
        cli.end_frame,
        Arc::new(config.plate_format()?),
    );
    let reader_done = reader.get_done_event();

    let mut writer = AnnotationWriter::new(&cli.output_dir);
    let last_emitted = cli
        .end_frame
        .checked_sub(config.window)
        .filter(|last| *last >= cli.start_frame);
    let completion = match last_emitted {
        Some(last) => {
            writer = writer.until(last);
            Completion::Writer(writer.get_done_event())
        }
        None => {
            warn!(
                "Frames {}..={} are fewer than the window needs, nothing will be written",
                cli.start_frame, cli.end_frame
            );
            Completion::Reader(reader_done)
        }
    };

    // Node that reads the annotation files in frame order
    let mut reader_node = SourceNode::create_common("annotation_reader".to_string(), Box::new(reader));

    let timestamp_synch = TimestampSynchronizer::default();

    // Node that holds the sliding window and reconciles its middle frame
    let mut reconciler_node = Node::create_common(
        "frame_reconciler".to_string(),
        Box::new(FrameReconciler::new(reconciler)),
        true,
        2000,
        1,
        Box::new(timestamp_synch.clone()),
        true,
    );

    // Node that writes the reconciled frames
    let writer_node = TerminalNode::create_common(
        "annotation_writer".to_string(),
        Box::new(writer),
        true,
        2000,
        1,
        Box::new(timestamp_synch.clone()),
        true,
    );

    // Reader -> Reconciler
    link(
        reader_node.write_channel.writer.c1(),
        reconciler_node.read_channel.channels.write().unwrap().c1(),
    )
    .unwrap();

    // Reconciler -> Writer
    link(
        reconciler_node.write_channel.writer.c1(),
        writer_node.read_channel.channels.write().unwrap().c1(),
    )
    .unwrap();

    let mut graph = Graph::new(Metrics::no_metrics());

    graph.start_terminal_node(writer_node);
    graph.start_node(reconciler_node);
    graph.start_source_node(reader_node);

    Ok((graph, completion))
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    std::fs::create_dir_all(&cli.output_dir)?;

    let (graph, completion) = setup_graph(&cli)?;

    info!("Starting, waiting for the last frame");
    let report = match completion {
        Completion::Writer(done) => done.recv().ok(),
        Completion::Reader(done) => {
            let _ = done.recv();
            None
        }
    };
    graph.stop(true, None);

    if let Some(report) = report {
        info!(
            "Done: {} frames written, {} failed",
            report.written, report.failed
        );
        if report.failed > 0 {
            bail!("{} frames could not be written", report.failed);
        }
    }
    Ok(())
}
