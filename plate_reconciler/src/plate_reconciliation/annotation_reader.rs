use std::path::PathBuf;
use std::sync::Arc;

use crossbeam::channel::{unbounded, Receiver, Sender};
use rusted_pipe::channels::typed_write_channel::WriteChannel1;
use rusted_pipe::graph::processor::ProcessorWriter;
use rusted_pipe::graph::processor::SourceProcessor;
use rusted_pipe::DataVersion;
use rusted_pipe::RustedPipeError;
use tracing::{debug, info};

use super::annotation_io::read_frame_or_empty;
use super::validator::PlateFormat;
use super::IndexedFrame;

/// Streams the raw annotation files of a frame range in index order.
pub struct AnnotationReader {
    input_dir: PathBuf,
    next_index: usize,
    last_index: usize,
    format: Arc<dyn PlateFormat>,
    done_s: Sender<bool>,
    done_r: Receiver<bool>,
    finished: bool,
}

impl AnnotationReader {
    pub fn new(
        input_dir: impl Into<PathBuf>,
        first_index: usize,
        last_index: usize,
        format: Arc<dyn PlateFormat>,
    ) -> Self {
        let (done_s, done_r) = unbounded();
        Self {
            input_dir: input_dir.into(),
            next_index: first_index,
            last_index,
            format,
            done_s,
            done_r,
            finished: false,
        }
    }

    /// Fires once every frame of the range has been emitted.
    pub fn get_done_event(&self) -> Receiver<bool> {
        self.done_r.clone()
    }

    /// The next frame of the range, with plate validity re-derived.
    pub fn next_frame(&mut self) -> Option<IndexedFrame> {
        if self.next_index > self.last_index {
            return None;
        }
        let index = self.next_index;
        self.next_index += 1;

        let mut frame = read_frame_or_empty(&self.input_dir, index);
        for car in frame.cars.iter_mut() {
            for plate in car.plates.iter_mut() {
                plate.revalidate(self.format.as_ref());
            }
        }
        Some(IndexedFrame::new(index, frame))
    }
}

impl SourceProcessor for AnnotationReader {
    type OUTPUT = WriteChannel1<IndexedFrame>;
    fn handle(&mut self, mut output: ProcessorWriter<Self::OUTPUT>) -> Result<(), RustedPipeError> {
        let Some(frame) = self.next_frame() else {
            if !self.finished {
                info!("All annotation frames read");
                self.finished = true;
                let _ = self.done_s.send(true);
            }
            return Err(RustedPipeError::EndOfStream());
        };

        let frame_ts = DataVersion::from_now();
        debug!("Frame {} read", frame.index);
        output
            .writer
            .c1()
            .write(frame, &frame_ts)
            .expect("Cannot write to output buffer");
        Ok(())
    }
}
