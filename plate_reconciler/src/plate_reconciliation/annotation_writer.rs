use std::path::PathBuf;

use crossbeam::channel::{unbounded, Receiver, Sender};
use rusted_pipe::channels::read_channel::InputGenerator;
use rusted_pipe::channels::typed_read_channel::ReadChannel1;
use rusted_pipe::graph::processor::TerminalProcessor;
use rusted_pipe::RustedPipeError;
use tracing::{error, info};

use super::annotation_io::{reconciled_annotations_path, write_frame};
use super::IndexedFrame;

/// Frames handled by an [`AnnotationWriter`] once its last expected frame is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteReport {
    pub written: usize,
    pub failed: usize,
}

/// Writes every reconciled frame next to the others in `output_dir`.
pub struct AnnotationWriter {
    pub id: String,
    output_dir: PathBuf,
    written: usize,
    failed: usize,
    last_index: Option<usize>,
    done_s: Sender<WriteReport>,
    done_r: Receiver<WriteReport>,
}

impl AnnotationWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        let (done_s, done_r) = unbounded();
        Self {
            id: "annotation_writer".to_string(),
            output_dir: output_dir.into(),
            written: 0,
            failed: 0,
            last_index: None,
            done_s,
            done_r,
        }
    }

    /// Fires the done event after frame `index` has been handled.
    pub fn until(mut self, index: usize) -> Self {
        self.last_index = Some(index);
        self
    }

    pub fn get_done_event(&self) -> Receiver<WriteReport> {
        self.done_r.clone()
    }

    pub fn report(&self) -> WriteReport {
        WriteReport {
            written: self.written,
            failed: self.failed,
        }
    }

    /// A failed write is logged and does not stop the following frames.
    pub fn store(&mut self, frame: &IndexedFrame) -> bool {
        let stored = self.write(frame);
        if self.last_index.map_or(false, |last| frame.index >= last) {
            let _ = self.done_s.send(self.report());
        }
        stored
    }

    fn write(&mut self, frame: &IndexedFrame) -> bool {
        let path = reconciled_annotations_path(&self.output_dir, frame.index);
        match write_frame(&path, &frame.frame) {
            Ok(()) => {
                self.written += 1;
                true
            }
            Err(e) => {
                error!("Frame {} not written: {}", frame.index, e);
                self.failed += 1;
                false
            }
        }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn failed(&self) -> usize {
        self.failed
    }
}

impl Drop for AnnotationWriter {
    fn drop(&mut self) {
        info!(
            "AnnotationWriter done: {} frames written, {} failed",
            self.written, self.failed
        );
    }
}

impl TerminalProcessor for AnnotationWriter {
    type INPUT = ReadChannel1<IndexedFrame>;
    fn handle(
        &mut self,
        mut input: <Self::INPUT as InputGenerator>::INPUT,
    ) -> Result<(), RustedPipeError> {
        if let Some(packet) = input.c1_owned() {
            self.store(&packet.data);
        }
        Ok(())
    }
}
