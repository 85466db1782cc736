use rusted_pipe::channels::read_channel::InputGenerator;
use rusted_pipe::channels::typed_read_channel::ReadChannel1;
use rusted_pipe::channels::typed_write_channel::WriteChannel1;
use rusted_pipe::graph::processor::Processor;
use rusted_pipe::graph::processor::ProcessorWriter;
use rusted_pipe::RustedPipeError;
use tracing::debug;

use super::history::AnnotationHistory;
use super::reconciler::{reconcile_isolated, Reconciler};
use super::IndexedFrame;

/// Keeps the last `2 * window + 1` frames of a stream and reconciles the middle
/// one as soon as its lookahead is complete.
pub struct SlidingReconciler {
    reconciler: Reconciler,
    history: AnnotationHistory,
    first_index: Option<usize>,
}

impl SlidingReconciler {
    pub fn new(reconciler: Reconciler) -> Self {
        Self {
            reconciler,
            history: AnnotationHistory::new(),
            first_index: None,
        }
    }

    /// Adds the next frame and returns the frame `window` positions behind it,
    /// reconciled. Frames must arrive in index order. Nothing is returned for
    /// indices before the first frame pushed.
    pub fn push(&mut self, frame: IndexedFrame) -> Option<IndexedFrame> {
        let window = self.reconciler.window();
        let newest = frame.index;
        let first = *self.first_index.get_or_insert(newest);
        self.history.insert(newest, frame.frame);

        let target = newest.checked_sub(window).filter(|target| *target >= first)?;
        let reconciled = reconcile_isolated(target, || {
            self.reconciler.reconcile_frame(&self.history, target)
        });
        self.history.evict_before((target + 1).saturating_sub(window));

        Some(IndexedFrame::new(target, reconciled))
    }

    pub fn buffered(&self) -> usize {
        self.history.len()
    }
}

pub struct FrameReconciler {
    id: String,
    sliding: SlidingReconciler,
}

impl FrameReconciler {
    pub fn new(reconciler: Reconciler) -> Self {
        Self {
            id: "FrameReconciler".to_string(),
            sliding: SlidingReconciler::new(reconciler),
        }
    }
}

impl Processor for FrameReconciler {
    type INPUT = ReadChannel1<IndexedFrame>;
    type OUTPUT = WriteChannel1<IndexedFrame>;
    fn handle(
        &mut self,
        mut input: <Self::INPUT as InputGenerator>::INPUT,
        mut output: ProcessorWriter<Self::OUTPUT>,
    ) -> Result<(), RustedPipeError> {
        let Some(packet) = input.c1_owned() else {
            return Ok(());
        };
        debug!("Reconciler received frame {}", packet.data.index);

        if let Some(reconciled) = self.sliding.push(packet.data) {
            output
                .writer
                .c1()
                .write(reconciled, &packet.version)
                .expect("Cannot write to output buffer");
        }
        Ok(())
    }

    fn id(&self) -> &String {
        return &self.id;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::recovery::RecoveryParams;
    use super::super::validator::RegexPlateFormat;
    use super::super::{BoundingBox, FrameAnnotations, PlateRecord, VehicleCategory, VehicleRecord};
    use super::*;

    fn reconciler(window: usize) -> Reconciler {
        Reconciler::with_format(
            RecoveryParams {
                window,
                min_occurrences: 2,
                max_edit_distance: 2,
            },
            false,
            Arc::new(RegexPlateFormat::italian()),
        )
    }

    fn frame_with(text: Option<&str>) -> FrameAnnotations {
        let mut car = VehicleRecord::new(BoundingBox::new(0.0, 0.0, 200.0, 100.0), VehicleCategory::Car);
        if let Some(text) = text {
            car.plates.push(PlateRecord {
                bounding_box: BoundingBox::new(80.0, 80.0, 40.0, 10.0),
                plate_text: Some(text.to_string()),
                valid_plate: true,
            });
        }
        FrameAnnotations { cars: vec![car] }
    }

    #[test]
    fn test_emits_with_window_delay() {
        let mut sliding = SlidingReconciler::new(reconciler(2));

        assert!(sliding.push(IndexedFrame::new(0, frame_with(None))).is_none());
        assert!(sliding.push(IndexedFrame::new(1, frame_with(None))).is_none());
        let out = sliding.push(IndexedFrame::new(2, frame_with(None))).unwrap();
        assert_eq!(out.index, 0);
        let out = sliding.push(IndexedFrame::new(3, frame_with(None))).unwrap();
        assert_eq!(out.index, 1);
    }

    #[test]
    fn test_stream_starting_late_emits_only_received_frames() {
        let mut sliding = SlidingReconciler::new(reconciler(2));
        let emitted: Vec<usize> = (100..=104)
            .filter_map(|i| sliding.push(IndexedFrame::new(i, frame_with(Some("AA123BB")))))
            .map(|out| out.index)
            .collect();

        assert_eq!(emitted, vec![100, 101, 102]);
    }

    #[test]
    fn test_buffer_stays_bounded() {
        let mut sliding = SlidingReconciler::new(reconciler(3));
        for i in 0..50 {
            sliding.push(IndexedFrame::new(i, frame_with(Some("AA123BB"))));
            assert!(sliding.buffered() <= 2 * 3 + 1);
        }
    }

    #[test]
    fn test_recovers_frame_missing_its_plate() {
        let mut sliding = SlidingReconciler::new(reconciler(2));
        let mut emitted = vec![];
        for i in 0..7 {
            let text = if i == 3 { None } else { Some("AA123BB") };
            if let Some(out) = sliding.push(IndexedFrame::new(i, frame_with(text))) {
                emitted.push(out);
            }
        }

        let recovered = emitted.iter().find(|f| f.index == 3).unwrap();
        assert_eq!(
            recovered.frame.cars[0].plates[0].plate_text.as_deref(),
            Some("AA123BB")
        );
    }
}
