use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crossbeam::channel::unbounded;
use tracing::{debug, error};

use super::association::associate;
use super::dedup::dedupe;
use super::history::AnnotationHistory;
use super::metrics;
use super::recovery::{recover, RecoveryParams};
use super::validator::PlateFormat;
use super::{FrameAnnotations, PlateRecord, VehicleRecord};
use crate::config::ReconcileConfig;
use crate::error::Result;

/// Turns the raw detections of a frame into its corrected annotations, using
/// the frames around it as evidence.
pub struct Reconciler {
    params: RecoveryParams,
    keep_invalid: bool,
    format: Arc<dyn PlateFormat>,
}

impl Reconciler {
    pub fn new(config: &ReconcileConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            params: config.recovery_params(),
            keep_invalid: config.keep_invalid,
            format: Arc::new(config.plate_format()?),
        })
    }

    pub fn with_format(params: RecoveryParams, keep_invalid: bool, format: Arc<dyn PlateFormat>) -> Self {
        Self {
            params,
            keep_invalid,
            format,
        }
    }

    pub fn window(&self) -> usize {
        self.params.window
    }

    pub fn format(&self) -> Arc<dyn PlateFormat> {
        self.format.clone()
    }

    /// Recovery, invalid plate filtering, duplicate removal and association
    /// for frame `index`. Only `index - window ..= index + window` is read.
    pub fn reconcile_frame(&self, history: &AnnotationHistory, index: usize) -> FrameAnnotations {
        let current = history.frame(index);

        let mut cars: Vec<VehicleRecord> = current
            .cars
            .iter()
            .map(|car| VehicleRecord::new(car.bounding_box, car.category))
            .collect();
        let mut plates: Vec<PlateRecord> = current.plates().cloned().collect();

        let report = recover(history, index, &mut plates, &self.params);
        metrics::record_recovery(&report);

        if !self.keep_invalid {
            let before = plates.len();
            plates.retain(|p| p.valid_plate);
            metrics::INVALID_PLATES_DROPPED.inc_by((before - plates.len()) as u64);
        }

        let before = plates.len();
        let plates = dedupe(plates);
        metrics::DUPLICATES_REMOVED.inc_by((before - plates.len()) as u64);

        let unassigned = associate(&mut cars, plates);
        metrics::PLATES_UNASSIGNED.inc_by(unassigned as u64);
        metrics::FRAMES_RECONCILED.inc();

        debug!(
            "Frame {}: {} corrected, {} synthesized, {} unassigned",
            index, report.corrected, report.synthesized, unassigned
        );

        FrameAnnotations { cars }
    }

    /// Reconciles `frames` on `workers` threads, handing each result to `sink`
    /// from the worker that produced it.
    ///
    /// A frame whose reconciliation panics is logged and handed over empty; the
    /// other frames are not affected.
    pub fn reconcile_each<F>(
        &self,
        history: &AnnotationHistory,
        frames: impl IntoIterator<Item = usize>,
        workers: usize,
        sink: F,
    ) where
        F: Fn(usize, FrameAnnotations) + Sync,
    {
        run_each(
            frames,
            workers,
            |index| self.reconcile_frame(history, index),
            sink,
        );
    }

    pub fn reconcile_range(
        &self,
        history: &AnnotationHistory,
        frames: impl IntoIterator<Item = usize>,
        workers: usize,
    ) -> BTreeMap<usize, FrameAnnotations> {
        let (result_s, result_r) = unbounded();
        self.reconcile_each(history, frames, workers, |index, frame| {
            let _ = result_s.send((index, frame));
        });
        drop(result_s);
        result_r.iter().collect()
    }
}

/// Runs `reconcile` for frame `index`, an empty frame if it panics.
pub fn reconcile_isolated<R>(index: usize, reconcile: R) -> FrameAnnotations
where
    R: FnOnce() -> FrameAnnotations,
{
    catch_unwind(AssertUnwindSafe(reconcile)).unwrap_or_else(|_| {
        error!("Frame {}: reconciliation failed, emitting empty frame", index);
        FrameAnnotations::default()
    })
}

fn run_each<R, F>(frames: impl IntoIterator<Item = usize>, workers: usize, reconcile: R, sink: F)
where
    R: Fn(usize) -> FrameAnnotations + Sync,
    F: Fn(usize, FrameAnnotations) + Sync,
{
    let (work_s, work_r) = unbounded::<usize>();
    for index in frames {
        if work_s.send(index).is_err() {
            break;
        }
    }
    drop(work_s);

    let reconcile = &reconcile;
    let sink = &sink;
    let scoped = crossbeam::thread::scope(|scope| {
        for _ in 0..workers.max(1) {
            let work_r = work_r.clone();
            scope.spawn(move |_| {
                for index in work_r.iter() {
                    let frame = reconcile_isolated(index, || reconcile(index));
                    sink(index, frame);
                }
            });
        }
    });

    if scoped.is_err() {
        error!("A reconciliation worker terminated abnormally");
    }
}

#[cfg(test)]
mod tests {
    use super::super::validator::RegexPlateFormat;
    use super::super::{BoundingBox, VehicleCategory};
    use super::*;

    fn reconciler(window: usize, keep_invalid: bool) -> Reconciler {
        Reconciler::with_format(
            RecoveryParams {
                window,
                min_occurrences: 2,
                max_edit_distance: 2,
            },
            keep_invalid,
            Arc::new(RegexPlateFormat::italian()),
        )
    }

    fn frame(car_x: f64, plates: Vec<(&str, bool)>) -> FrameAnnotations {
        let mut car = VehicleRecord::new(BoundingBox::new(car_x, 0.0, 200.0, 100.0), VehicleCategory::Car);
        car.plates = plates
            .into_iter()
            .map(|(text, valid)| PlateRecord {
                bounding_box: BoundingBox::new(car_x + 80.0, 80.0, 40.0, 10.0),
                plate_text: Some(text.to_string()),
                valid_plate: valid,
            })
            .collect();
        FrameAnnotations { cars: vec![car] }
    }

    #[test]
    fn test_invalid_plates_dropped_by_default() {
        let history: AnnotationHistory = [(0, frame(0.0, vec![("XX", false)]))].into_iter().collect();

        let out = reconciler(2, false).reconcile_frame(&history, 0);
        assert_eq!(out.cars.len(), 1);
        assert!(out.cars[0].plates.is_empty());

        let out = reconciler(2, true).reconcile_frame(&history, 0);
        assert_eq!(out.cars[0].plates[0].plate_text.as_deref(), Some("XX"));
        assert!(!out.cars[0].plates[0].valid_plate);
    }

    #[test]
    fn test_missing_frame_reconciles_to_empty() {
        let history = AnnotationHistory::new();
        let out = reconciler(2, false).reconcile_frame(&history, 7);
        assert_eq!(out, FrameAnnotations::default());
    }

    #[test]
    fn test_history_is_not_modified() {
        let history: AnnotationHistory = (0..5)
            .map(|i| (i, frame(0.0, vec![("AA123BB", i != 2)])))
            .collect();
        let before = history.frame(2).clone();

        let out = reconciler(2, false).reconcile_frame(&history, 2);

        assert_eq!(history.frame(2), &before);
        assert!(out.cars[0].plates[0].valid_plate);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let history: AnnotationHistory = (0..30)
            .map(|i| {
                let plates = if i % 4 == 0 {
                    vec![]
                } else if i % 3 == 0 {
                    vec![("AA1Z3BB", false)]
                } else {
                    vec![("AA123BB", true)]
                };
                (i, frame(i as f64 * 5.0, plates))
            })
            .collect();
        let reconciler = reconciler(3, false);

        let parallel = reconciler.reconcile_range(&history, 0..30, 4);
        assert_eq!(parallel.len(), 30);
        for (index, frame) in parallel {
            assert_eq!(frame, reconciler.reconcile_frame(&history, index));
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = ReconcileConfig {
            min_occurrences: 0,
            ..Default::default()
        };
        assert!(Reconciler::new(&config).is_err());
        assert_eq!(Reconciler::new(&ReconcileConfig::default()).unwrap().window(), 5);
    }

    #[test]
    fn test_panicking_frame_is_emitted_empty() {
        let (result_s, result_r) = unbounded();
        run_each(
            0..6,
            3,
            |index| {
                if index == 3 {
                    panic!("corrupt frame");
                }
                frame(index as f64, vec![("AA123BB", true)])
            },
            |index, frame| {
                let _ = result_s.send((index, frame));
            },
        );
        drop(result_s);
        let results: BTreeMap<usize, FrameAnnotations> = result_r.iter().collect();

        assert_eq!(results.len(), 6);
        assert_eq!(results[&3], FrameAnnotations::default());
        for index in [0, 1, 2, 4, 5] {
            assert_eq!(results[&index].cars.len(), 1);
        }
    }
}
