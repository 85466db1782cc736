use lazy_static::lazy_static;
use prometheus::{register_int_counter, Encoder, IntCounter, TextEncoder};

use super::recovery::RecoveryReport;

lazy_static! {
    pub static ref FRAMES_RECONCILED: IntCounter = register_int_counter!(
        "plate_reconciler_frames_reconciled_total",
        "Frames that went through reconciliation"
    )
    .unwrap();
    pub static ref FRAMES_MISSING: IntCounter = register_int_counter!(
        "plate_reconciler_frames_missing_total",
        "Frames without upstream annotations, read as empty"
    )
    .unwrap();
    pub static ref PLATES_CORRECTED: IntCounter = register_int_counter!(
        "plate_reconciler_plates_corrected_total",
        "Plates whose text was replaced by a code seen around the frame"
    )
    .unwrap();
    pub static ref PLATES_SYNTHESIZED: IntCounter = register_int_counter!(
        "plate_reconciler_plates_synthesized_total",
        "Plates added from neighbouring sightings"
    )
    .unwrap();
    pub static ref INVALID_PLATES_DROPPED: IntCounter = register_int_counter!(
        "plate_reconciler_invalid_plates_dropped_total",
        "Plates removed for failing the format check"
    )
    .unwrap();
    pub static ref DUPLICATES_REMOVED: IntCounter = register_int_counter!(
        "plate_reconciler_duplicates_removed_total",
        "Colliding plates removed within a frame"
    )
    .unwrap();
    pub static ref PLATES_UNASSIGNED: IntCounter = register_int_counter!(
        "plate_reconciler_plates_unassigned_total",
        "Plates left without a vehicle"
    )
    .unwrap();
}

pub fn record_recovery(report: &RecoveryReport) {
    PLATES_CORRECTED.inc_by(report.corrected as u64);
    PLATES_SYNTHESIZED.inc_by(report.synthesized as u64);
}

/// Default registry in the text exposition format.
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::warn!("Cannot encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
