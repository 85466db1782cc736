use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::geometry::center;
use super::history::AnnotationHistory;
use super::similarity::edit_distance;
use super::{BoundingBox, PlateRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryParams {
    pub window: usize,
    pub min_occurrences: usize,
    pub max_edit_distance: usize,
}

impl Default for RecoveryParams {
    fn default() -> Self {
        Self {
            window: 5,
            min_occurrences: 3,
            max_edit_distance: 2,
        }
    }
}

/// Where and when a valid plate code was seen on one side of the current frame.
#[derive(Debug, Clone, Default)]
pub struct Occurrences {
    pub seen_frames: BTreeSet<usize>,
    pub boxes: BTreeMap<usize, BoundingBox>,
}

pub type OccurrenceTable = BTreeMap<String, Occurrences>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecoveryReport {
    /// Current plates whose text was replaced by a code seen around the frame.
    pub corrected: usize,
    /// Current plates that kept their own text, now trusted as valid.
    pub confirmed: usize,
    /// Plates added from the motion of their neighbouring sightings.
    pub synthesized: usize,
}

/// Collects the valid plate codes seen in `frames`.
pub fn collect_occurrences(
    history: &AnnotationHistory,
    frames: impl IntoIterator<Item = usize>,
) -> OccurrenceTable {
    let mut table = OccurrenceTable::new();
    for index in frames {
        for plate in history.frame(index).plates() {
            if !plate.valid_plate {
                continue;
            }
            let Some(text) = plate.plate_text.as_ref() else {
                continue;
            };
            let seen = table.entry(text.clone()).or_default();
            seen.seen_frames.insert(index);
            seen.boxes.insert(index, plate.bounding_box);
        }
    }
    table
}

/// Index of the plate closest to `code`, first one on ties.
pub fn most_similar_plate(code: &str, plates: &[PlateRecord], max_distance: usize) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (i, plate) in plates.iter().enumerate() {
        let Some(text) = plate.plate_text.as_deref() else {
            continue;
        };
        let distance = edit_distance(code, text);
        if distance > max_distance {
            continue;
        }
        if best.map_or(true, |(_, min_distance)| distance < min_distance) {
            best = Some((i, distance));
        }
    }
    best.map(|(i, _)| i)
}

fn occurrence_count(code: &str, past: &OccurrenceTable, future: &OccurrenceTable) -> usize {
    past.get(code).map_or(0, |o| o.boxes.len()) + future.get(code).map_or(0, |o| o.boxes.len())
}

/// Text a matched plate should carry once `code` has been seen around the frame.
///
/// An invalid plate always takes `code`. A valid one keeps its own text only
/// when it was seen strictly more often in the window.
pub fn choose_best_alternative(
    current: &PlateRecord,
    code: &str,
    past: &OccurrenceTable,
    future: &OccurrenceTable,
) -> String {
    let old = match (&current.plate_text, current.valid_plate) {
        (Some(old), true) => old,
        _ => return code.to_string(),
    };

    if occurrence_count(old, past, future) > occurrence_count(code, past, future) {
        old.clone()
    } else {
        code.to_string()
    }
}

/// Estimates where a plate missing from `frame_index` should be, from the last
/// sighting before it and the first one after it.
///
/// The top-left corner moves by `(i_past - frame_index)` steps of the per-frame
/// centre velocity; the size is the one of the past sighting.
pub fn synthesize_box(frame_index: usize, past: &Occurrences, future: &Occurrences) -> Option<BoundingBox> {
    let (&i_past, bb_past) = past.boxes.iter().next_back()?;
    let (&i_future, bb_future) = future.boxes.iter().next()?;
    if i_future <= i_past {
        return None;
    }

    let dt = (i_future - i_past) as f64;
    let (xc_past, yc_past) = center(bb_past);
    let (xc_future, yc_future) = center(bb_future);
    let vx = (xc_future - xc_past) / dt;
    let vy = (yc_future - yc_past) / dt;

    let steps = i_past as f64 - frame_index as f64;
    Some(BoundingBox::new(
        bb_past.x + steps * vx,
        bb_past.y + steps * vy,
        bb_past.w,
        bb_past.h,
    ))
}

/// Repairs and completes the plates of `frame_index` using the codes seen both
/// before and after it within `params.window` frames.
pub fn recover(
    history: &AnnotationHistory,
    frame_index: usize,
    plates: &mut Vec<PlateRecord>,
    params: &RecoveryParams,
) -> RecoveryReport {
    let past = collect_occurrences(
        history,
        frame_index.saturating_sub(params.window)..frame_index,
    );
    let future = collect_occurrences(
        history,
        frame_index + 1..=frame_index + params.window,
    );

    let mut report = RecoveryReport::default();

    for (code, seen_past) in past.iter() {
        let Some(seen_future) = future.get(code) else {
            continue;
        };

        if let Some(i) = most_similar_plate(code, plates, params.max_edit_distance) {
            let best = choose_best_alternative(&plates[i], code, &past, &future);
            if plates[i].plate_text.as_deref() == Some(best.as_str()) {
                report.confirmed += 1;
            } else {
                debug!(
                    "Frame {}: plate {:?} corrected to {}",
                    frame_index, plates[i].plate_text, best
                );
                report.corrected += 1;
            }
            plates[i].plate_text = Some(best);
            plates[i].valid_plate = true;
            continue;
        }

        if seen_past.boxes.len() < params.min_occurrences
            || seen_future.boxes.len() < params.min_occurrences
        {
            continue;
        }

        if let Some(bounding_box) = synthesize_box(frame_index, seen_past, seen_future) {
            plates.push(PlateRecord {
                bounding_box,
                plate_text: Some(code.clone()),
                valid_plate: true,
            });
            report.synthesized += 1;
        }
    }

    debug!("Frame {}: recovered {} plates", frame_index, report.synthesized);
    report
}
