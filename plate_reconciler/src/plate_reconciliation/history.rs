use std::collections::BTreeMap;

use super::validator::PlateFormat;
use super::FrameAnnotations;

static EMPTY_FRAME: FrameAnnotations = FrameAnnotations { cars: Vec::new() };

/// Frame-index keyed annotations.
///
/// Frames never inserted read as empty, so a window reaching past the ends of
/// the sequence, or over a frame the detectors never produced, sees no plates.
#[derive(Debug, Clone, Default)]
pub struct AnnotationHistory {
    frames: BTreeMap<usize, FrameAnnotations>,
}

impl AnnotationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: usize, frame: FrameAnnotations) {
        self.frames.insert(index, frame);
    }

    pub fn frame(&self, index: usize) -> &FrameAnnotations {
        self.frames.get(&index).unwrap_or(&EMPTY_FRAME)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.frames.contains_key(&index)
    }

    pub fn first_index(&self) -> Option<usize> {
        self.frames.keys().next().copied()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.frames.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Drops every frame with an index lower than `index`.
    pub fn evict_before(&mut self, index: usize) {
        self.frames = self.frames.split_off(&index);
    }

    /// Re-derives plate validity with `format`, discarding upstream flags.
    pub fn revalidate(&mut self, format: &dyn PlateFormat) {
        for frame in self.frames.values_mut() {
            for car in frame.cars.iter_mut() {
                for plate in car.plates.iter_mut() {
                    plate.revalidate(format);
                }
            }
        }
    }
}

impl FromIterator<(usize, FrameAnnotations)> for AnnotationHistory {
    fn from_iter<T: IntoIterator<Item = (usize, FrameAnnotations)>>(iter: T) -> Self {
        Self {
            frames: iter.into_iter().collect(),
        }
    }
}
