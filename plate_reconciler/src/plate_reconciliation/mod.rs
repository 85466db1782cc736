pub mod annotation_io;
pub mod annotation_reader;
pub mod annotation_writer;
pub mod association;
pub mod dedup;
pub mod frame_reconciler;
pub mod geometry;
pub mod history;
pub mod metrics;
pub mod raw_annotations;
pub mod reconciler;
pub mod recovery;
pub mod similarity;
pub mod validator;

use serde::{Deserialize, Serialize};

use validator::PlateFormat;

/// Axis aligned box in absolute frame pixels, `(x, y)` being the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        return Self { x, y, w, h };
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from(v: [f64; 4]) -> Self {
        BoundingBox::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x, b.y, b.w, b.h]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateRecord {
    pub bounding_box: BoundingBox,
    pub plate_text: Option<String>,
    #[serde(default)]
    pub valid_plate: bool,
}

impl PlateRecord {
    /// Creates a record whose validity is derived from `format`.
    pub fn new(bounding_box: BoundingBox, plate_text: Option<String>, format: &dyn PlateFormat) -> Self {
        let mut plate = Self {
            bounding_box,
            plate_text,
            valid_plate: false,
        };
        plate.revalidate(format);
        plate
    }

    pub fn revalidate(&mut self, format: &dyn PlateFormat) {
        self.valid_plate = self
            .plate_text
            .as_deref()
            .map_or(false, |text| format.is_valid(text));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleCategory {
    Car,
    Bus,
    Truck,
}

impl std::str::FromStr for VehicleCategory {
    type Err = crate::error::ReconcileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "car" => Ok(VehicleCategory::Car),
            "bus" => Ok(VehicleCategory::Bus),
            "truck" => Ok(VehicleCategory::Truck),
            other => Err(crate::error::ReconcileError::UnknownCategory(
                other.to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleRecord {
    pub bounding_box: BoundingBox,
    pub category: VehicleCategory,
    #[serde(default)]
    pub plates: Vec<PlateRecord>,
}

impl VehicleRecord {
    pub fn new(bounding_box: BoundingBox, category: VehicleCategory) -> Self {
        return Self {
            bounding_box,
            category,
            plates: vec![],
        };
    }
}

/// Everything detected in one frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameAnnotations {
    #[serde(default)]
    pub cars: Vec<VehicleRecord>,
}

impl FrameAnnotations {
    pub fn plates(&self) -> impl Iterator<Item = &PlateRecord> {
        self.cars.iter().flat_map(|car| car.plates.iter())
    }
}

/// A frame travelling through the streaming graph together with its index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndexedFrame {
    pub index: usize,
    pub frame: FrameAnnotations,
}

impl IndexedFrame {
    pub fn new(index: usize, frame: FrameAnnotations) -> Self {
        return Self { index, frame };
    }
}
