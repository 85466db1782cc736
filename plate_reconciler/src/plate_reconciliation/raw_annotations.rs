use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::annotation_io::frame_stem;
use super::validator::PlateFormat;
use super::{BoundingBox, FrameAnnotations, PlateRecord, VehicleCategory, VehicleRecord};
use crate::error::{ReconcileError, Result};

/// One detection line: normalised centre and size relative to its reference box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativeBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl RelativeBox {
    /// Absolute box inside the `(origin_x, origin_y, width, height)` reference.
    pub fn to_absolute(&self, origin_x: f64, origin_y: f64, width: f64, height: f64) -> BoundingBox {
        let w = self.w * width;
        let h = self.h * height;
        BoundingBox::new(
            self.x * width - w / 2.0 + origin_x,
            self.y * height - h / 2.0 + origin_y,
            w,
            h,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarLine {
    pub rel: RelativeBox,
    pub category: VehicleCategory,
}

fn parse_box(fields: &[&str], path: &Path, line: usize) -> Result<RelativeBox> {
    let mut values = [0.0f64; 4];
    for (value, field) in values.iter_mut().zip(&fields[1..5]) {
        *value = field.parse().map_err(|_| ReconcileError::MalformedRawLine {
            path: path.to_path_buf(),
            line,
            reason: format!("'{}' is not a number", field),
        })?;
    }
    Ok(RelativeBox {
        x: values[0],
        y: values[1],
        w: values[2],
        h: values[3],
    })
}

fn split_fields<'a>(text: &'a str, expected: usize, path: &Path, line: usize) -> Result<Vec<&'a str>> {
    let fields: Vec<&str> = text.split_whitespace().collect();
    if fields.len() < expected {
        return Err(ReconcileError::MalformedRawLine {
            path: path.to_path_buf(),
            line,
            reason: format!("expected {} fields, found {}", expected, fields.len()),
        });
    }
    Ok(fields)
}

/// `class x y w h category`
pub fn parse_car_line(text: &str, path: &Path, line: usize) -> Result<CarLine> {
    let fields = split_fields(text, 6, path, line)?;
    Ok(CarLine {
        rel: parse_box(&fields, path, line)?,
        category: fields[5].parse()?,
    })
}

/// `class x y w h`
pub fn parse_plate_line(text: &str, path: &Path, line: usize) -> Result<RelativeBox> {
    let fields = split_fields(text, 5, path, line)?;
    parse_box(&fields, path, line)
}

/// Detections are numbered by their rank among the non-blank lines.
/// Yields the 1-based line number along with each line.
fn non_blank_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(i, text)| (i + 1, text))
}

/// Content of `path`, `None` when it does not exist.
fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ReconcileError::io(path, e)),
    }
}

/// Builds frame annotations from the text files left by the vehicle detector,
/// the plate detector and the OCR for each frame.
pub struct RawAnnotationSource {
    aux_dir: PathBuf,
    image_width: f64,
    image_height: f64,
}

impl RawAnnotationSource {
    pub fn new(aux_dir: impl Into<PathBuf>, image_width: u32, image_height: u32) -> Self {
        Self {
            aux_dir: aux_dir.into(),
            image_width: image_width as f64,
            image_height: image_height as f64,
        }
    }

    pub fn cars_path(&self, index: usize) -> PathBuf {
        self.aux_dir.join(format!("{}_cars.txt", frame_stem(index)))
    }

    pub fn plates_path(&self, index: usize, car_id: usize) -> PathBuf {
        self.aux_dir
            .join(format!("{}_car_{}_lp.txt", frame_stem(index), car_id))
    }

    pub fn ocr_path(&self, index: usize, car_id: usize, plate_id: usize) -> PathBuf {
        self.aux_dir.join(format!(
            "{}_car_{}_{}_lp_str.txt",
            frame_stem(index),
            car_id,
            plate_id
        ))
    }

    /// Frame `index` with absolute boxes and plate validity from `format`.
    ///
    /// A frame without a cars file is empty. Malformed lines are skipped.
    pub fn assemble_frame(&self, index: usize, format: &dyn PlateFormat) -> Result<FrameAnnotations> {
        let path = self.cars_path(index);
        let Some(content) = read_optional(&path)? else {
            warn!("Frame {}: no vehicle detections at {}", index, path.display());
            return Ok(FrameAnnotations::default());
        };

        let mut frame = FrameAnnotations::default();
        for (car_id, (line_no, text)) in non_blank_lines(&content).enumerate() {
            let line = match parse_car_line(text, &path, line_no) {
                Ok(line) => line,
                Err(e) => {
                    warn!("Skipping vehicle: {}", e);
                    continue;
                }
            };

            let car_box = line
                .rel
                .to_absolute(0.0, 0.0, self.image_width, self.image_height);
            let mut car = VehicleRecord::new(car_box, line.category);
            car.plates = self.assemble_plates(index, car_id, &car_box, format)?;
            frame.cars.push(car);
        }

        debug!("Frame {}: assembled {} vehicles", index, frame.cars.len());
        Ok(frame)
    }

    fn assemble_plates(
        &self,
        index: usize,
        car_id: usize,
        car_box: &BoundingBox,
        format: &dyn PlateFormat,
    ) -> Result<Vec<PlateRecord>> {
        let path = self.plates_path(index, car_id);
        let Some(content) = read_optional(&path)? else {
            return Ok(vec![]);
        };

        let mut plates = vec![];
        for (plate_id, (line_no, text)) in non_blank_lines(&content).enumerate() {
            let rel = match parse_plate_line(text, &path, line_no) {
                Ok(rel) => rel,
                Err(e) => {
                    warn!("Skipping plate: {}", e);
                    continue;
                }
            };

            let bounding_box = rel.to_absolute(car_box.x, car_box.y, car_box.w, car_box.h);
            let plate_text = read_optional(&self.ocr_path(index, car_id, plate_id))?
                .map(|text| text.trim().to_string());
            plates.push(PlateRecord::new(bounding_box, plate_text, format));
        }
        Ok(plates)
    }
}
