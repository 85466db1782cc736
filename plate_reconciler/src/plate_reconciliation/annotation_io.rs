use std::fs;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use tracing::warn;

use super::history::AnnotationHistory;
use super::metrics::FRAMES_MISSING;
use super::validator::PlateFormat;
use super::FrameAnnotations;
use crate::error::{ReconcileError, Result};

lazy_static! {
    static ref RAW_ANNOTATIONS_NAME: Regex =
        Regex::new(r"^frame(\d{5})_annotations\.json$").unwrap();
}

pub fn frame_stem(index: usize) -> String {
    format!("frame{:05}", index)
}

pub fn raw_annotations_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("{}_annotations.json", frame_stem(index)))
}

pub fn reconciled_annotations_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("{}_annotations_unique.json", frame_stem(index)))
}

pub fn read_frame(path: &Path) -> Result<FrameAnnotations> {
    let file = File::open(path).map_err(|e| ReconcileError::io(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| ReconcileError::json(path, e))
}

pub fn write_frame(path: &Path, frame: &FrameAnnotations) -> Result<()> {
    let file = File::create(path).map_err(|e| ReconcileError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    frame
        .serialize(&mut serializer)
        .map_err(|e| ReconcileError::json(path, e))?;
    writer.flush().map_err(|e| ReconcileError::io(path, e))
}

/// Sorted indices of the raw annotation files found in `dir`.
pub fn discover_frames(dir: &Path) -> Result<Vec<usize>> {
    let entries = fs::read_dir(dir).map_err(|e| ReconcileError::io(dir, e))?;
    let mut frames: Vec<usize> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name();
            let caps = RAW_ANNOTATIONS_NAME.captures(name.to_str()?)?;
            caps[1].parse().ok()
        })
        .collect();
    frames.sort_unstable();
    Ok(frames)
}

fn read_upstream_frame(dir: &Path, index: usize) -> Option<FrameAnnotations> {
    let path = raw_annotations_path(dir, index);
    match read_frame(&path) {
        Ok(frame) => Some(frame),
        Err(e) => {
            warn!("Frame {} read as empty: {}", index, e);
            FRAMES_MISSING.inc();
            None
        }
    }
}

/// Reads the frame at `index`, empty when the file is missing or unreadable.
pub fn read_frame_or_empty(dir: &Path, index: usize) -> FrameAnnotations {
    read_upstream_frame(dir, index).unwrap_or_default()
}

/// Loads `frames` from `dir` and re-derives plate validity with `format`.
///
/// Returns the history and the indices that had to be read as empty.
pub fn load_history(
    dir: &Path,
    frames: impl IntoIterator<Item = usize>,
    format: &dyn PlateFormat,
) -> (AnnotationHistory, Vec<usize>) {
    let mut history = AnnotationHistory::new();
    let mut missing = vec![];
    for index in frames {
        let frame = read_upstream_frame(dir, index).unwrap_or_else(|| {
            missing.push(index);
            FrameAnnotations::default()
        });
        history.insert(index, frame);
    }
    history.revalidate(format);
    (history, missing)
}
