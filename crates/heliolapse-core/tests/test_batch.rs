use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ndarray::Array2;

use heliolapse_core::error::{HelioError, Result};
use heliolapse_core::frame::{QuantizedFrame, RawFrame};
use heliolapse_core::io::{FrameCodec, FrameFormat};
use heliolapse_core::pipeline::match_sequence;

/// Codec serving decoded frames from memory and keeping what it encodes.
#[derive(Default)]
struct MemoryCodec {
    frames: HashMap<PathBuf, RawFrame>,
    written: Mutex<HashMap<PathBuf, Array2<u16>>>,
}

impl MemoryCodec {
    fn with(mut self, path: &str, frame: RawFrame) -> Self {
        self.frames.insert(PathBuf::from(path), frame);
        self
    }

    fn written(&self, path: &Path) -> Array2<u16> {
        self.written.lock().unwrap()[path].clone()
    }
}

impl FrameCodec for MemoryCodec {
    fn decode(&self, path: &Path, _format: FrameFormat) -> Result<RawFrame> {
        self.frames
            .get(path)
            .cloned()
            .ok_or_else(|| HelioError::UnsupportedFormat(path.display().to_string()))
    }

    fn encode(&self, path: &Path, _format: FrameFormat, frame: &QuantizedFrame) -> Result<()> {
        self.written
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), frame.data.clone());
        Ok(())
    }
}

/// Strictly increasing 16-bit levels, `step` apart.
fn level_ramp(step: i64) -> Array2<i64> {
    Array2::from_shape_fn((16, 16), |(r, c)| (r * 16 + c) as i64 * step + 500)
}

#[test]
fn test_integer_frames_match_onto_reference() {
    let out = tempfile::tempdir().unwrap();
    let codec = MemoryCodec::default()
        .with("ref.fits", RawFrame::integer(level_ramp(100), 16))
        .with("a.fits", RawFrame::integer(level_ramp(7), 16));

    let results = match_sequence(
        Path::new("ref.fits"),
        &[PathBuf::from("a.fits")],
        out.path(),
        &codec,
    )
    .unwrap();

    let output = results[0].output.as_ref().unwrap();
    assert_eq!(output, &out.path().join("a.fits"));
    let expected = level_ramp(100).mapv(|v| v as u16);
    assert_eq!(codec.written(output), expected);
}

#[test]
fn test_float_frames_are_spread_over_16_bits() {
    let out = tempfile::tempdir().unwrap();
    let unit = level_ramp(1).mapv(|v| (v - 500) as f64 / 255.0);
    let codec = MemoryCodec::default()
        .with("ref.fits", RawFrame::integer(level_ramp(100), 16))
        .with("a.fits", RawFrame::float(unit, 32));

    let results = match_sequence(
        Path::new("ref.fits"),
        &[PathBuf::from("a.fits")],
        out.path(),
        &codec,
    )
    .unwrap();

    let written = codec.written(results[0].output.as_ref().unwrap());
    let expected = level_ramp(100).mapv(|v| v as u16);
    let max_err = written
        .iter()
        .zip(expected.iter())
        .map(|(&a, &b)| (a as i32 - b as i32).abs())
        .max()
        .unwrap();
    assert!(max_err <= 1, "float frame matched with error {max_err}");
}

#[test]
fn test_failing_frame_does_not_stop_others() {
    let out = tempfile::tempdir().unwrap();
    let codec = MemoryCodec::default()
        .with("ref.fits", RawFrame::integer(level_ramp(100), 16))
        .with("b.fits", RawFrame::integer(level_ramp(3), 16));

    let inputs = [PathBuf::from("missing.fits"), PathBuf::from("b.fits")];
    let results = match_sequence(Path::new("ref.fits"), &inputs, out.path(), &codec).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].input, inputs[0]);
    assert!(results[0].output.is_err());
    assert!(results[1].output.is_ok());
}

#[test]
fn test_unreadable_reference_is_fatal() {
    let out = tempfile::tempdir().unwrap();
    let codec = MemoryCodec::default();
    let err = match_sequence(Path::new("ref.fits"), &[], out.path(), &codec).unwrap_err();
    assert!(matches!(err, HelioError::Reference { .. }));
}
