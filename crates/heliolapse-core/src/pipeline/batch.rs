//! Batch histogram matching of a whole directory onto one reference.

use std::path::{Path, PathBuf};

use ndarray::Array2;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::{HelioError, Result};
use crate::filters::histogram::{levels_u16, match_histogram};
use crate::filters::normalize::normalize;
use crate::frame::{QuantizedFrame, RawFrame, RawSamples};
use crate::io::listing::aligned_output_path;
use crate::io::{FrameCodec, FrameFormat};

/// Outcome of matching one file.
#[derive(Clone, Debug)]
pub struct MatchedFrame {
    pub input: PathBuf,
    /// Written file, or the reason matching failed.
    pub output: std::result::Result<PathBuf, String>,
}

/// Match the histogram of every file in `inputs` to `reference` and write
/// the results (same name and container) into `output_dir`.
///
/// Integer samples are read as 16-bit levels without rescaling; float
/// samples are normalized to the full 16-bit range first. Results keep the
/// order of `inputs`; a failing file does not stop the others.
pub fn match_sequence(
    reference: &Path,
    inputs: &[PathBuf],
    output_dir: &Path,
    codec: &dyn FrameCodec,
) -> Result<Vec<MatchedFrame>> {
    let reference_levels = read_levels(reference, codec).map_err(|e| HelioError::Reference {
        path: reference.to_path_buf(),
        source: Box::new(e),
    })?;
    std::fs::create_dir_all(output_dir)?;

    let results: Vec<MatchedFrame> = inputs
        .par_iter()
        .map(|input| {
            let output = match_one(input, &reference_levels, output_dir, codec)
                .map_err(|e| {
                    warn!(file = %input.display(), reason = %e, "Histogram match failed");
                    e.to_string()
                });
            MatchedFrame {
                input: input.clone(),
                output,
            }
        })
        .collect();

    info!(
        matched = results.iter().filter(|r| r.output.is_ok()).count(),
        total = results.len(),
        "Histogram matching finished"
    );
    Ok(results)
}

fn read_levels(path: &Path, codec: &dyn FrameCodec) -> Result<Array2<u16>> {
    let format = FrameFormat::from_path(path)
        .ok_or_else(|| HelioError::UnsupportedFormat(path.display().to_string()))?;
    levels_of(&codec.decode(path, format)?)
}

/// 16-bit levels of a decoded frame.
///
/// Integer samples are taken as levels. Float samples carry no level scale
/// of their own, so they are normalized and spread over the 16-bit range.
fn levels_of(raw: &RawFrame) -> Result<Array2<u16>> {
    match raw.samples {
        RawSamples::Integer(_) => Ok(raw.to_quantized().data),
        RawSamples::Float(_) => Ok(levels_u16(&normalize(raw)?.data)),
    }
}

fn match_one(
    input: &Path,
    reference: &Array2<u16>,
    output_dir: &Path,
    codec: &dyn FrameCodec,
) -> Result<PathBuf> {
    let format = FrameFormat::from_path(input)
        .ok_or_else(|| HelioError::UnsupportedFormat(input.display().to_string()))?;
    let source = levels_of(&codec.decode(input, format)?)?;
    let matched = QuantizedFrame::new(match_histogram(&source, reference));

    let extension = crate::io::listing::extension_or(input, "png");
    let output = aligned_output_path(output_dir, input, &extension);
    codec.encode(&output, format, &matched)?;
    Ok(output)
}
