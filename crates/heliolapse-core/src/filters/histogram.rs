//! CDF-based histogram matching for 16-bit grids.
//!
//! The source histogram is accumulated into a CDF, then every bin is sent
//! through the inverse CDF of the reference with linear interpolation over
//! bin edges. The resulting lookup table is kept so the same intensity
//! mapping can be applied to other grids (for instance after resampling).

use ndarray::{Array2, Array3, Axis};

use crate::consts::{HISTOGRAM_BINS, U16_MAX_F32};
use crate::error::{HelioError, Result};

/// Lookup table from source level to matched level, one entry per bin.
#[derive(Clone, Debug)]
pub struct HistogramMapping {
    lut: Vec<f32>,
}

impl HistogramMapping {
    /// Mapping that leaves every level unchanged.
    pub fn identity() -> Self {
        Self {
            lut: (0..HISTOGRAM_BINS).map(|b| b as f32).collect(),
        }
    }

    /// Build the mapping that moves `source`'s distribution onto `reference`'s.
    pub fn build(source: &Array2<u16>, reference: &Array2<u16>) -> Self {
        let src_cdf = match cumulative_distribution(source.iter().copied()) {
            Some(c) => c,
            None => return Self::identity(),
        };
        let ref_cdf = match cumulative_distribution(reference.iter().copied()) {
            Some(c) => c,
            None => return Self::identity(),
        };

        let lut = src_cdf.iter().map(|&p| inverse_cdf(&ref_cdf, p)).collect();
        Self { lut }
    }

    /// Matched level of an integer source level.
    pub fn map(&self, level: u16) -> f32 {
        self.lut[level as usize]
    }

    /// Matched level of a normalized `[0, 1]` sample.
    ///
    /// The sample is rounded to its nearest 16-bit level; bins are never
    /// interpolated, since unoccupied bins hold the occupied level below them.
    pub fn map_normalized(&self, value: f32) -> f32 {
        let level = (value * U16_MAX_F32).round().clamp(0.0, U16_MAX_F32) as u16;
        self.map(level)
    }

    /// Apply the mapping to a 16-bit grid, rounding to the nearest level.
    pub fn apply(&self, data: &Array2<u16>) -> Array2<u16> {
        data.mapv(|v| self.map(v).round().clamp(0.0, U16_MAX_F32) as u16)
    }
}

/// Scale a normalized grid to integer 16-bit levels (no stretch).
///
/// This is the level space `HistogramMapping::map_normalized` looks up.
pub fn levels_u16(data: &Array2<f32>) -> Array2<u16> {
    data.mapv(|v| (v * U16_MAX_F32).round().clamp(0.0, U16_MAX_F32) as u16)
}

/// Match the intensity distribution of `source` to `reference`.
pub fn match_histogram(source: &Array2<u16>, reference: &Array2<u16>) -> Array2<u16> {
    HistogramMapping::build(source, reference).apply(source)
}

/// Per-channel histogram matching for `(height, width, channels)` grids.
pub fn match_histogram_channels(
    source: &Array3<u16>,
    reference: &Array3<u16>,
) -> Result<Array3<u16>> {
    let src_channels = source.len_of(Axis(2));
    let ref_channels = reference.len_of(Axis(2));
    if src_channels != ref_channels {
        return Err(HelioError::UnsupportedFormat(format!(
            "channel count mismatch: {} vs {}",
            src_channels, ref_channels
        )));
    }

    let mut matched = source.clone();
    for c in 0..src_channels {
        let src = source.index_axis(Axis(2), c).to_owned();
        let reference = reference.index_axis(Axis(2), c).to_owned();
        let out = match_histogram(&src, &reference);
        matched.index_axis_mut(Axis(2), c).assign(&out);
    }
    Ok(matched)
}

/// Normalized cumulative histogram over all 16-bit levels.
///
/// Returns `None` for an empty grid.
fn cumulative_distribution(values: impl Iterator<Item = u16>) -> Option<Vec<f64>> {
    let mut counts = vec![0u64; HISTOGRAM_BINS];
    for v in values {
        counts[v as usize] += 1;
    }

    let total: u64 = counts.iter().sum();
    if total == 0 {
        return None;
    }

    let mut running = 0u64;
    let cdf = counts
        .iter()
        .map(|&c| {
            running += c;
            running as f64 / total as f64
        })
        .collect();
    Some(cdf)
}

/// Level at which the reference CDF reaches `p`.
///
/// Flat CDF runs resolve to their first bin, so a level present in both
/// distributions maps onto itself exactly.
fn inverse_cdf(cdf: &[f64], p: f64) -> f32 {
    let n = cdf.len();
    let i = cdf.partition_point(|&c| c < p);
    if i == 0 {
        return 0.0;
    }
    if i >= n {
        return (n - 1) as f32;
    }
    if cdf[i] == p {
        return i as f32;
    }

    let lo = i - 1;
    let span = cdf[i] - cdf[lo];
    let frac = (p - cdf[lo]) / span;
    (lo as f64 + frac) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_cdf_interpolates_between_bins() {
        let cdf = [0.0, 0.5, 1.0];
        assert_eq!(inverse_cdf(&cdf, 0.5), 1.0);
        assert!((inverse_cdf(&cdf, 0.75) - 1.5).abs() < 1e-6);
        assert_eq!(inverse_cdf(&cdf, 0.0), 0.0);
    }

    #[test]
    fn inverse_cdf_flat_run_takes_first_bin() {
        let cdf = [0.5, 0.5, 0.5, 1.0];
        assert_eq!(inverse_cdf(&cdf, 0.5), 0.0);
    }
}
