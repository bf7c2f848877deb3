pub mod interpolate;
pub mod phase_correlation;
pub mod resample;
pub mod rigid;
pub mod subpixel;
pub mod transform;

pub use interpolate::{bilinear_sample, resize_bilinear};
pub use resample::{quantize_u16, resample, resample_and_quantize};
pub use rigid::{apply_rigid, estimate_rigid, pre_align, RigidTransform};
pub use transform::{DisplacementField, DisplacementStats, Transform};
