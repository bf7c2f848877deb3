pub mod gaussian_blur;
pub mod histogram;
pub mod normalize;
