pub mod demons;
pub mod pyramid;

pub use demons::{register, Registration};
pub use pyramid::split_iterations;
