pub mod align;
pub mod config;
pub mod info;
pub mod movie;
pub mod normalize;
pub mod run;
