/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Largest 16-bit sample value.
pub const U16_MAX_F32: f32 = 65535.0;

/// Histogram bins used for 16-bit histogram matching.
pub const HISTOGRAM_BINS: usize = 65_536;

/// Default demons iteration budget.
pub const DEFAULT_ITERATIONS: usize = 1200;

/// Default standard deviation (pixels) of the field smoothing kernel.
pub const DEFAULT_STD_DEV: f32 = 4.0;

/// Downsample factors of the registration pyramid, coarsest first.
pub const PYRAMID_FACTORS: [usize; 3] = [4, 2, 1];

/// Share of the iteration budget (percent) spent at each pyramid level,
/// coarsest first. The finest level absorbs the rounding remainder.
pub const PYRAMID_BUDGET_PERCENT: [usize; 3] = [25, 30, 45];

/// Denominator threshold below which a demons update is skipped.
pub const DEMONS_DENOMINATOR_THRESHOLD: f32 = 1e-9;

/// Default frame rate of the assembled timelapse.
pub const DEFAULT_FPS: u32 = 10;

/// Default x264 constant rate factor of the assembled timelapse.
pub const DEFAULT_CRF: u32 = 23;

/// Base name of auto-numbered movie files (`timelapse-1.mp4`, ...).
pub const MOVIE_BASE_NAME: &str = "timelapse";

