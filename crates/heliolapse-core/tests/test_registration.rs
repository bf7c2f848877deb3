mod common;

use ndarray::Array2;

use heliolapse_core::align::resample::resample;
use heliolapse_core::align::rigid::RigidTransform;
use heliolapse_core::align::transform::Transform;
use heliolapse_core::error::HelioError;
use heliolapse_core::pipeline::config::{DemonsForce, RegistrationConfig, RegistrationMode};
use heliolapse_core::pipeline::CancelFlag;
use heliolapse_core::register::{register, split_iterations};

use common::{gaussian_blob, mean_abs_diff, solar_disk};

fn config(mode: RegistrationMode, iterations: usize, std_dev: f32) -> RegistrationConfig {
    RegistrationConfig {
        iterations,
        std_dev,
        mode,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Iteration budget
// ---------------------------------------------------------------------------

#[test]
fn test_default_budget_split() {
    assert_eq!(split_iterations(1200), [300, 360, 540]);
}

#[test]
fn test_budget_split_sums_to_total() {
    for n in [1usize, 2, 3, 7, 10, 99, 100, 101, 1199, 4001] {
        let parts = split_iterations(n);
        assert_eq!(parts.iter().sum::<usize>(), n, "n={n} parts={parts:?}");
        assert_eq!(parts[0], n * 25 / 100);
        assert_eq!(parts[1], n * 30 / 100);
    }
}

// ---------------------------------------------------------------------------
// Demons
// ---------------------------------------------------------------------------

#[test]
fn test_identity_registration_single_resolution() {
    let image = solar_disk(48, 48, 23.5, 23.5, 16.0);
    let cancel = CancelFlag::new();
    let reg = register(
        &image,
        &image,
        &config(RegistrationMode::SingleResolution, 30, 2.0),
        &cancel,
    )
    .unwrap();
    assert_eq!(reg.field.dim(), (48, 48));
    assert!(reg.stats.max < 1e-3, "max={}", reg.stats.max);
}

#[test]
fn test_identity_registration_pyramid() {
    let image = solar_disk(64, 48, 31.5, 23.5, 18.0);
    let cancel = CancelFlag::new();
    let reg = register(
        &image,
        &image,
        &config(RegistrationMode::MultiResolution, 40, 4.0),
        &cancel,
    )
    .unwrap();
    assert_eq!(reg.field.dim(), (64, 48));
    assert!(reg.stats.max < 1e-3, "max={}", reg.stats.max);
    assert!(reg.stats.mean <= reg.stats.max);
}

#[test]
fn test_field_reduces_residual_of_small_shift() {
    let fixed = gaussian_blob(64, 64, 31.5, 31.5, 6.0);
    let moving = gaussian_blob(64, 64, 32.5, 31.0, 6.0);
    let cancel = CancelFlag::new();

    for force in [DemonsForce::Fixed, DemonsForce::Symmetric] {
        let cfg = RegistrationConfig {
            force,
            ..config(RegistrationMode::SingleResolution, 100, 2.0)
        };
        let reg = register(&fixed, &moving, &cfg, &cancel).unwrap();

        let transform =
            Transform::rigid_only(RigidTransform::identity(31.5, 31.5)).with_field(reg.field);
        let warped = resample(&moving, &transform, (64, 64)).unwrap();

        let before = mean_abs_diff(&fixed, &moving);
        let after = mean_abs_diff(&fixed, &warped);
        assert!(
            after < before * 0.5,
            "{force:?}: before={before} after={after}"
        );
        assert!(reg.stats.max > 0.1);
    }
}

#[test]
fn test_pyramid_handles_odd_sizes() {
    let fixed = gaussian_blob(37, 29, 18.0, 14.0, 5.0);
    let moving = gaussian_blob(37, 29, 18.5, 14.5, 5.0);
    let reg = register(
        &fixed,
        &moving,
        &config(RegistrationMode::MultiResolution, 20, 2.0),
        &CancelFlag::new(),
    )
    .unwrap();
    assert_eq!(reg.field.dim(), (37, 29));
    assert!(reg.stats.max.is_finite());
}

#[test]
fn test_pyramid_on_tiny_grid_skips_coarse_levels() {
    let fixed = gaussian_blob(6, 6, 2.5, 2.5, 1.5);
    let reg = register(
        &fixed,
        &fixed,
        &config(RegistrationMode::MultiResolution, 10, 1.0),
        &CancelFlag::new(),
    )
    .unwrap();
    assert_eq!(reg.field.dim(), (6, 6));
}

#[test]
fn test_shape_mismatch_is_rejected() {
    let a = Array2::<f32>::zeros((10, 10));
    let b = Array2::<f32>::zeros((10, 12));
    let err = register(
        &a,
        &b,
        &RegistrationConfig::default(),
        &CancelFlag::new(),
    )
    .unwrap_err();
    assert!(matches!(err, HelioError::ShapeMismatch { .. }));
}

#[test]
fn test_divergence_bound() {
    let fixed = gaussian_blob(32, 32, 15.5, 15.5, 4.0);
    let moving = gaussian_blob(32, 32, 17.5, 15.5, 4.0);
    let cfg = RegistrationConfig {
        max_displacement_fraction: Some(1e-6),
        ..config(RegistrationMode::SingleResolution, 20, 1.0)
    };
    let err = register(&fixed, &moving, &cfg, &CancelFlag::new()).unwrap_err();
    assert!(matches!(err, HelioError::Divergence { .. }));
}

#[test]
fn test_cancelled_registration_stops() {
    let image = gaussian_blob(16, 16, 7.5, 7.5, 3.0);
    let cancel = CancelFlag::new();
    cancel.cancel();
    let err = register(
        &image,
        &image,
        &config(RegistrationMode::SingleResolution, 10, 1.0),
        &cancel,
    )
    .unwrap_err();
    assert!(matches!(err, HelioError::Cancelled));
}
