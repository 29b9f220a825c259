//! Common helpers for lane estimator integration tests

#![cfg(feature = "std")]
#![allow(dead_code)]

use lanekf::filters::lane::{LaneMeasurement, LaneParameterEstimator, LaneState};
use lanekf::types::spaces::{Measurement, StateVector};
use lanekf::utils::covariance::symmetry_error;

pub const SPEED: f64 = 3.6;
pub const LOOK_FORWARD_TIME: f64 = 0.5;

/// Lane at (1.8, 0.1, 0.001, 1e-6) with `P = 0.001 * I`.
pub fn initial_lane() -> LaneState<f64> {
    LaneState::with_variances(StateVector::from_array([1.8, 0.1, 0.001, 1e-6]), [0.001; 4])
}

/// Measurement `i` of a lane drifting away at 0.3 m per step.
pub fn drifting_measurement(i: usize) -> LaneMeasurement<f64> {
    let i = i as f64;
    Measurement::from_array([1.95 + 0.3 * i, 0.13 + 0.01 * i, 0.006 + 0.001 * i, 1e-6])
}

/// Estimator with default tuning, driving straight at 3.6 m/s.
pub fn straight_estimator() -> LaneParameterEstimator<f64> {
    let mut estimator = LaneParameterEstimator::new();
    estimator
        .set_motion_data(SPEED, LOOK_FORWARD_TIME, 0.0)
        .expect("valid motion");
    estimator
}

/// Asserts `P` is symmetric and positive semi-definite, relative to its scale.
pub fn assert_covariance_healthy(lane: &LaneState<f64>, context: &str) {
    let p = lane.covariance.as_matrix();
    let scale = p.amax().max(1.0);

    let asymmetry = symmetry_error(&lane.covariance);
    assert!(
        asymmetry < 1e-9 * scale,
        "{}: asymmetry {} exceeds tolerance",
        context,
        asymmetry
    );

    let sym = (p + p.transpose()) * 0.5;
    let min_eigen = sym.symmetric_eigenvalues().min();
    assert!(
        min_eigen >= -1e-9 * scale,
        "{}: negative eigenvalue {}",
        context,
        min_eigen
    );
}
