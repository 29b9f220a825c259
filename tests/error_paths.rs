//! Integration tests for rejected inputs and numerical failures

#![cfg(feature = "std")]

mod common;

use common::{drifting_measurement, initial_lane, straight_estimator, LOOK_FORWARD_TIME, SPEED};
use lanekf::prelude::*;
use nalgebra::{DMatrix, DVector};

#[test]
fn test_zero_speed_rejected_before_any_build() {
    let mut estimator = LaneParameterEstimator::<f64>::new();
    let err = estimator.set_motion_data(0.0, LOOK_FORWARD_TIME, 0.0).unwrap_err();
    assert!(matches!(err, LaneKfError::InvalidMotion { parameter: "speed", .. }));

    let mut lane = initial_lane();
    assert_eq!(estimator.predict(&mut lane), Err(LaneKfError::MotionNotSet));
    assert_eq!(estimator.phase(), EstimatorPhase::Uninitialized);
    assert_eq!(lane, initial_lane());
}

#[test]
fn test_zero_speed_after_valid_motion_keeps_model() {
    let mut estimator = straight_estimator();
    let mut lane = initial_lane();
    estimator.predict(&mut lane).unwrap();

    assert!(estimator.set_motion_data(0.0, LOOK_FORWARD_TIME, 0.0).is_err());
    estimator.predict(&mut lane).unwrap();
    assert!((estimator.model().unwrap().motion().speed - SPEED).abs() < 1e-12);
}

#[test]
fn test_singular_update_leaves_caller_state() {
    let config = EstimatorConfig::default()
        .with_process_noise([0.0; 4])
        .with_measurement_noise([0.0; 4]);
    let mut estimator = LaneParameterEstimator::with_config(config).unwrap();
    estimator.set_motion_data(SPEED, LOOK_FORWARD_TIME, 0.0).unwrap();

    let mut lane = LaneState::new(
        StateVector::from_array([1.8, 0.1, 0.001, 1e-6]),
        StateCovariance::zeros(),
    );
    let before = lane;

    assert_eq!(
        estimator.update(&mut lane, drifting_measurement(0)),
        Err(LaneKfError::SingularInnovation)
    );
    assert_eq!(lane, before);

    // Dead reckoning still works.
    estimator.predict(&mut lane).unwrap();
    assert_ne!(lane.mean, before.mean);
}

#[test]
fn test_extended_update_unsupported() {
    let mut core: LaneCore<f64> = LinearKalmanCore::new(
        *LaneModel::build(&MotionData::new(SPEED, LOOK_FORWARD_TIME, 0.0), &EstimatorConfig::default())
            .unwrap()
            .linear(),
        initial_lane(),
        ControlInput::zeros(),
    );

    let err = core.update_extended(&drifting_measurement(0)).unwrap_err();
    assert_eq!(err, LaneKfError::Unsupported("extended Kalman update"));
    assert_eq!(*core.state(), initial_lane());
}

#[test]
fn test_dimension_mismatches_reported() {
    let mut estimator = straight_estimator();
    assert!(matches!(
        estimator.set_measurement_slice(&[1.0; 5]),
        Err(LaneKfError::DimensionMismatch { operand: "measurement", actual: (5, 1), .. })
    ));

    assert!(matches!(
        LaneState::<f64>::try_from_slices(&[1.8, 0.1, 0.0, 0.0], &[0.001; 15]),
        Err(LaneKfError::DimensionMismatch { operand: "covariance", .. })
    ));

    let a = DMatrix::<f64>::identity(4, 4);
    let b = DMatrix::<f64>::zeros(4, 1);
    let h = DMatrix::<f64>::identity(4, 4);
    let p = DMatrix::<f64>::identity(4, 4);
    let q = DMatrix::<f64>::identity(4, 4);
    let r = DMatrix::<f64>::identity(3, 3);
    let x = DVector::<f64>::zeros(4);
    let u = DVector::<f64>::zeros(1);

    let err = LaneCore::<f64>::from_dynamic(&a, &b, &h, &p, &q, &r, &x, &u).unwrap_err();
    assert_eq!(
        err,
        LaneKfError::DimensionMismatch {
            operand: "R",
            expected: (4, 4),
            actual: (3, 3),
        }
    );
}

#[test]
fn test_invalid_config_rejected() {
    let config = EstimatorConfig::default().with_process_noise([0.001, -0.001, 0.001, 0.001]);
    assert!(matches!(
        LaneParameterEstimator::<f64>::with_config(config),
        Err(LaneKfError::InvalidConfig { parameter: "process_noise", .. })
    ));

    let core = CoreConfig {
        inversion_tolerance: f64::NAN,
        ..CoreConfig::default()
    };
    assert!(LaneParameterEstimator::<f64>::with_config(EstimatorConfig::default().with_core(core)).is_err());
}
