//! Lane Boundary Stream Replay
//!
//! Drives a `LaneParameterEstimator` through two scenarios:
//!
//! - the ten-frame drifting-lane replay with a detection on every frame
//! - a noisy curved lane where every third frame has no detection
//!
//! Run with `RUST_LOG=lanekf=debug` to see model rebuilds and rejected updates.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lanekf::prelude::*;

// ============================================================================
// Scenario Parameters
// ============================================================================

const SPEED: f64 = 3.6;
const LOOK_FORWARD_TIME: f64 = 0.5;

const NUM_FRAMES: usize = 60;
const OFFSET_NOISE_STD: f64 = 0.15;
const HEADING_NOISE_STD: f64 = 0.01;

fn initial_lane() -> LaneState<f64> {
    LaneState::with_variances(StateVector::from_array([1.8, 0.1, 0.001, 1e-6]), [0.001; 4])
}

/// Ten frames of a lane drifting away at 0.3 m per frame.
fn replay_drifting_lane() -> Result<()> {
    let mut estimator = LaneParameterEstimator::<f64>::new().with_observer(|event: &StepEvent<'_, f64>| {
        let lane = LaneCoefficients::from(event.state.mean);
        println!(
            "  step {:2} {:?}  c0={:8.5} c1={:8.5} c2={:8.5} trace(P)={:.6}",
            event.step,
            event.phase,
            lane.c0,
            lane.c1,
            lane.c2,
            event.state.uncertainty()
        );
    });
    estimator.set_motion_data(SPEED, LOOK_FORWARD_TIME, 0.0)?;

    println!("Drifting lane replay");
    let mut lane = initial_lane();
    for i in 0..10 {
        let i = i as f64;
        estimator.set_measurement_slice(&[1.95 + 0.3 * i, 0.13 + 0.01 * i, 0.006 + 0.001 * i, 1e-6])?;
        estimator.estimate_lane_line_param(&mut lane, true)?;
    }

    info!(c0 = *lane.mean.index(0), "replay finished");
    Ok(())
}

/// A gently curving lane observed with noise and periodic dropouts.
fn track_noisy_curve(rng: &mut StdRng) -> Result<()> {
    let offset_noise = Normal::new(0.0, OFFSET_NOISE_STD).expect("valid std");
    let heading_noise = Normal::new(0.0, HEADING_NOISE_STD).expect("valid std");

    let config = EstimatorConfig::default().with_measurement_noise([
        OFFSET_NOISE_STD * OFFSET_NOISE_STD,
        HEADING_NOISE_STD * HEADING_NOISE_STD,
        1e-4,
        1e-6,
    ]);
    let mut estimator = LaneParameterEstimator::with_config(config)?;

    let mut truth = LaneCoefficients::new(1.6, 0.0, 0.002, 0.0);
    let mut lane = initial_lane();
    let mut squared_error = 0.0;

    println!("\nNoisy curve, detection dropped every third frame");
    for frame in 0..NUM_FRAMES {
        let speed = SPEED + rng.random_range(-0.5..0.5);
        estimator.set_motion_data(speed, LOOK_FORWARD_TIME, 0.0)?;
        truth = truth.shifted(speed * LOOK_FORWARD_TIME);

        if frame % 3 == 2 {
            estimator.clear_measurement();
        } else {
            estimator.set_measurement_data(Some(Measurement::from_array([
                truth.c0 + offset_noise.sample(rng),
                truth.c1 + heading_noise.sample(rng),
                truth.c2,
                truth.c3,
            ])));
        }

        match estimator.estimate_lane_line_param(&mut lane, true) {
            Ok(phase) => {
                let error = lane.mean.index(0) - truth.c0;
                squared_error += error * error;
                if frame % 10 == 0 {
                    println!(
                        "  frame {:2} {:?}  c0={:7.3} truth={:7.3}",
                        frame,
                        phase,
                        lane.mean.index(0),
                        truth.c0
                    );
                }
            }
            Err(err) => warn!(%err, frame, "frame skipped"),
        }
    }

    let rmse = (squared_error / NUM_FRAMES as f64).sqrt();
    println!("  c0 RMSE over {} frames: {:.4}", NUM_FRAMES, rmse);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    replay_drifting_lane()?;

    let mut rng = StdRng::seed_from_u64(42);
    track_noisy_curve(&mut rng)?;
    Ok(())
}
