//! Transition (motion) models
//!
//! Describes how the lane state evolves between two steps.

use nalgebra::RealField;
use num_traits::Float;

use super::motion::MotionData;
use crate::types::lane::{LANE_CONTROL_DIM, LANE_STATE_DIM};
use crate::types::spaces::{ControlInput, StateCovariance};
use crate::types::transforms::{ControlMatrix, TransitionMatrix};
use crate::{LaneKfError, Result};

/// Trait for linear transition models with a control input.
///
/// Describes dynamics of the form:
/// x_{k+1} = A * x_k + B * u_k + w
///
/// where:
/// - A is the state transition matrix
/// - B is the control matrix and u the control input
/// - w is zero-mean Gaussian process noise with covariance Q
pub trait TransitionModel<T: RealField, const N: usize, const U: usize> {
    /// Returns the state transition matrix `A`.
    fn transition_matrix(&self) -> TransitionMatrix<T, N>;

    /// Returns the control matrix `B`.
    fn control_matrix(&self) -> ControlMatrix<T, N, U>;

    /// Returns the control input `u` paired with `B`.
    fn control_input(&self) -> ControlInput<T, U>;

    /// Returns the process noise covariance `Q`.
    fn process_noise(&self) -> StateCovariance<T, N>;
}

// ============================================================================
// Cubic Lane Transition
// ============================================================================

/// Re-bases the cubic lane polynomial as the vehicle advances `dx`.
///
/// State: [c0, c1, c2, c3]
///
/// A re-expands the curve around the look-ahead point:
///
/// ```text
/// | 1  dx  dx^2/2  dx^3/6 |
/// | 0  1   dx      dx^2/2 |
/// | 0  0   1       dx     |
/// | 0  0   0       1      |
/// ```
///
/// Yaw rate rotates the vehicle relative to the lane, so B only touches the
/// offset (`-dx^2 / (2 * speed)`) and the heading (`-look_forward_time`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicLaneTransition<T: RealField> {
    motion: MotionData<T>,
    process_noise: [T; LANE_STATE_DIM],
}

impl<T: RealField + Float + Copy> CubicLaneTransition<T> {
    /// Creates the transition for one step.
    ///
    /// # Errors
    /// [`LaneKfError::InvalidMotion`] if the motion fails validation against
    /// `min_speed`, [`LaneKfError::InvalidConfig`] if a process noise variance
    /// is negative or not finite.
    pub fn new(
        motion: MotionData<T>,
        process_noise: [T; LANE_STATE_DIM],
        min_speed: T,
    ) -> Result<Self> {
        motion.validate(min_speed)?;
        if process_noise
            .iter()
            .any(|q| !Float::is_finite(*q) || *q < T::zero())
        {
            return Err(LaneKfError::InvalidConfig {
                parameter: "process_noise",
                reason: "variances must be finite and non-negative",
            });
        }
        Ok(Self {
            motion,
            process_noise,
        })
    }

    pub fn motion(&self) -> &MotionData<T> {
        &self.motion
    }
}

impl<T: RealField + Float + Copy> TransitionModel<T, LANE_STATE_DIM, LANE_CONTROL_DIM>
    for CubicLaneTransition<T>
{
    fn transition_matrix(&self) -> TransitionMatrix<T, LANE_STATE_DIM> {
        let dx = self.motion.look_ahead_distance();
        let dx2 = dx * dx;
        let dx3 = dx2 * dx;
        let half: T = nalgebra::convert(0.5);
        let sixth: T = nalgebra::convert(1.0 / 6.0);
        let one = T::one();
        let zero = T::zero();

        TransitionMatrix::from_matrix(nalgebra::matrix![
            one, dx, dx2 * half, dx3 * sixth;
            zero, one, dx, dx2 * half;
            zero, zero, one, dx;
            zero, zero, zero, one
        ])
    }

    fn control_matrix(&self) -> ControlMatrix<T, LANE_STATE_DIM, LANE_CONTROL_DIM> {
        let dx = self.motion.look_ahead_distance();
        let two: T = nalgebra::convert(2.0);
        let zero = T::zero();

        ControlMatrix::from_matrix(nalgebra::matrix![
            -(dx * dx) / (two * self.motion.speed);
            -self.motion.look_forward_time;
            zero;
            zero
        ])
    }

    fn control_input(&self) -> ControlInput<T, LANE_CONTROL_DIM> {
        ControlInput::from_array([self.motion.yaw_rate])
    }

    fn process_noise(&self) -> StateCovariance<T, LANE_STATE_DIM> {
        StateCovariance::from_variances(self.process_noise)
    }
}
