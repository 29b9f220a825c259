//! Per-step lane model snapshot

use nalgebra::RealField;
use num_traits::Float;

use super::motion::MotionData;
use super::observation::DirectLaneSensor;
use super::transition::{CubicLaneTransition, TransitionModel};
use crate::filters::kalman::LinearModel;
use crate::filters::lane::EstimatorConfig;
use crate::types::lane::{LANE_CONTROL_DIM, LANE_MEASUREMENT_DIM, LANE_STATE_DIM};
use crate::types::spaces::ControlInput;
use crate::Result;

/// Matrices of the lane filter for one set of motion data.
///
/// Rebuilt by the estimator whenever the motion data changes; between rebuilds
/// it is read-only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneModel<T: RealField> {
    motion: MotionData<T>,
    linear: LinearModel<T, LANE_STATE_DIM, LANE_CONTROL_DIM, LANE_MEASUREMENT_DIM>,
    input: ControlInput<T, LANE_CONTROL_DIM>,
}

impl<T: RealField + Float + Copy> LaneModel<T> {
    /// Builds `A`, `B`, `u`, `Q`, `H` and `R` for `motion`.
    ///
    /// # Errors
    /// [`crate::LaneKfError::InvalidMotion`] or
    /// [`crate::LaneKfError::InvalidConfig`] from the underlying models.
    pub fn build(motion: &MotionData<T>, config: &EstimatorConfig<T>) -> Result<Self> {
        let transition = CubicLaneTransition::new(*motion, config.process_noise, config.min_speed)?;
        let sensor = DirectLaneSensor::new(config.measurement_noise)?;

        Ok(Self {
            motion: *motion,
            linear: LinearModel::from_models(&transition, &sensor),
            input: transition.control_input(),
        })
    }

    #[inline]
    pub fn motion(&self) -> &MotionData<T> {
        &self.motion
    }

    #[inline]
    pub fn linear(&self) -> &LinearModel<T, LANE_STATE_DIM, LANE_CONTROL_DIM, LANE_MEASUREMENT_DIM> {
        &self.linear
    }

    #[inline]
    pub fn input(&self) -> &ControlInput<T, LANE_CONTROL_DIM> {
        &self.input
    }

    /// Distance the polynomial reference point advances per step.
    #[inline]
    pub fn look_ahead_distance(&self) -> T {
        self.motion.look_ahead_distance()
    }
}
