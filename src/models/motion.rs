//! Vehicle motion driving the lane transition model

use nalgebra::RealField;
use num_traits::Float;

use crate::{LaneKfError, Result};

/// Speed, look-ahead time and yaw rate for one time step.
///
/// The look-ahead distance `dx = speed * look_forward_time` is how far the
/// reference point of the lane polynomial advances between two steps.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionData<T> {
    /// Longitudinal speed. Divides the control matrix, so never zero.
    pub speed: T,
    /// Look-ahead time (>= 0)
    pub look_forward_time: T,
    /// Yaw rate, applied as the control input
    pub yaw_rate: T,
}

impl<T: RealField + Float + Copy> MotionData<T> {
    /// Speed magnitudes below this are treated as standstill.
    pub fn default_min_speed() -> T {
        nalgebra::convert(1e-6)
    }

    pub fn new(speed: T, look_forward_time: T, yaw_rate: T) -> Self {
        Self {
            speed,
            look_forward_time,
            yaw_rate,
        }
    }

    /// Checks the parameters against the domain of the lane model.
    ///
    /// Negative speeds (reversing) are accepted; `|speed| < min_speed` is not.
    pub fn validate(&self, min_speed: T) -> Result<()> {
        if !Float::is_finite(self.speed) {
            return Err(LaneKfError::InvalidMotion {
                parameter: "speed",
                reason: "must be finite",
            });
        }
        if Float::abs(self.speed) < min_speed {
            return Err(LaneKfError::InvalidMotion {
                parameter: "speed",
                reason: "must be non-zero",
            });
        }
        if !Float::is_finite(self.look_forward_time) || self.look_forward_time < T::zero() {
            return Err(LaneKfError::InvalidMotion {
                parameter: "look_forward_time",
                reason: "must be finite and non-negative",
            });
        }
        if !Float::is_finite(self.yaw_rate) {
            return Err(LaneKfError::InvalidMotion {
                parameter: "yaw_rate",
                reason: "must be finite",
            });
        }
        Ok(())
    }

    /// `dx = speed * look_forward_time`
    #[inline]
    pub fn look_ahead_distance(&self) -> T {
        self.speed * self.look_forward_time
    }
}
