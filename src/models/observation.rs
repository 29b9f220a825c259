//! Observation (sensor) models
//!
//! Describes how perception measurements relate to the lane state.

use nalgebra::RealField;
use num_traits::Float;

use crate::types::lane::{LANE_MEASUREMENT_DIM, LANE_STATE_DIM};
use crate::types::spaces::MeasurementCovariance;
use crate::types::transforms::ObservationMatrix;
use crate::{LaneKfError, Result};

/// Trait for linear observation models.
///
/// Describes the measurement process:
/// z = H * x + v
///
/// where:
/// - H is the observation matrix
/// - v is zero-mean Gaussian measurement noise with covariance R
pub trait ObservationModel<T: RealField, const N: usize, const M: usize> {
    /// Returns the observation matrix `H`.
    fn observation_matrix(&self) -> ObservationMatrix<T, M, N>;

    /// Returns the measurement noise covariance `R`.
    fn measurement_noise(&self) -> MeasurementCovariance<T, M>;
}

/// Lane detector reporting all four coefficients directly.
///
/// `H` is the identity; `R` is diagonal and stationary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectLaneSensor<T: RealField> {
    noise: [T; LANE_MEASUREMENT_DIM],
}

impl<T: RealField + Float + Copy> DirectLaneSensor<T> {
    /// Creates the sensor from per-coefficient noise variances.
    ///
    /// # Errors
    /// [`LaneKfError::InvalidConfig`] if a variance is negative or not finite.
    pub fn new(noise: [T; LANE_MEASUREMENT_DIM]) -> Result<Self> {
        if noise.iter().any(|r| !Float::is_finite(*r) || *r < T::zero()) {
            return Err(LaneKfError::InvalidConfig {
                parameter: "measurement_noise",
                reason: "variances must be finite and non-negative",
            });
        }
        Ok(Self { noise })
    }
}

impl<T: RealField + Float + Copy> ObservationModel<T, LANE_STATE_DIM, LANE_MEASUREMENT_DIM>
    for DirectLaneSensor<T>
{
    fn observation_matrix(&self) -> ObservationMatrix<T, LANE_MEASUREMENT_DIM, LANE_STATE_DIM> {
        ObservationMatrix::identity()
    }

    fn measurement_noise(&self) -> MeasurementCovariance<T, LANE_MEASUREMENT_DIM> {
        MeasurementCovariance::from_variances(self.noise)
    }
}
