//! Linear Kalman filter core
//!
//! A fixed-dimension discrete-time Kalman filter with a control input. The core
//! owns its model matrices and the current estimate and transforms them in
//! place; it has no knowledge of lanes.
//!
//! # Type Safety
//!
//! Dimensions are const generics (`N` state, `U` control, `M` measurement), so
//! a model whose matrices disagree does not compile. Heap matrices of unknown
//! shape go through [`LinearKalmanCore::from_dynamic`], which checks them.
//!
//! # Example
//!
//! ```
//! use lanekf::filters::kalman::{KalmanState, LinearKalmanCore, LinearModel};
//! use lanekf::types::spaces::{
//!     ControlInput, Measurement, MeasurementCovariance, StateCovariance, StateVector,
//! };
//! use lanekf::types::transforms::{ControlMatrix, ObservationMatrix, TransitionMatrix};
//!
//! // Position/velocity driven by an acceleration input; position is measured.
//! let dt = 0.1;
//! let model = LinearModel {
//!     transition: TransitionMatrix::from_matrix(nalgebra::matrix![1.0, dt; 0.0, 1.0]),
//!     control: ControlMatrix::from_matrix(nalgebra::matrix![0.5 * dt * dt; dt]),
//!     observation: ObservationMatrix::from_matrix(nalgebra::matrix![1.0, 0.0]),
//!     process_noise: StateCovariance::from_variances([1e-4, 1e-3]),
//!     measurement_noise: MeasurementCovariance::from_variances([0.05]),
//! };
//! let state = KalmanState::new(StateVector::from_array([0.0, 1.0]), StateCovariance::identity());
//! let mut core = LinearKalmanCore::new(model, state, ControlInput::from_array([0.0]));
//!
//! core.predict();
//! core.update(&Measurement::from_array([0.12]))?;
//! assert!(core.state().uncertainty() < 2.0);
//! # Ok::<(), lanekf::LaneKfError>(())
//! ```

use nalgebra::RealField;
use num_traits::Float;
use tracing::trace;

#[cfg(feature = "std")]
use nalgebra::{DMatrix, DVector, SMatrix, SVector};

use crate::models::{ObservationModel, TransitionModel};
use crate::types::spaces::{
    ComputeInnovation, ControlInput, Innovation, Measurement, MeasurementCovariance,
    StateCovariance, StateVector,
};
use crate::types::transforms::{
    compute_innovation_covariance, compute_kalman_gain, joseph_covariance_update,
    standard_covariance_update, ControlMatrix, ObservationMatrix, TransitionMatrix,
};
use crate::utils::covariance::{is_positive_semidefinite, symmetrize, symmetry_error};
use crate::{LaneKfError, Result};

// ============================================================================
// Kalman Filter State
// ============================================================================

/// Mean and covariance of a state estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KalmanState<T: RealField, const N: usize> {
    /// State estimate mean
    pub mean: StateVector<T, N>,
    /// State estimate covariance
    pub covariance: StateCovariance<T, N>,
}

impl<T: RealField + Copy, const N: usize> KalmanState<T, N> {
    #[inline]
    pub fn new(mean: StateVector<T, N>, covariance: StateCovariance<T, N>) -> Self {
        Self { mean, covariance }
    }

    /// Creates a state with a diagonal covariance.
    #[inline]
    pub fn with_variances(mean: StateVector<T, N>, variances: [T; N]) -> Self {
        Self {
            mean,
            covariance: StateCovariance::from_variances(variances),
        }
    }

    /// Builds a state from a flat mean and a row-major covariance buffer.
    pub fn try_from_slices(mean: &[T], covariance: &[T]) -> Result<Self> {
        let mean = StateVector::try_from_slice(mean).map_err(|err| match err {
            LaneKfError::DimensionMismatch {
                expected, actual, ..
            } => LaneKfError::DimensionMismatch {
                operand: "state mean",
                expected,
                actual,
            },
            other => other,
        })?;
        let covariance = StateCovariance::try_from_row_major(covariance)?;
        Ok(Self { mean, covariance })
    }

    /// Trace of the covariance (sum of variances).
    #[inline]
    pub fn uncertainty(&self) -> T {
        self.covariance.trace()
    }

    /// True when the covariance is symmetric and PSD within `tolerance`.
    pub fn is_consistent(&self, tolerance: T) -> bool {
        symmetry_error(&self.covariance) <= tolerance
            && is_positive_semidefinite(&self.covariance, tolerance)
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Form of the covariance correction applied by [`LinearKalmanCore::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CovarianceUpdate {
    /// `P = (I - K*H) * P`
    #[default]
    Standard,
    /// `P = (I - K*H) * P * (I - K*H)^T + K * R * K^T`
    Joseph,
}

/// Numerical settings of the core.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CoreConfig<T> {
    /// Smallest accepted Jacobi-scaled Cholesky pivot of the innovation
    /// covariance. Updates below it fail as singular.
    pub inversion_tolerance: T,
    /// Covariance correction form
    pub covariance_update: CovarianceUpdate,
    /// Replace `P` by `(P + P^T) / 2` after every operation
    pub symmetrize: bool,
}

impl<T: RealField + Copy> Default for CoreConfig<T> {
    fn default() -> Self {
        Self {
            inversion_tolerance: nalgebra::convert(1e-12),
            covariance_update: CovarianceUpdate::Standard,
            symmetrize: false,
        }
    }
}

impl<T: RealField + Float + Copy> CoreConfig<T> {
    pub fn validate(&self) -> Result<()> {
        if !Float::is_finite(self.inversion_tolerance) || self.inversion_tolerance < T::zero() {
            return Err(LaneKfError::InvalidConfig {
                parameter: "inversion_tolerance",
                reason: "must be finite and non-negative",
            });
        }
        Ok(())
    }
}

// ============================================================================
// Linear Model
// ============================================================================

/// The matrices of one linear-Gaussian system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearModel<T: RealField, const N: usize, const U: usize, const M: usize> {
    /// State transition `A`
    pub transition: TransitionMatrix<T, N>,
    /// Control matrix `B`
    pub control: ControlMatrix<T, N, U>,
    /// Observation matrix `H`
    pub observation: ObservationMatrix<T, M, N>,
    /// Process noise `Q`
    pub process_noise: StateCovariance<T, N>,
    /// Measurement noise `R`
    pub measurement_noise: MeasurementCovariance<T, M>,
}

impl<T: RealField + Copy, const N: usize, const U: usize, const M: usize> LinearModel<T, N, U, M> {
    /// Collects the matrices of a transition model and an observation model.
    pub fn from_models<Trans, Obs>(transition: &Trans, observation: &Obs) -> Self
    where
        Trans: TransitionModel<T, N, U>,
        Obs: ObservationModel<T, N, M>,
    {
        Self {
            transition: transition.transition_matrix(),
            control: transition.control_matrix(),
            observation: observation.observation_matrix(),
            process_noise: transition.process_noise(),
            measurement_noise: observation.measurement_noise(),
        }
    }
}

// ============================================================================
// Linear Kalman Core
// ============================================================================

/// Linear Kalman filter holding its model, control input and estimate.
///
/// # Type Parameters
///
/// - `T`: scalar type
/// - `N`: state dimension
/// - `U`: control dimension
/// - `M`: measurement dimension
///
/// Every operation is all-or-nothing: a failed [`update`](Self::update)
/// leaves the estimate exactly as it was.
#[derive(Debug, Clone)]
pub struct LinearKalmanCore<T: RealField, const N: usize, const U: usize, const M: usize> {
    model: LinearModel<T, N, U, M>,
    input: ControlInput<T, U>,
    state: KalmanState<T, N>,
    config: CoreConfig<T>,
}

impl<T, const N: usize, const U: usize, const M: usize> LinearKalmanCore<T, N, U, M>
where
    T: RealField + Float + Copy,
{
    pub fn new(model: LinearModel<T, N, U, M>, state: KalmanState<T, N>, input: ControlInput<T, U>) -> Self {
        Self {
            model,
            input,
            state,
            config: CoreConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CoreConfig<T>) -> Self {
        self.config = config;
        self
    }

    /// Builds a core from heap matrices, checking every shape.
    ///
    /// # Errors
    /// [`LaneKfError::DimensionMismatch`] naming the first operand whose shape
    /// differs from `A: NxN, B: NxU, H: MxN, P: NxN, Q: NxN, R: MxM, x: N, u: U`.
    #[cfg(feature = "std")]
    #[allow(clippy::too_many_arguments)]
    pub fn from_dynamic(
        a: &DMatrix<T>,
        b: &DMatrix<T>,
        h: &DMatrix<T>,
        p: &DMatrix<T>,
        q: &DMatrix<T>,
        r: &DMatrix<T>,
        x: &DVector<T>,
        u: &DVector<T>,
    ) -> Result<Self> {
        let model: LinearModel<T, N, U, M> = LinearModel {
            transition: TransitionMatrix::from_matrix(fixed_matrix("A", a)?),
            control: ControlMatrix::from_matrix(fixed_matrix("B", b)?),
            observation: ObservationMatrix::from_matrix(fixed_matrix("H", h)?),
            process_noise: StateCovariance::from_matrix(fixed_matrix("Q", q)?),
            measurement_noise: MeasurementCovariance::from_matrix(fixed_matrix("R", r)?),
        };
        let state: KalmanState<T, N> = KalmanState::new(
            StateVector::from_svector(fixed_vector("x", x)?),
            StateCovariance::from_matrix(fixed_matrix("P", p)?),
        );
        let input: ControlInput<T, U> = ControlInput::from_svector(fixed_vector("u", u)?);

        Ok(Self::new(model, state, input))
    }

    #[inline]
    pub fn state(&self) -> &KalmanState<T, N> {
        &self.state
    }

    #[inline]
    pub fn model(&self) -> &LinearModel<T, N, U, M> {
        &self.model
    }

    #[inline]
    pub fn input(&self) -> &ControlInput<T, U> {
        &self.input
    }

    #[inline]
    pub fn config(&self) -> &CoreConfig<T> {
        &self.config
    }

    /// Replaces the estimate.
    #[inline]
    pub fn reseed(&mut self, state: KalmanState<T, N>) {
        self.state = state;
    }

    /// Replaces the model matrices and the control input together.
    #[inline]
    pub fn set_model(&mut self, model: LinearModel<T, N, U, M>, input: ControlInput<T, U>) {
        self.model = model;
        self.input = input;
    }

    /// Prediction step.
    ///
    /// - x = A * x + B * u
    /// - P = A * P * A^T + Q
    pub fn predict(&mut self) {
        let model = &self.model;
        let mean = model.transition.apply_state(&self.state.mean)
            + model.control.apply_control(&self.input);
        let covariance = model
            .transition
            .propagate_covariance(&self.state.covariance)
            .add(&model.process_noise);

        self.state = KalmanState::new(mean, self.finish(covariance));
        trace!(
            uncertainty = ?self.state.uncertainty(),
            asymmetry = ?symmetry_error(&self.state.covariance),
            "kalman predict"
        );
    }

    /// Innovation `y = z - H * x` and its covariance `S = H * P * H^T + R`.
    pub fn innovation(
        &self,
        measurement: &Measurement<T, M>,
    ) -> (Innovation<T, M>, MeasurementCovariance<T, M>) {
        let predicted = self.model.observation.observe(&self.state.mean);
        let innovation = (*measurement).innovation(predicted);
        let innovation_cov = compute_innovation_covariance(
            &self.state.covariance,
            &self.model.observation,
            &self.model.measurement_noise,
        );
        (innovation, innovation_cov)
    }

    /// Update step.
    ///
    /// - K = P * H^T * S^{-1}
    /// - x = x + K * y
    /// - P = (I - K * H) * P, or the Joseph form if configured
    ///
    /// # Errors
    /// [`LaneKfError::SingularInnovation`] if `S` cannot be inverted within the
    /// configured tolerance. The estimate is left unchanged.
    pub fn update(&mut self, measurement: &Measurement<T, M>) -> Result<()> {
        let (innovation, innovation_cov) = self.innovation(measurement);
        let gain = compute_kalman_gain(
            &self.state.covariance,
            &self.model.observation,
            &innovation_cov,
            self.config.inversion_tolerance,
        )?;

        let mean = self.state.mean + gain.correct(&innovation);
        let covariance = match self.config.covariance_update {
            CovarianceUpdate::Standard => {
                standard_covariance_update(&self.state.covariance, &gain, &self.model.observation)
            }
            CovarianceUpdate::Joseph => joseph_covariance_update(
                &self.state.covariance,
                &gain,
                &self.model.observation,
                &self.model.measurement_noise,
            ),
        };

        self.state = KalmanState::new(mean, self.finish(covariance));
        trace!(
            uncertainty = ?self.state.uncertainty(),
            innovation_norm = ?innovation.norm(),
            "kalman update"
        );
        Ok(())
    }

    /// Nonlinear measurement update. The linear core never implements it.
    pub fn update_extended(&mut self, _measurement: &Measurement<T, M>) -> Result<()> {
        Err(LaneKfError::Unsupported("extended Kalman update"))
    }

    fn finish(&self, covariance: StateCovariance<T, N>) -> StateCovariance<T, N> {
        if self.config.symmetrize {
            symmetrize(&covariance)
        } else {
            covariance
        }
    }
}

#[cfg(feature = "std")]
fn fixed_matrix<T: RealField + Copy, const R: usize, const C: usize>(
    operand: &'static str,
    matrix: &DMatrix<T>,
) -> Result<SMatrix<T, R, C>> {
    if matrix.shape() != (R, C) {
        return Err(LaneKfError::DimensionMismatch {
            operand,
            expected: (R, C),
            actual: matrix.shape(),
        });
    }
    Ok(SMatrix::from_iterator(matrix.iter().copied()))
}

#[cfg(feature = "std")]
fn fixed_vector<T: RealField + Copy, const R: usize>(
    operand: &'static str,
    vector: &DVector<T>,
) -> Result<SVector<T, R>> {
    if vector.len() != R {
        return Err(LaneKfError::DimensionMismatch {
            operand,
            expected: (R, 1),
            actual: (vector.len(), 1),
        });
    }
    Ok(SVector::from_iterator(vector.iter().copied()))
}

// ============================================================================
// Tests
// ============================================================================
