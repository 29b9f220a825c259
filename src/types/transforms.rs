//! Typed transformation matrices
//!
//! Matrices carry the space they map from and the space they map to, so
//! `A`, `B`, `H` and `K` can only be applied to the vectors they were built for.

use ::core::cmp::Ordering;
use ::core::marker::PhantomData;
use nalgebra::{RealField, SMatrix, Scalar};

use super::spaces::{
    ControlInput, ControlSpace, Innovation, InnovationSpace, Measurement, MeasurementCovariance,
    MeasurementSpace, StateCovariance, StateSpace, StateVector,
};
use crate::{LaneKfError, Result};

// ============================================================================
// Transform Matrix
// ============================================================================

/// A `ROWS x COLS` matrix mapping vectors in `From` to vectors in `To`.
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq)]
pub struct Transform<T: Scalar, const ROWS: usize, const COLS: usize, To, From> {
    inner: SMatrix<T, ROWS, COLS>,
    _marker: PhantomData<(To, From)>,
}

impl<T: Scalar, const ROWS: usize, const COLS: usize, To, From> Transform<T, ROWS, COLS, To, From> {
    #[inline]
    pub fn from_matrix(inner: SMatrix<T, ROWS, COLS>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn as_matrix(&self) -> &SMatrix<T, ROWS, COLS> {
        &self.inner
    }

    #[inline]
    pub fn into_matrix(self) -> SMatrix<T, ROWS, COLS> {
        self.inner
    }
}

impl<T: Scalar + Copy, const ROWS: usize, const COLS: usize, To: Clone, From: Clone> Copy
    for Transform<T, ROWS, COLS, To, From>
where
    SMatrix<T, ROWS, COLS>: Copy,
{
}

impl<T: RealField + Copy, const ROWS: usize, const COLS: usize, To, From>
    Transform<T, ROWS, COLS, To, From>
{
    /// Ones on the main diagonal, zeros elsewhere (also for non-square shapes).
    #[inline]
    pub fn identity() -> Self {
        Self::from_matrix(SMatrix::identity())
    }

    #[inline]
    pub fn zeros() -> Self {
        Self::from_matrix(SMatrix::zeros())
    }

    /// The transpose maps `To` back to `From`.
    #[inline]
    pub fn transpose(&self) -> Transform<T, COLS, ROWS, From, To> {
        Transform::from_matrix(self.inner.transpose())
    }
}

// ============================================================================
// Type Aliases
// ============================================================================

/// State transition matrix `A`: state -> state.
pub type TransitionMatrix<T, const N: usize> = Transform<T, N, N, StateSpace, StateSpace>;

/// Control matrix `B`: control -> state.
pub type ControlMatrix<T, const N: usize, const U: usize> =
    Transform<T, N, U, StateSpace, ControlSpace>;

/// Observation matrix `H`: state -> measurement.
pub type ObservationMatrix<T, const M: usize, const N: usize> =
    Transform<T, M, N, MeasurementSpace, StateSpace>;

/// Kalman gain `K`: innovation -> state.
pub type KalmanGain<T, const N: usize, const M: usize> =
    Transform<T, N, M, StateSpace, InnovationSpace>;

// ============================================================================
// Applications
// ============================================================================

impl<T: RealField + Copy, const N: usize> TransitionMatrix<T, N> {
    /// `A * x`
    #[inline]
    pub fn apply_state(&self, state: &StateVector<T, N>) -> StateVector<T, N> {
        StateVector::from_svector(self.inner * state.as_svector())
    }

    /// `A * P * A^T`
    #[inline]
    pub fn propagate_covariance(&self, cov: &StateCovariance<T, N>) -> StateCovariance<T, N> {
        StateCovariance::from_matrix(self.inner * cov.as_matrix() * self.inner.transpose())
    }
}

impl<T: RealField + Copy, const N: usize, const U: usize> ControlMatrix<T, N, U> {
    /// `B * u`
    #[inline]
    pub fn apply_control(&self, input: &ControlInput<T, U>) -> StateVector<T, N> {
        StateVector::from_svector(self.inner * input.as_svector())
    }
}

impl<T: RealField + Copy, const M: usize, const N: usize> ObservationMatrix<T, M, N> {
    /// `H * x`
    #[inline]
    pub fn observe(&self, state: &StateVector<T, N>) -> Measurement<T, M> {
        Measurement::from_svector(self.inner * state.as_svector())
    }

    /// `H * P * H^T`
    #[inline]
    pub fn project_covariance(&self, cov: &StateCovariance<T, N>) -> MeasurementCovariance<T, M> {
        MeasurementCovariance::from_matrix(self.inner * cov.as_matrix() * self.inner.transpose())
    }
}

impl<T: RealField + Copy, const N: usize, const M: usize> KalmanGain<T, N, M> {
    /// `K * y`
    #[inline]
    pub fn correct(&self, innovation: &Innovation<T, M>) -> StateVector<T, N> {
        StateVector::from_svector(self.inner * innovation.as_svector())
    }
}

// ============================================================================
// Update Kernels
// ============================================================================

/// Innovation covariance `S = H * P * H^T + R`.
pub fn compute_innovation_covariance<T: RealField + Copy, const N: usize, const M: usize>(
    state_cov: &StateCovariance<T, N>,
    obs_matrix: &ObservationMatrix<T, M, N>,
    meas_noise: &MeasurementCovariance<T, M>,
) -> MeasurementCovariance<T, M> {
    let h_p_ht = obs_matrix.project_covariance(state_cov);
    MeasurementCovariance::from_matrix(h_p_ht.as_matrix() + meas_noise.as_matrix())
}

/// Smallest Jacobi-scaled Cholesky pivot of `S`, `min_i L_ii^2 / S_ii`.
///
/// Each term is the fraction of a component's variance not explained by the
/// components before it, so the measure lies in `(0, 1]` and ignores the
/// units of the individual components. `None` when `S` is not positive
/// definite.
pub fn pivot_ratio<T: RealField + Copy, const M: usize>(
    innovation_cov: &MeasurementCovariance<T, M>,
) -> Option<T> {
    let s = innovation_cov.as_matrix();
    let chol = nalgebra::Cholesky::new(*s)?;
    let pivots = chol.l().diagonal();

    let mut ratio = T::one();
    for i in 0..M {
        if s[(i, i)] <= T::zero() {
            return None;
        }
        let scaled = pivots[i] * pivots[i] / s[(i, i)];
        match scaled.partial_cmp(&ratio) {
            Some(Ordering::Less) => ratio = scaled,
            Some(_) => {}
            None => return None,
        }
    }
    Some(ratio)
}

/// Kalman gain `K = P * H^T * S^{-1}`.
///
/// Fails with [`LaneKfError::SingularInnovation`] when `S` is not positive
/// definite, when its [`pivot_ratio`] falls below `tolerance`, or when the
/// inversion itself fails.
pub fn compute_kalman_gain<T: RealField + Copy, const N: usize, const M: usize>(
    state_cov: &StateCovariance<T, N>,
    obs_matrix: &ObservationMatrix<T, M, N>,
    innovation_cov: &MeasurementCovariance<T, M>,
    tolerance: T,
) -> Result<KalmanGain<T, N, M>> {
    let ratio = pivot_ratio(innovation_cov).ok_or(LaneKfError::SingularInnovation)?;
    // NaN pivots compare as None
    match ratio.partial_cmp(&tolerance) {
        Some(Ordering::Less) | None => return Err(LaneKfError::SingularInnovation),
        _ => {}
    }

    let s_inv = innovation_cov
        .as_matrix()
        .try_inverse()
        .ok_or(LaneKfError::SingularInnovation)?;

    let k = state_cov.as_matrix() * obs_matrix.as_matrix().transpose() * s_inv;
    Ok(KalmanGain::from_matrix(k))
}

/// Standard covariance update `P = (I - K*H) * P`.
pub fn standard_covariance_update<T: RealField + Copy, const N: usize, const M: usize>(
    state_cov: &StateCovariance<T, N>,
    kalman_gain: &KalmanGain<T, N, M>,
    obs_matrix: &ObservationMatrix<T, M, N>,
) -> StateCovariance<T, N> {
    let i: SMatrix<T, N, N> = SMatrix::identity();
    let i_kh = i - kalman_gain.as_matrix() * obs_matrix.as_matrix();

    StateCovariance::from_matrix(i_kh * state_cov.as_matrix())
}

/// Joseph-form covariance update
/// `P = (I - K*H) * P * (I - K*H)^T + K * R * K^T`.
///
/// Symmetric by construction and positive semi-definite for any gain.
pub fn joseph_covariance_update<T: RealField + Copy, const N: usize, const M: usize>(
    state_cov: &StateCovariance<T, N>,
    kalman_gain: &KalmanGain<T, N, M>,
    obs_matrix: &ObservationMatrix<T, M, N>,
    meas_noise: &MeasurementCovariance<T, M>,
) -> StateCovariance<T, N> {
    let i: SMatrix<T, N, N> = SMatrix::identity();
    let k = kalman_gain.as_matrix();
    let i_kh = i - k * obs_matrix.as_matrix();

    let propagated = i_kh * state_cov.as_matrix() * i_kh.transpose();
    let injected = k * meas_noise.as_matrix() * k.transpose();

    StateCovariance::from_matrix(propagated + injected)
}
