//! Space-tagged vectors and covariances
//!
//! Lane states, sensor measurements, innovations and yaw-rate inputs all fit
//! in small fixed-size `nalgebra` vectors. A zero-sized marker keeps them
//! apart, so a measurement cannot be added to a state or fed in as a control.

use ::core::marker::PhantomData;
use ::core::ops::{Add, Sub};
use nalgebra::{RealField, SMatrix, SVector, Scalar};

use crate::{LaneKfError, Result};

// ============================================================================
// Vector Space Markers
// ============================================================================

/// Marker for state vectors (lane coefficients).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSpace;

/// Marker for measurement vectors (perception output).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasurementSpace;

/// Marker for innovation vectors (measurement minus predicted measurement).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InnovationSpace;

/// Marker for control inputs (yaw rate).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlSpace;

// ============================================================================
// Typed Vector
// ============================================================================

/// A fixed-size vector tagged with the space it belongs to.
///
/// # Type Parameters
///
/// - `T`: scalar type (`f32` or `f64`)
/// - `N`: dimension
/// - `Space`: one of the marker types above
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq)]
pub struct Vector<T: Scalar, const N: usize, Space> {
    inner: SVector<T, N>,
    _marker: PhantomData<Space>,
}

impl<T: Scalar, const N: usize, Space> Vector<T, N, Space> {
    #[inline]
    pub fn from_array(data: [T; N]) -> Self {
        Self {
            inner: SVector::from(data),
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn from_svector(inner: SVector<T, N>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn as_svector(&self) -> &SVector<T, N> {
        &self.inner
    }

    #[inline]
    pub fn into_svector(self) -> SVector<T, N> {
        self.inner
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.inner.as_slice()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.inner.get(index)
    }

    /// Access element at index.
    ///
    /// # Panics
    /// Panics if index is out of bounds.
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn index(&self, index: usize) -> &T {
        &self.inner[index]
    }

    /// Builds a vector from a flat buffer, rejecting any length other than `N`.
    pub fn try_from_slice(data: &[T]) -> Result<Self> {
        if data.len() != N {
            return Err(LaneKfError::DimensionMismatch {
                operand: "vector",
                expected: (N, 1),
                actual: (data.len(), 1),
            });
        }
        Ok(Self::from_svector(SVector::from_column_slice(data)))
    }
}

impl<T: Scalar + Copy, const N: usize, Space: Clone> Copy for Vector<T, N, Space> {}

impl<T: RealField + Copy, const N: usize, Space> Vector<T, N, Space> {
    #[inline]
    pub fn zeros() -> Self {
        Self {
            inner: SVector::zeros(),
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn norm(&self) -> T {
        self.inner.norm()
    }
}

// ============================================================================
// Type Aliases
// ============================================================================

/// A state vector in state space.
pub type StateVector<T, const N: usize> = Vector<T, N, StateSpace>;

/// A measurement vector in measurement space.
pub type Measurement<T, const M: usize> = Vector<T, M, MeasurementSpace>;

/// A measurement residual.
pub type Innovation<T, const M: usize> = Vector<T, M, InnovationSpace>;

/// A control input vector.
pub type ControlInput<T, const U: usize> = Vector<T, U, ControlSpace>;

// ============================================================================
// Same-Space Arithmetic
// ============================================================================

impl<T: RealField + Copy, const N: usize, Space> Add for Vector<T, N, Space> {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::from_svector(self.inner + rhs.inner)
    }
}

impl<T: RealField + Copy, const N: usize, Space> Sub for Vector<T, N, Space> {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self::from_svector(self.inner - rhs.inner)
    }
}

/// Measurement minus predicted measurement is an innovation, not a measurement.
pub trait ComputeInnovation<T: RealField, const M: usize> {
    fn innovation(self, predicted: Measurement<T, M>) -> Innovation<T, M>;
}

impl<T: RealField + Copy, const M: usize> ComputeInnovation<T, M> for Measurement<T, M> {
    #[inline]
    fn innovation(self, predicted: Measurement<T, M>) -> Innovation<T, M> {
        Innovation::from_svector(self.inner - predicted.inner)
    }
}

// ============================================================================
// Covariance Matrix
// ============================================================================

/// A square covariance matrix bound to a vector space.
///
/// Expected to be symmetric positive semi-definite; see
/// [`crate::utils::covariance`] for checks.
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq)]
pub struct Covariance<T: Scalar, const N: usize, Space> {
    inner: SMatrix<T, N, N>,
    _marker: PhantomData<Space>,
}

impl<T: Scalar, const N: usize, Space> Covariance<T, N, Space> {
    #[inline]
    pub fn from_matrix(inner: SMatrix<T, N, N>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn as_matrix(&self) -> &SMatrix<T, N, N> {
        &self.inner
    }

    #[inline]
    pub fn into_matrix(self) -> SMatrix<T, N, N> {
        self.inner
    }

    /// Builds a covariance from `N * N` values in row-major order.
    pub fn try_from_row_major(data: &[T]) -> Result<Self> {
        if data.len() != N * N {
            return Err(LaneKfError::DimensionMismatch {
                operand: "covariance",
                expected: (N * N, 1),
                actual: (data.len(), 1),
            });
        }
        Ok(Self::from_matrix(SMatrix::from_row_slice(data)))
    }
}

impl<T: Scalar + Copy, const N: usize, Space: Clone> Copy for Covariance<T, N, Space> where
    SMatrix<T, N, N>: Copy
{
}

impl<T: RealField + Copy, const N: usize, Space> Covariance<T, N, Space> {
    #[inline]
    pub fn zeros() -> Self {
        Self::from_matrix(SMatrix::zeros())
    }

    #[inline]
    pub fn identity() -> Self {
        Self::from_matrix(SMatrix::identity())
    }

    #[inline]
    pub fn from_diagonal(diag: &SVector<T, N>) -> Self {
        Self::from_matrix(SMatrix::from_diagonal(diag))
    }

    /// Diagonal covariance from per-component variances.
    #[inline]
    pub fn from_variances(variances: [T; N]) -> Self {
        Self::from_diagonal(&SVector::from(variances))
    }

    #[inline]
    pub fn scale(&self, s: T) -> Self {
        Self::from_matrix(self.inner.scale(s))
    }

    #[inline]
    pub fn add(&self, other: &Self) -> Self {
        Self::from_matrix(self.inner + other.inner)
    }

    /// Sum of variances.
    #[inline]
    pub fn trace(&self) -> T {
        self.inner.trace()
    }

    /// Per-component variances.
    #[inline]
    pub fn variances(&self) -> SVector<T, N> {
        self.inner.diagonal()
    }
}

impl<T: RealField + Copy, const N: usize, Space> Add for Covariance<T, N, Space> {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::from_matrix(self.inner + rhs.inner)
    }
}

/// Covariance matrix in state space.
pub type StateCovariance<T, const N: usize> = Covariance<T, N, StateSpace>;

/// Covariance matrix in measurement space.
///
/// The innovation covariance `S = H*P*H' + R` is also carried in this type.
pub type MeasurementCovariance<T, const M: usize> = Covariance<T, M, MeasurementSpace>;

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn test_state_vector_addition() {
        let v1: StateVector<f64, 4> = StateVector::from_array([1.8, 0.1, 0.001, 1e-6]);
        let v2: StateVector<f64, 4> = StateVector::from_array([0.2, 0.0, 0.0, 0.0]);

        let sum = v1 + v2;
        assert!((sum.index(0) - 2.0).abs() < 1e-12);
        assert!((sum.index(1) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_measurement_to_innovation() {
        let actual: Measurement<f64, 4> = Measurement::from_array([1.95, 0.13, 0.006, 1e-6]);
        let predicted: Measurement<f64, 4> = Measurement::from_array([1.90, 0.10, 0.006, 1e-6]);

        let innovation = actual.innovation(predicted);
        assert!((innovation.index(0) - 0.05).abs() < 1e-12);
        assert!((innovation.index(1) - 0.03).abs() < 1e-12);
        assert!(innovation.index(2).abs() < 1e-15);
    }

    #[test]
    fn test_try_from_slice_checks_length() {
        let ok: Measurement<f64, 4> = Measurement::try_from_slice(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(ok.as_slice(), &[1.0, 2.0, 3.0, 4.0]);

        let err = Measurement::<f64, 4>::try_from_slice(&[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(
            err,
            LaneKfError::DimensionMismatch {
                operand: "vector",
                expected: (4, 1),
                actual: (3, 1),
            }
        );
    }

    #[test]
    fn test_covariance_from_row_major() {
        let cov: StateCovariance<f64, 2> =
            StateCovariance::try_from_row_major(&[1.0, 0.5, 0.5, 2.0]).unwrap();
        assert!((cov.as_matrix()[(0, 1)] - 0.5).abs() < 1e-12);
        assert!((cov.trace() - 3.0).abs() < 1e-12);

        assert!(StateCovariance::<f64, 2>::try_from_row_major(&[1.0, 0.0, 0.0]).is_err());
    }

    #[test]
    fn test_variances() {
        let cov: StateCovariance<f64, 4> = StateCovariance::from_variances([0.1, 0.2, 0.3, 0.4]);
        let v = cov.variances();
        assert!((v[2] - 0.3).abs() < 1e-12);
        assert!((cov.trace() - 1.0).abs() < 1e-12);
    }
}
