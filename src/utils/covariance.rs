//! Covariance health checks

use nalgebra::{Cholesky, RealField, SMatrix};

use crate::types::spaces::Covariance;

/// Largest absolute difference between `P` and `P^T`.
pub fn symmetry_error<T: RealField + Copy, const N: usize, S>(cov: &Covariance<T, N, S>) -> T {
    let m = cov.as_matrix();
    (m - m.transpose()).amax()
}

/// `(P + P^T) / 2`
pub fn symmetrize<T: RealField + Copy, const N: usize, S>(
    cov: &Covariance<T, N, S>,
) -> Covariance<T, N, S> {
    let m = cov.as_matrix();
    let half: T = nalgebra::convert(0.5);
    Covariance::from_matrix((m + m.transpose()) * half)
}

/// Checks positive semi-definiteness up to `tolerance`.
///
/// The symmetric part of `P`, shifted by `tolerance * I`, must admit a
/// Cholesky factorization. A zero tolerance rejects singular matrices.
pub fn is_positive_semidefinite<T: RealField + Copy, const N: usize, S>(
    cov: &Covariance<T, N, S>,
    tolerance: T,
) -> bool {
    let shifted = symmetrize(cov).into_matrix() + SMatrix::<T, N, N>::identity() * tolerance;
    Cholesky::new(shifted).is_some()
}
