//! Numerical helpers shared by the filter core and the tests

pub mod covariance;

pub use covariance::*;
