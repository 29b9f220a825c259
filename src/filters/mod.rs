//! Filters
//!
//! - [`kalman::LinearKalmanCore`]: fixed-dimension linear Kalman filter with a
//!   control input
//! - [`lane::LaneParameterEstimator`]: per-step lane workflow on top of the core
//! - [`observer`]: hook receiving every completed step

pub mod kalman;
pub mod lane;
pub mod observer;
