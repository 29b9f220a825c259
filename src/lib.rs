//! lanekf: recursive estimation of cubic lane-boundary models
//!
//! Fuses noisy per-frame lane measurements with vehicle motion to track the
//! coefficients of a cubic lane boundary `(c0, c1, c2, c3)`: lateral offset,
//! heading, curvature and curvature rate.
//!
//! The crate is split in two layers:
//!
//! - [`filters::kalman::LinearKalmanCore`]: a fixed-dimension linear Kalman
//!   filter with a control input. It knows nothing about lanes.
//! - [`filters::lane::LaneParameterEstimator`]: builds the transition, control
//!   and noise matrices from speed, look-ahead time and yaw rate, and sequences
//!   predict/update for every time step, including steps with no measurement.
//!
//! # Features
//!
//! - **Type Safety**: state, measurement, innovation and control vectors live
//!   in distinct types, and all dimensions are const generics
//! - **no_std Support**: disable the default `std` feature for embedded targets
//! - **serde** (optional): serializable motion data and tuning
//!
//! # Example
//!
//! ```
//! use lanekf::prelude::*;
//!
//! let mut estimator = LaneParameterEstimator::<f64>::new();
//! estimator.set_motion_data(3.6, 0.5, 0.0)?;
//!
//! let mut lane = LaneState::new(
//!     StateVector::from_array([1.8, 0.1, 0.001, 1e-6]),
//!     StateCovariance::identity().scale(0.001),
//! );
//!
//! // A frame without a lane detection: dead-reckon.
//! estimator.predict(&mut lane)?;
//!
//! // A frame with a detection: predict, then correct.
//! let z = Measurement::from_array([1.95, 0.13, 0.006, 1e-6]);
//! estimator.predict_and_update(&mut lane, z)?;
//! # Ok::<(), lanekf::LaneKfError>(())
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

pub mod filters;
pub mod models;
pub mod types;
pub mod utils;

pub mod prelude {
    pub use crate::filters::kalman::*;
    pub use crate::filters::lane::*;
    pub use crate::filters::observer::*;
    pub use crate::models::*;
    pub use crate::types::lane::*;
    pub use crate::types::phase::*;
    pub use crate::types::spaces::*;
    pub use crate::types::transforms::*;
    pub use crate::utils::*;
    pub use crate::{LaneKfError, Result};
}

/// Errors reported by the filter core and the lane estimator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LaneKfError {
    /// An operand does not have the shape the model requires.
    ///
    /// Shapes are `(rows, cols)`; flat buffers are reported as columns.
    #[error("dimension mismatch for {operand}: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        operand: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },
    /// Motion parameters outside the domain of the lane model.
    #[error("invalid motion parameter `{parameter}`: {reason}")]
    InvalidMotion {
        parameter: &'static str,
        reason: &'static str,
    },
    /// Estimator or core tuning outside its valid range.
    #[error("invalid configuration `{parameter}`: {reason}")]
    InvalidConfig {
        parameter: &'static str,
        reason: &'static str,
    },
    /// A step was requested before any valid motion data was supplied.
    #[error("motion data has not been set")]
    MotionNotSet,
    /// The innovation covariance is singular or too ill-conditioned to invert.
    #[error("innovation covariance is singular or ill-conditioned")]
    SingularInnovation,
    /// The operation exists in the interface but not in the linear filter.
    #[error("{0} is not supported by the linear filter")]
    Unsupported(&'static str),
}

pub type Result<T> = ::core::result::Result<T, LaneKfError>;
