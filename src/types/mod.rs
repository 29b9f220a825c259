//! Core types for typed vector spaces, transformations and lane coefficients

pub mod lane;
pub mod phase;
pub mod spaces;
pub mod transforms;
