//! Lane dynamics and sensor models
//!
//! Traits describing linear dynamics and measurements, the cubic lane
//! implementations of them, and the per-step model snapshot built from them.

mod lane;
mod motion;
mod observation;
mod transition;

pub use lane::*;
pub use motion::*;
pub use observation::*;
pub use transition::*;
