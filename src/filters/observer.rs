//! Per-step observation hook
//!
//! The estimator never prints. Drivers that want to plot or record the
//! recursion install a [`StepObserver`]; any `FnMut(&StepEvent<T>)` closure
//! qualifies.

use nalgebra::RealField;

use super::lane::LaneState;
use crate::types::phase::StepPhase;

/// A completed predict or update.
#[derive(Debug, Clone, Copy)]
pub struct StepEvent<'a, T: RealField> {
    /// Number of completed predictions; an update reports the step it corrects.
    pub step: u64,
    pub phase: StepPhase,
    /// Estimate after the step.
    pub state: &'a LaneState<T>,
}

/// Receives every successful step of a lane estimator.
pub trait StepObserver<T: RealField> {
    fn on_step(&mut self, event: &StepEvent<'_, T>);
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoopObserver;

impl<T: RealField> StepObserver<T> for NoopObserver {
    #[inline]
    fn on_step(&mut self, _event: &StepEvent<'_, T>) {}
}

impl<T: RealField, F> StepObserver<T> for F
where
    F: FnMut(&StepEvent<'_, T>),
{
    #[inline]
    fn on_step(&mut self, event: &StepEvent<'_, T>) {
        self(event)
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::types::spaces::{StateCovariance, StateVector};

    #[test]
    fn test_closure_observer_receives_events() {
        let state = LaneState::new(StateVector::from_array([1.0, 0.0, 0.0, 0.0]), StateCovariance::identity());
        let mut seen = 0u64;
        {
            let mut observer = |event: &StepEvent<'_, f64>| seen += event.step;
            observer.on_step(&StepEvent {
                step: 3,
                phase: StepPhase::Predicted,
                state: &state,
            });
        }
        assert_eq!(seen, 3);

        NoopObserver.on_step(&StepEvent {
            step: 1,
            phase: StepPhase::Updated,
            state: &state,
        });
    }
}
