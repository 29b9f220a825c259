//! Phases of a filter step and of the estimator lifecycle

// ============================================================================
// Step and Estimator Phases
// ============================================================================

/// Which half of the recursion produced an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepPhase {
    /// Propagated through the motion model only.
    Predicted,
    /// Corrected by a measurement.
    Updated,
}

/// Lifecycle of a lane estimator.
///
/// There is no terminal phase: a ready estimator keeps rebuilding its model
/// whenever the motion data changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EstimatorPhase {
    /// No model has been built yet.
    #[default]
    Uninitialized,
    /// A model snapshot exists for the last applied motion data.
    Ready,
}
