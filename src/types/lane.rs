//! Named view of the cubic lane-boundary state
//!
//! The boundary is `y(x) = c0 + c1*x + c2*x^2/2 + c3*x^3/6` in the vehicle
//! frame, with `x` the longitudinal distance ahead of the vehicle.

use nalgebra::RealField;

use super::spaces::StateVector;

/// Number of lane coefficients in the state.
pub const LANE_STATE_DIM: usize = 4;

/// Number of control inputs (yaw rate).
pub const LANE_CONTROL_DIM: usize = 1;

/// Number of measured components.
pub const LANE_MEASUREMENT_DIM: usize = 4;

/// Lane-boundary coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LaneCoefficients<T> {
    /// Lateral offset
    pub c0: T,
    /// Heading angle
    pub c1: T,
    /// Curvature
    pub c2: T,
    /// Curvature rate
    pub c3: T,
}

impl<T: RealField + Copy> LaneCoefficients<T> {
    pub fn new(c0: T, c1: T, c2: T, c3: T) -> Self {
        Self { c0, c1, c2, c3 }
    }

    pub fn from_state(state: &StateVector<T, LANE_STATE_DIM>) -> Self {
        let s = state.as_svector();
        Self::new(s[0], s[1], s[2], s[3])
    }

    pub fn to_state(&self) -> StateVector<T, LANE_STATE_DIM> {
        StateVector::from_array([self.c0, self.c1, self.c2, self.c3])
    }

    /// Lateral offset of the boundary at distance `x`.
    pub fn offset_at(&self, x: T) -> T {
        let half: T = nalgebra::convert(0.5);
        let sixth: T = nalgebra::convert(1.0 / 6.0);
        self.c0 + self.c1 * x + self.c2 * x * x * half + self.c3 * x * x * x * sixth
    }

    /// Heading of the boundary at distance `x`.
    pub fn heading_at(&self, x: T) -> T {
        let half: T = nalgebra::convert(0.5);
        self.c1 + self.c2 * x + self.c3 * x * x * half
    }

    /// Curvature of the boundary at distance `x`.
    pub fn curvature_at(&self, x: T) -> T {
        self.c2 + self.c3 * x
    }

    /// Coefficients of the same curve re-expanded around distance `dx`.
    pub fn shifted(&self, dx: T) -> Self {
        Self::new(
            self.offset_at(dx),
            self.heading_at(dx),
            self.curvature_at(dx),
            self.c3,
        )
    }
}

impl<T: RealField + Copy> From<StateVector<T, LANE_STATE_DIM>> for LaneCoefficients<T> {
    fn from(state: StateVector<T, LANE_STATE_DIM>) -> Self {
        Self::from_state(&state)
    }
}

impl<T: RealField + Copy> From<LaneCoefficients<T>> for StateVector<T, LANE_STATE_DIM> {
    fn from(coeffs: LaneCoefficients<T>) -> Self {
        coeffs.to_state()
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trip() {
        let coeffs = LaneCoefficients::new(1.8, 0.1, 0.001, 1e-6);
        let state: StateVector<f64, 4> = coeffs.into();
        assert_eq!(state.as_slice(), &[1.8, 0.1, 0.001, 1e-6]);
        assert_eq!(LaneCoefficients::from(state), coeffs);
    }

    #[test]
    fn test_straight_lane_evaluation() {
        let lane = LaneCoefficients::<f64>::new(1.5, 0.0, 0.0, 0.0);
        assert!((lane.offset_at(30.0) - 1.5).abs() < 1e-12);
        assert!(lane.heading_at(30.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_curvature_arc() {
        // Small-angle arc: y = k * x^2 / 2
        let lane = LaneCoefficients::<f64>::new(0.0, 0.0, 0.01, 0.0);
        assert!((lane.offset_at(10.0) - 0.5).abs() < 1e-12);
        assert!((lane.heading_at(10.0) - 0.1).abs() < 1e-12);
        assert!((lane.curvature_at(10.0) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_shift_preserves_curve() {
        let lane = LaneCoefficients::<f64>::new(1.8, 0.1, 0.001, 1e-4);
        let shifted = lane.shifted(5.0);

        // The shifted curve evaluated at x equals the original at x + 5.
        for x in [0.0, 1.0, 7.5, 20.0] {
            assert!((shifted.offset_at(x) - lane.offset_at(x + 5.0)).abs() < 1e-9);
        }
    }
}
