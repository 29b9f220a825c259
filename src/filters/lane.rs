//! Lane-boundary parameter estimator
//!
//! Drives a [`LinearKalmanCore`] with the cubic lane model. Each call takes
//! the caller's [`LaneState`], copies it into the core, runs one predict
//! and/or update, and writes the result back. The estimator keeps only the
//! model snapshot, the last measurement, a step counter and its observer;
//! the estimate itself always belongs to the caller, so it may be reset or
//! edited between calls.
//!
//! # Example
//!
//! ```
//! use lanekf::prelude::*;
//!
//! let mut estimator = LaneParameterEstimator::<f64>::new();
//! estimator.set_motion_data(3.6, 0.5, 0.0)?;
//!
//! let mut lane = LaneState::with_variances(
//!     StateVector::from_array([1.8, 0.1, 0.001, 1e-6]),
//!     [0.001; 4],
//! );
//!
//! estimator.set_measurement_slice(&[1.95, 0.13, 0.006, 1e-6])?;
//! assert_eq!(estimator.estimate_lane_line_param(&mut lane, true)?, StepPhase::Updated);
//!
//! estimator.clear_measurement();
//! assert_eq!(estimator.estimate_lane_line_param(&mut lane, true)?, StepPhase::Predicted);
//! assert_eq!(estimator.step(), 2);
//! # Ok::<(), lanekf::LaneKfError>(())
//! ```

use nalgebra::RealField;
use num_traits::Float;
use tracing::{debug, warn};

use super::kalman::{CoreConfig, KalmanState, LinearKalmanCore};
use super::observer::{NoopObserver, StepEvent, StepObserver};
use crate::models::{LaneModel, MotionData};
use crate::types::lane::{LANE_CONTROL_DIM, LANE_MEASUREMENT_DIM, LANE_STATE_DIM};
use crate::types::phase::{EstimatorPhase, StepPhase};
use crate::types::spaces::Measurement;
use crate::{LaneKfError, Result};

/// Lane coefficients and their covariance.
pub type LaneState<T> = KalmanState<T, LANE_STATE_DIM>;

/// Kalman core bound to the lane dimensions.
pub type LaneCore<T> = LinearKalmanCore<T, LANE_STATE_DIM, LANE_CONTROL_DIM, LANE_MEASUREMENT_DIM>;

/// Measured lane coefficients.
pub type LaneMeasurement<T> = Measurement<T, LANE_MEASUREMENT_DIM>;

// ============================================================================
// Configuration
// ============================================================================

/// Tuning of a [`LaneParameterEstimator`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EstimatorConfig<T> {
    /// Diagonal of `Q`
    pub process_noise: [T; LANE_STATE_DIM],
    /// Diagonal of `R`
    pub measurement_noise: [T; LANE_MEASUREMENT_DIM],
    /// Smallest accepted speed magnitude
    pub min_speed: T,
    pub core: CoreConfig<T>,
}

impl<T: RealField + Float + Copy> Default for EstimatorConfig<T> {
    fn default() -> Self {
        Self {
            process_noise: [nalgebra::convert(0.001); LANE_STATE_DIM],
            measurement_noise: [nalgebra::convert(0.1); LANE_MEASUREMENT_DIM],
            min_speed: MotionData::default_min_speed(),
            core: CoreConfig::default(),
        }
    }
}

impl<T: RealField + Float + Copy> EstimatorConfig<T> {
    pub fn with_process_noise(mut self, process_noise: [T; LANE_STATE_DIM]) -> Self {
        self.process_noise = process_noise;
        self
    }

    pub fn with_measurement_noise(mut self, measurement_noise: [T; LANE_MEASUREMENT_DIM]) -> Self {
        self.measurement_noise = measurement_noise;
        self
    }

    pub fn with_min_speed(mut self, min_speed: T) -> Self {
        self.min_speed = min_speed;
        self
    }

    pub fn with_core(mut self, core: CoreConfig<T>) -> Self {
        self.core = core;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let valid_variance = |v: &T| Float::is_finite(*v) && *v >= T::zero();
        if !self.process_noise.iter().all(valid_variance) {
            return Err(LaneKfError::InvalidConfig {
                parameter: "process_noise",
                reason: "variances must be finite and non-negative",
            });
        }
        if !self.measurement_noise.iter().all(valid_variance) {
            return Err(LaneKfError::InvalidConfig {
                parameter: "measurement_noise",
                reason: "variances must be finite and non-negative",
            });
        }
        if !Float::is_finite(self.min_speed) || self.min_speed <= T::zero() {
            return Err(LaneKfError::InvalidConfig {
                parameter: "min_speed",
                reason: "must be finite and positive",
            });
        }
        self.core.validate()
    }
}

// ============================================================================
// Lane Parameter Estimator
// ============================================================================

/// Recursive estimator of the cubic lane-boundary coefficients.
///
/// Starts [`EstimatorPhase::Uninitialized`] and becomes
/// [`EstimatorPhase::Ready`] once a predict or update has built a model
/// snapshot. The snapshot is rebuilt only when the motion data changes.
#[derive(Debug, Clone)]
pub struct LaneParameterEstimator<T: RealField = f64, O = NoopObserver> {
    config: EstimatorConfig<T>,
    motion: Option<MotionData<T>>,
    measurement: Option<LaneMeasurement<T>>,
    model: Option<LaneModel<T>>,
    core: Option<LaneCore<T>>,
    step: u64,
    observer: O,
}

impl<T: RealField + Float + Copy> LaneParameterEstimator<T, NoopObserver> {
    /// Creates an estimator with the default tuning.
    pub fn new() -> Self {
        Self::from_parts(EstimatorConfig::default(), NoopObserver)
    }

    /// Creates an estimator with custom tuning.
    ///
    /// # Errors
    /// [`LaneKfError::InvalidConfig`] if the configuration fails validation.
    pub fn with_config(config: EstimatorConfig<T>) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(config, NoopObserver))
    }
}

impl<T: RealField + Float + Copy> Default for LaneParameterEstimator<T, NoopObserver> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, O> LaneParameterEstimator<T, O>
where
    T: RealField + Float + Copy,
    O: StepObserver<T>,
{
    fn from_parts(config: EstimatorConfig<T>, observer: O) -> Self {
        Self {
            config,
            motion: None,
            measurement: None,
            model: None,
            core: None,
            step: 0,
            observer,
        }
    }

    /// Replaces the observer, keeping everything else.
    pub fn with_observer<P: StepObserver<T>>(self, observer: P) -> LaneParameterEstimator<T, P> {
        LaneParameterEstimator {
            config: self.config,
            motion: self.motion,
            measurement: self.measurement,
            model: self.model,
            core: self.core,
            step: self.step,
            observer,
        }
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn config(&self) -> &EstimatorConfig<T> {
        &self.config
    }

    /// Motion data applied by the next step.
    pub fn motion(&self) -> Option<&MotionData<T>> {
        self.motion.as_ref()
    }

    pub fn measurement(&self) -> Option<&LaneMeasurement<T>> {
        self.measurement.as_ref()
    }

    pub fn phase(&self) -> EstimatorPhase {
        if self.model.is_some() {
            EstimatorPhase::Ready
        } else {
            EstimatorPhase::Uninitialized
        }
    }

    /// Model snapshot used by the last step.
    pub fn model(&self) -> Option<&LaneModel<T>> {
        self.model.as_ref()
    }

    /// Number of completed predictions.
    pub fn step(&self) -> u64 {
        self.step
    }

    /// Returns to [`EstimatorPhase::Uninitialized`], keeping the configuration
    /// and the observer.
    pub fn reset(&mut self) {
        self.motion = None;
        self.measurement = None;
        self.model = None;
        self.core = None;
        self.step = 0;
    }

    /// Records the vehicle motion for the following steps.
    ///
    /// # Errors
    /// [`LaneKfError::InvalidMotion`] for a speed below the configured
    /// minimum, a negative or non-finite look-ahead time, or a non-finite yaw
    /// rate. The previous motion data is kept.
    pub fn set_motion_data(&mut self, speed: T, look_forward_time: T, yaw_rate: T) -> Result<()> {
        self.set_motion(MotionData::new(speed, look_forward_time, yaw_rate))
    }

    pub fn set_motion(&mut self, motion: MotionData<T>) -> Result<()> {
        if let Err(err) = motion.validate(self.config.min_speed) {
            warn!(%err, speed = ?motion.speed, "motion data rejected");
            return Err(err);
        }
        self.motion = Some(motion);
        Ok(())
    }

    /// Records or clears the current measurement.
    pub fn set_measurement_data(&mut self, measurement: Option<LaneMeasurement<T>>) {
        self.measurement = measurement;
    }

    pub fn clear_measurement(&mut self) {
        self.measurement = None;
    }

    /// Records a measurement from a flat buffer of four coefficients.
    pub fn set_measurement_slice(&mut self, data: &[T]) -> Result<()> {
        if data.len() != LANE_MEASUREMENT_DIM {
            return Err(LaneKfError::DimensionMismatch {
                operand: "measurement",
                expected: (LANE_MEASUREMENT_DIM, 1),
                actual: (data.len(), 1),
            });
        }
        self.measurement = Some(Measurement::try_from_slice(data)?);
        Ok(())
    }

    /// Advances `lane` one step through the motion model.
    ///
    /// # Errors
    /// [`LaneKfError::MotionNotSet`] if no valid motion data was supplied.
    pub fn predict(&mut self, lane: &mut LaneState<T>) -> Result<()> {
        let core = self.bind(lane)?;
        core.predict();
        *lane = *core.state();

        self.step += 1;
        self.notify(StepPhase::Predicted, lane);
        Ok(())
    }

    /// Corrects `lane` with `measurement`, which becomes the stored
    /// measurement once the correction succeeds.
    ///
    /// # Errors
    /// [`LaneKfError::MotionNotSet`] before any valid motion data,
    /// [`LaneKfError::SingularInnovation`] if the correction cannot be
    /// computed. `lane` is unchanged on error.
    pub fn update(&mut self, lane: &mut LaneState<T>, measurement: LaneMeasurement<T>) -> Result<()> {
        let core = self.bind(lane)?;
        if let Err(err) = core.update(&measurement) {
            warn!(%err, step = self.step, "lane update rejected");
            return Err(err);
        }
        *lane = *core.state();
        self.measurement = Some(measurement);

        self.notify(StepPhase::Updated, lane);
        Ok(())
    }

    /// Predict followed by update with `measurement`.
    ///
    /// Produces the same estimate as [`predict`](Self::predict) then
    /// [`update`](Self::update), but commits nothing on failure: `lane`, the
    /// stored measurement, the step counter and the observer are untouched.
    pub fn predict_and_update(
        &mut self,
        lane: &mut LaneState<T>,
        measurement: LaneMeasurement<T>,
    ) -> Result<()> {
        let core = self.bind(lane)?;
        core.predict();
        let predicted = *core.state();
        if let Err(err) = core.update(&measurement) {
            warn!(%err, step = self.step + 1, "lane update rejected");
            return Err(err);
        }
        *lane = *core.state();
        self.measurement = Some(measurement);

        self.step += 1;
        self.notify(StepPhase::Predicted, &predicted);
        self.notify(StepPhase::Updated, lane);
        Ok(())
    }

    /// Runs one step of the missing-measurement policy.
    ///
    /// With a stored measurement and `measurement_available` set, predicts and
    /// updates; otherwise only predicts. Returns which of the two happened.
    pub fn estimate_lane_line_param(
        &mut self,
        lane: &mut LaneState<T>,
        measurement_available: bool,
    ) -> Result<StepPhase> {
        match self.measurement {
            Some(measurement) if measurement_available => {
                self.predict_and_update(lane, measurement)?;
                Ok(StepPhase::Updated)
            }
            _ => {
                self.predict(lane)?;
                Ok(StepPhase::Predicted)
            }
        }
    }

    /// Returns the snapshot for the current motion, building it if needed.
    fn ensure_model(&mut self) -> Result<LaneModel<T>> {
        let motion = self.motion.ok_or(LaneKfError::MotionNotSet)?;
        if let Some(model) = self.model {
            if *model.motion() == motion {
                return Ok(model);
            }
        }

        let model = LaneModel::build(&motion, &self.config)?;
        debug!(
            dx = ?model.look_ahead_distance(),
            speed = ?motion.speed,
            yaw_rate = ?motion.yaw_rate,
            "lane model built"
        );
        self.model = Some(model);
        Ok(model)
    }

    /// Loads the current snapshot and the caller's estimate into the core.
    fn bind(&mut self, lane: &LaneState<T>) -> Result<&mut LaneCore<T>> {
        let model = self.ensure_model()?;
        let config = self.config.core;
        let core = self
            .core
            .get_or_insert_with(|| LaneCore::new(*model.linear(), *lane, *model.input()).with_config(config));
        core.set_model(*model.linear(), *model.input());
        core.reseed(*lane);
        Ok(core)
    }

    fn notify(&mut self, phase: StepPhase, state: &LaneState<T>) {
        self.observer.on_step(&StepEvent {
            step: self.step,
            phase,
            state,
        });
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::types::spaces::{StateCovariance, StateVector};

    fn initial_lane() -> LaneState<f64> {
        LaneState::with_variances(StateVector::from_array([1.8, 0.1, 0.001, 1e-6]), [0.001; 4])
    }

    fn measurement() -> LaneMeasurement<f64> {
        Measurement::from_array([1.95, 0.13, 0.006, 1e-6])
    }

    fn ready_estimator() -> LaneParameterEstimator<f64> {
        let mut estimator = LaneParameterEstimator::new();
        estimator.set_motion_data(3.6, 0.5, 0.0).unwrap();
        estimator
    }

    #[test]
    fn test_phase_transitions() {
        let mut estimator = LaneParameterEstimator::<f64>::new();
        assert_eq!(estimator.phase(), EstimatorPhase::Uninitialized);

        estimator.set_motion_data(3.6, 0.5, 0.0).unwrap();
        // Motion alone builds nothing.
        assert_eq!(estimator.phase(), EstimatorPhase::Uninitialized);

        let mut lane = initial_lane();
        estimator.predict(&mut lane).unwrap();
        assert_eq!(estimator.phase(), EstimatorPhase::Ready);

        estimator.reset();
        assert_eq!(estimator.phase(), EstimatorPhase::Uninitialized);
        assert!(estimator.motion().is_none());
        assert_eq!(estimator.step(), 0);
    }

    #[test]
    fn test_predict_without_motion() {
        let mut estimator = LaneParameterEstimator::<f64>::new();
        let mut lane = initial_lane();

        assert_eq!(estimator.predict(&mut lane), Err(LaneKfError::MotionNotSet));
        assert_eq!(
            estimator.update(&mut lane, measurement()),
            Err(LaneKfError::MotionNotSet)
        );
        assert_eq!(lane, initial_lane());
        assert!(estimator.measurement().is_none());
    }

    #[test]
    fn test_rejected_motion_keeps_previous() {
        let mut estimator = ready_estimator();

        let err = estimator.set_motion_data(0.0, 0.5, 0.0).unwrap_err();
        assert!(matches!(err, LaneKfError::InvalidMotion { parameter: "speed", .. }));
        assert_eq!(estimator.motion(), Some(&MotionData::new(3.6, 0.5, 0.0)));
    }

    #[test]
    fn test_model_rebuilt_on_motion_change() {
        let mut estimator = ready_estimator();
        let mut lane = initial_lane();

        estimator.predict(&mut lane).unwrap();
        let first = *estimator.model().unwrap();
        estimator.predict(&mut lane).unwrap();
        assert_eq!(*estimator.model().unwrap(), first);

        estimator.set_motion_data(10.0, 0.5, 0.02).unwrap();
        estimator.predict(&mut lane).unwrap();
        let rebuilt = estimator.model().unwrap();
        assert!((rebuilt.look_ahead_distance() - 5.0).abs() < 1e-12);
        assert_eq!(rebuilt.input().as_slice(), &[0.02]);
    }

    #[test]
    fn test_update_without_predict() {
        let mut estimator = ready_estimator();
        let mut lane = initial_lane();

        estimator.update(&mut lane, measurement()).unwrap();
        let c0 = *lane.mean.index(0);
        assert!(c0 > 1.8 && c0 < 1.95);
        assert_eq!(estimator.step(), 0);
        assert_eq!(estimator.measurement(), Some(&measurement()));
    }

    #[test]
    fn test_estimate_policy() {
        let mut estimator = ready_estimator();
        let mut lane = initial_lane();

        // Nothing stored: predict only, whatever the flag says.
        assert_eq!(
            estimator.estimate_lane_line_param(&mut lane, true).unwrap(),
            StepPhase::Predicted
        );

        estimator.set_measurement_data(Some(measurement()));
        assert_eq!(
            estimator.estimate_lane_line_param(&mut lane, false).unwrap(),
            StepPhase::Predicted
        );
        assert_eq!(
            estimator.estimate_lane_line_param(&mut lane, true).unwrap(),
            StepPhase::Updated
        );
        assert_eq!(estimator.step(), 3);
    }

    #[test]
    fn test_measurement_slice_dimension() {
        let mut estimator = ready_estimator();
        let err = estimator.set_measurement_slice(&[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(
            err,
            LaneKfError::DimensionMismatch {
                operand: "measurement",
                expected: (4, 1),
                actual: (3, 1),
            }
        );
        assert!(estimator.measurement().is_none());

        estimator.set_measurement_slice(&[1.0, 0.0, 0.0, 0.0]).unwrap();
        assert!(estimator.measurement().is_some());
        estimator.clear_measurement();
        assert!(estimator.measurement().is_none());
    }

    #[test]
    fn test_failed_predict_and_update_commits_nothing() {
        let config = EstimatorConfig::default()
            .with_process_noise([0.0; 4])
            .with_measurement_noise([0.0; 4]);
        let mut estimator = LaneParameterEstimator::with_config(config).unwrap();
        estimator.set_motion_data(3.6, 0.5, 0.0).unwrap();

        let mut lane = LaneState::new(
            StateVector::from_array([1.8, 0.1, 0.001, 1e-6]),
            StateCovariance::zeros(),
        );
        let before = lane;

        let err = estimator.predict_and_update(&mut lane, measurement()).unwrap_err();
        assert_eq!(err, LaneKfError::SingularInnovation);
        assert_eq!(lane, before);
        assert_eq!(estimator.step(), 0);
        assert!(estimator.measurement().is_none());
    }

    #[test]
    fn test_failed_update_keeps_stored_measurement() {
        let config = EstimatorConfig::default()
            .with_process_noise([0.0; 4])
            .with_measurement_noise([0.0; 4]);
        let mut estimator = LaneParameterEstimator::with_config(config).unwrap();
        estimator.set_motion_data(3.6, 0.5, 0.0).unwrap();

        let stored = Measurement::from_array([1.7, 0.1, 0.0, 0.0]);
        estimator.set_measurement_data(Some(stored));

        let mut lane = LaneState::new(
            StateVector::from_array([1.8, 0.1, 0.001, 1e-6]),
            StateCovariance::zeros(),
        );
        assert!(estimator.update(&mut lane, measurement()).is_err());
        assert_eq!(estimator.measurement(), Some(&stored));
    }

    #[test]
    fn test_observer_sees_steps() {
        let mut events = Vec::new();
        {
            let mut estimator = ready_estimator()
                .with_observer(|event: &StepEvent<'_, f64>| events.push((event.step, event.phase)));
            let mut lane = initial_lane();

            estimator.predict(&mut lane).unwrap();
            estimator.predict_and_update(&mut lane, measurement()).unwrap();
        }

        assert_eq!(
            events,
            vec![
                (1, StepPhase::Predicted),
                (2, StepPhase::Predicted),
                (2, StepPhase::Updated),
            ]
        );
    }

    #[test]
    fn test_config_validation() {
        assert!(EstimatorConfig::<f64>::default().validate().is_ok());

        let bad = EstimatorConfig::default().with_min_speed(0.0);
        assert!(matches!(
            LaneParameterEstimator::<f64>::with_config(bad),
            Err(LaneKfError::InvalidConfig { parameter: "min_speed", .. })
        ));

        let bad = EstimatorConfig::default().with_measurement_noise([0.1, 0.1, f64::NAN, 0.1]);
        assert!(matches!(
            bad.validate(),
            Err(LaneKfError::InvalidConfig { parameter: "measurement_noise", .. })
        ));
    }
}
