//! Per-step operators and the integration driver.
//!
//! An [`Operator`] is a callback evaluated once after every accepted
//! integration sub-step, at which point positions for that step are final.
//! Operators are held in an insertion-ordered registry and run synchronously
//! in the single-threaded loop, so step N's operator pass is strictly
//! ordered before step N+1's position update.

use std::any::Any;

use indexmap::IndexMap;

use crate::error::{SimError, SimResult};
use crate::physics::{AdaptiveControl, Integrator};
use crate::state::System;
use crate::tracker::MinDistanceTracker;

/// A registered per-step extension of the integration loop.
pub trait Operator {
    /// Registry name; also the key used by [`load_operator`].
    fn name(&self) -> &'static str;

    /// Observe (and possibly mutate) the system after an accepted sub-step.
    ///
    /// # Errors
    ///
    /// Implementations return an error only for faults their policy treats
    /// as fatal; recoverable conditions become diagnostics.
    fn apply(&mut self, system: &mut System) -> SimResult<()>;

    /// Downcasting hook for reading operator-specific state.
    fn as_any(&self) -> &dyn Any;
}

impl std::fmt::Debug for dyn Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operator").field("name", &self.name()).finish()
    }
}

/// Factory lookup by operator name.
///
/// Currently reserved names: `"min_distance"`.
///
/// # Errors
///
/// Returns [`SimError::UnknownOperator`] for an unrecognized name.
pub fn load_operator(name: &str) -> SimResult<Box<dyn Operator>> {
    match name {
        "min_distance" => Ok(Box::new(MinDistanceTracker::default())),
        _ => Err(SimError::UnknownOperator {
            name: name.to_string(),
        }),
    }
}

/// Integration driver: a system, an integrator, and registered operators.
pub struct Simulation {
    /// The N-body system being advanced.
    pub system: System,
    integrator: Box<dyn Integrator>,
    operators: IndexMap<String, Box<dyn Operator>>,
    base_dt: f64,
    adaptive: Option<AdaptiveControl>,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("system", &self.system)
            .field("integrator", &self.integrator.name())
            .field("operators", &self.operators.keys().collect::<Vec<_>>())
            .field("base_dt", &self.base_dt)
            .field("adaptive", &self.adaptive)
            .finish()
    }
}

impl Simulation {
    /// Create a driver from parts.
    #[must_use]
    pub fn new(system: System, integrator: Box<dyn Integrator>, base_dt: f64) -> Self {
        Self {
            system,
            integrator,
            operators: IndexMap::new(),
            base_dt,
            adaptive: None,
        }
    }

    /// Create a driver from a configuration and a prepared system.
    #[must_use]
    pub fn from_config(config: &crate::config::SimulationConfig, system: System) -> Self {
        let mut sim = Self::new(system, config.build_integrator(), config.dt);
        sim.adaptive = config.adaptive.control();
        sim
    }

    /// Enable adaptive sub-stepping.
    pub fn set_adaptive(&mut self, control: AdaptiveControl) {
        self.adaptive = Some(control);
    }

    /// Register an operator to run every sub-step.
    ///
    /// Registration order is evaluation order; registering a second operator
    /// with the same name replaces the first in place.
    pub fn add_operator(&mut self, operator: Box<dyn Operator>) {
        self.operators
            .insert(operator.name().to_string(), operator);
    }

    /// Look up a registered operator by name.
    #[must_use]
    pub fn operator(&self, name: &str) -> Option<&dyn Operator> {
        self.operators.get(name).map(|op| &**op)
    }

    /// Downcast a registered operator to its concrete type.
    #[must_use]
    pub fn operator_as<T: 'static>(&self, name: &str) -> Option<&T> {
        self.operator(name).and_then(|op| op.as_any().downcast_ref())
    }

    /// Names of registered operators, in evaluation order.
    pub fn operator_names(&self) -> impl Iterator<Item = &str> {
        self.operators.keys().map(String::as_str)
    }

    /// Base sub-step length.
    #[must_use]
    pub const fn base_dt(&self) -> f64 {
        self.base_dt
    }

    /// Effective sub-step for the current state.
    fn effective_dt(&self) -> f64 {
        match &self.adaptive {
            Some(control) => control.effective_dt(&self.system, self.base_dt),
            None => self.base_dt,
        }
    }

    /// Advance one sub-step and evaluate all operators.
    ///
    /// Returns the sub-step length actually taken.
    ///
    /// # Errors
    ///
    /// Propagates integrator and operator errors; on error the operator pass
    /// for this step is abandoned.
    pub fn step(&mut self) -> SimResult<f64> {
        let dt = self.effective_dt();
        self.step_by(dt)?;
        Ok(dt)
    }

    /// Advance one sub-step of explicit length and evaluate all operators.
    ///
    /// A non-positive `dt` never advances `system.time`, so it is rejected
    /// here rather than allowed to stall the `integrate` loop.
    fn step_by(&mut self, dt: f64) -> SimResult<()> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SimError::config(format!(
                "sub-step dt must be positive and finite, got {dt}"
            )));
        }
        self.integrator.step(&mut self.system, dt)?;
        for operator in self.operators.values_mut() {
            operator.apply(&mut self.system)?;
        }
        Ok(())
    }

    /// Integrate forward to `t_end`, finishing exactly on it.
    ///
    /// The final sub-step is shortened so that `system.time == t_end` up to
    /// floating-point rounding. Operators run after every sub-step,
    /// including the shortened one.
    ///
    /// # Errors
    ///
    /// Propagates integrator and operator errors; the system is left at the
    /// time of the failed sub-step.
    pub fn integrate(&mut self, t_end: f64) -> SimResult<()> {
        if !t_end.is_finite() {
            return Err(SimError::config(format!(
                "t_end must be finite, got {t_end}"
            )));
        }
        if !(self.base_dt.is_finite() && self.base_dt > 0.0) {
            return Err(SimError::config(format!(
                "base dt must be positive and finite, got {}",
                self.base_dt
            )));
        }

        // Relative slack so accumulated rounding cannot add a stray step.
        let slack = f64::EPSILON * t_end.abs().max(1.0);

        while self.system.time < t_end - slack {
            let remaining = t_end - self.system.time;
            let dt = self.effective_dt().min(remaining);
            self.step_by(dt)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::LeapfrogIntegrator;
    use crate::state::Vec3;

    /// Counts how many times it was applied.
    struct CountingOperator {
        calls: usize,
    }

    impl Operator for CountingOperator {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn apply(&mut self, _system: &mut System) -> SimResult<()> {
            self.calls += 1;
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn two_body_sim(dt: f64) -> Simulation {
        let mut system = System::natural_units();
        system.add(1.0, Vec3::zero(), Vec3::zero());
        system.add(0.0, Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0));
        Simulation::new(system, Box::new(LeapfrogIntegrator), dt)
    }

    #[test]
    fn test_load_operator_known_name() {
        let op = load_operator("min_distance").expect("reserved name");
        assert_eq!(op.name(), "min_distance");
    }

    #[test]
    fn test_load_operator_unknown_name() {
        let err = load_operator("drag").unwrap_err();
        assert!(matches!(err, SimError::UnknownOperator { .. }));
    }

    #[test]
    fn test_operator_runs_once_per_substep() {
        let mut sim = two_body_sim(0.1);
        sim.add_operator(Box::new(CountingOperator { calls: 0 }));

        for _ in 0..7 {
            sim.step().expect("step");
        }

        let counter: &CountingOperator = sim.operator_as("counting").expect("registered");
        assert_eq!(counter.calls, 7);
    }

    #[test]
    fn test_integrate_lands_exactly_on_t_end() {
        // 0.3 is not an integer multiple of 0.07.
        let mut sim = two_body_sim(0.07);
        sim.add_operator(Box::new(CountingOperator { calls: 0 }));
        sim.integrate(0.3).expect("integrate");

        assert!((sim.system.time - 0.3).abs() < 1e-12);

        // Four full sub-steps plus one shortened final sub-step.
        let counter: &CountingOperator = sim.operator_as("counting").expect("registered");
        assert_eq!(counter.calls, 5);
    }

    #[test]
    fn test_integrate_is_idempotent_at_t_end() {
        let mut sim = two_body_sim(0.05);
        sim.integrate(0.2).expect("integrate");
        let t = sim.system.time;
        sim.integrate(0.2).expect("second call");
        assert!((sim.system.time - t).abs() < 1e-15);
    }

    #[test]
    fn test_reregistering_replaces() {
        let mut sim = two_body_sim(0.1);
        sim.add_operator(Box::new(CountingOperator { calls: 10 }));
        sim.add_operator(Box::new(CountingOperator { calls: 0 }));

        assert_eq!(sim.operator_names().count(), 1);
        let counter: &CountingOperator = sim.operator_as("counting").expect("registered");
        assert_eq!(counter.calls, 0);
    }

    #[test]
    fn test_rejects_non_finite_t_end() {
        let mut sim = two_body_sim(0.1);
        assert!(sim.integrate(f64::INFINITY).is_err());
    }

    #[test]
    fn test_rejects_non_positive_dt() {
        // A zero sub-step would leave system.time fixed forever, so it must
        // surface as an error instead of a stalled integrate loop.
        let mut sim = two_body_sim(0.0);
        let err = sim.step().unwrap_err();
        assert!(matches!(err, SimError::Config { .. }));
        assert!(sim.system.time.abs() < f64::EPSILON);
        assert!(sim.integrate(1.0).is_err());

        let mut sim = two_body_sim(-0.1);
        assert!(sim.step().is_err());

        let mut sim = two_body_sim(f64::NAN);
        assert!(sim.integrate(1.0).is_err());
    }
}
