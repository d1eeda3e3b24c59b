//! Simulation configuration with YAML schema and validation.
//!
//! Configuration is loaded from YAML, schema-checked via `validator`, then
//! semantically checked (positivity, ordering constraints the schema cannot
//! express). A builder covers programmatic construction.

use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::Validate;

use crate::error::{SimError, SimResult};
use crate::physics::{AdaptiveControl, Integrator, LeapfrogIntegrator, YoshidaIntegrator};
use crate::state::System;

/// Integration scheme selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegratorKind {
    /// Drift-kick-drift leapfrog, 2nd order.
    Leapfrog,
    /// Yoshida composition, 4th order.
    #[default]
    Yoshida4,
}

/// What the tracker does when a tracked particle names an unknown reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferencePolicy {
    /// Skip the particle for this step and record a diagnostic.
    #[default]
    Skip,
    /// Abort the step with [`SimError::UnknownReference`].
    ///
    /// [`SimError::UnknownReference`]: crate::error::SimError::UnknownReference
    Halt,
}

/// Post-step guard thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields, default)]
pub struct GuardConfig {
    /// Allowed upward slack on the stored minimum before the guard pauses.
    pub monotonicity_tolerance: f64,
    /// Whether orbit snapshots are checked for bound-orbit consistency.
    pub check_snapshots: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            monotonicity_tolerance: 1e-12,
            check_snapshots: true,
        }
    }
}

/// Close-encounter sub-step control.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields, default)]
pub struct AdaptiveConfig {
    /// Whether adaptive sub-stepping is active.
    pub enabled: bool,
    /// Smallest allowed sub-step.
    pub min_dt: f64,
    /// Separation below which the step shrinks.
    pub encounter_threshold: f64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_dt: 1e-9,
            encounter_threshold: 0.0,
        }
    }
}

impl AdaptiveConfig {
    /// Convert to the runtime control, if enabled.
    #[must_use]
    pub fn control(&self) -> Option<AdaptiveControl> {
        self.enabled.then_some(AdaptiveControl {
            min_dt: self.min_dt,
            encounter_threshold: self.encounter_threshold,
        })
    }
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Schema version for forward compatibility.
    #[validate(length(min = 1))]
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// Integration scheme.
    #[serde(default)]
    pub integrator: IntegratorKind,

    /// Base integration sub-step.
    pub dt: f64,

    /// Gravitational constant (1.0 for natural units).
    #[serde(default = "default_g")]
    pub gravitational_constant: f64,

    /// Plummer softening length.
    #[serde(default)]
    pub softening: f64,

    /// Unknown-reference handling for the tracker.
    #[serde(default)]
    pub reference_policy: ReferencePolicy,

    /// Close-encounter sub-step control.
    #[validate(nested)]
    #[serde(default)]
    pub adaptive: AdaptiveConfig,

    /// Post-step guard thresholds.
    #[validate(nested)]
    #[serde(default)]
    pub guard: GuardConfig,
}

fn default_schema_version() -> String {
    "1.0".to_string()
}

const fn default_g() -> f64 {
    1.0
}

impl SimulationConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, YAML parsing fails, or
    /// validation fails.
    pub fn load<P: AsRef<Path>>(path: P) -> SimResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or validation fails.
    pub fn from_yaml(yaml: &str) -> SimResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        config.validate_semantic()?;
        Ok(config)
    }

    /// Serialize configuration to YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> SimResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Create a builder seeded with defaults.
    #[must_use]
    pub fn builder() -> SimulationConfigBuilder {
        SimulationConfigBuilder::default()
    }

    /// Validate constraints beyond the schema.
    fn validate_semantic(&self) -> SimResult<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(SimError::config(format!(
                "dt must be positive and finite, got {}",
                self.dt
            )));
        }
        if !(self.gravitational_constant.is_finite() && self.gravitational_constant > 0.0) {
            return Err(SimError::config(format!(
                "gravitational_constant must be positive and finite, got {}",
                self.gravitational_constant
            )));
        }
        if !(self.softening.is_finite() && self.softening >= 0.0) {
            return Err(SimError::config(format!(
                "softening must be non-negative, got {}",
                self.softening
            )));
        }
        if self.guard.monotonicity_tolerance < 0.0 {
            return Err(SimError::config(
                "guard.monotonicity_tolerance must be non-negative",
            ));
        }
        if self.adaptive.enabled {
            if !(self.adaptive.min_dt > 0.0 && self.adaptive.min_dt <= self.dt) {
                return Err(SimError::config(
                    "adaptive.min_dt must be in (0, dt] when adaptive stepping is enabled",
                ));
            }
            if self.adaptive.encounter_threshold <= 0.0 {
                return Err(SimError::config(
                    "adaptive.encounter_threshold must be positive when enabled",
                ));
            }
        }
        Ok(())
    }

    /// Instantiate the configured integrator.
    #[must_use]
    pub fn build_integrator(&self) -> Box<dyn Integrator> {
        match self.integrator {
            IntegratorKind::Leapfrog => Box::new(LeapfrogIntegrator),
            IntegratorKind::Yoshida4 => Box::new(YoshidaIntegrator::new()),
        }
    }

    /// Create an empty system with the configured constants.
    #[must_use]
    pub fn build_system(&self) -> System {
        let mut system = System::new(self.gravitational_constant);
        system.set_softening(self.softening);
        system
    }
}

/// Builder for [`SimulationConfig`].
#[derive(Debug, Clone)]
pub struct SimulationConfigBuilder {
    config: SimulationConfig,
}

impl Default for SimulationConfigBuilder {
    fn default() -> Self {
        Self {
            config: SimulationConfig {
                schema_version: default_schema_version(),
                integrator: IntegratorKind::default(),
                dt: 1e-3,
                gravitational_constant: default_g(),
                softening: 0.0,
                reference_policy: ReferencePolicy::default(),
                adaptive: AdaptiveConfig::default(),
                guard: GuardConfig::default(),
            },
        }
    }
}

impl SimulationConfigBuilder {
    /// Set the integration scheme.
    #[must_use]
    pub fn integrator(mut self, kind: IntegratorKind) -> Self {
        self.config.integrator = kind;
        self
    }

    /// Set the base sub-step.
    #[must_use]
    pub fn dt(mut self, dt: f64) -> Self {
        self.config.dt = dt;
        self
    }

    /// Set the gravitational constant.
    #[must_use]
    pub fn gravitational_constant(mut self, g: f64) -> Self {
        self.config.gravitational_constant = g;
        self
    }

    /// Set the softening length.
    #[must_use]
    pub fn softening(mut self, softening: f64) -> Self {
        self.config.softening = softening;
        self
    }

    /// Set the unknown-reference policy.
    #[must_use]
    pub fn reference_policy(mut self, policy: ReferencePolicy) -> Self {
        self.config.reference_policy = policy;
        self
    }

    /// Set the adaptive sub-step control.
    #[must_use]
    pub fn adaptive(mut self, adaptive: AdaptiveConfig) -> Self {
        self.config.adaptive = adaptive;
        self
    }

    /// Set the guard thresholds.
    #[must_use]
    pub fn guard(mut self, guard: GuardConfig) -> Self {
        self.config.guard = guard;
        self
    }

    /// Validate and produce the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any constraint is violated.
    pub fn build(self) -> SimResult<SimulationConfig> {
        self.config.validate()?;
        self.config.validate_semantic()?;
        Ok(self.config)
    }
}
