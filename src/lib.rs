//! # periapse
//!
//! Minimum-distance (close-approach) tracking for N-body orbital
//! integrations.
//!
//! A particle carrying a `min_distance` parameter is observed after every
//! accepted integration sub-step: its distance to a reference body is
//! measured, the running minimum updated, and optionally the osculating
//! orbit at the moment of the minimum recorded in place.
//!
//! ## Example
//!
//! ```rust
//! use periapse::prelude::*;
//!
//! // Two-body orbit in natural units: a = 1, e = 0.5, started at apocenter.
//! let config = KeplerConfig::natural_units();
//! let (system, _orbiter) = config.build_tracked(1.0).expect("valid scenario");
//!
//! let mut sim = Simulation::new(system, Box::new(YoshidaIntegrator::new()), 1e-3);
//! sim.add_operator(load_operator("min_distance").expect("reserved name"));
//!
//! // Half a period reaches pericenter: min distance approaches a(1-e) = 0.5.
//! sim.integrate(std::f64::consts::PI).expect("integration");
//! let min = sim.system.particles[1].min_distance().expect("tracked");
//! assert!((min - 0.5).abs() < 1e-3);
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::cast_precision_loss,
    clippy::suboptimal_flops,  // Numerical code choices are intentional
    clippy::imprecise_flops,
    clippy::missing_const_for_fn,  // Many functions can't be const in stable Rust
    clippy::needless_range_loop,   // Sometimes range loops are clearer
)]

pub mod config;
pub mod error;
pub mod guard;
pub mod operator;
pub mod orbit;
pub mod physics;
pub mod rng;
pub mod scenarios;
pub mod state;
pub mod tracker;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{
        IntegratorKind, ReferencePolicy, SimulationConfig, SimulationConfigBuilder,
    };
    pub use crate::error::{SimError, SimResult};
    pub use crate::guard::{GuardResponse, TrackGuard};
    pub use crate::operator::{load_operator, Operator, Simulation};
    pub use crate::orbit::OrbitElements;
    pub use crate::physics::{Integrator, LeapfrogIntegrator, YoshidaIntegrator};
    pub use crate::scenarios::{KeplerConfig, SwarmConfig};
    pub use crate::state::{ParamKey, Particle, ParticleId, System, TrackState, Vec3};
    pub use crate::tracker::{MinDistanceTracker, TrackerDiagnostics};
}

pub use error::{SimError, SimResult};
