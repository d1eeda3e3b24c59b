//! Pre-built scenarios.
//!
//! Canonical configurations for exercising the tracker: a two-body Kepler
//! problem (natural units or Earth-Sun) and a seeded swarm of tracked test
//! particles for close-encounter surveys.

use serde::{Deserialize, Serialize};

use crate::error::SimResult;
use crate::orbit::OrbitElements;
use crate::rng::SimRng;
use crate::state::{ParticleId, System, Vec3};

/// Gravitational constant in SI units (m³ kg⁻¹ s⁻²).
pub const G_SI: f64 = 6.674_30e-11;

/// Astronomical unit in meters.
pub const AU: f64 = 1.495_978_707e11;

/// Solar mass in kilograms.
pub const SOLAR_MASS: f64 = 1.988_92e30;

/// Earth mass in kilograms.
pub const EARTH_MASS: f64 = 5.972_2e24;

/// Two-body Keplerian configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeplerConfig {
    /// Primary body mass.
    pub primary_mass: f64,
    /// Orbiting body mass (0 for a test particle).
    pub orbiter_mass: f64,
    /// Semi-major axis.
    pub semi_major_axis: f64,
    /// Eccentricity in `[0, 1)`.
    pub eccentricity: f64,
    /// Inclination (radians).
    pub inclination: f64,
    /// Initial true anomaly (radians).
    pub initial_anomaly: f64,
}

impl Default for KeplerConfig {
    fn default() -> Self {
        Self::natural_units()
    }
}

impl KeplerConfig {
    /// Natural-units eccentric orbit started at apocenter.
    ///
    /// With G = 1 this orbit has pericenter distance `a(1-e) = 0.5` and
    /// period `2π`, which makes tracker results easy to check by hand.
    #[must_use]
    pub const fn natural_units() -> Self {
        Self {
            primary_mass: 1.0,
            orbiter_mass: 0.0,
            semi_major_axis: 1.0,
            eccentricity: 0.5,
            inclination: 0.0,
            initial_anomaly: std::f64::consts::PI,
        }
    }

    /// Earth around the Sun, SI units.
    #[must_use]
    pub const fn earth_sun() -> Self {
        Self {
            primary_mass: SOLAR_MASS,
            orbiter_mass: EARTH_MASS,
            semi_major_axis: AU,
            eccentricity: 0.0167,
            inclination: 0.0,
            initial_anomaly: 0.0,
        }
    }

    /// Gravitational parameter for the pair under constant `g`.
    #[must_use]
    pub fn mu(&self, g: f64) -> f64 {
        g * (self.primary_mass + self.orbiter_mass)
    }

    /// Orbital period under constant `g`.
    #[must_use]
    pub fn period(&self, g: f64) -> f64 {
        2.0 * std::f64::consts::PI * (self.semi_major_axis.powi(3) / self.mu(g)).sqrt()
    }

    /// Pericenter distance `a(1-e)`.
    #[must_use]
    pub fn pericenter(&self) -> f64 {
        self.semi_major_axis * (1.0 - self.eccentricity)
    }

    /// Build the two-body system: primary at rest at the origin.
    ///
    /// # Errors
    ///
    /// Returns an error for degenerate elements (e.g. `e ≥ 1`).
    pub fn build(&self, g: f64) -> SimResult<System> {
        let elements = OrbitElements {
            a: self.semi_major_axis,
            e: self.eccentricity,
            inc: self.inclination,
            node: 0.0,
            argp: 0.0,
            true_anomaly: self.initial_anomaly,
        };
        let (pos, vel) = elements.to_state(self.mu(g))?;

        let mut system = System::new(g);
        system.add(self.primary_mass, Vec3::zero(), Vec3::zero());
        system.add(self.orbiter_mass, pos, vel);
        Ok(system)
    }

    /// Build the system with the orbiter tracked against the primary.
    ///
    /// The minimum is seeded with the current separation and orbit
    /// snapshots are enabled. Returns the orbiter's id alongside.
    ///
    /// # Errors
    ///
    /// Same as [`build`](Self::build).
    pub fn build_tracked(&self, g: f64) -> SimResult<(System, ParticleId)> {
        let mut system = self.build(g)?;
        let orbiter = system.particles[1].id;
        let initial = system.particles[1]
            .position
            .distance_to(&system.particles[0].position);

        let p = &mut system.particles[1];
        p.enable_tracking(initial);
        p.enable_orbit_snapshot();
        Ok((system, orbiter))
    }
}

/// A seeded swarm of tracked test particles around a primary.
///
/// Each particle starts at a random anomaly on a random bound orbit drawn
/// from the configured ranges, with tracking enabled against the primary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmConfig {
    /// Primary body mass.
    pub primary_mass: f64,
    /// Number of test particles.
    pub count: usize,
    /// Semi-major axis range `[min, max)`.
    pub a_range: (f64, f64),
    /// Eccentricity range `[min, max)`, inside `[0, 1)`.
    pub e_range: (f64, f64),
    /// Maximum inclination (radians).
    pub max_inclination: f64,
    /// Master seed.
    pub seed: u64,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            primary_mass: 1.0,
            count: 64,
            a_range: (0.8, 1.2),
            e_range: (0.0, 0.3),
            max_inclination: 0.1,
            seed: 42,
        }
    }
}

impl SwarmConfig {
    /// Build the swarm system with all test particles tracked.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for empty or out-of-bounds ranges, and
    /// a degenerate-orbit error if a drawn orbit cannot be placed.
    pub fn build(&self, g: f64) -> SimResult<System> {
        if !(self.a_range.0 > 0.0 && self.a_range.0 < self.a_range.1) {
            return Err(crate::error::SimError::config(format!(
                "a_range must satisfy 0 < min < max, got {:?}",
                self.a_range
            )));
        }
        if !(self.e_range.0 >= 0.0
            && self.e_range.0 < self.e_range.1
            && self.e_range.1 < 1.0)
        {
            return Err(crate::error::SimError::config(format!(
                "e_range must satisfy 0 <= min < max < 1, got {:?}",
                self.e_range
            )));
        }

        let mut system = System::new(g);
        system.add(self.primary_mass, Vec3::zero(), Vec3::zero());
        let mu = g * self.primary_mass;

        let rng = SimRng::new(self.seed);
        for k in 0..self.count {
            // One stream per particle: inserting or removing particles
            // elsewhere does not reshuffle the rest of the swarm.
            let mut stream = rng.derive(k as u64);
            let elements = OrbitElements {
                a: stream.uniform(self.a_range.0, self.a_range.1),
                e: stream.uniform(self.e_range.0, self.e_range.1),
                inc: if self.max_inclination > 0.0 {
                    stream.uniform(0.0, self.max_inclination)
                } else {
                    0.0
                },
                node: stream.angle(),
                argp: stream.angle(),
                true_anomaly: stream.angle(),
            };
            let (pos, vel) = elements.to_state(mu)?;

            let id = system.add(0.0, pos, vel);
            if let Some(index) = system.index_of(id) {
                let initial = system.particles[index].position.magnitude();
                let p = &mut system.particles[index];
                p.enable_tracking(initial);
                p.enable_orbit_snapshot();
            }
        }

        Ok(system)
    }
}
