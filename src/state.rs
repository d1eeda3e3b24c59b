//! Simulation state: vectors, particles, and the N-body system.
//!
//! Tracking state is attached to particles as typed optional fields behind a
//! capability-tag enum ([`ParamKey`]) rather than a string-keyed store, so a
//! misspelled key is a compile error and the orbit snapshot is owned by the
//! particle itself (callers get a read-only view, never a dangling pointer).

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::orbit::OrbitElements;

/// 3D vector for positions, velocities, and accelerations.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

impl Vec3 {
    /// Create a new vector.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Zero vector.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Magnitude squared.
    #[must_use]
    pub fn magnitude_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// Magnitude (length).
    #[must_use]
    pub fn magnitude(&self) -> f64 {
        self.magnitude_squared().sqrt()
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        (*self - *other).magnitude()
    }

    /// Dot product.
    #[must_use]
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product.
    #[must_use]
    pub fn cross(&self, other: &Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    /// Normalize to unit vector (zero vector stays zero).
    #[must_use]
    pub fn normalize(&self) -> Self {
        let mag = self.magnitude();
        if mag < f64::EPSILON {
            Self::zero()
        } else {
            self.scale(1.0 / mag)
        }
    }

    /// Scale by scalar.
    #[must_use]
    pub fn scale(&self, s: f64) -> Self {
        Self {
            x: self.x * s,
            y: self.y * s,
            z: self.z * s,
        }
    }

    /// Check if all components are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl std::ops::Mul<f64> for Vec3 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        self.scale(rhs)
    }
}

impl std::ops::Neg for Vec3 {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

/// Stable particle identifier.
///
/// Assigned by the [`System`] at insertion and never reused, so a stored id
/// stays valid (or detectably stale) across particle removal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ParticleId(u64);

impl ParticleId {
    /// Raw id value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Capability tags for the typed per-particle tracking parameters.
///
/// Replaces a string-keyed heterogeneous parameter store: each tag names one
/// typed field on [`TrackState`], and presence checks go through
/// [`Particle::has`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamKey {
    /// Running minimum distance (`f64`). Presence means "tracked".
    MinDistance,
    /// Explicit reference body id; absent means the system primary.
    MinDistanceFrom,
    /// Osculating-orbit snapshot recorded at each new minimum.
    MinDistanceOrbit,
}

/// Tracking state for one particle.
///
/// Created by [`Particle::enable_tracking`]; mutated only by the
/// min-distance operator after that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackState {
    /// Smallest distance to the reference body observed so far.
    ///
    /// Initialized by the user to an upper bound (typically the current
    /// distance); monotonically non-increasing for a fixed reference.
    pub min_distance: f64,
    /// Reference body; `None` selects the system primary (index 0).
    pub reference: Option<ParticleId>,
    /// Whether to record the osculating orbit at each new minimum.
    record_orbit: bool,
    /// Snapshot storage, owned here. `None` until the first update.
    orbit: Option<OrbitElements>,
}

impl TrackState {
    /// Create tracking state seeded with an initial upper bound.
    #[must_use]
    pub const fn new(initial_distance: f64) -> Self {
        Self {
            min_distance: initial_distance,
            reference: None,
            record_orbit: false,
            orbit: None,
        }
    }

    /// Whether orbit snapshots are requested.
    #[must_use]
    pub const fn records_orbit(&self) -> bool {
        self.record_orbit
    }

    /// Read-only view of the last recorded snapshot, if any.
    #[must_use]
    pub const fn orbit(&self) -> Option<&OrbitElements> {
        self.orbit.as_ref()
    }

    /// Overwrite the snapshot in place. Tracker-internal.
    pub(crate) fn store_orbit(&mut self, elements: OrbitElements) {
        self.orbit = Some(elements);
    }
}

/// A point mass in the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    /// Stable identifier.
    pub id: ParticleId,
    /// Mass (simulation units).
    pub mass: f64,
    /// Position.
    pub position: Vec3,
    /// Velocity.
    pub velocity: Vec3,
    /// Minimum-distance tracking state; `None` means untracked.
    track: Option<TrackState>,
}

impl Particle {
    /// Enable minimum-distance tracking with an initial upper bound.
    ///
    /// Transitions the particle from untracked to tracked; there is no
    /// transition back.
    pub fn enable_tracking(&mut self, initial_distance: f64) -> &mut TrackState {
        self.track.insert(TrackState::new(initial_distance))
    }

    /// Set the reference body for distance measurement.
    ///
    /// No effect on an untracked particle.
    pub fn set_reference(&mut self, reference: ParticleId) {
        if let Some(track) = self.track.as_mut() {
            track.reference = Some(reference);
        }
    }

    /// Request an osculating-orbit snapshot at each new minimum.
    ///
    /// No effect on an untracked particle.
    pub fn enable_orbit_snapshot(&mut self) {
        if let Some(track) = self.track.as_mut() {
            track.record_orbit = true;
        }
    }

    /// Re-seed the stored minimum with a new upper bound.
    ///
    /// Intended for use after reassigning the reference body, where the old
    /// minimum has no meaning against the new target. No effect on an
    /// untracked particle.
    pub fn seed_min_distance(&mut self, value: f64) {
        if let Some(track) = self.track.as_mut() {
            track.min_distance = value;
        }
    }

    /// Check presence of a tracking parameter.
    #[must_use]
    pub fn has(&self, key: ParamKey) -> bool {
        match key {
            ParamKey::MinDistance => self.track.is_some(),
            ParamKey::MinDistanceFrom => {
                self.track.as_ref().is_some_and(|t| t.reference.is_some())
            }
            ParamKey::MinDistanceOrbit => {
                self.track.as_ref().is_some_and(TrackState::records_orbit)
            }
        }
    }

    /// Read-only tracking state, if the particle is tracked.
    #[must_use]
    pub const fn track(&self) -> Option<&TrackState> {
        self.track.as_ref()
    }

    /// Mutable tracking state. Tracker-internal.
    pub(crate) fn track_mut(&mut self) -> Option<&mut TrackState> {
        self.track.as_mut()
    }

    /// Current minimum distance, if tracked.
    #[must_use]
    pub fn min_distance(&self) -> Option<f64> {
        self.track.as_ref().map(|t| t.min_distance)
    }

    /// Kinetic energy.
    #[must_use]
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.velocity.magnitude_squared()
    }
}

/// N-body system state.
///
/// Particle index order is the evaluation order for operators; index 0 is
/// the primary body used as the default tracking reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct System {
    /// Particles in index order.
    pub particles: Vec<Particle>,
    /// Simulation time.
    pub time: f64,
    /// Gravitational constant (1.0 in natural units).
    pub g: f64,
    /// Plummer softening length.
    softening: f64,
    /// Next id to hand out.
    next_id: u64,
}

impl System {
    /// Create an empty system with the given gravitational constant.
    #[must_use]
    pub const fn new(g: f64) -> Self {
        Self {
            particles: Vec::new(),
            time: 0.0,
            g,
            softening: 0.0,
            next_id: 0,
        }
    }

    /// Create an empty system in natural units (G = 1).
    #[must_use]
    pub const fn natural_units() -> Self {
        Self::new(1.0)
    }

    /// Set the softening length.
    pub fn set_softening(&mut self, softening: f64) {
        self.softening = softening;
    }

    /// Softening length.
    #[must_use]
    pub const fn softening(&self) -> f64 {
        self.softening
    }

    /// Add a particle; returns its stable id.
    pub fn add(&mut self, mass: f64, position: Vec3, velocity: Vec3) -> ParticleId {
        let id = ParticleId(self.next_id);
        self.next_id += 1;
        self.particles.push(Particle {
            id,
            mass,
            position,
            velocity,
            track: None,
        });
        id
    }

    /// Number of particles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// True if the system holds no particles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Particle by index.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::IndexOutOfRange`] for a bad index.
    pub fn particle(&self, index: usize) -> SimResult<&Particle> {
        self.particles.get(index).ok_or(SimError::IndexOutOfRange {
            index,
            len: self.particles.len(),
        })
    }

    /// Index of a particle by id, if present.
    #[must_use]
    pub fn index_of(&self, id: ParticleId) -> Option<usize> {
        self.particles.iter().position(|p| p.id == id)
    }

    /// Id of the primary body (index 0).
    ///
    /// # Errors
    ///
    /// Returns [`SimError::EmptySystem`] if there are no particles.
    pub fn primary_id(&self) -> SimResult<ParticleId> {
        self.particles
            .first()
            .map(|p| p.id)
            .ok_or(SimError::EmptySystem)
    }

    /// Remove a particle by id; returns true if it was present.
    ///
    /// Ids of remaining particles are unchanged; indices shift.
    pub fn remove(&mut self, id: ParticleId) -> bool {
        match self.index_of(id) {
            Some(index) => {
                self.particles.remove(index);
                true
            }
            None => false,
        }
    }

    /// Total kinetic energy.
    #[must_use]
    pub fn kinetic_energy(&self) -> f64 {
        self.particles.iter().map(Particle::kinetic_energy).sum()
    }

    /// Total potential energy (pairwise, softened).
    #[must_use]
    pub fn potential_energy(&self) -> f64 {
        let mut pe = 0.0;
        let n = self.particles.len();
        let eps_sq = self.softening * self.softening;

        for i in 0..n {
            for j in (i + 1)..n {
                let r = self.particles[i].position - self.particles[j].position;
                let r_mag = (r.magnitude_squared() + eps_sq).sqrt();
                if r_mag > f64::EPSILON {
                    pe -= self.g * self.particles[i].mass * self.particles[j].mass / r_mag;
                }
            }
        }

        pe
    }

    /// Total mechanical energy.
    #[must_use]
    pub fn total_energy(&self) -> f64 {
        self.kinetic_energy() + self.potential_energy()
    }

    /// Total angular momentum vector.
    #[must_use]
    pub fn angular_momentum(&self) -> Vec3 {
        let mut l = Vec3::zero();
        for p in &self.particles {
            l = l + p.position.cross(&p.velocity).scale(p.mass);
        }
        l
    }

    /// Minimum pairwise separation between particles.
    #[must_use]
    pub fn min_separation(&self) -> f64 {
        let mut min_sep = f64::MAX;
        let n = self.particles.len();

        for i in 0..n {
            for j in (i + 1)..n {
                let sep = self.particles[i]
                    .position
                    .distance_to(&self.particles[j].position);
                if sep < min_sep {
                    min_sep = sep;
                }
            }
        }

        min_sep
    }

    /// Check if all positions and velocities are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.particles
            .iter()
            .all(|p| p.position.is_finite() && p.velocity.is_finite())
    }
}
