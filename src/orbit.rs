//! Osculating orbital elements.
//!
//! Converts Cartesian relative state to classical elements and back, under
//! two-body Keplerian assumptions. Angles are radians in `[0, 2π)`; lengths
//! and times are in whatever units the gravitational parameter implies.
//!
//! Degenerate geometries are handled explicitly: circular orbits take
//! `argp = 0` with the anomaly measured from the ascending node (or the
//! x-axis when equatorial), and equatorial orbits take `node = 0`.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::state::Vec3;

const TWO_PI: f64 = 2.0 * std::f64::consts::PI;

/// Below this eccentricity the orbit is treated as circular.
const CIRCULAR_TOL: f64 = 1e-11;

/// Below this normalized node-vector magnitude the orbit is equatorial.
const EQUATORIAL_TOL: f64 = 1e-11;

/// Classical orbital elements of an osculating two-body orbit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitElements {
    /// Semi-major axis (negative for hyperbolic orbits).
    pub a: f64,
    /// Eccentricity.
    pub e: f64,
    /// Inclination (radians).
    pub inc: f64,
    /// Longitude of the ascending node (radians).
    pub node: f64,
    /// Argument of pericenter (radians).
    pub argp: f64,
    /// True anomaly (radians).
    pub true_anomaly: f64,
}

impl OrbitElements {
    /// Compute osculating elements from a relative Cartesian state.
    ///
    /// `rel_pos` and `rel_vel` are the particle's position and velocity
    /// relative to the reference body; `mu` is `G * (m_ref + m_particle)`.
    ///
    /// # Errors
    ///
    /// - [`SimError::InvalidMu`] if `mu` is not positive and finite.
    /// - [`SimError::DegenerateOrbit`] for vanishing separation or
    ///   vanishing relative angular momentum (radial trajectories).
    pub fn from_state(rel_pos: Vec3, rel_vel: Vec3, mu: f64) -> SimResult<Self> {
        if !(mu.is_finite() && mu > 0.0) {
            return Err(SimError::InvalidMu { mu });
        }

        let r_mag = rel_pos.magnitude();
        if r_mag < f64::EPSILON {
            return Err(SimError::DegenerateOrbit {
                reason: "coincident with reference body".to_string(),
            });
        }

        // Specific angular momentum h = r x v.
        let h = rel_pos.cross(&rel_vel);
        let h_mag = h.magnitude();
        if h_mag < f64::EPSILON * r_mag.max(1.0) {
            return Err(SimError::DegenerateOrbit {
                reason: "vanishing angular momentum (radial trajectory)".to_string(),
            });
        }

        // Eccentricity vector e = (v x h) / mu - r_hat.
        let e_vec = rel_vel.cross(&h).scale(1.0 / mu) - rel_pos.scale(1.0 / r_mag);
        let e = e_vec.magnitude();

        // Semi-major axis from the vis-viva energy.
        let energy = 0.5 * rel_vel.magnitude_squared() - mu / r_mag;
        let a = if energy.abs() < f64::EPSILON * mu / r_mag {
            f64::INFINITY
        } else {
            -mu / (2.0 * energy)
        };

        let inc = (h.z / h_mag).clamp(-1.0, 1.0).acos();

        // Node vector n = z_hat x h.
        let n = Vec3::new(-h.y, h.x, 0.0);
        let n_mag = n.magnitude();
        let equatorial = n_mag < EQUATORIAL_TOL * h_mag;

        let node = if equatorial {
            0.0
        } else {
            n.y.atan2(n.x).rem_euclid(TWO_PI)
        };

        let circular = e < CIRCULAR_TOL;

        let argp = if circular {
            0.0
        } else if equatorial {
            // Longitude of pericenter measured from the x-axis.
            e_vec.y.atan2(e_vec.x).rem_euclid(TWO_PI)
        } else {
            let cos_argp = (n.dot(&e_vec) / (n_mag * e)).clamp(-1.0, 1.0);
            let argp = cos_argp.acos();
            if e_vec.z < 0.0 {
                TWO_PI - argp
            } else {
                argp
            }
        };

        let true_anomaly = if circular {
            if equatorial {
                rel_pos.y.atan2(rel_pos.x).rem_euclid(TWO_PI)
            } else {
                let cos_nu = (n.dot(&rel_pos) / (n_mag * r_mag)).clamp(-1.0, 1.0);
                let nu = cos_nu.acos();
                if rel_pos.z < 0.0 {
                    TWO_PI - nu
                } else {
                    nu
                }
            }
        } else {
            let cos_nu = (e_vec.dot(&rel_pos) / (e * r_mag)).clamp(-1.0, 1.0);
            let nu = cos_nu.acos();
            if rel_pos.dot(&rel_vel) < 0.0 {
                TWO_PI - nu
            } else {
                nu
            }
        };

        Ok(Self {
            a,
            e,
            inc,
            node,
            argp,
            true_anomaly,
        })
    }

    /// Reconstruct the relative Cartesian state from these elements.
    ///
    /// Inverse of [`from_state`](Self::from_state) via the perifocal frame.
    ///
    /// # Errors
    ///
    /// - [`SimError::InvalidMu`] if `mu` is not positive and finite.
    /// - [`SimError::DegenerateOrbit`] if the elements place the particle at
    ///   infinity (semi-latus rectum non-positive, or `1 + e cos ν ≤ 0`).
    pub fn to_state(&self, mu: f64) -> SimResult<(Vec3, Vec3)> {
        if !(mu.is_finite() && mu > 0.0) {
            return Err(SimError::InvalidMu { mu });
        }

        let semi_latus = self.a * (1.0 - self.e * self.e);
        if !(semi_latus.is_finite() && semi_latus > 0.0) {
            return Err(SimError::DegenerateOrbit {
                reason: format!("non-positive semi-latus rectum {semi_latus:.6e}"),
            });
        }

        let (sin_nu, cos_nu) = self.true_anomaly.sin_cos();
        let denom = 1.0 + self.e * cos_nu;
        if denom <= 0.0 {
            return Err(SimError::DegenerateOrbit {
                reason: "true anomaly outside the hyperbolic branch".to_string(),
            });
        }

        let r_mag = semi_latus / denom;
        let v_scale = (mu / semi_latus).sqrt();

        // Perifocal state: x toward pericenter, z along angular momentum.
        let pos_pf = Vec3::new(r_mag * cos_nu, r_mag * sin_nu, 0.0);
        let vel_pf = Vec3::new(-v_scale * sin_nu, v_scale * (self.e + cos_nu), 0.0);

        let pos = rotate_z(rotate_x(rotate_z(pos_pf, self.argp), self.inc), self.node);
        let vel = rotate_z(rotate_x(rotate_z(vel_pf, self.argp), self.inc), self.node);
        Ok((pos, vel))
    }

    /// Pericenter distance `a (1 - e)`.
    #[must_use]
    pub fn pericenter(&self) -> f64 {
        self.a * (1.0 - self.e)
    }

    /// Apocenter distance `a (1 + e)` (meaningless for unbound orbits).
    #[must_use]
    pub fn apocenter(&self) -> f64 {
        self.a * (1.0 + self.e)
    }

    /// True if the orbit is bound (elliptic).
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.e < 1.0 && self.a > 0.0 && self.a.is_finite()
    }

    /// Orbital period for a bound orbit.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::DegenerateOrbit`] for unbound orbits and
    /// [`SimError::InvalidMu`] for a non-positive `mu`.
    pub fn period(&self, mu: f64) -> SimResult<f64> {
        if !(mu.is_finite() && mu > 0.0) {
            return Err(SimError::InvalidMu { mu });
        }
        if !self.is_bound() {
            return Err(SimError::DegenerateOrbit {
                reason: "period undefined for unbound orbit".to_string(),
            });
        }
        Ok(TWO_PI * (self.a.powi(3) / mu).sqrt())
    }

    /// Check the internal consistency expected of a bound snapshot.
    #[must_use]
    pub fn is_valid_bound(&self) -> bool {
        self.a > 0.0
            && self.a.is_finite()
            && (0.0..1.0).contains(&self.e)
            && self.inc.is_finite()
            && self.node.is_finite()
            && self.argp.is_finite()
            && self.true_anomaly.is_finite()
    }
}

/// Rotate about the z-axis by `angle`.
fn rotate_z(v: Vec3, angle: f64) -> Vec3 {
    let (sin_a, cos_a) = angle.sin_cos();
    Vec3::new(
        v.x * cos_a - v.y * sin_a,
        v.x * sin_a + v.y * cos_a,
        v.z,
    )
}

/// Rotate about the x-axis by `angle`.
fn rotate_x(v: Vec3, angle: f64) -> Vec3 {
    let (sin_a, cos_a) = angle.sin_cos();
    Vec3::new(
        v.x,
        v.y * cos_a - v.z * sin_a,
        v.y * sin_a + v.z * cos_a,
    )
}
