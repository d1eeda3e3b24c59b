//! Post-step invariant guard with graceful degradation.
//!
//! Checked after each accepted sub-step, the guard verifies what the tracker
//! promises: finite state, a non-increasing stored minimum for an unchanged
//! reference, and internally consistent orbit snapshots. Violations pause or
//! halt rather than crash, leaving the state inspectable.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::GuardConfig;
use crate::orbit::OrbitElements;
use crate::state::{ParticleId, System};

/// A detected invariant violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GuardViolation {
    /// Non-finite position or velocity component.
    NonFinite {
        /// Particle index.
        index: usize,
        /// Which field went non-finite.
        field: String,
    },

    /// A stored minimum increased while its reference was unchanged.
    MinDistanceIncreased {
        /// The offending particle.
        particle: ParticleId,
        /// Minimum observed at the previous check.
        previous: f64,
        /// Minimum observed now.
        current: f64,
    },

    /// An orbit snapshot whose fields contradict each other.
    InconsistentSnapshot {
        /// The offending particle.
        particle: ParticleId,
        /// Snapshot semi-major axis.
        a: f64,
        /// Snapshot eccentricity.
        e: f64,
    },
}

/// Guard verdict for one check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GuardResponse {
    /// All checks passed.
    Continue,
    /// Suspicious but survivable; integration may proceed.
    Warning {
        /// What was detected.
        violation: GuardViolation,
    },
    /// Invariant broken; pause for inspection.
    Pause {
        /// What was detected.
        violation: GuardViolation,
    },
    /// Numerical breakdown; stop.
    Halt {
        /// What was detected.
        violation: GuardViolation,
    },
}

impl GuardResponse {
    /// Whether integration may continue after this response.
    #[must_use]
    pub fn can_continue(&self) -> bool {
        matches!(self, Self::Continue | Self::Warning { .. })
    }

    /// Whether this response carries a violation.
    #[must_use]
    pub fn is_violation(&self) -> bool {
        !matches!(self, Self::Continue)
    }
}

/// Tracks per-particle minima between checks to enforce monotonicity.
#[derive(Debug, Clone, Default)]
pub struct TrackGuard {
    config: GuardConfig,
    /// Last observed (minimum, reference) per tracked particle.
    seen: HashMap<ParticleId, (f64, Option<ParticleId>)>,
}

impl TrackGuard {
    /// Create a guard with the given thresholds.
    #[must_use]
    pub fn new(config: GuardConfig) -> Self {
        Self {
            config,
            seen: HashMap::new(),
        }
    }

    /// Forget all recorded minima (e.g. after re-seeding a tracker).
    pub fn reset(&mut self) {
        self.seen.clear();
    }

    /// Check the system; worst finding wins.
    ///
    /// Recorded minima are updated as a side effect, so consecutive calls
    /// compare against the step before, not the initial state.
    pub fn check(&mut self, system: &System) -> GuardResponse {
        if let Some(halt) = self.check_finite(system) {
            return halt;
        }

        let mut worst = GuardResponse::Continue;

        for particle in &system.particles {
            let Some(track) = particle.track() else {
                continue;
            };

            let current = track.min_distance;
            if let Some(&(previous, prev_reference)) = self.seen.get(&particle.id) {
                // A reference change implicitly restarts the history, so
                // monotonicity is only enforced for an unchanged reference.
                let same_reference = prev_reference == track.reference;
                if same_reference && current > previous + self.config.monotonicity_tolerance {
                    // Keep scanning: `seen` must be brought current for every
                    // particle, or a resume after this pause would compare
                    // later particles against minima from two checks back.
                    worst = escalate(
                        worst,
                        GuardResponse::Pause {
                            violation: GuardViolation::MinDistanceIncreased {
                                particle: particle.id,
                                previous,
                                current,
                            },
                        },
                    );
                }
            }
            self.seen.insert(particle.id, (current, track.reference));

            if self.config.check_snapshots {
                if let Some(orbit) = track.orbit() {
                    if snapshot_inconsistent(orbit) {
                        worst = escalate(
                            worst,
                            GuardResponse::Warning {
                                violation: GuardViolation::InconsistentSnapshot {
                                    particle: particle.id,
                                    a: orbit.a,
                                    e: orbit.e,
                                },
                            },
                        );
                    }
                }
            }
        }

        worst
    }

    /// Halt on any non-finite position or velocity.
    fn check_finite(&self, system: &System) -> Option<GuardResponse> {
        for (index, particle) in system.particles.iter().enumerate() {
            if !particle.position.is_finite() {
                return Some(GuardResponse::Halt {
                    violation: GuardViolation::NonFinite {
                        index,
                        field: "position".to_string(),
                    },
                });
            }
            if !particle.velocity.is_finite() {
                return Some(GuardResponse::Halt {
                    violation: GuardViolation::NonFinite {
                        index,
                        field: "velocity".to_string(),
                    },
                });
            }
        }
        None
    }
}

/// Keep the more severe of two responses; the first one wins a tie.
fn escalate(current: GuardResponse, candidate: GuardResponse) -> GuardResponse {
    const fn rank(response: &GuardResponse) -> u8 {
        match response {
            GuardResponse::Continue => 0,
            GuardResponse::Warning { .. } => 1,
            GuardResponse::Pause { .. } => 2,
            GuardResponse::Halt { .. } => 3,
        }
    }

    if rank(&candidate) > rank(&current) {
        candidate
    } else {
        current
    }
}

/// A snapshot is inconsistent when its fields contradict each other: the
/// bound/unbound verdicts of `e` and `a` must agree, and all fields must be
/// finite. A genuinely hyperbolic snapshot (e > 1, a < 0) is consistent.
fn snapshot_inconsistent(orbit: &OrbitElements) -> bool {
    let finite = orbit.a.is_finite()
        && orbit.e.is_finite()
        && orbit.inc.is_finite()
        && orbit.node.is_finite()
        && orbit.argp.is_finite()
        && orbit.true_anomaly.is_finite();
    if !finite {
        return true;
    }
    if orbit.e < 0.0 {
        return true;
    }
    (orbit.e < 1.0) != (orbit.a > 0.0)
}
