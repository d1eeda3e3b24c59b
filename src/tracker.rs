//! Minimum-distance tracking operator.
//!
//! After every accepted sub-step, for each particle carrying a
//! `min_distance` parameter, measures the distance to its reference body and
//! updates the stored minimum when beaten; optionally records the osculating
//! orbit relative to the reference at that moment.
//!
//! Particles are visited in index order. Particles without the parameter are
//! never touched. A missing reference body is handled per
//! [`ReferencePolicy`]: the default skips the particle for the step and
//! counts a diagnostic; the halt policy aborts the step with an error.

use std::any::Any;

use serde::{Deserialize, Serialize};

use crate::config::ReferencePolicy;
use crate::error::{SimError, SimResult};
use crate::operator::Operator;
use crate::orbit::OrbitElements;
use crate::state::System;

/// Counters for recoverable faults and activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerDiagnostics {
    /// Tracked particles skipped because their reference was not found.
    pub skipped_unknown_reference: u64,
    /// Snapshot updates abandoned because the relative state was degenerate
    /// (the previous snapshot is kept in those cases).
    pub degenerate_snapshots: u64,
    /// Number of new minima recorded.
    pub updates: u64,
}

/// Per-step observer maintaining each tracked particle's minimum distance.
#[derive(Debug, Clone, Default)]
pub struct MinDistanceTracker {
    policy: ReferencePolicy,
    diagnostics: TrackerDiagnostics,
}

impl MinDistanceTracker {
    /// Create a tracker with the given unknown-reference policy.
    #[must_use]
    pub fn new(policy: ReferencePolicy) -> Self {
        Self {
            policy,
            diagnostics: TrackerDiagnostics::default(),
        }
    }

    /// The configured unknown-reference policy.
    #[must_use]
    pub const fn policy(&self) -> ReferencePolicy {
        self.policy
    }

    /// Diagnostic counters accumulated so far.
    #[must_use]
    pub const fn diagnostics(&self) -> TrackerDiagnostics {
        self.diagnostics
    }

    /// Evaluate one tracked particle; returns whether a minimum was stored.
    fn evaluate(&mut self, system: &mut System, index: usize) -> SimResult<bool> {
        let Some(track) = system.particle(index)?.track() else {
            return Ok(false);
        };

        // Resolve the reference: explicit id, else the system primary. The
        // primary tracking itself with no explicit reference is skipped.
        let reference_id = match track.reference {
            Some(id) => id,
            None => {
                if index == 0 {
                    return Ok(false);
                }
                system.primary_id()?
            }
        };

        let Some(ref_index) = system.index_of(reference_id) else {
            match self.policy {
                ReferencePolicy::Skip => {
                    self.diagnostics.skipped_unknown_reference += 1;
                    return Ok(false);
                }
                ReferencePolicy::Halt => {
                    return Err(SimError::UnknownReference {
                        particle: system.particles[index].id,
                        reference: reference_id,
                    });
                }
            }
        };
        if ref_index == index {
            return Ok(false);
        }

        let particle = &system.particles[index];
        let reference = &system.particles[ref_index];
        let distance = particle.position.distance_to(&reference.position);

        let Some(track) = system.particles[index].track() else {
            return Ok(false);
        };
        if distance >= track.min_distance {
            return Ok(false);
        }

        // New minimum. Recompute the osculating orbit first if requested,
        // while the reference is still borrowable.
        let snapshot = if track.records_orbit() {
            let particle = &system.particles[index];
            let reference = &system.particles[ref_index];
            let mu = system.g * (reference.mass + particle.mass);
            let rel_pos = particle.position - reference.position;
            let rel_vel = particle.velocity - reference.velocity;

            match OrbitElements::from_state(rel_pos, rel_vel, mu) {
                Ok(elements) => Some(elements),
                Err(SimError::DegenerateOrbit { .. } | SimError::InvalidMu { .. }) => {
                    // Keep the previous snapshot; the minimum still updates.
                    self.diagnostics.degenerate_snapshots += 1;
                    None
                }
                Err(err) => return Err(err),
            }
        } else {
            None
        };

        if let Some(track) = system.particles[index].track_mut() {
            track.min_distance = distance;
            if let Some(elements) = snapshot {
                track.store_orbit(elements);
            }
            self.diagnostics.updates += 1;
        }

        Ok(true)
    }
}

impl Operator for MinDistanceTracker {
    fn name(&self) -> &'static str {
        "min_distance"
    }

    fn apply(&mut self, system: &mut System) -> SimResult<()> {
        for index in 0..system.particles.len() {
            self.evaluate(system, index)?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
