//! Error types for periapse.
//!
//! All fallible library operations return `Result<T, SimError>` instead of
//! panicking; faults detected mid-integration surface either as errors (halt
//! policy) or as guard responses and diagnostic counters (skip policy).

use crate::state::ParticleId;
use thiserror::Error;

/// Result type alias for periapse operations.
pub type SimResult<T> = Result<T, SimError>;

/// Unified error type for all periapse operations.
#[derive(Debug, Error)]
pub enum SimError {
    /// Numerical instability detected (NaN or Inf).
    #[error("non-finite value detected at {location}")]
    NonFiniteValue {
        /// Location where the non-finite value was detected.
        location: String,
    },

    /// A tracked particle names a reference body that is not in the system.
    ///
    /// Only returned under [`ReferencePolicy::Halt`]; the default policy
    /// skips the particle and records a diagnostic instead.
    ///
    /// [`ReferencePolicy::Halt`]: crate::config::ReferencePolicy::Halt
    #[error("particle {particle:?} references unknown body {reference:?}")]
    UnknownReference {
        /// The tracked particle.
        particle: ParticleId,
        /// The missing reference body.
        reference: ParticleId,
    },

    /// Operator factory lookup failed.
    #[error("unknown operator '{name}'")]
    UnknownOperator {
        /// The requested operator name.
        name: String,
    },

    /// Osculating elements cannot be computed from the given state.
    #[error("degenerate orbit state: {reason}")]
    DegenerateOrbit {
        /// Why the element computation failed.
        reason: String,
    },

    /// Invalid gravitational parameter (mu must be positive and finite).
    #[error("invalid gravitational parameter mu = {mu:.6e}")]
    InvalidMu {
        /// The offending value.
        mu: f64,
    },

    /// A particle index is out of range for the system.
    #[error("particle index {index} out of range (system has {len} particles)")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of particles in the system.
        len: usize,
    },

    /// The system is empty where at least one particle is required.
    #[error("operation requires a non-empty system")]
    EmptySystem,

    /// Invalid configuration parameter.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// Schema validation error.
    #[error("validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimError {
    /// Create a configuration error from a message.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// True if the error indicates numerical breakdown rather than misuse.
    #[must_use]
    pub fn is_numerical(&self) -> bool {
        matches!(
            self,
            Self::NonFiniteValue { .. } | Self::DegenerateOrbit { .. }
        )
    }
}
