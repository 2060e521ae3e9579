//! Errors raised by distribution operations.

/// Result alias for distribution operations.
pub type DistributionResult<T> = Result<T, DistributionError>;

/// Errors reported synchronously by the distribution. A failed operation
/// leaves the distribution unmodified.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DistributionError {
    /// A sequence was required but a scalar value was supplied.
    #[error("parameter is required to be an array")]
    NotAnArray,

    #[error("dump cannot be loaded: {reason}")]
    InvalidDump { reason: String },

    #[error("distribution is in unknown form: {reason}")]
    InvalidDistribution { reason: String },

    #[error("weight must be a finite non-negative number, got {value}")]
    InvalidWeight { value: f64 },

    #[error("mass must be a finite number, got {value}")]
    InvalidMass { value: f64 },

    #[error("learning rate must be a non-negative number, got {value}")]
    InvalidAdaptationRate { value: f64 },

    #[error("capacity must be a non-negative number, got {value}")]
    InvalidCapacity { value: f64 },

    /// A weight or the weight sum left the representable range even after
    /// rescaling. Indicates a policy parameter too large for `f64`.
    #[error("weight overflow during {operation}")]
    Overflow { operation: String },
}

impl DistributionError {
    pub fn invalid_dump(reason: impl Into<String>) -> Self {
        Self::InvalidDump {
            reason: reason.into(),
        }
    }

    pub fn invalid_distribution(reason: impl Into<String>) -> Self {
        Self::InvalidDistribution {
            reason: reason.into(),
        }
    }

    pub fn overflow(operation: impl Into<String>) -> Self {
        Self::Overflow {
            operation: operation.into(),
        }
    }
}
