//! Shared constants for the categorical distribution engine.

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable read by `init_tracing`.
pub const LOG_ENV_VAR: &str = "CATDIST_LOG";

/// Filter used when `CATDIST_LOG` is unset or unparsable.
pub const DEFAULT_LOG_FILTER: &str = "catdist=info";

/// Default print precision (digits after the decimal point).
pub const DEFAULT_PRINT_PRECISION: usize = 2;

/// Upper bound for the print precision.
pub const MAX_PRINT_PRECISION: usize = 10;

/// Tolerance used when checking `weightSum` against a full scan.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;
