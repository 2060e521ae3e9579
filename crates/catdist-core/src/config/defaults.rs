// Single source of truth for all default values.

// --- Policy ---
/// `None` capacity means unbounded.
pub const DEFAULT_CAPACITY: Option<f64> = None;
/// Every event weighs the same.
pub const DEFAULT_LEARNING_RATE: f64 = 1.0;
/// Weight assigned to the recurrence before the first learned event.
pub const INITIAL_EVENT_WEIGHT: f64 = 1.0;
/// Mass of a single learned event.
pub const DEFAULT_MASS: f64 = 1.0;

// --- Sampling ---
/// Above this many categories unordered sampling switches to the batch
/// algorithm plus a shuffle. Measured: batch wins from about 22 categories.
pub const DEFAULT_SAMPLING_CROSSOVER: usize = 22;
/// Number of draws when the caller does not specify one.
pub const DEFAULT_SAMPLE_COUNT: usize = 1;
