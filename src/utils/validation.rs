//! Centralized validation helpers.

use crate::core::error::ConfigError;

/// Capacity of each pipeline queue unless configured otherwise
pub const DEFAULT_QUEUE_CAPACITY: usize = 2 << 16;

/// Largest worker pool accepted from configuration
pub const MAX_THREADS: usize = 1024;

/// True if the inclusive window `start..=end` lies inside a sequence of `length` bases.
///
/// # Examples
///
/// ```
/// use map_refine::utils::validation::window_fits;
///
/// assert!(window_fits(0, 9, 10));
/// assert!(!window_fits(0, 10, 10));
/// assert!(!window_fits(5, 4, 10));
/// ```
#[must_use]
pub fn window_fits(start: usize, end: usize, length: usize) -> bool {
    start <= end && end < length
}

/// Validate a percentage identity threshold (0 disables the bound).
///
/// # Errors
///
/// Returns `ConfigError::InvalidSetting` unless `0 <= pct <= 100`.
pub fn validate_identity(pct: f64) -> Result<f64, ConfigError> {
    if pct.is_finite() && (0.0..=100.0).contains(&pct) {
        Ok(pct)
    } else {
        Err(ConfigError::InvalidSetting(format!(
            "percentage identity must be between 0 and 100, got {pct}"
        )))
    }
}

/// Validate the worker count.
///
/// # Errors
///
/// Returns `ConfigError::InvalidSetting` if `threads` is 0 or above [`MAX_THREADS`].
pub fn validate_threads(threads: usize) -> Result<usize, ConfigError> {
    if (1..=MAX_THREADS).contains(&threads) {
        Ok(threads)
    } else {
        Err(ConfigError::InvalidSetting(format!(
            "thread count must be between 1 and {MAX_THREADS}, got {threads}"
        )))
    }
}

/// Validate a queue capacity.
///
/// # Errors
///
/// Returns `ConfigError::InvalidSetting` if `capacity` is 0.
pub fn validate_queue_capacity(capacity: usize) -> Result<usize, ConfigError> {
    if capacity == 0 {
        Err(ConfigError::InvalidSetting(
            "queue capacity must be at least 1".to_string(),
        ))
    } else {
        Ok(capacity)
    }
}
