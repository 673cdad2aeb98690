//! Transcript store configuration.

use crate::error::{StorageError, StorageResult};
use std::time::Duration;

/// Default size of one slice in the chunked representation (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Default number of compressed write attempts before falling back to chunks.
pub const MAX_RETRIES: u32 = 3;

/// Default gzip compression level.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Configuration for a transcript store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Size of one slice in the chunked representation.
    pub chunk_size: usize,

    /// Gzip compression level (0-9).
    pub compression_level: u32,

    /// Retry policy for the compressed write path.
    pub retry: RetryConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            retry: RetryConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the slice size of the chunked representation.
    #[must_use]
    pub const fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Sets the gzip compression level. Values above 9 are clamped.
    #[must_use]
    pub fn compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.min(9);
        self
    }

    /// Sets the compressed-path retry policy.
    #[must_use]
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Checks that the configuration can drive a store.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidConfig`] if `chunk_size` or
    /// `retry.max_attempts` is zero.
    pub fn validate(&self) -> StorageResult<()> {
        if self.chunk_size == 0 {
            return Err(StorageError::InvalidConfig(
                "chunk_size must be greater than zero".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(StorageError::InvalidConfig(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Retry policy for compressed writes.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of compressed write attempts.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Creates a retry configuration with immediate retries.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }

    /// Creates a configuration that falls back after a single failure.
    pub fn no_retry() -> Self {
        Self::new(1)
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Calculates the delay before attempt number `attempt` (1-indexed).
    ///
    /// The first attempt never waits.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 || self.initial_delay.is_zero() {
            return Duration::ZERO;
        }

        let base = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powi(attempt.saturating_sub(2) as i32);

        Duration::from_secs_f64(base.min(self.max_delay.as_secs_f64()))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(MAX_RETRIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.chunk_size, 1_048_576);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.compression_level, 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_pattern() {
        let config = StoreConfig::new()
            .chunk_size(16)
            .compression_level(42)
            .retry(RetryConfig::no_retry());

        assert_eq!(config.chunk_size, 16);
        assert_eq!(config.compression_level, 9);
        assert_eq!(config.retry.max_attempts, 1);
    }

    #[test]
    fn zero_chunk_size_rejected() {
        let result = StoreConfig::new().chunk_size(0).validate();
        assert!(matches!(result, Err(StorageError::InvalidConfig(_))));
    }

    #[test]
    fn zero_attempts_rejected() {
        let result = StoreConfig::new().retry(RetryConfig::new(0)).validate();
        assert!(matches!(result, Err(StorageError::InvalidConfig(_))));
    }

    #[test]
    fn default_retries_are_immediate() {
        let retry = RetryConfig::default();
        for attempt in 1..=3 {
            assert_eq!(retry.delay_for_attempt(attempt), Duration::ZERO);
        }
    }

    #[test]
    fn retry_delay_backoff() {
        let retry = RetryConfig::new(5)
            .with_initial_delay(Duration::from_millis(100))
            .with_backoff_multiplier(2.0);

        assert_eq!(retry.delay_for_attempt(1), Duration::ZERO);
        assert_eq!(retry.delay_for_attempt(2), Duration::from_millis(100));
        assert_eq!(retry.delay_for_attempt(3), Duration::from_millis(200));
        assert_eq!(retry.delay_for_attempt(4), Duration::from_millis(400));
    }

    #[test]
    fn retry_delay_respects_max() {
        let retry = RetryConfig::new(10)
            .with_initial_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(3));

        assert_eq!(retry.delay_for_attempt(8), Duration::from_secs(3));
    }
}
