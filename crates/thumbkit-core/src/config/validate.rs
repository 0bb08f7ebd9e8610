//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.parallel == 0 {
            return Err(ConfigError::ValidationError(
                "fetch.parallel must be > 0".into(),
            ));
        }
        if !(0..=20).contains(&self.queue.wait_time_seconds) {
            return Err(ConfigError::ValidationError(
                "queue.wait_time_seconds must be between 0 and 20".into(),
            ));
        }
        if self.queue.retry_delay_ms == 0 {
            return Err(ConfigError::ValidationError(
                "queue.retry_delay_ms must be > 0".into(),
            ));
        }
        if self.queue.max_backoff_ms < self.queue.retry_delay_ms {
            return Err(ConfigError::ValidationError(
                "queue.max_backoff_ms must be >= queue.retry_delay_ms".into(),
            ));
        }
        if self.queue.queue_name.is_empty() && self.queue.queue_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "one of queue.queue_name or queue.queue_url must be set".into(),
            ));
        }
        if self.transform.default_quality == 0 || self.transform.default_quality > 100 {
            return Err(ConfigError::ValidationError(
                "transform.default_quality must be between 1 and 100".into(),
            ));
        }
        if self.transform.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "transform.timeout_ms must be > 0".into(),
            ));
        }
        if self.transform.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "transform.max_image_dimension must be > 0".into(),
            ));
        }
        if self.notify.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "notify.timeout_ms must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_fetch_parallel() {
        let mut config = Config::default();
        config.fetch.parallel = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("fetch.parallel"));
    }

    #[test]
    fn test_validate_rejects_long_wait_time() {
        let mut config = Config::default();
        config.queue.wait_time_seconds = 21;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("wait_time_seconds"));
    }

    #[test]
    fn test_validate_rejects_backoff_cap_below_base() {
        let mut config = Config::default();
        config.queue.retry_delay_ms = 5000;
        config.queue.max_backoff_ms = 1000;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_backoff_ms"));
    }

    #[test]
    fn test_validate_rejects_invalid_quality() {
        let mut config = Config::default();
        config.transform.default_quality = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("default_quality"));

        config.transform.default_quality = 101;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("default_quality"));
    }

    #[test]
    fn test_validate_requires_queue_location() {
        let mut config = Config::default();
        config.queue.queue_name.clear();
        config.queue.queue_url.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("queue_name"));
    }
}
