use serde::Deserialize;

use super::auth_config::ConfigError;
use super::defaults;

/// Thresholds applied to one device class by the login throttle. Mobile
/// clients get looser numbers than desktop because mobile network stacks and
/// app frameworks legitimately retry more aggressively.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct DeviceLimits {
    pub max_requests: u32,
    pub min_interval_ms: u64,
    pub max_consecutive_fast: u32,
    pub hard_fast_ms: u64,
    pub high_frequency_floor: u32,
    pub high_frequency_interval_ms: u64,
    pub block_seconds: u64,
}

impl DeviceLimits {
    pub fn desktop() -> Self {
        Self {
            max_requests: 20,
            min_interval_ms: 300,
            max_consecutive_fast: 12,
            hard_fast_ms: 100,
            high_frequency_floor: 10,
            high_frequency_interval_ms: 200,
            block_seconds: 10,
        }
    }

    pub fn mobile() -> Self {
        Self {
            max_requests: 30,
            min_interval_ms: 200,
            max_consecutive_fast: 18,
            hard_fast_ms: 50,
            high_frequency_floor: 15,
            high_frequency_interval_ms: 150,
            block_seconds: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ThrottleConfig {
    #[serde(default = "defaults::default_throttle_window_seconds")]
    pub window_seconds: u64,
    #[serde(default = "DeviceLimits::desktop")]
    pub desktop: DeviceLimits,
    #[serde(default = "DeviceLimits::mobile")]
    pub mobile: DeviceLimits,
    #[serde(default = "defaults::default_loop_max_attempts")]
    pub loop_max_attempts: u32,
    #[serde(default = "defaults::default_loop_window_ms")]
    pub loop_window_ms: u64,
    #[serde(default = "defaults::default_loop_block_seconds")]
    pub loop_block_seconds: u64,
    #[serde(default = "defaults::default_throttle_retention_seconds")]
    pub retention_seconds: u64,
    #[serde(default = "defaults::default_throttle_max_tracked_keys")]
    pub max_tracked_keys: usize,
    #[serde(default = "defaults::default_throttle_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            window_seconds: defaults::default_throttle_window_seconds(),
            desktop: DeviceLimits::desktop(),
            mobile: DeviceLimits::mobile(),
            loop_max_attempts: defaults::default_loop_max_attempts(),
            loop_window_ms: defaults::default_loop_window_ms(),
            loop_block_seconds: defaults::default_loop_block_seconds(),
            retention_seconds: defaults::default_throttle_retention_seconds(),
            max_tracked_keys: defaults::default_throttle_max_tracked_keys(),
            sweep_interval_seconds: defaults::default_throttle_sweep_interval_seconds(),
        }
    }
}

impl ThrottleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_seconds == 0 {
            return Err(ConfigError::Invalid(
                "throttle.window_seconds must be greater than zero".to_string(),
            ));
        }

        if self.loop_window_ms == 0 || self.loop_block_seconds == 0 {
            return Err(ConfigError::Invalid(
                "throttle loop guard window and block must be greater than zero".to_string(),
            ));
        }

        for (class, limits) in [("desktop", &self.desktop), ("mobile", &self.mobile)] {
            if limits.max_requests == 0 || limits.max_consecutive_fast == 0 {
                return Err(ConfigError::Invalid(format!(
                    "throttle.{class} request limits must be greater than zero"
                )));
            }
        }

        if self.max_tracked_keys == 0 {
            return Err(ConfigError::Invalid(
                "throttle.max_tracked_keys must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
