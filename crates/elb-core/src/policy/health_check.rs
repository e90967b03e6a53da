//! Health check normalization
//!
//! Turns the service owner's descriptor into the configuration the control
//! plane expects: the target gains the protocol and instance port, and
//! every unset numeric field receives its default independently.

use crate::definition::HealthCheck;
use crate::traits::HealthCheckConfig;

/// Target sentinel selecting a plain TCP check
pub const TCP_TARGET: &str = "TCP";

/// Default seconds between checks
pub const DEFAULT_INTERVAL_SECS: u32 = 30;

/// Default consecutive successes before healthy
pub const DEFAULT_HEALTHY_THRESHOLD: u32 = 2;

/// Default seconds before a check times out
pub const DEFAULT_TIMEOUT_SECS: u32 = 10;

/// Default consecutive failures before unhealthy
pub const DEFAULT_UNHEALTHY_THRESHOLD: u32 = 10;

impl HealthCheck {
    /// Build the normalized configuration for checks against `instance_port`
    ///
    /// `"TCP"` becomes `TCP:<port>`; any other target is treated as a path
    /// and becomes `HTTPS:<port><path>`.
    pub fn normalize(&self, instance_port: u16) -> HealthCheckConfig {
        HealthCheckConfig {
            target: normalize_target(&self.target, instance_port),
            interval: self.interval.unwrap_or(DEFAULT_INTERVAL_SECS),
            healthy_threshold: self.healthy_threshold.unwrap_or(DEFAULT_HEALTHY_THRESHOLD),
            unhealthy_threshold: self
                .unhealthy_threshold
                .unwrap_or(DEFAULT_UNHEALTHY_THRESHOLD),
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
    }
}

fn normalize_target(target: &str, instance_port: u16) -> String {
    if target == TCP_TARGET {
        format!("TCP:{}", instance_port)
    } else {
        format!("HTTPS:{}{}", instance_port, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_fields_take_defaults() {
        let config = HealthCheck::new("/health").normalize(32768);

        assert_eq!(config.target, "HTTPS:32768/health");
        assert_eq!(config.interval, 30);
        assert_eq!(config.healthy_threshold, 2);
        assert_eq!(config.timeout, 10);
        assert_eq!(config.unhealthy_threshold, 10);
    }

    #[test]
    fn tcp_sentinel_targets_the_port() {
        let config = HealthCheck::new("TCP").normalize(31000);
        assert_eq!(config.target, "TCP:31000");
    }

    #[test]
    fn set_fields_are_kept_individually() {
        let descriptor = HealthCheck {
            target: "/ping".to_string(),
            interval: Some(5),
            healthy_threshold: None,
            unhealthy_threshold: Some(3),
            timeout: None,
        };

        let config = descriptor.normalize(8080);

        assert_eq!(config.interval, 5);
        assert_eq!(config.healthy_threshold, 2);
        assert_eq!(config.unhealthy_threshold, 3);
        assert_eq!(config.timeout, 10);
    }

    #[test]
    fn descriptor_is_left_untouched() {
        let descriptor = HealthCheck::new("/health");
        let _ = descriptor.normalize(1234);
        assert_eq!(descriptor.target, "/health");
        assert_eq!(descriptor.interval, None);
    }
}
