//! Application configuration, loaded from environment variables.
//!
//! Every knob has a validated default; malformed values are reported and
//! replaced with the default instead of aborting startup.

use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use tracing::warn;

/// Complete application configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub planner: PlannerConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            planner: PlannerConfig::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;

    fn from_env() -> Self {
        let host_value =
            env_string("STOWAGE_API_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, effective_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                warn!(
                    "Could not parse STOWAGE_API_HOST ('{}'): {}. Using {}.",
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    Self::DEFAULT_HOST
                        .parse::<IpAddr>()
                        .expect("Default host must be valid"),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match env_string("STOWAGE_API_PORT") {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    warn!("STOWAGE_API_PORT must not be 0. Using {}.", Self::DEFAULT_PORT);
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    warn!(
                        "Could not parse STOWAGE_API_PORT ('{}'): {}. Using {}.",
                        raw,
                        err,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host: effective_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    /// Configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether the server binds to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }
}

/// Configuration for the planning engine.
///
/// Holds the enumerated defaults for loosely specified item fields and the
/// resource bounds of the placement search.
#[derive(Clone, Debug)]
pub struct PlannerConfig {
    /// Zone assumed for items without a preferred zone.
    pub default_zone: String,
    /// Priority assumed for items without one (lowest).
    pub default_priority: i32,
    /// Fraction of the weight limit the return planner may fill.
    pub return_fill_ratio: f64,
    /// Upper bound on candidate evaluations per packing attempt.
    pub max_candidate_checks: usize,
    /// General numerical tolerance.
    pub general_epsilon: f64,
}

impl PlannerConfig {
    pub const DEFAULT_ZONE: &'static str = "A";
    pub const DEFAULT_PRIORITY: i32 = 0;
    pub const DEFAULT_RETURN_FILL_RATIO: f64 = 0.95;
    pub const DEFAULT_MAX_CANDIDATE_CHECKS: usize = 10_000;
    pub const DEFAULT_GENERAL_EPSILON: f64 = 1e-6;

    const ZONE_VAR: &'static str = "STOWAGE_DEFAULT_ZONE";
    const PRIORITY_VAR: &'static str = "STOWAGE_DEFAULT_PRIORITY";
    const FILL_RATIO_VAR: &'static str = "STOWAGE_RETURN_FILL_RATIO";
    const CANDIDATE_CHECKS_VAR: &'static str = "STOWAGE_MAX_CANDIDATE_CHECKS";
    const EPSILON_VAR: &'static str = "STOWAGE_GENERAL_EPSILON";

    /// Creates a builder for custom configuration.
    pub fn builder() -> PlannerConfigBuilder {
        PlannerConfigBuilder::default()
    }

    fn from_env() -> Self {
        let default_zone =
            env_string(Self::ZONE_VAR).unwrap_or_else(|| Self::DEFAULT_ZONE.to_string());

        let default_priority = match env_string(Self::PRIORITY_VAR) {
            Some(raw) => match raw.parse::<i32>() {
                Ok(value) => value,
                Err(err) => {
                    warn!(
                        "Could not parse {} ('{}') as integer: {}. Using {}.",
                        Self::PRIORITY_VAR,
                        raw,
                        err,
                        Self::DEFAULT_PRIORITY
                    );
                    Self::DEFAULT_PRIORITY
                }
            },
            None => Self::DEFAULT_PRIORITY,
        };

        let return_fill_ratio = load_f64_with_warning(
            Self::FILL_RATIO_VAR,
            Self::DEFAULT_RETURN_FILL_RATIO,
            |value| (0.0..=1.0).contains(&value),
            "must be between 0 and 1",
            "Adjusted return fill ratio changes the overfill safety margin",
        );

        let max_candidate_checks = match env_string(Self::CANDIDATE_CHECKS_VAR) {
            Some(raw) => match raw.parse::<usize>() {
                Ok(value) if value > 0 => value,
                Ok(_) => {
                    warn!(
                        "{} must be greater than 0. Using {}.",
                        Self::CANDIDATE_CHECKS_VAR,
                        Self::DEFAULT_MAX_CANDIDATE_CHECKS
                    );
                    Self::DEFAULT_MAX_CANDIDATE_CHECKS
                }
                Err(err) => {
                    warn!(
                        "Could not parse {} ('{}') as number: {}. Using {}.",
                        Self::CANDIDATE_CHECKS_VAR,
                        raw,
                        err,
                        Self::DEFAULT_MAX_CANDIDATE_CHECKS
                    );
                    Self::DEFAULT_MAX_CANDIDATE_CHECKS
                }
            },
            None => Self::DEFAULT_MAX_CANDIDATE_CHECKS,
        };

        let general_epsilon = load_f64_with_warning(
            Self::EPSILON_VAR,
            Self::DEFAULT_GENERAL_EPSILON,
            |value| value > 0.0,
            "must be greater than 0",
            "Adjusted tolerances may cause numerical instabilities",
        );

        Self {
            default_zone,
            default_priority,
            return_fill_ratio,
            max_candidate_checks,
            general_epsilon,
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            default_zone: Self::DEFAULT_ZONE.to_string(),
            default_priority: Self::DEFAULT_PRIORITY,
            return_fill_ratio: Self::DEFAULT_RETURN_FILL_RATIO,
            max_candidate_checks: Self::DEFAULT_MAX_CANDIDATE_CHECKS,
            general_epsilon: Self::DEFAULT_GENERAL_EPSILON,
        }
    }
}

/// Builder for `PlannerConfig`.
#[derive(Clone, Debug, Default)]
pub struct PlannerConfigBuilder {
    config: PlannerConfig,
}

impl PlannerConfigBuilder {
    /// Sets the zone assumed for items without one.
    pub fn default_zone(mut self, zone: impl Into<String>) -> Self {
        self.config.default_zone = zone.into();
        self
    }

    /// Sets the priority assumed for items without one.
    pub fn default_priority(mut self, priority: i32) -> Self {
        self.config.default_priority = priority;
        self
    }

    /// Sets the return-planner fill ratio.
    pub fn return_fill_ratio(mut self, ratio: f64) -> Self {
        self.config.return_fill_ratio = ratio;
        self
    }

    /// Sets the candidate-evaluation cap.
    pub fn max_candidate_checks(mut self, checks: usize) -> Self {
        self.config.max_candidate_checks = checks;
        self
    }

    /// Sets the general tolerance.
    pub fn general_epsilon(mut self, epsilon: f64) -> Self {
        self.config.general_epsilon = epsilon;
        self
    }

    /// Builds the final configuration.
    pub fn build(self) -> PlannerConfig {
        self.config
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!("Access to {} failed: {}. Using default value.", name, err);
            None
        }
    }
}

fn load_f64_with_warning(
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    warning: &str,
) -> f64 {
    match env_string(var_name) {
        Some(raw) => match raw.parse::<f64>() {
            Ok(value) => {
                if !validator(value) {
                    warn!(
                        "{} contains invalid value '{}': {}. Using {}.",
                        var_name, raw, invalid_hint, default
                    );
                    default
                } else {
                    let tolerance = (default.abs().max(1.0)) * 1e-9;
                    if (value - default).abs() > tolerance {
                        warn!("{} ({} = {}).", warning, var_name, value);
                    }
                    value
                }
            }
            Err(err) => {
                warn!(
                    "Could not parse {} ('{}') as number: {}. Using {}.",
                    var_name, raw, err, default
                );
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = PlannerConfig::builder()
            .default_zone("C")
            .default_priority(1)
            .return_fill_ratio(0.8)
            .max_candidate_checks(500)
            .build();

        assert_eq!(config.default_zone, "C");
        assert_eq!(config.default_priority, 1);
        assert!((config.return_fill_ratio - 0.8).abs() < 1e-12);
        assert_eq!(config.max_candidate_checks, 500);
        assert!((config.general_epsilon - PlannerConfig::DEFAULT_GENERAL_EPSILON).abs() < 1e-12);
    }

    #[test]
    fn default_matches_constants() {
        let config = PlannerConfig::default();
        assert_eq!(config.default_zone, PlannerConfig::DEFAULT_ZONE);
        assert_eq!(config.default_priority, PlannerConfig::DEFAULT_PRIORITY);
        assert!(
            (config.return_fill_ratio - PlannerConfig::DEFAULT_RETURN_FILL_RATIO).abs() < 1e-12
        );
    }

    #[test]
    fn load_f64_rejects_invalid_values() {
        // No env var set: default wins.
        let value = load_f64_with_warning(
            "STOWAGE_TEST_UNSET_VAR",
            0.5,
            |v| (0.0..=1.0).contains(&v),
            "must be between 0 and 1",
            "warning",
        );
        assert!((value - 0.5).abs() < 1e-12);
    }
}
