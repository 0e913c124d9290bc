//! Dispatch timing, loaded from the environment with clamped bounds.

use std::time::Duration;

pub const LEASE_TIMEOUT_ENV: &str = "POLLMCP_LEASE_TIMEOUT_MS";
pub const SWEEP_INTERVAL_ENV: &str = "POLLMCP_SWEEP_INTERVAL_MS";
pub const RESPONSE_TIMEOUT_ENV: &str = "POLLMCP_RESPONSE_TIMEOUT_SECS";

const LEASE_TIMEOUT_MS_DEFAULT: u64 = 30_000;
const LEASE_TIMEOUT_MS_MIN: u64 = 100;
const LEASE_TIMEOUT_MS_MAX: u64 = 3_600_000;

const SWEEP_INTERVAL_MS_DEFAULT: u64 = 5_000;
const SWEEP_INTERVAL_MS_MIN: u64 = 50;
const SWEEP_INTERVAL_MS_MAX: u64 = 600_000;

const RESPONSE_TIMEOUT_SECS_DEFAULT: u64 = 300;
const RESPONSE_TIMEOUT_SECS_MAX: u64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// How long a claimed item may stay unacknowledged before redelivery
    pub lease_timeout: Duration,
    /// Period of the background reactivation sweep
    pub sweep_interval: Duration,
    /// Caller-side wait for a client response; `None` waits indefinitely
    pub response_timeout: Option<Duration>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            lease_timeout: Duration::from_millis(LEASE_TIMEOUT_MS_DEFAULT),
            sweep_interval: Duration::from_millis(SWEEP_INTERVAL_MS_DEFAULT),
            response_timeout: Some(Duration::from_secs(RESPONSE_TIMEOUT_SECS_DEFAULT)),
        }
    }
}

impl DispatchConfig {
    pub fn from_env() -> Self {
        Self::from_raw(
            std::env::var(LEASE_TIMEOUT_ENV).ok(),
            std::env::var(SWEEP_INTERVAL_ENV).ok(),
            std::env::var(RESPONSE_TIMEOUT_ENV).ok(),
        )
    }

    fn from_raw(
        lease_raw: Option<String>,
        sweep_raw: Option<String>,
        response_raw: Option<String>,
    ) -> Self {
        let (lease_ms, lease_set) = parse_env_u64_with_bounds(
            lease_raw,
            LEASE_TIMEOUT_MS_MIN,
            LEASE_TIMEOUT_MS_MAX,
            LEASE_TIMEOUT_MS_DEFAULT,
        );
        let (sweep_ms, sweep_set) = parse_env_u64_with_bounds(
            sweep_raw,
            SWEEP_INTERVAL_MS_MIN,
            SWEEP_INTERVAL_MS_MAX,
            SWEEP_INTERVAL_MS_DEFAULT,
        );
        let (response_secs, response_set) = parse_env_u64_with_bounds(
            response_raw,
            0,
            RESPONSE_TIMEOUT_SECS_MAX,
            RESPONSE_TIMEOUT_SECS_DEFAULT,
        );
        if lease_set || sweep_set || response_set {
            tracing::info!(
                lease_timeout_ms = lease_ms,
                sweep_interval_ms = sweep_ms,
                response_timeout_secs = response_secs,
                "dispatch timing overridden from environment"
            );
        }

        Self {
            lease_timeout: Duration::from_millis(lease_ms),
            sweep_interval: Duration::from_millis(sweep_ms),
            // 0 disables the caller-side timeout
            response_timeout: (response_secs > 0).then(|| Duration::from_secs(response_secs)),
        }
    }
}

pub fn parse_env_bool_flag(raw: Option<String>, default: bool) -> bool {
    match raw {
        Some(value) => matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        None => default,
    }
}

/// Parse an unsigned env value, clamping into `[min, max]`. The flag reports
/// whether the raw value was usable.
pub fn parse_env_u64_with_bounds(
    raw: Option<String>,
    min: u64,
    max: u64,
    default: u64,
) -> (u64, bool) {
    match raw.and_then(|value| value.trim().parse::<u64>().ok()) {
        Some(parsed) => (parsed.clamp(min, max), true),
        None => (default, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset_or_garbage() {
        let config = DispatchConfig::from_raw(None, Some("soon".to_string()), None);
        assert_eq!(config, DispatchConfig::default());
        assert_eq!(config.lease_timeout, Duration::from_secs(30));
        assert_eq!(config.response_timeout, Some(Duration::from_secs(300)));
    }

    #[test]
    fn values_are_clamped_into_bounds() {
        let config = DispatchConfig::from_raw(
            Some("1".to_string()),
            Some("999999999".to_string()),
            None,
        );
        assert_eq!(config.lease_timeout, Duration::from_millis(LEASE_TIMEOUT_MS_MIN));
        assert_eq!(config.sweep_interval, Duration::from_millis(SWEEP_INTERVAL_MS_MAX));
    }

    #[test]
    fn zero_response_timeout_means_wait_forever() {
        let config = DispatchConfig::from_raw(None, None, Some("0".to_string()));
        assert_eq!(config.response_timeout, None);
    }

    #[test]
    fn bool_flag_accepts_common_spellings() {
        assert!(parse_env_bool_flag(Some(" Yes ".to_string()), false));
        assert!(!parse_env_bool_flag(Some("off".to_string()), true));
        assert!(parse_env_bool_flag(None, true));
    }
}
