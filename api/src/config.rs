use std::time::Duration;

use pollmcp_runtime::DispatchConfig;
use pollmcp_runtime::config::{parse_env_bool_flag, parse_env_u64_with_bounds};

const PORT_ENV: &str = "PORT";
const FORECAST_DELAY_ENV: &str = "POLLMCP_FORECAST_DELAY_MS";
const MOCK_NOTIFIER_ENV: &str = "POLLMCP_MOCK_NOTIFIER_SECS";
const INTERNAL_ROUTES_ENV: &str = "POLLMCP_ENABLE_INTERNAL_ROUTES";
const CORS_ORIGINS_ENV: &str = "POLLMCP_CORS_ORIGINS";

const PORT_DEFAULT: u64 = 3000;
const FORECAST_DELAY_MS_DEFAULT: u64 = 3_000;
const FORECAST_DELAY_MS_MAX: u64 = 600_000;
const MOCK_NOTIFIER_SECS_DEFAULT: u64 = 5;
const MOCK_NOTIFIER_SECS_MAX: u64 = 3_600;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub dispatch: DispatchConfig,
    /// Simulated work time of the long-running forecast tool
    pub forecast_delay: Duration,
    /// Period of the resource-update notifier; `None` disables it
    pub mock_notifier_interval: Option<Duration>,
    /// Mounts the `/internal/*` helper routes
    pub enable_internal_routes: bool,
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: PORT_DEFAULT as u16,
            dispatch: DispatchConfig::default(),
            forecast_delay: Duration::from_millis(FORECAST_DELAY_MS_DEFAULT),
            mock_notifier_interval: Some(Duration::from_secs(MOCK_NOTIFIER_SECS_DEFAULT)),
            enable_internal_routes: true,
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let (port, _) =
            parse_env_u64_with_bounds(std::env::var(PORT_ENV).ok(), 1, u16::MAX as u64, PORT_DEFAULT);
        let (forecast_ms, _) = parse_env_u64_with_bounds(
            std::env::var(FORECAST_DELAY_ENV).ok(),
            0,
            FORECAST_DELAY_MS_MAX,
            FORECAST_DELAY_MS_DEFAULT,
        );
        let (notifier_secs, _) = parse_env_u64_with_bounds(
            std::env::var(MOCK_NOTIFIER_ENV).ok(),
            0,
            MOCK_NOTIFIER_SECS_MAX,
            MOCK_NOTIFIER_SECS_DEFAULT,
        );
        let cors_origins = std::env::var(CORS_ORIGINS_ENV)
            .map(|raw| parse_origins(&raw))
            .unwrap_or(defaults.cors_origins);

        Self {
            port: port as u16,
            dispatch: DispatchConfig::from_env(),
            forecast_delay: Duration::from_millis(forecast_ms),
            mock_notifier_interval: (notifier_secs > 0).then(|| Duration::from_secs(notifier_secs)),
            enable_internal_routes: parse_env_bool_flag(
                std::env::var(INTERNAL_ROUTES_ENV).ok(),
                true,
            ),
            cors_origins,
        }
    }

    /// Settings for in-process tests: short leases, no background notifier,
    /// instant forecasts.
    pub fn for_tests() -> Self {
        Self {
            dispatch: DispatchConfig {
                lease_timeout: Duration::from_millis(500),
                sweep_interval: Duration::from_secs(3_600),
                response_timeout: Some(Duration::from_secs(30)),
            },
            forecast_delay: Duration::ZERO,
            mock_notifier_interval: None,
            ..Self::default()
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
