// src/config.rs
use chrono_tz::Tz;
use log::warn;
use std::env;
use std::time::Duration;

use crate::services::analyzer::DEFAULT_UPSTREAM_TIMEOUT;
use crate::services::openrouter::{self, RelayConfig};
use crate::services::trends::{self, TrendsConfig};

/// Everything the server reads from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub trends: TrendsConfig,
    pub timezone: Tz,
    pub upstream_timeout: Duration,
    /// `None` when OPENROUTER_API_KEY is unset; AI features are then disabled
    pub relay: Option<RelayConfig>,
    pub default_model: String,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parsed_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("${} has an invalid value {:?}, using the default", name, raw);
            default
        }),
        Err(_) => default,
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let port = parsed_or("PORT", 3030u16);

        let timezone = parsed_or("TRENDS_TIMEZONE", chrono_tz::UTC);
        let upstream_timeout = Duration::from_secs(parsed_or(
            "UPSTREAM_TIMEOUT_SECS",
            DEFAULT_UPSTREAM_TIMEOUT.as_secs(),
        ));

        let trends = TrendsConfig {
            base_url: var_or("TRENDS_BASE_URL", trends::DEFAULT_BASE_URL),
            hl: var_or("TRENDS_HL", "en-US"),
            tz_offset: parsed_or("TRENDS_TZ_OFFSET", 0),
            geo: env::var("TRENDS_GEO").unwrap_or_default(),
        };

        let relay = match env::var("OPENROUTER_API_KEY") {
            Ok(api_key) if !api_key.trim().is_empty() => Some(RelayConfig {
                api_key,
                base_url: var_or("OPENROUTER_BASE_URL", openrouter::DEFAULT_BASE_URL),
                site_url: var_or("SITE_URL", "https://localhost:3000"),
                site_name: var_or("SITE_NAME", "POD Market Analyzer"),
                timeout: Duration::from_secs(parsed_or("OPENROUTER_TIMEOUT_SECS", 60)),
            }),
            _ => {
                warn!("OPENROUTER_API_KEY not set, AI features disabled");
                None
            }
        };

        AppConfig {
            port,
            trends,
            timezone,
            upstream_timeout,
            relay,
            default_model: var_or("OPENROUTER_MODEL", openrouter::DEFAULT_MODEL),
        }
    }
}
