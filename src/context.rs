// src/context.rs
use log::info;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::analyzer::MarketAnalyzer;
use crate::services::openrouter::OpenRouterClient;
use crate::services::trends::GoogleTrendsClient;
use crate::BoxError;

/// Shared, read-only state handed to every request.
pub struct AppContext {
    pub analyzer: MarketAnalyzer,
    /// Absent when no OpenRouter key is configured
    pub relay: Option<OpenRouterClient>,
    pub default_model: String,
}

impl AppContext {
    pub fn new(analyzer: MarketAnalyzer, relay: Option<OpenRouterClient>, default_model: impl Into<String>) -> Self {
        AppContext {
            analyzer,
            relay,
            default_model: default_model.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, BoxError> {
        let provider = GoogleTrendsClient::new(config.trends.clone())?;
        let analyzer = MarketAnalyzer::new(Arc::new(provider))
            .with_timeout(config.upstream_timeout)
            .with_timezone(config.timezone);
        info!(
            "Trends provider at {} (timeout {:?}, months in {})",
            config.trends.base_url, config.upstream_timeout, config.timezone
        );

        let relay = match &config.relay {
            Some(relay_config) => {
                info!("OpenRouter relay enabled, default model {}", config.default_model);
                Some(OpenRouterClient::new(relay_config.clone())?)
            }
            None => None,
        };

        Ok(AppContext::new(analyzer, relay, config.default_model.clone()))
    }

    pub fn ai_available(&self) -> bool {
        self.relay.is_some()
    }
}
