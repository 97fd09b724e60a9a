// src/services/analyzer.rs
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::error::{AnalysisError, ProviderError};
use crate::models::{MarketReport, RelatedKeywordEntry, TimeSeriesPoint};
use crate::services::calculations::{compute_seasonality, score_competition, score_opportunity, summarize};
use crate::services::insights::derive_insights;
use crate::services::trends::{RelatedQueries, TrendsProvider};

pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

const TOP_QUERY_LIMIT: usize = 5;
const RISING_QUERY_LIMIT: usize = 3;
const BREAKOUT_POPULARITY: i64 = 100;
const DEFAULT_POPULARITY: i64 = 50;

/// Turns a keyword into a `MarketReport` using whatever `TrendsProvider` it was built with.
#[derive(Clone)]
pub struct MarketAnalyzer {
    provider: Arc<dyn TrendsProvider>,
    upstream_timeout: Duration,
    timezone: Tz,
}

impl MarketAnalyzer {
    pub fn new(provider: Arc<dyn TrendsProvider>) -> Self {
        MarketAnalyzer {
            provider,
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            timezone: chrono_tz::UTC,
        }
    }

    pub fn with_timeout(mut self, upstream_timeout: Duration) -> Self {
        self.upstream_timeout = upstream_timeout;
        self
    }

    /// Zone used to decide which calendar month a sample belongs to.
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub async fn analyze(&self, keyword: &str) -> Result<MarketReport, AnalysisError> {
        info!("Analyzing keyword \"{}\"", keyword);

        let end = Utc::now();
        let start = end - chrono::Duration::days(365);

        // Independent reads; only the series is allowed to fail the analysis
        let (series, related) = tokio::join!(
            self.fetch_series(keyword, start, end),
            self.fetch_related_queries(keyword)
        );
        let series = series?;

        let report = build_report(keyword, &series, related, &self.timezone);
        info!(
            "Analysis of \"{}\" done: popularity {}, trend {}, competition {}",
            keyword,
            report.trend.average_popularity,
            report.trend.trend_direction.as_str(),
            report.competition.score
        );
        Ok(report)
    }

    /// Interest-over-time for `[start, end]`. An empty series is an error.
    pub async fn fetch_series(
        &self,
        keyword: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeSeriesPoint>, AnalysisError> {
        let series = timeout(
            self.upstream_timeout,
            self.provider.interest_over_time(keyword, start, end),
        )
        .await
        .map_err(|_| ProviderError::Timeout(self.upstream_timeout))??;

        if series.is_empty() {
            warn!("Trends provider returned no data points for \"{}\"", keyword);
            return Err(AnalysisError::EmptySeries {
                keyword: keyword.to_string(),
            });
        }

        debug!("Fetched {} points for \"{}\"", series.len(), keyword);
        Ok(series)
    }

    /// Related keywords, or an empty list if the provider fails in any way.
    pub async fn fetch_related_queries(&self, keyword: &str) -> Vec<RelatedKeywordEntry> {
        match timeout(self.upstream_timeout, self.provider.related_queries(keyword)).await {
            Ok(Ok(related)) => related_entries(&related),
            Ok(Err(e)) => {
                warn!("Related queries for \"{}\" unavailable: {}", keyword, e);
                Vec::new()
            }
            Err(_) => {
                warn!(
                    "Related queries for \"{}\" timed out after {:?}",
                    keyword, self.upstream_timeout
                );
                Vec::new()
            }
        }
    }
}

/// First five top queries as stable, then the first three rising ones.
pub fn related_entries(related: &RelatedQueries) -> Vec<RelatedKeywordEntry> {
    let top = related.top.iter().take(TOP_QUERY_LIMIT).map(|item| RelatedKeywordEntry {
        keyword: item.query.clone(),
        popularity: item.numeric_value().unwrap_or(DEFAULT_POPULARITY),
        trend: "stable".to_string(),
    });

    let rising = related.rising.iter().take(RISING_QUERY_LIMIT).map(|item| RelatedKeywordEntry {
        keyword: item.query.clone(),
        popularity: if item.is_breakout() {
            BREAKOUT_POPULARITY
        } else {
            item.numeric_value().unwrap_or(DEFAULT_POPULARITY)
        },
        trend: "rising".to_string(),
    });

    top.chain(rising).collect()
}

/// The scoring half of the pipeline, over data that has already been fetched.
pub fn build_report(
    keyword: &str,
    series: &[TimeSeriesPoint],
    related_keywords: Vec<RelatedKeywordEntry>,
    timezone: &Tz,
) -> MarketReport {
    let trend = summarize(series);
    let seasonality = compute_seasonality(series, timezone);
    let competition = score_competition(&trend, &related_keywords);
    let opportunity = score_opportunity(&trend, &competition);
    let insights = derive_insights(keyword, &trend, &opportunity);

    MarketReport {
        keyword: keyword.to_string(),
        trend,
        seasonality,
        competition,
        opportunity,
        related_keywords,
        insights,
    }
}
