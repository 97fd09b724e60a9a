// src/services/trends.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ProviderError;
use crate::models::TimeSeriesPoint;

pub const DEFAULT_BASE_URL: &str = "https://trends.google.com";

const TIMESERIES_WIDGET: &str = "TIMESERIES";
const RELATED_QUERIES_WIDGET: &str = "RELATED_QUERIES";

/// Connection settings for the Google Trends widget API.
#[derive(Debug, Clone)]
pub struct TrendsConfig {
    pub base_url: String,
    /// Interface language, e.g. "en-US"
    pub hl: String,
    /// Minutes offset from UTC, as Google expects it
    pub tz_offset: i32,
    /// Empty string means worldwide
    pub geo: String,
}

impl Default for TrendsConfig {
    fn default() -> Self {
        TrendsConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            hl: "en-US".to_string(),
            tz_offset: 0,
            geo: String::new(),
        }
    }
}

/// A related-query value is a number for ranked entries, but may be text such as "Breakout".
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedQuery {
    pub query: String,
    pub value: QueryValue,
    #[serde(default)]
    pub formatted_value: Option<String>,
}

impl RankedQuery {
    pub fn is_breakout(&self) -> bool {
        let breakout = |s: &str| s.trim().eq_ignore_ascii_case("breakout");
        matches!(&self.value, QueryValue::Text(s) if breakout(s.as_str()))
            || self.formatted_value.as_deref().map_or(false, breakout)
    }

    /// Numeric value, reading text values like "+250%" by their leading integer.
    pub fn numeric_value(&self) -> Option<i64> {
        match &self.value {
            QueryValue::Number(n) if n.is_finite() => Some(n.round() as i64),
            QueryValue::Number(_) => None,
            QueryValue::Text(s) => parse_leading_int(s),
        }
    }
}

fn parse_leading_int(text: &str) -> Option<i64> {
    let text = text.trim();
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, text.strip_prefix('+').unwrap_or(text)),
    };
    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

/// The two ranked lists Google returns for a keyword.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelatedQueries {
    pub top: Vec<RankedQuery>,
    pub rising: Vec<RankedQuery>,
}

/// Source of search-interest data. The pipeline only talks to this trait.
#[async_trait]
pub trait TrendsProvider: Send + Sync {
    async fn interest_over_time(
        &self,
        keyword: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeSeriesPoint>, ProviderError>;

    async fn related_queries(&self, keyword: &str) -> Result<RelatedQueries, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct ExploreResponse {
    widgets: Vec<Widget>,
}

#[derive(Debug, Clone, Deserialize)]
struct Widget {
    id: String,
    token: String,
    request: Value,
}

#[derive(Debug, Deserialize)]
struct TimelineEnvelope {
    default: TimelineDefault,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimelineDefault {
    timeline_data: Vec<TimelineEntry>,
}

#[derive(Debug, Deserialize)]
struct TimelineEntry {
    time: Timestamp,
    #[serde(default)]
    value: Vec<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Timestamp {
    Number(i64),
    Text(String),
}

impl Timestamp {
    fn seconds(&self) -> Result<i64, ProviderError> {
        match self {
            Timestamp::Number(n) => Ok(*n),
            Timestamp::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| ProviderError::Decode(format!("timeline time {:?} is not epoch seconds", s))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RelatedEnvelope {
    default: RelatedDefault,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelatedDefault {
    ranked_list: Vec<RankedList>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RankedList {
    #[serde(default)]
    ranked_keyword: Vec<RankedQuery>,
}

/// Google prefixes JSON bodies with junk like `)]}',` to defeat XSSI.
pub fn strip_xssi_prefix(body: &str) -> &str {
    match body.find('{') {
        Some(start) => &body[start..],
        None => body,
    }
}

pub fn format_time_window(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    format!("{} {}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"))
}

/// Turn a multiline widget body into points.
pub fn decode_timeline(body: &str) -> Result<Vec<TimeSeriesPoint>, ProviderError> {
    let envelope: TimelineEnvelope = serde_json::from_str(strip_xssi_prefix(body))
        .map_err(|e| ProviderError::Decode(format!("expected default.timelineData: {}", e)))?;

    envelope
        .default
        .timeline_data
        .iter()
        .map(|entry| {
            let value = entry.value.first().copied().unwrap_or(0);
            Ok(TimeSeriesPoint::new(entry.time.seconds()?, value))
        })
        .collect()
}

/// Turn a relatedsearches widget body into the top (index 0) and rising (index 1) lists.
pub fn decode_related(body: &str) -> Result<RelatedQueries, ProviderError> {
    let envelope: RelatedEnvelope = serde_json::from_str(strip_xssi_prefix(body))
        .map_err(|e| ProviderError::Decode(format!("expected default.rankedList: {}", e)))?;

    let mut lists = envelope.default.ranked_list.into_iter();
    let top = lists.next().map(|l| l.ranked_keyword).unwrap_or_default();
    let rising = lists.next().map(|l| l.ranked_keyword).unwrap_or_default();

    Ok(RelatedQueries { top, rising })
}

pub struct GoogleTrendsClient {
    client: Client,
    config: TrendsConfig,
}

impl GoogleTrendsClient {
    pub fn new(config: TrendsConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .cookie_store(true)
            .build()?;

        Ok(GoogleTrendsClient { client, config })
    }

    async fn get_text(&self, path: &str, query: &[(&str, &str)]) -> Result<String, ProviderError> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        let tz = self.config.tz_offset.to_string();

        // Google answers the first cookieless request with 429 and a cookie; the second one goes through
        for attempt in 0..2 {
            debug!("GET {} (attempt {})", url, attempt + 1);
            let response = self
                .client
                .get(&url)
                .query(&[("hl", self.config.hl.as_str()), ("tz", tz.as_str())])
                .query(query)
                .send()
                .await?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS && attempt == 0 {
                warn!("Trends provider rate limited {}, retrying with session cookie", path);
                continue;
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ProviderError::Status { status: status.as_u16(), body });
            }
            return Ok(response.text().await?);
        }

        Err(ProviderError::Status {
            status: StatusCode::TOO_MANY_REQUESTS.as_u16(),
            body: "rate limited".to_string(),
        })
    }

    async fn explore(&self, keyword: &str, time: &str) -> Result<Vec<Widget>, ProviderError> {
        let req = json!({
            "comparisonItem": [{ "keyword": keyword, "geo": self.config.geo, "time": time }],
            "category": 0,
            "property": ""
        })
        .to_string();

        let body = self.get_text("/trends/api/explore", &[("req", req.as_str())]).await?;
        let explore: ExploreResponse = serde_json::from_str(strip_xssi_prefix(&body))
            .map_err(|e| ProviderError::Decode(format!("expected explore widgets: {}", e)))?;
        Ok(explore.widgets)
    }

    async fn widget_data(
        &self,
        keyword: &str,
        time: &str,
        widget_id: &'static str,
        path: &str,
    ) -> Result<String, ProviderError> {
        let widgets = self.explore(keyword, time).await?;
        let widget = widgets
            .into_iter()
            .find(|w| w.id == widget_id)
            .ok_or(ProviderError::MissingWidget(widget_id))?;

        let req = widget.request.to_string();
        self.get_text(path, &[("req", req.as_str()), ("token", widget.token.as_str())])
            .await
    }
}

#[async_trait]
impl TrendsProvider for GoogleTrendsClient {
    async fn interest_over_time(
        &self,
        keyword: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeSeriesPoint>, ProviderError> {
        let time = format_time_window(start, end);
        info!("Fetching interest over time for \"{}\" ({})", keyword, time);

        let body = self
            .widget_data(keyword, &time, TIMESERIES_WIDGET, "/trends/api/widgetdata/multiline")
            .await?;
        let points = decode_timeline(&body)?;
        info!("Received {} interest points for \"{}\"", points.len(), keyword);
        Ok(points)
    }

    async fn related_queries(&self, keyword: &str) -> Result<RelatedQueries, ProviderError> {
        info!("Fetching related queries for \"{}\"", keyword);

        let body = self
            .widget_data(keyword, "all", RELATED_QUERIES_WIDGET, "/trends/api/widgetdata/relatedsearches")
            .await?;
        let related = decode_related(&body)?;
        debug!(
            "Related queries for \"{}\": {} top, {} rising",
            keyword,
            related.top.len(),
            related.rising.len()
        );
        Ok(related)
    }
}
