//! Integration tests for GoogleTrendsClient and the analyzer using wiremock

use chrono::{TimeZone, Utc};
use pod_market_analyzer::error::{AnalysisError, ProviderError};
use pod_market_analyzer::models::{CompetitionLevel, Profitability, TrendDirection};
use pod_market_analyzer::services::analyzer::MarketAnalyzer;
use pod_market_analyzer::services::trends::{GoogleTrendsClient, TrendsConfig, TrendsProvider};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const XSSI: &str = ")]}',\n";
const WEEK: i64 = 7 * 86_400;
const JAN_1_2023: i64 = 1_672_531_200;

fn client_for(server: &MockServer) -> GoogleTrendsClient {
    GoogleTrendsClient::new(TrendsConfig {
        base_url: server.uri(),
        ..TrendsConfig::default()
    })
    .unwrap()
}

fn explore_body() -> String {
    let body = json!({
        "widgets": [
            {"id": "TIMESERIES", "token": "ts-token", "request": {"resolution": "WEEK"}},
            {"id": "RELATED_TOPICS", "token": "rt-token", "request": {}},
            {"id": "RELATED_QUERIES", "token": "rq-token", "request": {"restriction": {}}}
        ]
    });
    format!("{}{}", XSSI, body)
}

/// 40 weeks at 45 followed by 12 weeks at 70
fn timeline_body() -> String {
    let points: Vec<_> = (0..52)
        .map(|i| {
            let value = if i < 40 { 45 } else { 70 };
            json!({"time": (JAN_1_2023 + i * WEEK).to_string(), "value": [value], "formattedTime": "..."})
        })
        .collect();
    format!("{}{}", XSSI, json!({"default": {"timelineData": points}}))
}

fn related_body() -> String {
    let body = json!({
        "default": {
            "rankedList": [
                {"rankedKeyword": [
                    {"query": "funny cat shirts for men", "value": 100, "formattedValue": "100"},
                    {"query": "cat shirt", "value": 62, "formattedValue": "62"}
                ]},
                {"rankedKeyword": [
                    {"query": "cat dad shirt", "value": 250, "formattedValue": "Breakout"}
                ]}
            ]
        }
    });
    format!("{}{}", XSSI, body)
}

async fn mount_happy_path(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/trends/api/explore"))
        .and(query_param("hl", "en-US"))
        .respond_with(ResponseTemplate::new(200).set_body_string(explore_body()))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/trends/api/widgetdata/multiline"))
        .and(query_param("token", "ts-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string(timeline_body()))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/trends/api/widgetdata/relatedsearches"))
        .and(query_param("token", "rq-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string(related_body()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_interest_over_time() {
    let server = MockServer::start().await;
    mount_happy_path(&server).await;

    let client = client_for(&server);
    let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let points = client.interest_over_time("funny cat shirts", start, end).await.unwrap();

    assert_eq!(points.len(), 52);
    assert_eq!(points[0].timestamp_seconds, JAN_1_2023);
    assert_eq!(points[0].value, 45);
    assert_eq!(points[51].value, 70);
}

#[tokio::test]
async fn test_related_queries() {
    let server = MockServer::start().await;
    mount_happy_path(&server).await;

    let related = client_for(&server).related_queries("funny cat shirts").await.unwrap();

    assert_eq!(related.top.len(), 2);
    assert_eq!(related.top[1].query, "cat shirt");
    assert_eq!(related.rising.len(), 1);
    assert!(related.rising[0].is_breakout());
}

#[tokio::test]
async fn test_rate_limit_retried_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/trends/api/explore"))
        .respond_with(ResponseTemplate::new(429).insert_header("set-cookie", "NID=abc; Path=/"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_happy_path(&server).await;

    let related = client_for(&server).related_queries("cat").await;
    assert!(related.is_ok(), "Should succeed after one retry: {:?}", related.err());
}

#[tokio::test]
async fn test_persistent_rate_limit_fails() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/trends/api/explore"))
        .respond_with(ResponseTemplate::new(429))
        .expect(2)
        .mount(&server)
        .await;

    let result = client_for(&server).related_queries("cat").await;
    assert!(matches!(result, Err(ProviderError::Status { status: 429, .. })));
}

#[tokio::test]
async fn test_missing_widget() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/trends/api/explore"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!("{}{}", XSSI, json!({"widgets": []}))))
        .mount(&server)
        .await;

    let result = client_for(&server).related_queries("cat").await;
    assert!(matches!(result, Err(ProviderError::MissingWidget("RELATED_QUERIES"))));
}

#[tokio::test]
async fn test_malformed_timeline_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/trends/api/explore"))
        .respond_with(ResponseTemplate::new(200).set_body_string(explore_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/trends/api/widgetdata/multiline"))
        .respond_with(ResponseTemplate::new(200).set_body_string(")]}',\n{\"default\": {}}"))
        .mount(&server)
        .await;

    let now = Utc::now();
    let result = client_for(&server)
        .interest_over_time("cat", now - chrono::Duration::days(365), now)
        .await;
    match result {
        Err(ProviderError::Decode(message)) => assert!(message.contains("timelineData")),
        other => panic!("expected decode error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_full_analysis_over_http() {
    let server = MockServer::start().await;
    mount_happy_path(&server).await;

    let analyzer = MarketAnalyzer::new(Arc::new(client_for(&server)));
    let report = analyzer.analyze("funny cat shirts").await.unwrap();

    assert_eq!(report.trend.average_popularity, 51);
    assert_eq!(report.trend.trend_direction, TrendDirection::Rising);
    assert_eq!(report.competition.score, 55);
    assert_eq!(report.competition.level, CompetitionLevel::Medium);
    assert_eq!(report.opportunity.profitability, Profitability::High);

    let keywords: Vec<_> = report.related_keywords.iter().map(|k| k.keyword.as_str()).collect();
    assert_eq!(keywords, vec!["funny cat shirts for men", "cat shirt", "cat dad shirt"]);
    assert_eq!(report.related_keywords[2].popularity, 100);
    assert_eq!(report.related_keywords[2].trend, "rising");
}

#[tokio::test]
async fn test_related_failure_degrades() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/trends/api/explore"))
        .respond_with(ResponseTemplate::new(200).set_body_string(explore_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/trends/api/widgetdata/multiline"))
        .respond_with(ResponseTemplate::new(200).set_body_string(timeline_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/trends/api/widgetdata/relatedsearches"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let analyzer = MarketAnalyzer::new(Arc::new(client_for(&server)));
    let report = analyzer.analyze("funny cat shirts").await.unwrap();

    assert!(report.related_keywords.is_empty());
    assert_eq!(report.trend.average_popularity, 51);
    assert_eq!(report.competition.score, 55);
}

#[tokio::test]
async fn test_slow_series_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/trends/api/explore"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(explore_body())
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let analyzer = MarketAnalyzer::new(Arc::new(client_for(&server))).with_timeout(Duration::from_millis(100));
    let result = analyzer.analyze("cat").await;

    assert!(matches!(result, Err(AnalysisError::Provider(ProviderError::Timeout(_)))));
}
