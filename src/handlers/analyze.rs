// src/handlers/analyze.rs
use chrono::{SecondsFormat, Utc};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use warp::http::StatusCode;
use warp::reply::Json;
use warp::{Rejection, Reply};

use super::error::ApiError;
use crate::context::AppContext;
use crate::models::MarketReport;
use crate::services::keyword_ai::{self, EnhancedReport, AI_PROVIDER};
use crate::services::openrouter::AVAILABLE_MODELS;

pub const MAX_KEYWORD_LENGTH: usize = 100;

fn default_use_ai() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default = "default_use_ai", rename = "useAI")]
    pub use_ai: bool,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AnalysisData {
    Basic(MarketReport),
    Enhanced(EnhancedReport),
}

impl AnalysisData {
    fn keyword_count(&self) -> usize {
        match self {
            AnalysisData::Basic(report) => report.related_keywords.len(),
            AnalysisData::Enhanced(report) => report.related_keywords.len(),
        }
    }

    fn niche_count(&self) -> usize {
        match self {
            AnalysisData::Basic(_) => 0,
            AnalysisData::Enhanced(report) => report.related_niches.len(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMeta {
    pub ai_enhanced: bool,
    pub ai_fallback: bool,
    pub ai_provider: Option<&'static str>,
    pub selected_model: Option<String>,
    pub processing_time: String,
    pub analysis_timestamp: String,
    pub keyword_count: usize,
    pub niche_count: usize,
}

/// Trimmed keyword, 1 to 100 characters.
pub fn validate_keyword(raw: Option<&str>) -> Result<String, ApiError> {
    let keyword = raw.map(str::trim).unwrap_or("");
    if keyword.is_empty() {
        return Err(ApiError::bad_request("Keyword is required"));
    }
    if keyword.chars().count() > MAX_KEYWORD_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Keyword too long (max {} characters)",
            MAX_KEYWORD_LENGTH
        )));
    }
    Ok(keyword.to_string())
}

pub async fn analyze_keyword(request: AnalyzeRequest, ctx: Arc<AppContext>) -> Result<Json, Rejection> {
    let started = Instant::now();
    let keyword = validate_keyword(request.keyword.as_deref()).map_err(warp::reject::custom)?;
    info!("Handling analysis request for \"{}\" (useAI: {})", keyword, request.use_ai);

    let report = ctx.analyzer.analyze(&keyword).await.map_err(|e| {
        error!("Analysis of \"{}\" failed: {}", keyword, e);
        warp::reject::custom(ApiError::analysis_failed(e.to_string()))
    })?;

    let relay = match (&ctx.relay, request.use_ai) {
        (Some(relay), true) => Some(relay),
        (None, true) => {
            warn!("AI analysis requested but OPENROUTER_API_KEY is not configured");
            None
        }
        _ => None,
    };

    let (data, ai_fallback, selected_model) = match relay {
        Some(relay) => {
            let model = request
                .model
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| ctx.default_model.clone());
            let (ai, fallback) = keyword_ai::analyze_or_fallback(relay, &model, &report).await;
            (AnalysisData::Enhanced(keyword_ai::enhance(report, ai)), fallback, Some(model))
        }
        None => (AnalysisData::Basic(report), false, None),
    };

    let ai_enhanced = selected_model.is_some();
    let meta = AnalysisMeta {
        ai_enhanced,
        ai_fallback,
        ai_provider: ai_enhanced.then_some(AI_PROVIDER),
        selected_model,
        processing_time: format!("{}ms", started.elapsed().as_millis()),
        analysis_timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        keyword_count: data.keyword_count(),
        niche_count: data.niche_count(),
    };
    info!(
        "Analysis of \"{}\" served in {} ({} keywords, {} niches)",
        keyword, meta.processing_time, meta.keyword_count, meta.niche_count
    );

    Ok(warp::reply::json(&json!({
        "success": true,
        "data": data,
        "meta": meta,
    })))
}

pub async fn analyze_keyword_usage() -> Result<impl Reply, Rejection> {
    Ok(warp::reply::with_status(
        warp::reply::json(&json!({
            "success": false,
            "error": "Method not allowed",
            "message": "Use POST with a JSON body to analyze a keyword",
            "example": {
                "keyword": "funny cat shirts",
                "useAI": true,
                "model": AVAILABLE_MODELS[0],
            },
            "availableModels": AVAILABLE_MODELS,
        })),
        StatusCode::METHOD_NOT_ALLOWED,
    ))
}

/// Health probe: reports AI availability in headers only.
pub async fn analyze_keyword_health(ctx: Arc<AppContext>) -> Result<impl Reply, Rejection> {
    let available_models = serde_json::to_string(&AVAILABLE_MODELS).unwrap_or_else(|_| "[]".to_string());

    let reply = warp::reply::with_header(warp::reply(), "X-AI-Available", ctx.ai_available().to_string());
    let reply = warp::reply::with_header(reply, "X-AI-Provider", AI_PROVIDER);
    let reply = warp::reply::with_header(reply, "X-Selected-Model", ctx.default_model.clone());
    let reply = warp::reply::with_header(reply, "X-Service-Status", "healthy");
    Ok(warp::reply::with_header(reply, "X-Available-Models", available_models))
}
