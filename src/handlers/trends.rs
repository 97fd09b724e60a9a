// src/handlers/trends.rs
use chrono::{Duration, Utc};
use log::{error, info, warn};
use percent_encoding::percent_decode_str;
use serde_json::json;
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use super::analyze::validate_keyword;
use super::error::ApiError;
use crate::context::AppContext;
use crate::error::AnalysisError;

pub async fn get_trends(raw_keyword: String, ctx: Arc<AppContext>) -> Result<Json, Rejection> {
    let decoded = percent_decode_str(&raw_keyword)
        .decode_utf8()
        .map_err(|_| warp::reject::custom(ApiError::bad_request("Keyword is not valid UTF-8")))?;
    let keyword = validate_keyword(Some(&decoded)).map_err(warp::reject::custom)?;
    info!("Handling request for trends of \"{}\"", keyword);

    let end = Utc::now();
    let start = end - Duration::days(365);

    let timeline = match ctx.analyzer.fetch_series(&keyword, start, end).await {
        Ok(points) => points,
        Err(AnalysisError::EmptySeries { .. }) => {
            warn!("No trend data for \"{}\"", keyword);
            Vec::new()
        }
        Err(e) => {
            error!("Failed to fetch trends for \"{}\": {}", keyword, e);
            return Err(warp::reject::custom(ApiError::new("Failed to fetch trends")));
        }
    };

    Ok(warp::reply::json(&json!({
        "keyword": keyword,
        "timelineData": timeline,
    })))
}
