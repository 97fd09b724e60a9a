// src/routes.rs
use std::convert::Infallible;
use std::sync::Arc;
use log::{debug, info};
use warp::filters::body::BodyDeserializeError;
use warp::http::StatusCode;
use warp::reject::Rejection;
use warp::{Filter, Reply};

use crate::context::AppContext;
use crate::handlers::analyze::{analyze_keyword, analyze_keyword_health, analyze_keyword_usage};
use crate::handlers::error::ApiError;
use crate::handlers::prompt::generate_prompt;
use crate::handlers::trends::get_trends;

const MAX_BODY_BYTES: u64 = 64 * 1024;

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let api_error = if err.is_not_found() {
        ApiError {
            status: StatusCode::NOT_FOUND,
            ..ApiError::new("Not Found")
        }
    } else if let Some(api_error) = err.find::<ApiError>() {
        api_error.clone()
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        debug!("Rejected request body: {}", e);
        ApiError::bad_request("Invalid JSON body")
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        ApiError {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            ..ApiError::new("Request body too large")
        }
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        ApiError {
            status: StatusCode::METHOD_NOT_ALLOWED,
            ..ApiError::new("Method not allowed")
        }
    } else {
        ApiError::new("Internal Server Error")
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&api_error.body()),
        api_error.status,
    ))
}

pub fn routes(ctx: Arc<AppContext>) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    info!("Configuring routes...");

    let ctx_filter = warp::any().map(move || ctx.clone());

    let analyze_route = warp::path!("api" / "analyze-keyword")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(ctx_filter.clone())
        .and_then(analyze_keyword);

    let analyze_usage_route = warp::path!("api" / "analyze-keyword")
        .and(warp::get())
        .and_then(analyze_keyword_usage);

    let analyze_health_route = warp::path!("api" / "analyze-keyword")
        .and(warp::head())
        .and(ctx_filter.clone())
        .and_then(analyze_keyword_health);

    let trends_route = warp::path!("api" / "trends" / String)
        .and(warp::get())
        .and(ctx_filter.clone())
        .and_then(get_trends);

    let prompt_route = warp::path!("api" / "generate-prompt")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(ctx_filter.clone())
        .and_then(generate_prompt);

    info!("All routes configured successfully.");

    analyze_route
        .or(analyze_usage_route)
        .or(analyze_health_route)
        .or(trends_route)
        .or(prompt_route)
        .recover(handle_rejection)
}
